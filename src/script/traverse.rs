use crate::script::node::{NodeId, NodeKind};
use crate::script::tree::ScriptTree;

/// Lazy pre-order walk of a subtree.
///
/// Uses an explicit stack, so depth is bounded by memory rather than the
/// call stack. [`Dfs::restart`] rewinds to the starting node.
#[derive(Debug, Clone)]
pub struct Dfs<'a> {
    tree: &'a ScriptTree,
    start: NodeId,
    stack: Vec<NodeId>,
}

impl<'a> Dfs<'a> {
    pub fn new(tree: &'a ScriptTree, start: NodeId) -> Self {
        Self {
            tree,
            start,
            stack: vec![start],
        }
    }

    pub fn restart(&mut self) {
        self.stack.clear();
        self.stack.push(self.start);
    }
}

impl Iterator for Dfs<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let first_child = self.stack.len();
        self.stack.extend(self.tree.children(id));
        self.stack[first_child..].reverse();
        Some(id)
    }
}

impl ScriptTree {
    pub fn dfs(&self, start: NodeId) -> Dfs<'_> {
        Dfs::new(self, start)
    }

    /// Every call expression under `start`, outermost first
    pub fn calls(&self, start: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.dfs(start).filter(move |&id| self.kind(id).is_call())
    }

    /// First call to `name` under `start`, with its arguments
    pub fn find_call(&self, start: NodeId, name: &str) -> Option<(NodeId, &[NodeId])> {
        self.calls(start)
            .find(|&id| self.callee_name(id) == Some(name))
            .and_then(|id| self.call_parts(id).map(|(_, arguments)| (id, arguments)))
    }

    /// Whether `start` contains a node of `kind`
    pub fn contains_kind(&self, start: NodeId, kind: NodeKind) -> bool {
        self.dfs(start).any(|id| self.kind(id) == kind)
    }
}
