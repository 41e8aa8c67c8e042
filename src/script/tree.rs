use serde::Deserialize;
use std::ops::Index;

use crate::error::{RecoveryError, Result};
use crate::script::node::{Children, NodeData, NodeId, NodeKind, ScriptNode};
use crate::script::raw::{RawArguments, RawNode, RawValue};

/// Arena of script nodes.
///
/// Nodes are stored in pre-order; the root is always `NodeId(0)`. Parent
/// links are indices into the same arena and are set exactly once while the
/// tree is built.
#[derive(Debug, Clone)]
pub struct ScriptTree {
    nodes: Vec<ScriptNode>,
}

impl ScriptTree {
    /// Parse the JSON form emitted by the script parser. Nesting depth is
    /// unbounded; the stack grows on the heap as needed.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut json = serde_json::Deserializer::from_str(text);
        json.disable_recursion_limit();
        let raw = RawNode::deserialize(serde_stacker::Deserializer::new(&mut json))?;
        json.end()?;
        Self::from_raw(&raw)
    }

    /// Build the arena with an explicit stack, in two passes: the first
    /// numbers nodes in pre-order, the second resolves each node's fields
    /// against its children's ids.
    pub fn from_raw(raw: &RawNode) -> Result<Self> {
        let mut order: Vec<&RawNode> = Vec::new();
        let mut child_ids: Vec<Vec<NodeId>> = Vec::new();
        let mut stack: Vec<(&RawNode, Option<NodeId>)> = vec![(raw, None)];
        let mut nested = Vec::new();
        while let Some((raw, parent)) = stack.pop() {
            let id = NodeId::new(order.len() as u32);
            order.push(raw);
            child_ids.push(Vec::new());
            if let Some(parent) = parent {
                child_ids[parent.index()].push(id);
            }

            nested.clear();
            Resolver {
                visit: &mut |child| {
                    nested.push(child);
                    Ok(id)
                },
            }
            .resolve(raw)?;
            stack.extend(nested.drain(..).rev().map(|child| (child, Some(id))));
        }

        let mut nodes = Vec::with_capacity(order.len());
        for (raw, ids) in order.iter().zip(&child_ids) {
            let mut ids = ids.iter().copied();
            let data = Resolver {
                visit: &mut |_| {
                    ids.next()
                        .ok_or_else(|| RecoveryError::malformed(raw.kind, "child count changed between passes"))
                },
            }
            .resolve(raw)?;
            nodes.push(ScriptNode { data, parent: None });
        }

        for index in 0..nodes.len() {
            let parent = NodeId::new(index as u32);
            let kind = nodes[index].kind();
            let children: Vec<NodeId> = nodes[index].children().collect();
            for child in children {
                let slot = &mut nodes[child.index()].parent;
                if slot.is_some() {
                    return Err(RecoveryError::malformed(kind, format!("node {child} already has a parent")));
                }
                *slot = Some(parent);
            }
        }
        Ok(Self { nodes })
    }

    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&ScriptNode> {
        self.nodes.get(id.index())
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self[id].data
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self[id].kind()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        self[id].children()
    }

    /// Parents of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    pub fn identifier_name(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Identifier { name } => Some(name),
            _ => None,
        }
    }

    /// Base and arguments of any call form
    pub fn call_parts(&self, id: NodeId) -> Option<(NodeId, &[NodeId])> {
        match self.data(id) {
            NodeData::CallExpression { base, arguments } | NodeData::StringCallExpression { base, arguments } => {
                Some((*base, arguments))
            }
            NodeData::TableCallExpression { base, argument } => Some((*base, std::slice::from_ref(argument))),
            _ => None,
        }
    }

    /// Name of a call whose base is a plain identifier
    pub fn callee_name(&self, id: NodeId) -> Option<&str> {
        self.call_parts(id).and_then(|(base, _)| self.identifier_name(base))
    }

    /// Named top-level function declarations in source order
    pub fn function_declarations(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        let body: &[NodeId] = match self.nodes.first().map(ScriptNode::data) {
            Some(NodeData::Chunk { body }) => body,
            _ => &[],
        };
        body.iter().filter_map(move |&id| match self.data(id) {
            NodeData::FunctionDeclaration { name: Some(name), .. } => {
                self.identifier_name(*name).map(|name| (name, id))
            }
            _ => None,
        })
    }

    /// Statement list of a function or block node
    pub fn block(&self, id: NodeId) -> &[NodeId] {
        match self.data(id) {
            NodeData::Chunk { body }
            | NodeData::FunctionDeclaration { body, .. }
            | NodeData::FunctionExpression { body, .. }
            | NodeData::IfClause { body, .. }
            | NodeData::ElseifClause { body, .. }
            | NodeData::ElseClause { body }
            | NodeData::WhileStatement { body, .. }
            | NodeData::DoStatement { body }
            | NodeData::RepeatStatement { body, .. }
            | NodeData::ForNumericStatement { body, .. }
            | NodeData::ForGenericStatement { body, .. } => body,
            _ => &[],
        }
    }
}

impl Index<NodeId> for ScriptTree {
    type Output = ScriptNode;

    fn index(&self, id: NodeId) -> &ScriptNode {
        &self.nodes[id.index()]
    }
}

/// Maps raw fields to typed node data. Every nested node goes through
/// `visit`, in the order its id is assigned.
struct Resolver<'v, 'r> {
    visit: &'v mut dyn FnMut(&'r RawNode) -> Result<NodeId>,
}

impl<'r> Resolver<'_, 'r> {
    fn build(&mut self, raw: &'r RawNode) -> Result<NodeId> {
        (self.visit)(raw)
    }

    fn resolve(&mut self, raw: &'r RawNode) -> Result<NodeData> {
        let kind = raw.kind;
        let data = match kind {
            NodeKind::Chunk => NodeData::Chunk {
                body: self.list(&raw.body)?,
            },
            NodeKind::FunctionDeclaration => NodeData::FunctionDeclaration {
                name: self.optional(raw.target.as_deref())?,
                parameters: self.list(&raw.parameters)?,
                body: self.list(&raw.body)?,
            },
            NodeKind::LocalStatement => NodeData::LocalStatement {
                variables: self.list(&raw.targets)?,
                init: self.list(&raw.values)?,
            },
            NodeKind::AssignmentStatement => NodeData::AssignmentStatement {
                variables: self.list(&raw.targets)?,
                init: self.list(&raw.values)?,
            },
            NodeKind::CallStatement => NodeData::CallStatement {
                expression: self.required(kind, "target", raw.target.as_deref())?,
            },
            NodeKind::IfStatement => {
                if let Some(clause) = raw.clauses.iter().find(|clause| {
                    !matches!(
                        clause.kind,
                        NodeKind::IfClause | NodeKind::ElseifClause | NodeKind::ElseClause
                    )
                }) {
                    return Err(RecoveryError::malformed(kind, format!("{} is not a clause", clause.kind)));
                }
                NodeData::IfStatement {
                    clauses: self.list(&raw.clauses)?,
                }
            }
            NodeKind::IfClause => NodeData::IfClause {
                condition: self.required(kind, "condition", raw.condition.as_deref())?,
                body: self.list(&raw.body)?,
            },
            NodeKind::ElseifClause => NodeData::ElseifClause {
                condition: self.required(kind, "condition", raw.condition.as_deref())?,
                body: self.list(&raw.body)?,
            },
            NodeKind::ElseClause => NodeData::ElseClause {
                body: self.list(&raw.body)?,
            },
            NodeKind::WhileStatement => NodeData::WhileStatement {
                condition: self.required(kind, "condition", raw.condition.as_deref())?,
                body: self.list(&raw.body)?,
            },
            NodeKind::DoStatement => NodeData::DoStatement {
                body: self.list(&raw.body)?,
            },
            NodeKind::RepeatStatement => NodeData::RepeatStatement {
                body: self.list(&raw.body)?,
                condition: self.required(kind, "condition", raw.condition.as_deref())?,
            },
            NodeKind::ForNumericStatement => NodeData::ForNumericStatement {
                variable: self.required(kind, "target", raw.target.as_deref())?,
                start: self.required(kind, "start", raw.start.as_deref())?,
                limit: self.required(kind, "limit", raw.limit.as_deref())?,
                step: self.optional(raw.step.as_deref())?,
                body: self.list(&raw.body)?,
            },
            NodeKind::ForGenericStatement => NodeData::ForGenericStatement {
                variables: self.list(&raw.targets)?,
                iterators: self.list(&raw.values)?,
                body: self.list(&raw.body)?,
            },
            NodeKind::ReturnStatement => NodeData::ReturnStatement {
                arguments: self.list(&raw.values)?,
            },
            NodeKind::BreakStatement => NodeData::BreakStatement,
            NodeKind::GotoStatement => NodeData::GotoStatement {
                label: required_name(raw)?,
            },
            NodeKind::LabelStatement => NodeData::LabelStatement {
                label: required_name(raw)?,
            },
            NodeKind::Identifier => NodeData::Identifier {
                name: required_name(raw)?,
            },
            NodeKind::MemberExpression => NodeData::MemberExpression {
                base: self.required(kind, "target", raw.target.as_deref())?,
                indexer: raw.operator.clone().unwrap_or_else(|| ".".to_string()),
                identifier: self.required(kind, "key", raw.key.as_deref())?,
            },
            NodeKind::IndexExpression => NodeData::IndexExpression {
                base: self.required(kind, "target", raw.target.as_deref())?,
                index: self.required(kind, "key", raw.key.as_deref())?,
            },
            NodeKind::CallExpression => NodeData::CallExpression {
                base: self.required(kind, "target", raw.target.as_deref())?,
                arguments: self.argument_list(raw)?,
            },
            NodeKind::StringCallExpression => NodeData::StringCallExpression {
                base: self.required(kind, "target", raw.target.as_deref())?,
                arguments: self.argument_list(raw)?,
            },
            NodeKind::TableCallExpression => {
                let base = self.required(kind, "target", raw.target.as_deref())?;
                let argument = match &raw.arguments {
                    Some(RawArguments::One(argument)) => self.build(argument)?,
                    Some(RawArguments::Many(arguments)) if arguments.len() == 1 => self.build(&arguments[0])?,
                    _ => return Err(RecoveryError::malformed(kind, "expects exactly one table argument")),
                };
                NodeData::TableCallExpression { base, argument }
            }
            NodeKind::FunctionExpression => NodeData::FunctionExpression {
                parameters: self.list(&raw.parameters)?,
                body: self.list(&raw.body)?,
            },
            NodeKind::BinaryExpression | NodeKind::LogicalExpression => {
                let operator = required_operator(raw)?;
                let [left, right] = raw.operands.as_slice() else {
                    return Err(RecoveryError::malformed(
                        kind,
                        format!("expects 2 operands, found {}", raw.operands.len()),
                    ));
                };
                let left = self.build(left)?;
                let right = self.build(right)?;
                if kind == NodeKind::BinaryExpression {
                    NodeData::BinaryExpression { operator, left, right }
                } else {
                    NodeData::LogicalExpression { operator, left, right }
                }
            }
            NodeKind::UnaryExpression => {
                let operator = required_operator(raw)?;
                let [argument] = raw.operands.as_slice() else {
                    return Err(RecoveryError::malformed(
                        kind,
                        format!("expects 1 operand, found {}", raw.operands.len()),
                    ));
                };
                NodeData::UnaryExpression {
                    operator,
                    argument: self.build(argument)?,
                }
            }
            NodeKind::ParenthesizedExpression => NodeData::ParenthesizedExpression {
                expression: self.required(kind, "target", raw.target.as_deref())?,
            },
            NodeKind::TableConstructorExpression => NodeData::TableConstructorExpression {
                fields: self.list(&raw.values)?,
            },
            NodeKind::TableKey => NodeData::TableKey {
                key: self.required(kind, "key", raw.key.as_deref())?,
                value: self.payload(raw)?,
            },
            NodeKind::TableKeyString => NodeData::TableKeyString {
                key: self.required(kind, "key", raw.key.as_deref())?,
                value: self.payload(raw)?,
            },
            NodeKind::TableValue => NodeData::TableValue {
                value: self.payload(raw)?,
            },
            NodeKind::StringLiteral => NodeData::StringLiteral {
                raw: literal_text(raw)?,
            },
            NodeKind::NumericLiteral => NodeData::NumericLiteral {
                raw: literal_text(raw)?,
            },
            NodeKind::BooleanLiteral => NodeData::BooleanLiteral {
                value: match &raw.value {
                    Some(RawValue::Bool(value)) => *value,
                    Some(RawValue::Text(text)) if text == "true" => true,
                    Some(RawValue::Text(text)) if text == "false" => false,
                    _ => return Err(RecoveryError::malformed(kind, "expects true or false")),
                },
            },
            NodeKind::NilLiteral => NodeData::NilLiteral,
            NodeKind::VarargLiteral => NodeData::VarargLiteral,
        };
        Ok(data)
    }

    fn list(&mut self, raws: &'r [RawNode]) -> Result<Vec<NodeId>> {
        raws.iter().map(|raw| self.build(raw)).collect()
    }

    fn optional(&mut self, raw: Option<&'r RawNode>) -> Result<Option<NodeId>> {
        raw.map(|raw| self.build(raw)).transpose()
    }

    fn required(&mut self, kind: NodeKind, field: &str, raw: Option<&'r RawNode>) -> Result<NodeId> {
        match raw {
            Some(raw) => self.build(raw),
            None => Err(RecoveryError::malformed(kind, format!("missing '{field}'"))),
        }
    }

    fn argument_list(&mut self, raw: &'r RawNode) -> Result<Vec<NodeId>> {
        match &raw.arguments {
            Some(RawArguments::Many(arguments)) => self.list(arguments),
            Some(RawArguments::One(argument)) => Ok(vec![self.build(argument)?]),
            None => Ok(Vec::new()),
        }
    }

    /// Nested node carried in `value` by table entries
    fn payload(&mut self, raw: &'r RawNode) -> Result<NodeId> {
        match &raw.value {
            Some(RawValue::Node(value)) => self.build(value),
            _ => Err(RecoveryError::malformed(raw.kind, "expects a node in 'value'")),
        }
    }
}

fn required_name(raw: &RawNode) -> Result<String> {
    raw.name
        .clone()
        .ok_or_else(|| RecoveryError::malformed(raw.kind, "missing 'name'"))
}

fn required_operator(raw: &RawNode) -> Result<String> {
    raw.operator
        .clone()
        .ok_or_else(|| RecoveryError::malformed(raw.kind, "missing 'operator'"))
}

/// Scalar text carried in `value` by literals
fn literal_text(raw: &RawNode) -> Result<String> {
    match &raw.value {
        Some(RawValue::Text(text)) => Ok(text.clone()),
        Some(RawValue::Number(number)) => Ok(number.to_string()),
        _ => Err(RecoveryError::malformed(raw.kind, "expects literal text in 'value'")),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    /// JSON for `"a" .. ("a" .. (...))`, `depth` operators deep
    pub fn concat_chain_json(depth: usize) -> String {
        let leaf = r#"{"kind":"StringLiteral","value":"\"a\""}"#;
        let mut json = String::new();
        for _ in 0..depth {
            json.push_str(r#"{"kind":"BinaryExpression","operator":"..","operands":["#);
            json.push_str(leaf);
            json.push(',');
        }
        json.push_str(leaf);
        for _ in 0..depth {
            json.push_str("]}");
        }
        json
    }
}
