use log::{debug, info};
use std::borrow::Cow;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::reconstruct::context::ReconstructionContext;
use crate::reconstruct::handlers::{default_handlers, Handler};
use crate::reconstruct::players::MapInfo;
use crate::reconstruct::records::ReconstructedObjects;
use crate::script::{NodeId, NodeKind, ScriptTree};

/// Functions the game runs on map load, in the order it runs them
pub const ENTRY_POINTS: [&str; 2] = ["config", "main"];

/// Runs a function given its name as a string argument
const DEFERRED_CALL: &str = "ExecuteFunc";

/// Counters of one reconstruction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub statements: usize,
    pub consumed: usize,
    pub handler_errors: usize,
    pub handler_panics: usize,
}

#[derive(Debug, Clone, Copy)]
enum Work {
    /// Statement still to be flattened
    Visit(NodeId),
    /// Statement ready to be offered to handlers
    Emit(NodeId),
}

/// Walks the statements reachable from [`ENTRY_POINTS`] in call order and
/// offers each one to an ordered list of handlers
#[derive(Debug, Clone)]
pub struct StatementPatternEngine {
    handlers: Vec<Handler>,
}

impl Default for StatementPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementPatternEngine {
    /// Engine with the built-in handlers
    pub fn new() -> Self {
        Self::with_handlers(default_handlers())
    }

    pub fn with_handlers(handlers: Vec<Handler>) -> Self {
        Self { handlers }
    }

    /// Append a handler; it runs after every handler registered before it
    pub fn register(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Rebuild object records from `tree`
    pub fn reconstruct(&self, tree: &ScriptTree, map_info: MapInfo) -> ReconstructedObjects {
        self.reconstruct_with_stats(tree, map_info).0
    }

    /// [`reconstruct`](Self::reconstruct), also returning the pass counters
    pub fn reconstruct_with_stats(&self, tree: &ScriptTree, map_info: MapInfo) -> (ReconstructedObjects, PassStats) {
        let mut ctx = ReconstructionContext::new(tree, map_info);
        let statements = flatten(&mut ctx, tree);

        let mut stats = PassStats {
            statements: statements.len(),
            ..Default::default()
        };
        for statement in statements {
            ctx.track_assignment(tree, statement);
            self.dispatch(&mut ctx, tree, statement, &mut stats);
        }

        info!(
            "Reconstructed {} objects from {} statements ({} consumed, {} handler errors, {} panics)",
            ctx.len(),
            stats.statements,
            stats.consumed,
            stats.handler_errors,
            stats.handler_panics
        );
        (ctx.into_objects(), stats)
    }

    /// Offer one statement to each handler until one consumes it
    fn dispatch(&self, ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId, stats: &mut PassStats) {
        for handler in &self.handlers {
            // Isolate panics with catch_unwind
            let result = catch_unwind(AssertUnwindSafe(|| (handler.run)(ctx, tree, statement)));
            match result {
                Ok(Ok(true)) => {
                    stats.consumed += 1;
                    return;
                }
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    debug!("Handler {} failed on statement {}: {}", handler.name, statement, e);
                    stats.handler_errors += 1;
                }
                Err(_) => {
                    debug!("Handler {} panicked on statement {}", handler.name, statement);
                    stats.handler_panics += 1;
                }
            }
        }
    }
}

/// Statements reachable from the entry points, with calls to script
/// functions replaced by the callee's body. A callee's body comes before
/// the statement that calls it. Each function expands once per pass.
pub fn flatten(ctx: &mut ReconstructionContext, tree: &ScriptTree) -> Vec<NodeId> {
    let mut stack = Vec::new();
    for entry in ENTRY_POINTS.iter().rev() {
        if let Some(declaration) = ctx.begin_expansion(entry) {
            stack.extend(tree.block(declaration).iter().rev().map(|&statement| Work::Visit(statement)));
        } else {
            debug!("Entry point {} not found", entry);
        }
    }

    let mut ordered = Vec::new();
    let mut pending = Vec::new();
    while let Some(work) = stack.pop() {
        match work {
            Work::Emit(statement) => ordered.push(statement),
            Work::Visit(statement) => {
                pending.clear();
                expand_statement(ctx, tree, statement, &mut pending);
                stack.extend(pending.drain(..).rev());
            }
        }
    }
    ordered
}

/// Work items for one statement, in execution order
fn expand_statement(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId, out: &mut Vec<Work>) {
    match tree.kind(statement) {
        // declared, not run
        NodeKind::FunctionDeclaration => {}
        kind if is_compound(kind) => {
            for child in tree.children(statement) {
                let child_kind = tree.kind(child);
                if child_kind.is_statement() || is_clause(child_kind) {
                    out.push(Work::Visit(child));
                } else {
                    expand_callees(ctx, tree, child, out);
                }
            }
        }
        _ => {
            expand_callees(ctx, tree, statement, out);
            out.push(Work::Emit(statement));
        }
    }
}

/// Queue the bodies of script functions called anywhere under `node`.
/// Function expressions are skipped; their bodies only run when called.
fn expand_callees(ctx: &mut ReconstructionContext, tree: &ScriptTree, node: NodeId, out: &mut Vec<Work>) {
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        let kind = tree.kind(id);
        if kind == NodeKind::FunctionExpression {
            continue;
        }
        if kind.is_call() {
            if let Some(declaration) = called_function(tree, id).and_then(|name| ctx.begin_expansion(&name)) {
                out.extend(tree.block(declaration).iter().map(|&statement| Work::Visit(statement)));
            }
        }
        let start = stack.len();
        stack.extend(tree.children(id));
        stack[start..].reverse();
    }
}

/// Name of the script function a call runs, seeing through `ExecuteFunc`
fn called_function(tree: &ScriptTree, call: NodeId) -> Option<Cow<'_, str>> {
    let callee = tree.callee_name(call)?;
    if callee != DEFERRED_CALL {
        return Some(Cow::Borrowed(callee));
    }
    let (_, arguments) = tree.call_parts(call)?;
    let argument = *arguments.first()?;
    (tree.kind(argument) == NodeKind::StringLiteral).then(|| tree.literal_text(argument))
}

fn is_compound(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::IfStatement
            | NodeKind::IfClause
            | NodeKind::ElseifClause
            | NodeKind::ElseClause
            | NodeKind::WhileStatement
            | NodeKind::DoStatement
            | NodeKind::RepeatStatement
            | NodeKind::ForNumericStatement
            | NodeKind::ForGenericStatement
    )
}

fn is_clause(kind: NodeKind) -> bool {
    matches!(kind, NodeKind::IfClause | NodeKind::ElseifClause | NodeKind::ElseClause)
}
