//! Typed script nodes.
//!
//! Every kind declares its child slots in a fixed order; [`NodeData::children`]
//! walks exactly those slots, skipping absent optional ones, without
//! allocating.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{EnumCount, EnumIter};

/// Index of a node inside its [`ScriptTree`](crate::script::ScriptTree)
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed set of node kinds produced by the script parser
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumCount, strum::Display,
)]
pub enum NodeKind {
    Chunk,
    FunctionDeclaration,
    LocalStatement,
    AssignmentStatement,
    CallStatement,
    IfStatement,
    IfClause,
    ElseifClause,
    ElseClause,
    WhileStatement,
    DoStatement,
    RepeatStatement,
    ForNumericStatement,
    ForGenericStatement,
    ReturnStatement,
    BreakStatement,
    GotoStatement,
    LabelStatement,
    Identifier,
    MemberExpression,
    IndexExpression,
    CallExpression,
    StringCallExpression,
    TableCallExpression,
    FunctionExpression,
    BinaryExpression,
    LogicalExpression,
    UnaryExpression,
    ParenthesizedExpression,
    TableConstructorExpression,
    TableKey,
    TableKeyString,
    TableValue,
    StringLiteral,
    NumericLiteral,
    BooleanLiteral,
    NilLiteral,
    VarargLiteral,
}

impl NodeKind {
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::FunctionDeclaration
                | NodeKind::LocalStatement
                | NodeKind::AssignmentStatement
                | NodeKind::CallStatement
                | NodeKind::IfStatement
                | NodeKind::WhileStatement
                | NodeKind::DoStatement
                | NodeKind::RepeatStatement
                | NodeKind::ForNumericStatement
                | NodeKind::ForGenericStatement
                | NodeKind::ReturnStatement
                | NodeKind::BreakStatement
                | NodeKind::GotoStatement
                | NodeKind::LabelStatement
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            NodeKind::StringLiteral
                | NodeKind::NumericLiteral
                | NodeKind::BooleanLiteral
                | NodeKind::NilLiteral
                | NodeKind::VarargLiteral
        )
    }

    /// Call forms that invoke `base` with arguments
    pub fn is_call(&self) -> bool {
        matches!(
            self,
            NodeKind::CallExpression | NodeKind::StringCallExpression | NodeKind::TableCallExpression
        )
    }
}

/// Kind-specific payload of a node.
///
/// Table entries carry their payload as a child `value`, literals carry
/// their source text as `raw`. Table calls take exactly one `argument`,
/// every other call form an `arguments` list.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Chunk {
        body: Vec<NodeId>,
    },
    FunctionDeclaration {
        name: Option<NodeId>,
        parameters: Vec<NodeId>,
        body: Vec<NodeId>,
    },
    LocalStatement {
        variables: Vec<NodeId>,
        init: Vec<NodeId>,
    },
    AssignmentStatement {
        variables: Vec<NodeId>,
        init: Vec<NodeId>,
    },
    CallStatement {
        expression: NodeId,
    },
    IfStatement {
        clauses: Vec<NodeId>,
    },
    IfClause {
        condition: NodeId,
        body: Vec<NodeId>,
    },
    ElseifClause {
        condition: NodeId,
        body: Vec<NodeId>,
    },
    ElseClause {
        body: Vec<NodeId>,
    },
    WhileStatement {
        condition: NodeId,
        body: Vec<NodeId>,
    },
    DoStatement {
        body: Vec<NodeId>,
    },
    RepeatStatement {
        body: Vec<NodeId>,
        condition: NodeId,
    },
    ForNumericStatement {
        variable: NodeId,
        start: NodeId,
        limit: NodeId,
        step: Option<NodeId>,
        body: Vec<NodeId>,
    },
    ForGenericStatement {
        variables: Vec<NodeId>,
        iterators: Vec<NodeId>,
        body: Vec<NodeId>,
    },
    ReturnStatement {
        arguments: Vec<NodeId>,
    },
    BreakStatement,
    GotoStatement {
        label: String,
    },
    LabelStatement {
        label: String,
    },
    Identifier {
        name: String,
    },
    MemberExpression {
        base: NodeId,
        indexer: String,
        identifier: NodeId,
    },
    IndexExpression {
        base: NodeId,
        index: NodeId,
    },
    CallExpression {
        base: NodeId,
        arguments: Vec<NodeId>,
    },
    StringCallExpression {
        base: NodeId,
        arguments: Vec<NodeId>,
    },
    TableCallExpression {
        base: NodeId,
        argument: NodeId,
    },
    FunctionExpression {
        parameters: Vec<NodeId>,
        body: Vec<NodeId>,
    },
    BinaryExpression {
        operator: String,
        left: NodeId,
        right: NodeId,
    },
    LogicalExpression {
        operator: String,
        left: NodeId,
        right: NodeId,
    },
    UnaryExpression {
        operator: String,
        argument: NodeId,
    },
    ParenthesizedExpression {
        expression: NodeId,
    },
    TableConstructorExpression {
        fields: Vec<NodeId>,
    },
    TableKey {
        key: NodeId,
        value: NodeId,
    },
    TableKeyString {
        key: NodeId,
        value: NodeId,
    },
    TableValue {
        value: NodeId,
    },
    StringLiteral {
        raw: String,
    },
    NumericLiteral {
        raw: String,
    },
    BooleanLiteral {
        value: bool,
    },
    NilLiteral,
    VarargLiteral,
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Chunk { .. } => NodeKind::Chunk,
            NodeData::FunctionDeclaration { .. } => NodeKind::FunctionDeclaration,
            NodeData::LocalStatement { .. } => NodeKind::LocalStatement,
            NodeData::AssignmentStatement { .. } => NodeKind::AssignmentStatement,
            NodeData::CallStatement { .. } => NodeKind::CallStatement,
            NodeData::IfStatement { .. } => NodeKind::IfStatement,
            NodeData::IfClause { .. } => NodeKind::IfClause,
            NodeData::ElseifClause { .. } => NodeKind::ElseifClause,
            NodeData::ElseClause { .. } => NodeKind::ElseClause,
            NodeData::WhileStatement { .. } => NodeKind::WhileStatement,
            NodeData::DoStatement { .. } => NodeKind::DoStatement,
            NodeData::RepeatStatement { .. } => NodeKind::RepeatStatement,
            NodeData::ForNumericStatement { .. } => NodeKind::ForNumericStatement,
            NodeData::ForGenericStatement { .. } => NodeKind::ForGenericStatement,
            NodeData::ReturnStatement { .. } => NodeKind::ReturnStatement,
            NodeData::BreakStatement => NodeKind::BreakStatement,
            NodeData::GotoStatement { .. } => NodeKind::GotoStatement,
            NodeData::LabelStatement { .. } => NodeKind::LabelStatement,
            NodeData::Identifier { .. } => NodeKind::Identifier,
            NodeData::MemberExpression { .. } => NodeKind::MemberExpression,
            NodeData::IndexExpression { .. } => NodeKind::IndexExpression,
            NodeData::CallExpression { .. } => NodeKind::CallExpression,
            NodeData::StringCallExpression { .. } => NodeKind::StringCallExpression,
            NodeData::TableCallExpression { .. } => NodeKind::TableCallExpression,
            NodeData::FunctionExpression { .. } => NodeKind::FunctionExpression,
            NodeData::BinaryExpression { .. } => NodeKind::BinaryExpression,
            NodeData::LogicalExpression { .. } => NodeKind::LogicalExpression,
            NodeData::UnaryExpression { .. } => NodeKind::UnaryExpression,
            NodeData::ParenthesizedExpression { .. } => NodeKind::ParenthesizedExpression,
            NodeData::TableConstructorExpression { .. } => NodeKind::TableConstructorExpression,
            NodeData::TableKey { .. } => NodeKind::TableKey,
            NodeData::TableKeyString { .. } => NodeKind::TableKeyString,
            NodeData::TableValue { .. } => NodeKind::TableValue,
            NodeData::StringLiteral { .. } => NodeKind::StringLiteral,
            NodeData::NumericLiteral { .. } => NodeKind::NumericLiteral,
            NodeData::BooleanLiteral { .. } => NodeKind::BooleanLiteral,
            NodeData::NilLiteral => NodeKind::NilLiteral,
            NodeData::VarargLiteral => NodeKind::VarargLiteral,
        }
    }

    /// Child slots in declaration order
    pub fn children(&self) -> Children<'_> {
        use std::slice::from_ref as one;

        let segments: [&[NodeId]; MAX_SEGMENTS] = match self {
            NodeData::Chunk { body } => [body.as_slice(), NONE, NONE, NONE, NONE],
            NodeData::FunctionDeclaration { name, parameters, body } => {
                [optional(name), parameters.as_slice(), body.as_slice(), NONE, NONE]
            }
            NodeData::LocalStatement { variables, init } | NodeData::AssignmentStatement { variables, init } => {
                [variables.as_slice(), init.as_slice(), NONE, NONE, NONE]
            }
            NodeData::CallStatement { expression } => [one(expression), NONE, NONE, NONE, NONE],
            NodeData::IfStatement { clauses } => [clauses.as_slice(), NONE, NONE, NONE, NONE],
            NodeData::IfClause { condition, body }
            | NodeData::ElseifClause { condition, body }
            | NodeData::WhileStatement { condition, body } => [one(condition), body.as_slice(), NONE, NONE, NONE],
            NodeData::ElseClause { body } | NodeData::DoStatement { body } => {
                [body.as_slice(), NONE, NONE, NONE, NONE]
            }
            NodeData::RepeatStatement { body, condition } => [body.as_slice(), one(condition), NONE, NONE, NONE],
            NodeData::ForNumericStatement {
                variable,
                start,
                limit,
                step,
                body,
            } => [one(variable), one(start), one(limit), optional(step), body.as_slice()],
            NodeData::ForGenericStatement {
                variables,
                iterators,
                body,
            } => [variables.as_slice(), iterators.as_slice(), body.as_slice(), NONE, NONE],
            NodeData::ReturnStatement { arguments } => [arguments.as_slice(), NONE, NONE, NONE, NONE],
            NodeData::MemberExpression { base, identifier, .. } => [one(base), one(identifier), NONE, NONE, NONE],
            NodeData::IndexExpression { base, index } => [one(base), one(index), NONE, NONE, NONE],
            NodeData::CallExpression { base, arguments } | NodeData::StringCallExpression { base, arguments } => {
                [one(base), arguments.as_slice(), NONE, NONE, NONE]
            }
            NodeData::TableCallExpression { base, argument } => [one(base), one(argument), NONE, NONE, NONE],
            NodeData::FunctionExpression { parameters, body } => {
                [parameters.as_slice(), body.as_slice(), NONE, NONE, NONE]
            }
            NodeData::BinaryExpression { left, right, .. } | NodeData::LogicalExpression { left, right, .. } => {
                [one(left), one(right), NONE, NONE, NONE]
            }
            NodeData::UnaryExpression { argument, .. } => [one(argument), NONE, NONE, NONE, NONE],
            NodeData::ParenthesizedExpression { expression } => [one(expression), NONE, NONE, NONE, NONE],
            NodeData::TableConstructorExpression { fields } => [fields.as_slice(), NONE, NONE, NONE, NONE],
            NodeData::TableKey { key, value } | NodeData::TableKeyString { key, value } => {
                [one(key), one(value), NONE, NONE, NONE]
            }
            NodeData::TableValue { value } => [one(value), NONE, NONE, NONE, NONE],
            NodeData::BreakStatement
            | NodeData::GotoStatement { .. }
            | NodeData::LabelStatement { .. }
            | NodeData::Identifier { .. }
            | NodeData::StringLiteral { .. }
            | NodeData::NumericLiteral { .. }
            | NodeData::BooleanLiteral { .. }
            | NodeData::NilLiteral
            | NodeData::VarargLiteral => [NONE, NONE, NONE, NONE, NONE],
        };

        Children { segments, current: 0 }
    }
}

const MAX_SEGMENTS: usize = 5;
const NONE: &[NodeId] = &[];

fn optional(slot: &Option<NodeId>) -> &[NodeId] {
    match slot {
        Some(id) => std::slice::from_ref(id),
        None => &[],
    }
}

/// Iterator over a node's child slots
#[derive(Debug, Clone)]
pub struct Children<'a> {
    segments: [&'a [NodeId]; MAX_SEGMENTS],
    current: usize,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let segment = self.segments.get_mut(self.current)?;
            let rest: &'a [NodeId] = *segment;
            if let Some((first, tail)) = rest.split_first() {
                *segment = tail;
                return Some(*first);
            }
            self.current += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.segments[self.current.min(MAX_SEGMENTS)..]
            .iter()
            .map(|segment| segment.len())
            .sum();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Children<'_> {}

/// A node plus its parent link
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptNode {
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
}

impl ScriptNode {
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> Children<'_> {
        self.data.children()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn ids(range: std::ops::Range<u32>) -> Vec<NodeId> {
        range.map(NodeId::new).collect()
    }

    #[test]
    fn test_children_follow_declaration_order() {
        let data = NodeData::ForNumericStatement {
            variable: NodeId::new(1),
            start: NodeId::new(2),
            limit: NodeId::new(3),
            step: None,
            body: ids(4..6),
        };
        let children: Vec<NodeId> = data.children().collect();
        assert_eq!(children, ids(1..4).into_iter().chain(ids(4..6)).collect::<Vec<_>>());
        assert_eq!(data.children().len(), 5);
    }

    #[test]
    fn test_optional_slots_are_skipped() {
        let declaration = NodeData::FunctionDeclaration {
            name: None,
            parameters: Vec::new(),
            body: ids(3..4),
        };
        assert_eq!(declaration.children().collect::<Vec<_>>(), ids(3..4));

        let leaf = NodeData::StringLiteral {
            raw: "\"x\"".to_string(),
        };
        assert_eq!(leaf.children().next(), None);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(NodeKind::iter().count(), NodeKind::COUNT);
        let statements = NodeKind::iter().filter(NodeKind::is_statement).count();
        let literals = NodeKind::iter().filter(NodeKind::is_literal).count();
        assert_eq!(statements, 14);
        assert_eq!(literals, 5);
        assert!(NodeKind::TableCallExpression.is_call());
        assert_eq!(NodeKind::CallStatement.to_string(), "CallStatement");
    }
}
