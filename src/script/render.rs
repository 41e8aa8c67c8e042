use std::borrow::Cow;

use crate::script::node::{NodeData, NodeId};
use crate::script::tree::ScriptTree;

impl ScriptTree {
    /// Source text of a subtree, statements on one line each
    pub fn render(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![Piece::Node(id)];
        let mut pieces = Vec::new();
        while let Some(piece) = stack.pop() {
            match piece {
                Piece::Text(text) => out.push_str(&text),
                Piece::Node(id) => {
                    Renderer {
                        tree: self,
                        pieces: &mut pieces,
                    }
                    .node(id);
                    stack.extend(pieces.drain(..).rev());
                }
            }
        }
        out
    }
}

/// Output still to be written: text, or a node to expand
enum Piece<'a> {
    Text(Cow<'a, str>),
    Node(NodeId),
}

/// Expands one node into its pieces, children left unexpanded
struct Renderer<'a, 'p> {
    tree: &'a ScriptTree,
    pieces: &'p mut Vec<Piece<'a>>,
}

impl<'a> Renderer<'a, '_> {
    fn text(&mut self, text: impl Into<Cow<'a, str>>) {
        self.pieces.push(Piece::Text(text.into()));
    }

    fn child(&mut self, id: NodeId) {
        self.pieces.push(Piece::Node(id));
    }

    fn node(&mut self, id: NodeId) {
        let tree = self.tree;
        match tree.data(id) {
            NodeData::Chunk { body } => self.separated(body, "\n"),
            NodeData::FunctionDeclaration { name, parameters, body } => {
                self.text("function ");
                if let Some(name) = name {
                    self.child(*name);
                }
                self.text("(");
                self.separated(parameters, ", ");
                self.text(")");
                self.block(body);
                self.text(" end");
            }
            NodeData::LocalStatement { variables, init } => {
                self.text("local ");
                self.separated(variables, ", ");
                if !init.is_empty() {
                    self.text(" = ");
                    self.separated(init, ", ");
                }
            }
            NodeData::AssignmentStatement { variables, init } => {
                self.separated(variables, ", ");
                self.text(" = ");
                self.separated(init, ", ");
            }
            NodeData::CallStatement { expression } => self.child(*expression),
            NodeData::IfStatement { clauses } => {
                for clause in clauses {
                    self.child(*clause);
                }
                self.text(" end");
            }
            NodeData::IfClause { condition, body } => self.conditional("if ", *condition, " then", body),
            NodeData::ElseifClause { condition, body } => self.conditional(" elseif ", *condition, " then", body),
            NodeData::ElseClause { body } => {
                self.text(" else");
                self.block(body);
            }
            NodeData::WhileStatement { condition, body } => {
                self.conditional("while ", *condition, " do", body);
                self.text(" end");
            }
            NodeData::DoStatement { body } => {
                self.text("do");
                self.block(body);
                self.text(" end");
            }
            NodeData::RepeatStatement { body, condition } => {
                self.text("repeat");
                self.block(body);
                self.text(" until ");
                self.child(*condition);
            }
            NodeData::ForNumericStatement {
                variable,
                start,
                limit,
                step,
                body,
            } => {
                self.text("for ");
                self.child(*variable);
                self.text(" = ");
                self.child(*start);
                self.text(", ");
                self.child(*limit);
                if let Some(step) = step {
                    self.text(", ");
                    self.child(*step);
                }
                self.text(" do");
                self.block(body);
                self.text(" end");
            }
            NodeData::ForGenericStatement {
                variables,
                iterators,
                body,
            } => {
                self.text("for ");
                self.separated(variables, ", ");
                self.text(" in ");
                self.separated(iterators, ", ");
                self.text(" do");
                self.block(body);
                self.text(" end");
            }
            NodeData::ReturnStatement { arguments } => {
                self.text("return");
                if !arguments.is_empty() {
                    self.text(" ");
                    self.separated(arguments, ", ");
                }
            }
            NodeData::BreakStatement => self.text("break"),
            NodeData::GotoStatement { label } => self.text(format!("goto {label}")),
            NodeData::LabelStatement { label } => self.text(format!("::{label}::")),
            NodeData::Identifier { name } => self.text(name.as_str()),
            NodeData::MemberExpression {
                base,
                indexer,
                identifier,
            } => {
                self.child(*base);
                self.text(indexer.as_str());
                self.child(*identifier);
            }
            NodeData::IndexExpression { base, index } => {
                self.child(*base);
                self.text("[");
                self.child(*index);
                self.text("]");
            }
            NodeData::CallExpression { base, arguments } | NodeData::StringCallExpression { base, arguments } => {
                self.child(*base);
                self.text("(");
                self.separated(arguments, ", ");
                self.text(")");
            }
            NodeData::TableCallExpression { base, argument } => {
                self.child(*base);
                self.child(*argument);
            }
            NodeData::FunctionExpression { parameters, body } => {
                self.text("function(");
                self.separated(parameters, ", ");
                self.text(")");
                self.block(body);
                self.text(" end");
            }
            NodeData::BinaryExpression { operator, left, right }
            | NodeData::LogicalExpression { operator, left, right } => {
                self.child(*left);
                self.text(format!(" {operator} "));
                self.child(*right);
            }
            NodeData::UnaryExpression { operator, argument } => {
                self.text(operator.as_str());
                if operator.chars().all(char::is_alphabetic) {
                    self.text(" ");
                }
                self.child(*argument);
            }
            NodeData::ParenthesizedExpression { expression } => {
                self.text("(");
                self.child(*expression);
                self.text(")");
            }
            NodeData::TableConstructorExpression { fields } => {
                self.text("{");
                self.separated(fields, ", ");
                self.text("}");
            }
            NodeData::TableKey { key, value } => {
                self.text("[");
                self.child(*key);
                self.text("] = ");
                self.child(*value);
            }
            NodeData::TableKeyString { key, value } => {
                self.child(*key);
                self.text(" = ");
                self.child(*value);
            }
            NodeData::TableValue { value } => self.child(*value),
            NodeData::StringLiteral { raw } | NodeData::NumericLiteral { raw } => self.text(raw.as_str()),
            NodeData::BooleanLiteral { value } => self.text(if *value { "true" } else { "false" }),
            NodeData::NilLiteral => self.text("nil"),
            NodeData::VarargLiteral => self.text("..."),
        }
    }

    fn separated(&mut self, ids: &[NodeId], separator: &'static str) {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                self.text(separator);
            }
            self.child(*id);
        }
    }

    fn block(&mut self, body: &[NodeId]) {
        for id in body {
            self.text(" ");
            self.child(*id);
        }
    }

    fn conditional(&mut self, keyword: &'static str, condition: NodeId, opener: &'static str, body: &[NodeId]) {
        self.text(keyword);
        self.child(condition);
        self.text(opener);
        self.block(body);
    }
}

#[cfg(test)]
mod tests {
    use crate::script::node::NodeKind;
    use crate::script::raw::RawNode;
    use crate::script::tree::ScriptTree;

    fn render(raw: RawNode) -> String {
        let tree = ScriptTree::from_raw(&raw).unwrap();
        tree.render(tree.root())
    }

    #[test]
    fn test_render_statements() {
        let statement = RawNode::assign(
            "gg_rct_Test",
            RawNode::call(
                "Rect",
                vec![
                    RawNode::number("0.0"),
                    RawNode::unary("-", RawNode::number("64.0")),
                    RawNode::number("100"),
                    RawNode::parenthesized(RawNode::number("100")),
                ],
            ),
        );
        assert_eq!(render(statement), "gg_rct_Test = Rect(0.0, -64.0, 100, (100))");

        let function = RawNode::function(
            "main",
            vec!["a"],
            vec![RawNode::local("u", RawNode::nil()), RawNode::call_statement("InitBlizzard", vec![])],
        );
        assert_eq!(render(function), "function main(a) local u = nil InitBlizzard() end");
    }

    #[test]
    fn test_render_expressions() {
        assert_eq!(render(RawNode::unary("not", RawNode::boolean(false))), "not false");
        assert_eq!(render(RawNode::string("a\"b")), "\"a\\\"b\"");
        assert_eq!(
            render(RawNode::member(RawNode::identifier("t"), ":", "go")),
            "t:go"
        );

        let mut branch = RawNode::new(NodeKind::IfStatement);
        let clause = RawNode::new(NodeKind::IfClause)
            .with_condition(RawNode::identifier("x"))
            .with_body(vec![RawNode::new(NodeKind::BreakStatement)]);
        let otherwise = RawNode::new(NodeKind::ElseClause);
        branch.clauses = vec![clause, otherwise];
        assert_eq!(render(branch), "if x then break else end");
    }
}
