//! Serialized script tree as the external parser emits it.
//!
//! Field meaning depends on `kind`: `value` is a literal's text for literal
//! kinds but a nested node for table entries, and `arguments` is a single
//! node for table calls but a list for every other call. [`ScriptTree::from_raw`]
//! resolves both.
//!
//! [`ScriptTree::from_raw`]: crate::script::ScriptTree::from_raw

use serde::de::value::MapAccessDeserializer;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::script::node::NodeKind;

// Deserialize by hand: an untagged derive buffers the subtree and replays it
// recursively, outside the caller's deserializer.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
    Node(Box<RawNode>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawArguments {
    Many(Vec<RawNode>),
    One(Box<RawNode>),
}

struct RawValueVisitor;

impl<'de> Visitor<'de> for RawValueVisitor {
    type Value = RawValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, number, boolean or node")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<RawValue, E> {
        Ok(RawValue::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<RawValue, E> {
        Ok(RawValue::Text(value))
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<RawValue, E> {
        Ok(RawValue::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<RawValue, E> {
        Ok(RawValue::Number(value.into()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<RawValue, E> {
        Ok(RawValue::Number(value.into()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<RawValue, E> {
        serde_json::Number::from_f64(value)
            .map(RawValue::Number)
            .ok_or_else(|| E::custom(format!("{value} is not a finite number")))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<RawValue, A::Error> {
        RawNode::deserialize(MapAccessDeserializer::new(map)).map(|node| RawValue::Node(Box::new(node)))
    }
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawValueVisitor)
    }
}

struct RawArgumentsVisitor;

impl<'de> Visitor<'de> for RawArgumentsVisitor {
    type Value = RawArguments;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a node or a list of nodes")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawArguments, A::Error> {
        let mut arguments = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(argument) = seq.next_element()? {
            arguments.push(argument);
        }
        Ok(RawArguments::Many(arguments))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<RawArguments, A::Error> {
        RawNode::deserialize(MapAccessDeserializer::new(map)).map(|node| RawArguments::One(Box::new(node)))
    }
}

impl<'de> Deserialize<'de> for RawArguments {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawArgumentsVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RawValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<RawArguments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Box<RawNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Box<RawNode>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Box<RawNode>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clauses: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Box<RawNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Box<RawNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Box<RawNode>>,
}

impl RawNode {
    /// Empty node of `kind`; fill fields with the `with_*` helpers
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            operator: None,
            value: None,
            arguments: None,
            target: None,
            key: None,
            targets: Vec::new(),
            values: Vec::new(),
            condition: None,
            body: Vec::new(),
            clauses: Vec::new(),
            operands: Vec::new(),
            parameters: Vec::new(),
            start: None,
            limit: None,
            step: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.value = Some(RawValue::Text(text.into()));
        self
    }

    pub fn with_value(mut self, value: RawNode) -> Self {
        self.value = Some(RawValue::Node(Box::new(value)));
        self
    }

    pub fn with_target(mut self, target: RawNode) -> Self {
        self.target = Some(Box::new(target));
        self
    }

    pub fn with_key(mut self, key: RawNode) -> Self {
        self.key = Some(Box::new(key));
        self
    }

    pub fn with_condition(mut self, condition: RawNode) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    pub fn with_body(mut self, body: Vec<RawNode>) -> Self {
        self.body = body;
        self
    }

    // Leaf and expression builders

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Identifier).with_name(name)
    }

    /// String literal; `text` is wrapped in double quotes with `\` and `"` escaped
    pub fn string(text: &str) -> Self {
        let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
        Self::new(NodeKind::StringLiteral).with_text(format!("\"{escaped}\""))
    }

    pub fn number(text: impl Into<String>) -> Self {
        Self::new(NodeKind::NumericLiteral).with_text(text)
    }

    pub fn boolean(value: bool) -> Self {
        let mut node = Self::new(NodeKind::BooleanLiteral);
        node.value = Some(RawValue::Bool(value));
        node
    }

    pub fn nil() -> Self {
        Self::new(NodeKind::NilLiteral)
    }

    /// `name(arguments...)`
    pub fn call(name: impl Into<String>, arguments: Vec<RawNode>) -> Self {
        let mut node = Self::new(NodeKind::CallExpression).with_target(Self::identifier(name));
        node.arguments = Some(RawArguments::Many(arguments));
        node
    }

    /// `FourCC("code")`
    pub fn fourcc(code: &str) -> Self {
        Self::call("FourCC", vec![Self::string(code)])
    }

    pub fn binary(operator: impl Into<String>, left: RawNode, right: RawNode) -> Self {
        let mut node = Self::new(NodeKind::BinaryExpression).with_operator(operator);
        node.operands = vec![left, right];
        node
    }

    pub fn unary(operator: impl Into<String>, argument: RawNode) -> Self {
        let mut node = Self::new(NodeKind::UnaryExpression).with_operator(operator);
        node.operands = vec![argument];
        node
    }

    pub fn parenthesized(expression: RawNode) -> Self {
        Self::new(NodeKind::ParenthesizedExpression).with_target(expression)
    }

    pub fn member(base: RawNode, indexer: &str, name: impl Into<String>) -> Self {
        Self::new(NodeKind::MemberExpression)
            .with_target(base)
            .with_operator(indexer)
            .with_key(Self::identifier(name))
    }

    // Statement builders

    /// `name(arguments...)` as a statement
    pub fn call_statement(name: impl Into<String>, arguments: Vec<RawNode>) -> Self {
        Self::new(NodeKind::CallStatement).with_target(Self::call(name, arguments))
    }

    /// `name = value`
    pub fn assign(name: impl Into<String>, value: RawNode) -> Self {
        let mut node = Self::new(NodeKind::AssignmentStatement);
        node.targets = vec![Self::identifier(name)];
        node.values = vec![value];
        node
    }

    /// `local name = value`
    pub fn local(name: impl Into<String>, value: RawNode) -> Self {
        let mut node = Self::new(NodeKind::LocalStatement);
        node.targets = vec![Self::identifier(name)];
        node.values = vec![value];
        node
    }

    /// `function name(parameters...) body end`
    pub fn function(name: impl Into<String>, parameters: Vec<&str>, body: Vec<RawNode>) -> Self {
        let mut node = Self::new(NodeKind::FunctionDeclaration)
            .with_target(Self::identifier(name))
            .with_body(body);
        node.parameters = parameters.into_iter().map(Self::identifier).collect();
        node
    }

    pub fn chunk(body: Vec<RawNode>) -> Self {
        Self::new(NodeKind::Chunk).with_body(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_ambiguous_fields() {
        let json = r#"{
            "kind": "TableCallExpression",
            "target": { "kind": "Identifier", "name": "setup" },
            "arguments": { "kind": "TableConstructorExpression", "values": [
                { "kind": "TableKeyString",
                  "key": { "kind": "Identifier", "name": "x" },
                  "value": { "kind": "NumericLiteral", "value": "1.5" } }
            ] }
        }"#;
        let node: RawNode = serde_json::from_str(json).unwrap();

        let Some(RawArguments::One(table)) = &node.arguments else {
            panic!("expected a single argument, got {:?}", node.arguments);
        };
        let entry = &table.values[0];
        assert!(matches!(&entry.value, Some(RawValue::Node(literal)) if literal.kind == NodeKind::NumericLiteral));
    }

    #[test]
    fn test_scalar_values() {
        let node: RawNode = serde_json::from_str(r#"{ "kind": "NumericLiteral", "value": 42 }"#).unwrap();
        assert!(matches!(node.value, Some(RawValue::Number(_))));

        let node: RawNode = serde_json::from_str(r#"{ "kind": "BooleanLiteral", "value": true }"#).unwrap();
        assert_eq!(node.value, Some(RawValue::Bool(true)));

        let node: RawNode = serde_json::from_str(r#"{ "kind": "NumericLiteral", "value": null }"#).unwrap();
        assert_eq!(node.value, None);

        assert!(serde_json::from_str::<RawNode>(r#"{ "kind": "NumericLiteral", "value": [1] }"#).is_err());
    }

    #[test]
    fn test_builders_round_trip_through_json() {
        let statement = RawNode::assign(
            "gg_rct_Test",
            RawNode::call("Rect", vec![RawNode::number("0"), RawNode::number("0.0")]),
        );
        let json = serde_json::to_string(&statement).unwrap();
        assert!(!json.contains("clauses"));
        let back: RawNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, statement);
    }

    #[test]
    fn test_string_builder_escapes() {
        let node = RawNode::string("Sound\\Music\\\"x\".mp3");
        assert_eq!(
            node.value,
            Some(RawValue::Text("\"Sound\\\\Music\\\\\\\"x\\\".mp3\"".to_string()))
        );
    }
}
