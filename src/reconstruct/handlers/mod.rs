//! Statement pattern handlers.
//!
//! Each handler looks for one API call inside a statement. It returns
//! `Ok(true)` when it consumed the statement, `Ok(false)` when the statement
//! is not its pattern, and an error when the pattern matched but the
//! arguments could not be used.

pub mod cameras;
pub mod doodads;
pub mod regions;
pub mod sounds;
pub mod units;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{RecoveryError, Result};
use crate::fourcc::FourCC;
use crate::reconstruct::context::ReconstructionContext;
use crate::script::{LiteralTarget, NodeData, NodeId, ScriptTree};

pub type HandlerFn = fn(&mut ReconstructionContext, &ScriptTree, NodeId) -> Result<bool>;

/// A named pattern handler
#[derive(Clone, Copy)]
pub struct Handler {
    pub name: &'static str,
    pub run: HandlerFn,
}

impl Handler {
    pub const fn new(name: &'static str, run: HandlerFn) -> Self {
        Self { name, run }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handler").field(&self.name).finish()
    }
}

/// Built-in handlers in registration order
pub fn default_handlers() -> Vec<Handler> {
    vec![
        Handler::new("region", regions::create_region),
        Handler::new("region_weather", regions::weather_effect),
        Handler::new("region_ambient_sound", regions::ambient_sound),
        Handler::new("camera", cameras::create_camera),
        Handler::new("camera_field", cameras::set_field),
        Handler::new("camera_position", cameras::set_destination),
        Handler::new("sound", sounds::create_sound),
        Handler::new("sound_setter", sounds::apply_setter),
        Handler::new("unit", units::create_unit),
        Handler::new("unit_setter", units::apply_setter),
        Handler::new("doodad", doodads::create_doodad),
        Handler::new("doodad_setter", doodads::apply_setter),
    ]
}

lazy_static! {
    /// Globals the editor generates for placed objects, e.g. `gg_rct_Spawn_Area`
    static ref GENERATED_VARIABLE: Option<Regex> =
        Regex::new(r"^gg_(rct|cam|snd|trg|unit|dest|item)_(\w+)$").ok();
}

/// Object name behind an editor global with the given prefix tag
pub(crate) fn generated_name<'a>(variable: &'a str, tag: &str) -> Option<&'a str> {
    let captures = GENERATED_VARIABLE.as_ref()?.captures(variable)?;
    if captures.get(1)?.as_str() != tag {
        return None;
    }
    captures.get(2).map(|name| name.as_str())
}

/// The single plain variable a statement assigns to
pub(crate) fn assigned_variable(tree: &ScriptTree, statement: NodeId) -> Option<&str> {
    match tree.data(statement) {
        NodeData::AssignmentStatement { variables, .. } | NodeData::LocalStatement { variables, .. } => {
            tree.identifier_name(*variables.first()?)
        }
        _ => None,
    }
}

/// First call in `statement` to any of `names`
pub(crate) fn find_any_call<'t>(
    tree: &'t ScriptTree,
    statement: NodeId,
    names: &[&'static str],
) -> Option<(&'static str, &'t [NodeId])> {
    tree.calls(statement).find_map(|call| {
        let callee = tree.callee_name(call)?;
        let name = names.iter().copied().find(|name| *name == callee)?;
        tree.call_parts(call).map(|(_, arguments)| (name, arguments))
    })
}

pub(crate) fn expect_arguments(handler: &'static str, arguments: &[NodeId], expected: usize) -> Result<()> {
    if arguments.len() < expected {
        return Err(handler_error(
            handler,
            format!("expected {expected} arguments, found {}", arguments.len()),
        ));
    }
    Ok(())
}

/// Coerce a mandatory argument
pub(crate) fn required<T: LiteralTarget>(
    tree: &ScriptTree,
    argument: NodeId,
    handler: &'static str,
    field: &str,
) -> Result<T> {
    tree.try_get_value(argument).ok_or_else(|| {
        handler_error(
            handler,
            format!("{field} is not a literal: {}", tree.render(argument)),
        )
    })
}

/// `FourCC("hfoo")`, `"hfoo"` or a raw integer code
pub(crate) fn fourcc_argument(tree: &ScriptTree, argument: NodeId) -> Option<FourCC> {
    match tree.call_parts(argument) {
        Some((_, inner)) if tree.callee_name(argument) == Some("FourCC") => {
            tree.try_get_value(*inner.first()?)
        }
        Some(_) => None,
        None if tree.kind(argument).is_literal() => tree.try_get_value(argument),
        None => None,
    }
}

/// Life set either as an absolute value or as `fraction * current`
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum LifeValue {
    Absolute(f32),
    Fraction(f32),
}

pub(crate) fn life_value(tree: &ScriptTree, argument: NodeId) -> Option<LifeValue> {
    if let Some(value) = tree.try_get_value::<f32>(argument) {
        return Some(LifeValue::Absolute(value));
    }
    match tree.data(argument) {
        NodeData::BinaryExpression { operator, left, right } if operator == "*" => tree
            .try_get_value::<f32>(*left)
            .or_else(|| tree.try_get_value::<f32>(*right))
            .map(LifeValue::Fraction),
        _ => None,
    }
}

pub(crate) fn handler_error(handler: &'static str, reason: impl Into<String>) -> RecoveryError {
    RecoveryError::Handler {
        handler,
        reason: reason.into(),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::reconstruct::context::ReconstructionContext;
    use crate::reconstruct::players::MapInfo;
    use crate::script::{NodeId, RawNode, ScriptTree};

    /// Tree whose `main` holds `statements`, plus the ids of those statements
    pub fn main_with(statements: Vec<RawNode>) -> (ScriptTree, Vec<NodeId>) {
        let tree = ScriptTree::from_raw(&RawNode::chunk(vec![RawNode::function("main", vec![], statements)]))
            .unwrap();
        let main = tree.function_declarations().next().unwrap().1;
        let ids = tree.block(main).to_vec();
        (tree, ids)
    }

    pub fn context(tree: &ScriptTree) -> ReconstructionContext {
        ReconstructionContext::new(tree, MapInfo::default())
    }

    pub fn numbers(values: &[&str]) -> Vec<RawNode> {
        values.iter().map(|value| RawNode::number(*value)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::script::RawNode;

    #[test]
    fn test_generated_name() {
        assert_eq!(generated_name("gg_rct_Spawn_Area", "rct"), Some("Spawn_Area"));
        assert_eq!(generated_name("gg_rct_Spawn_Area", "cam"), None);
        assert_eq!(generated_name("udg_rect", "rct"), None);
    }

    #[test]
    fn test_fourcc_argument_forms() {
        let (tree, ids) = main_with(vec![RawNode::call_statement(
            "Test",
            vec![RawNode::fourcc("hfoo"), RawNode::string("Hpal"), RawNode::number("1751543663")],
        )]);
        let (_, arguments) = tree.find_call(ids[0], "Test").unwrap();
        assert_eq!(fourcc_argument(&tree, arguments[0]), Some(FourCC::parse("hfoo")));
        assert_eq!(fourcc_argument(&tree, arguments[1]), Some(FourCC::parse("Hpal")));
        assert_eq!(fourcc_argument(&tree, arguments[2]), Some(FourCC::parse("hfoo")));
    }

    #[test]
    fn test_life_value() {
        let (tree, ids) = main_with(vec![RawNode::call_statement(
            "Test",
            vec![
                RawNode::number("250"),
                RawNode::binary("*", RawNode::number("0.5"), RawNode::identifier("life")),
                RawNode::identifier("life"),
            ],
        )]);
        let (_, arguments) = tree.find_call(ids[0], "Test").unwrap();
        assert_eq!(life_value(&tree, arguments[0]), Some(LifeValue::Absolute(250.0)));
        assert_eq!(life_value(&tree, arguments[1]), Some(LifeValue::Fraction(0.5)));
        assert_eq!(life_value(&tree, arguments[2]), None);
    }
}
