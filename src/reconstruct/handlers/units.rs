use crate::error::Result;
use crate::reconstruct::context::ReconstructionContext;
use crate::reconstruct::handlers::{
    assigned_variable, expect_arguments, find_any_call, fourcc_argument, generated_name, handler_error, life_value,
    required, LifeValue,
};
use crate::reconstruct::records::{InventoryItem, Unit};
use crate::script::{NodeId, ScriptTree};

/// How many `p = q` hops an owner expression may take
const MAX_ALIAS_DEPTH: usize = 8;

const CONSTRUCTORS: &[&str] = &["CreateUnit", "BlzCreateUnitWithSkin"];

const SETTERS: &[&str] = &[
    "SetUnitState",
    "SetResourceAmount",
    "SetUnitAcquireRange",
    "SetUnitColor",
    "SetHeroLevel",
    "SetHeroStr",
    "SetHeroAgi",
    "SetHeroInt",
    "UnitAddItemToSlotById",
    "SelectHeroSkill",
];

/// `CreateUnit(owner, id, x, y, facing)` and
/// `BlzCreateUnitWithSkin(owner, id, x, y, facing, skin)`
pub fn create_unit(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    const HANDLER: &str = "unit";

    let Some((constructor, arguments)) = find_any_call(tree, statement, CONSTRUCTORS) else {
        return Ok(false);
    };
    let with_skin = constructor == "BlzCreateUnitWithSkin";
    expect_arguments(HANDLER, arguments, if with_skin { 6 } else { 5 })?;

    let owner = owner_of(ctx, tree, arguments[0], 0)
        .ok_or_else(|| handler_error(HANDLER, format!("unresolved owner {}", tree.render(arguments[0]))))?;
    let type_id = fourcc_argument(tree, arguments[1])
        .ok_or_else(|| handler_error(HANDLER, format!("unreadable unit id {}", tree.render(arguments[1]))))?;
    let skin_id = if with_skin {
        Some(
            fourcc_argument(tree, arguments[5])
                .ok_or_else(|| handler_error(HANDLER, format!("unreadable skin id {}", tree.render(arguments[5]))))?,
        )
    } else {
        None
    };

    let variable = assigned_variable(tree, statement);
    let unit = Unit {
        variable: variable
            .filter(|name| generated_name(name, "unit").is_some())
            .map(str::to_string),
        type_id,
        skin_id,
        owner,
        x: required(tree, arguments[2], HANDLER, "x")?,
        y: required(tree, arguments[3], HANDLER, "y")?,
        facing: required(tree, arguments[4], HANDLER, "facing")?,
        ..Default::default()
    };
    ctx.add(unit, variable);
    Ok(true)
}

/// Player index of an owner expression: `Player(n)`, `Player(NEUTRAL)`,
/// or a variable assigned one of those
fn owner_of(ctx: &ReconstructionContext, tree: &ScriptTree, node: NodeId, depth: usize) -> Option<i32> {
    if depth > MAX_ALIAS_DEPTH {
        return None;
    }
    if let Some((_, arguments)) = tree.call_parts(node) {
        if tree.callee_name(node) != Some("Player") {
            return None;
        }
        return player_index(ctx, tree, *arguments.first()?, depth + 1);
    }
    let name = tree.identifier_name(node)?;
    owner_of(ctx, tree, ctx.value_of(name)?, depth + 1)
}

fn player_index(ctx: &ReconstructionContext, tree: &ScriptTree, node: NodeId, depth: usize) -> Option<i32> {
    if depth > MAX_ALIAS_DEPTH {
        return None;
    }
    if let Some(index) = tree.try_get_value::<i32>(node) {
        return Some(index);
    }
    let name = tree.identifier_name(node)?;
    if let Some(index) = ctx.map_info().neutral_player(name) {
        return Some(index);
    }
    player_index(ctx, tree, ctx.value_of(name)?, depth + 1)
}

/// Setters the editor emits after placing a unit. Values that are not
/// literals leave the field unset.
pub fn apply_setter(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    const HANDLER: &str = "unit_setter";

    let Some((setter, arguments)) = find_any_call(tree, statement, SETTERS) else {
        return Ok(false);
    };
    expect_arguments(HANDLER, arguments, 2)?;
    let argument = |index: usize| arguments.get(index).copied();
    let integer = |index: usize| argument(index).and_then(|node| tree.try_get_value::<i32>(node));
    let number = |index: usize| argument(index).and_then(|node| tree.try_get_value::<f32>(node));

    let unit = ctx
        .resolve_mut::<Unit>(tree.identifier_name(arguments[0]))
        .ok_or_else(|| handler_error(HANDLER, "no unit created yet"))?;

    match setter {
        "SetUnitState" => {
            let state = tree.identifier_name(arguments[1]);
            let value = argument(2).and_then(|node| life_value(tree, node));
            match (state, value) {
                (Some("UNIT_STATE_LIFE"), Some(LifeValue::Absolute(life))) => unit.life = Some(life),
                (Some("UNIT_STATE_LIFE"), Some(LifeValue::Fraction(fraction))) => unit.life_fraction = Some(fraction),
                (Some("UNIT_STATE_MANA"), Some(LifeValue::Absolute(mana))) => unit.mana = Some(mana),
                _ => {}
            }
        }
        "SetResourceAmount" => unit.resource_amount = integer(1),
        "SetUnitAcquireRange" => unit.acquire_range = number(1),
        "SetUnitColor" => unit.color = argument(1).and_then(|node| player_color(tree, node)),
        "SetHeroLevel" => unit.hero_level = integer(1),
        "SetHeroStr" => unit.hero_strength = integer(1),
        "SetHeroAgi" => unit.hero_agility = integer(1),
        "SetHeroInt" => unit.hero_intelligence = integer(1),
        "UnitAddItemToSlotById" => {
            let item = argument(1).and_then(|node| fourcc_argument(tree, node));
            if let (Some(item), Some(slot)) = (item, integer(2)) {
                unit.items.push(InventoryItem { slot, item });
            }
        }
        "SelectHeroSkill" => {
            if let Some(skill) = argument(1).and_then(|node| fourcc_argument(tree, node)) {
                unit.skills.push(skill);
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// `ConvertPlayerColor(n)` or a bare index
fn player_color(tree: &ScriptTree, node: NodeId) -> Option<i32> {
    match tree.call_parts(node) {
        Some((_, arguments)) if tree.callee_name(node) == Some("ConvertPlayerColor") => {
            tree.try_get_value(*arguments.first()?)
        }
        Some(_) => None,
        None => tree.try_get_value(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fourcc::FourCC;
    use crate::reconstruct::handlers::test_support::*;
    use crate::reconstruct::players::MapInfo;
    use crate::script::RawNode;

    fn player(index: RawNode) -> RawNode {
        RawNode::call("Player", vec![index])
    }

    fn create(variable: &str, owner: RawNode, id: &str) -> RawNode {
        let mut arguments = vec![owner, RawNode::fourcc(id)];
        arguments.extend(numbers(&["-512.0", "256.0", "270.0"]));
        RawNode::assign(variable, RawNode::call("CreateUnit", arguments))
    }

    fn call(name: &str, arguments: Vec<RawNode>) -> RawNode {
        RawNode::call_statement(name, arguments)
    }

    #[test]
    fn test_create_unit_with_player_index() {
        let (tree, ids) = main_with(vec![create("gg_unit_hfoo_0001", player(RawNode::number("3")), "hfoo")]);
        let mut ctx = context(&tree);
        assert!(create_unit(&mut ctx, &tree, ids[0]).unwrap());

        let unit = ctx.get::<Unit>("gg_unit_hfoo_0001").unwrap();
        assert_eq!(unit.variable.as_deref(), Some("gg_unit_hfoo_0001"));
        assert_eq!(unit.type_id, FourCC::parse("hfoo"));
        assert_eq!(unit.owner, 3);
        assert_eq!((unit.x, unit.y, unit.facing), (-512.0, 256.0, 270.0));
        assert_eq!(unit.skin_id, None);
    }

    #[test]
    fn test_digit_only_type_id_is_a_tag() {
        let (tree, ids) = main_with(vec![create("gg_unit_1234_0001", player(RawNode::number("0")), "1234")]);
        let mut ctx = context(&tree);
        assert!(create_unit(&mut ctx, &tree, ids[0]).unwrap());

        let unit = ctx.get::<Unit>("gg_unit_1234_0001").unwrap();
        assert_eq!(unit.type_id.as_bytes(), b"1234");
        assert_eq!(unit.owner, 0);
    }

    #[test]
    fn test_neutral_owner_follows_slot_convention() {
        let statements = vec![create(
            "u",
            player(RawNode::identifier("PLAYER_NEUTRAL_PASSIVE")),
            "ngol",
        )];
        let (tree, ids) = main_with(statements);

        let mut current = context(&tree);
        create_unit(&mut current, &tree, ids[0]).unwrap();
        assert_eq!(current.last_created::<Unit>().map(|unit| unit.owner), Some(27));
        assert_eq!(current.last_created::<Unit>().and_then(|unit| unit.variable.clone()), None);

        let mut classic = ReconstructionContext::new(&tree, MapInfo::new(Some(6031)));
        create_unit(&mut classic, &tree, ids[0]).unwrap();
        assert_eq!(classic.last_created::<Unit>().map(|unit| unit.owner), Some(15));
    }

    #[test]
    fn test_owner_through_local_alias() {
        let (tree, ids) = main_with(vec![
            RawNode::local("p", player(RawNode::number("5"))),
            create("u", RawNode::identifier("p"), "hfoo"),
            RawNode::local("loop", RawNode::identifier("loop")),
            create("v", RawNode::identifier("loop"), "hfoo"),
        ]);
        let mut ctx = context(&tree);
        ctx.track_assignment(&tree, ids[0]);
        ctx.track_assignment(&tree, ids[2]);

        assert!(create_unit(&mut ctx, &tree, ids[1]).unwrap());
        assert_eq!(ctx.get::<Unit>("u").map(|unit| unit.owner), Some(5));
        assert!(create_unit(&mut ctx, &tree, ids[3]).is_err());
    }

    #[test]
    fn test_skinned_unit() {
        let mut arguments = vec![player(RawNode::number("0")), RawNode::fourcc("Hpal")];
        arguments.extend(numbers(&["0", "0", "0"]));
        arguments.push(RawNode::fourcc("Hart"));
        let (tree, ids) = main_with(vec![RawNode::assign(
            "gg_unit_Hpal_0002",
            RawNode::call("BlzCreateUnitWithSkin", arguments),
        )]);
        let mut ctx = context(&tree);
        assert!(create_unit(&mut ctx, &tree, ids[0]).unwrap());
        assert_eq!(
            ctx.get::<Unit>("gg_unit_Hpal_0002").and_then(|unit| unit.skin_id),
            Some(FourCC::parse("Hart"))
        );
    }

    #[test]
    fn test_setters() {
        let u = || RawNode::identifier("u");
        let (tree, ids) = main_with(vec![
            create("u", player(RawNode::number("0")), "Hpal"),
            call(
                "SetUnitState",
                vec![
                    u(),
                    RawNode::identifier("UNIT_STATE_LIFE"),
                    RawNode::binary("*", RawNode::number("0.75"), RawNode::identifier("life")),
                ],
            ),
            call(
                "SetUnitState",
                vec![u(), RawNode::identifier("UNIT_STATE_MANA"), RawNode::number("40")],
            ),
            call("SetUnitColor", vec![u(), RawNode::call("ConvertPlayerColor", numbers(&["6"]))]),
            call("SetHeroLevel", vec![u(), RawNode::number("4"), RawNode::boolean(false)]),
            call("SetHeroStr", vec![u(), RawNode::number("22"), RawNode::boolean(true)]),
            call(
                "UnitAddItemToSlotById",
                vec![u(), RawNode::fourcc("ratf"), RawNode::number("2")],
            ),
            call("SelectHeroSkill", vec![u(), RawNode::fourcc("AHhb")]),
        ]);
        let mut ctx = context(&tree);
        create_unit(&mut ctx, &tree, ids[0]).unwrap();
        for &id in &ids[1..] {
            assert!(apply_setter(&mut ctx, &tree, id).unwrap());
        }

        let unit = ctx.get::<Unit>("u").unwrap();
        assert_eq!(unit.life, None);
        assert_eq!(unit.life_fraction, Some(0.75));
        assert_eq!(unit.mana, Some(40.0));
        assert_eq!(unit.color, Some(6));
        assert_eq!(unit.hero_level, Some(4));
        assert_eq!(unit.hero_strength, Some(22));
        assert_eq!(
            unit.items,
            vec![InventoryItem {
                slot: 2,
                item: FourCC::parse("ratf")
            }]
        );
        assert_eq!(unit.skills, vec![FourCC::parse("AHhb")]);
    }
}
