use crate::error::Result;
use crate::reconstruct::context::ReconstructionContext;
use crate::reconstruct::handlers::{
    assigned_variable, expect_arguments, fourcc_argument, generated_name, handler_error, required,
};
use crate::reconstruct::records::Region;
use crate::script::{NodeId, ScriptTree};

/// `gg_rct_<Name> = Rect(left, bottom, right, top)`
pub fn create_region(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    const HANDLER: &str = "region";

    let Some((_, arguments)) = tree.find_call(statement, "Rect") else {
        return Ok(false);
    };
    let Some(variable) = assigned_variable(tree, statement) else {
        return Ok(false);
    };
    let Some(name) = generated_name(variable, "rct") else {
        return Ok(false);
    };
    expect_arguments(HANDLER, arguments, 4)?;

    let region = Region {
        name: name.to_string(),
        left: required(tree, arguments[0], HANDLER, "left")?,
        bottom: required(tree, arguments[1], HANDLER, "bottom")?,
        right: required(tree, arguments[2], HANDLER, "right")?,
        top: required(tree, arguments[3], HANDLER, "top")?,
        ..Default::default()
    };
    ctx.add(region, Some(variable));
    Ok(true)
}

/// `AddWeatherEffect(region, FourCC("RAhr"))`
pub fn weather_effect(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    const HANDLER: &str = "region_weather";

    let Some((_, arguments)) = tree.find_call(statement, "AddWeatherEffect") else {
        return Ok(false);
    };
    expect_arguments(HANDLER, arguments, 2)?;

    let effect = fourcc_argument(tree, arguments[1])
        .ok_or_else(|| handler_error(HANDLER, format!("unreadable effect id {}", tree.render(arguments[1]))))?;
    let region = ctx
        .resolve_mut::<Region>(tree.identifier_name(arguments[0]))
        .ok_or_else(|| handler_error(HANDLER, "no region created yet"))?;
    region.weather_effect = Some(effect);
    Ok(true)
}

/// `RegisterStackedSound(gg_snd_X, true, width, height)` right after the
/// region it plays over
pub fn ambient_sound(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    const HANDLER: &str = "region_ambient_sound";

    let Some((_, arguments)) = tree.find_call(statement, "RegisterStackedSound") else {
        return Ok(false);
    };
    expect_arguments(HANDLER, arguments, 1)?;

    let sound = tree
        .identifier_name(arguments[0])
        .ok_or_else(|| handler_error(HANDLER, "sound is not a variable"))?;
    let region = ctx
        .last_created_mut::<Region>()
        .ok_or_else(|| handler_error(HANDLER, "no region created yet"))?;
    region.ambient_sound = Some(sound.to_string());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fourcc::FourCC;
    use crate::reconstruct::handlers::test_support::*;
    use crate::script::RawNode;

    fn rect(variable: &str) -> RawNode {
        RawNode::assign(variable, RawNode::call("Rect", numbers(&["0", "0", "100", "100"])))
    }

    #[test]
    fn test_rect_creates_region() {
        let (tree, ids) = main_with(vec![rect("gg_rct_Test")]);
        let mut ctx = context(&tree);

        assert!(create_region(&mut ctx, &tree, ids[0]).unwrap());
        let region = ctx.get::<Region>("gg_rct_Test").unwrap();
        assert_eq!(region.name, "Test");
        assert_eq!((region.left, region.bottom, region.right, region.top), (0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_unprefixed_rect_is_ignored() {
        let (tree, ids) = main_with(vec![rect("r")]);
        let mut ctx = context(&tree);
        assert!(!create_region(&mut ctx, &tree, ids[0]).unwrap());
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_non_literal_bound_is_an_error() {
        let statement = RawNode::assign(
            "gg_rct_Bad",
            RawNode::call(
                "Rect",
                vec![
                    RawNode::identifier("x"),
                    RawNode::number("0"),
                    RawNode::number("1"),
                    RawNode::number("1"),
                ],
            ),
        );
        let (tree, ids) = main_with(vec![statement]);
        let mut ctx = context(&tree);
        assert!(create_region(&mut ctx, &tree, ids[0]).is_err());
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_weather_and_ambient_sound() {
        let (tree, ids) = main_with(vec![
            rect("gg_rct_Rain"),
            rect("gg_rct_Other"),
            RawNode::local(
                "we",
                RawNode::call(
                    "AddWeatherEffect",
                    vec![RawNode::identifier("gg_rct_Rain"), RawNode::fourcc("RAhr")],
                ),
            ),
            RawNode::call_statement(
                "RegisterStackedSound",
                vec![
                    RawNode::identifier("gg_snd_Waves"),
                    RawNode::boolean(true),
                    RawNode::number("512"),
                    RawNode::number("512"),
                ],
            ),
        ]);
        let mut ctx = context(&tree);
        for &id in &ids[..2] {
            create_region(&mut ctx, &tree, id).unwrap();
        }

        assert!(weather_effect(&mut ctx, &tree, ids[2]).unwrap());
        assert!(ambient_sound(&mut ctx, &tree, ids[3]).unwrap());

        let rain = ctx.get::<Region>("gg_rct_Rain").unwrap();
        assert_eq!(rain.weather_effect, Some(FourCC::parse("RAhr")));
        assert_eq!(rain.ambient_sound, None);
        let other = ctx.get::<Region>("gg_rct_Other").unwrap();
        assert_eq!(other.ambient_sound.as_deref(), Some("gg_snd_Waves"));
    }
}
