use crate::error::Result;
use crate::reconstruct::context::ReconstructionContext;
use crate::reconstruct::handlers::{
    assigned_variable, expect_arguments, find_any_call, fourcc_argument, generated_name, handler_error, life_value,
    required, LifeValue,
};
use crate::reconstruct::records::Doodad;
use crate::script::{NodeId, ScriptTree};

const CONSTRUCTORS: &[&str] = &[
    "CreateDestructable",
    "CreateDestructableZ",
    "BlzCreateDestructableWithSkin",
    "BlzCreateDestructableZWithSkin",
];

const SETTERS: &[&str] = &["SetDestructableLife", "SetDestructableInvulnerable"];

/// Argument layout of one constructor
struct Layout {
    has_z: bool,
    has_skin: bool,
}

impl Layout {
    fn of(constructor: &str) -> Self {
        Self {
            has_z: constructor.ends_with("ZWithSkin") || constructor == "CreateDestructableZ",
            has_skin: constructor.ends_with("WithSkin"),
        }
    }

    fn arity(&self) -> usize {
        6 + usize::from(self.has_z) + usize::from(self.has_skin)
    }
}

/// `CreateDestructable(id, x, y, facing, scale, variation)`, with an extra
/// `z` after `y` for the `Z` forms and a trailing skin id for the skinned
/// ones
pub fn create_doodad(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    const HANDLER: &str = "doodad";

    let Some((constructor, arguments)) = find_any_call(tree, statement, CONSTRUCTORS) else {
        return Ok(false);
    };
    let layout = Layout::of(constructor);
    expect_arguments(HANDLER, arguments, layout.arity())?;

    let type_id = fourcc_argument(tree, arguments[0])
        .ok_or_else(|| handler_error(HANDLER, format!("unreadable doodad id {}", tree.render(arguments[0]))))?;
    let z = if layout.has_z {
        Some(required(tree, arguments[3], HANDLER, "z")?)
    } else {
        None
    };
    let rest = if layout.has_z { 4 } else { 3 };
    let skin_id = if layout.has_skin {
        let skin = arguments[rest + 3];
        Some(
            fourcc_argument(tree, skin)
                .ok_or_else(|| handler_error(HANDLER, format!("unreadable skin id {}", tree.render(skin))))?,
        )
    } else {
        None
    };

    let variable = assigned_variable(tree, statement);
    let doodad = Doodad {
        variable: variable
            .filter(|name| generated_name(name, "dest").is_some())
            .map(str::to_string),
        type_id,
        skin_id,
        x: required(tree, arguments[1], HANDLER, "x")?,
        y: required(tree, arguments[2], HANDLER, "y")?,
        z,
        facing: required(tree, arguments[rest], HANDLER, "facing")?,
        scale: required(tree, arguments[rest + 1], HANDLER, "scale")?,
        variation: required(tree, arguments[rest + 2], HANDLER, "variation")?,
        ..Default::default()
    };
    ctx.add(doodad, variable);
    Ok(true)
}

pub fn apply_setter(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    const HANDLER: &str = "doodad_setter";

    let Some((setter, arguments)) = find_any_call(tree, statement, SETTERS) else {
        return Ok(false);
    };
    expect_arguments(HANDLER, arguments, 2)?;

    let doodad = ctx
        .resolve_mut::<Doodad>(tree.identifier_name(arguments[0]))
        .ok_or_else(|| handler_error(HANDLER, "no doodad created yet"))?;

    match setter {
        "SetDestructableLife" => match life_value(tree, arguments[1]) {
            Some(LifeValue::Absolute(life)) => doodad.life = Some(life),
            Some(LifeValue::Fraction(fraction)) => doodad.life_fraction = Some(fraction),
            None => {}
        },
        "SetDestructableInvulnerable" => {
            doodad.invulnerable = tree.try_get_value::<bool>(arguments[1]).unwrap_or(false);
        }
        _ => return Ok(false),
    }
    Ok(true)
}
