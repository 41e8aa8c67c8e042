use crate::error::Result;
use crate::reconstruct::context::ReconstructionContext;
use crate::reconstruct::handlers::{
    assigned_variable, expect_arguments, find_any_call, generated_name, handler_error, required,
};
use crate::reconstruct::records::Sound;
use crate::script::{NodeId, ScriptTree};

const SETTERS: &[&str] = &[
    "SetSoundParamsFromLabel",
    "SetSoundDuration",
    "SetSoundChannel",
    "SetSoundVolume",
    "SetSoundPitch",
    "SetSoundDistances",
    "SetSoundDistanceCutoff",
    "SetSoundConeAngles",
    "SetSoundConeOrientation",
];

/// `gg_snd_<Name> = CreateSound(path, looping, is3D, stopWhenOutOfRange,
/// fadeInRate, fadeOutRate, eaxSetting)`
pub fn create_sound(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    const HANDLER: &str = "sound";

    let Some((_, arguments)) = tree.find_call(statement, "CreateSound") else {
        return Ok(false);
    };
    let Some(variable) = assigned_variable(tree, statement) else {
        return Ok(false);
    };
    let Some(name) = generated_name(variable, "snd") else {
        return Ok(false);
    };
    expect_arguments(HANDLER, arguments, 7)?;

    let sound = Sound {
        name: name.to_string(),
        file_path: required(tree, arguments[0], HANDLER, "path")?,
        looping: required(tree, arguments[1], HANDLER, "looping")?,
        is_3d: required(tree, arguments[2], HANDLER, "is3D")?,
        stop_when_out_of_range: required(tree, arguments[3], HANDLER, "stopWhenOutOfRange")?,
        fade_in_rate: required(tree, arguments[4], HANDLER, "fadeInRate")?,
        fade_out_rate: required(tree, arguments[5], HANDLER, "fadeOutRate")?,
        eax_setting: required(tree, arguments[6], HANDLER, "eaxSetting")?,
        ..Default::default()
    };
    ctx.add(sound, Some(variable));
    Ok(true)
}

/// The `SetSound*` calls the editor emits after `CreateSound`
pub fn apply_setter(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    const HANDLER: &str = "sound_setter";

    let Some((setter, arguments)) = find_any_call(tree, statement, SETTERS) else {
        return Ok(false);
    };
    let value = |index: usize| arguments.get(index).copied();
    let number = |index: usize| value(index).and_then(|argument| tree.try_get_value::<f32>(argument));
    let integer = |index: usize| value(index).and_then(|argument| tree.try_get_value::<i32>(argument));
    expect_arguments(HANDLER, arguments, 2)?;

    let sound = ctx
        .resolve_mut::<Sound>(tree.identifier_name(arguments[0]))
        .ok_or_else(|| handler_error(HANDLER, "no sound created yet"))?;

    match setter {
        "SetSoundParamsFromLabel" => {
            sound.label = value(1).and_then(|argument| tree.try_get_value::<String>(argument));
        }
        "SetSoundDuration" => sound.duration = integer(1),
        "SetSoundChannel" => sound.channel = integer(1),
        "SetSoundVolume" => sound.volume = integer(1),
        "SetSoundPitch" => sound.pitch = number(1),
        "SetSoundDistances" => {
            sound.min_distance = number(1);
            sound.max_distance = number(2);
        }
        "SetSoundDistanceCutoff" => sound.distance_cutoff = number(1),
        "SetSoundConeAngles" => {
            sound.cone_inside = number(1);
            sound.cone_outside = number(2);
            sound.cone_outside_volume = integer(3);
        }
        "SetSoundConeOrientation" => {
            sound.cone_orientation = match (number(1), number(2), number(3)) {
                (Some(x), Some(y), Some(z)) => Some([x, y, z]),
                _ => None,
            };
        }
        _ => return Ok(false),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::handlers::test_support::*;
    use crate::script::RawNode;

    fn create(variable: &str) -> RawNode {
        RawNode::assign(
            variable,
            RawNode::call(
                "CreateSound",
                vec![
                    RawNode::string("Sound\\Ambient\\Waves.wav"),
                    RawNode::boolean(true),
                    RawNode::boolean(true),
                    RawNode::boolean(false),
                    RawNode::number("10"),
                    RawNode::number("10"),
                    RawNode::string("DefaultEAXON"),
                ],
            ),
        )
    }

    fn setter(name: &str, sound: &str, values: &[&str]) -> RawNode {
        let mut arguments = vec![RawNode::identifier(sound)];
        arguments.extend(numbers(values));
        RawNode::call_statement(name, arguments)
    }

    #[test]
    fn test_create_sound() {
        let (tree, ids) = main_with(vec![create("gg_snd_Waves")]);
        let mut ctx = context(&tree);
        assert!(create_sound(&mut ctx, &tree, ids[0]).unwrap());

        let sound = ctx.get::<Sound>("gg_snd_Waves").unwrap();
        assert_eq!(sound.name, "Waves");
        assert_eq!(sound.file_path, "Sound\\Ambient\\Waves.wav");
        assert!(sound.looping && sound.is_3d && !sound.stop_when_out_of_range);
        assert_eq!((sound.fade_in_rate, sound.fade_out_rate), (10, 10));
        assert_eq!(sound.eax_setting, "DefaultEAXON");
    }

    #[test]
    fn test_setters() {
        let (tree, ids) = main_with(vec![
            create("gg_snd_Waves"),
            RawNode::call_statement(
                "SetSoundParamsFromLabel",
                vec![RawNode::identifier("gg_snd_Waves"), RawNode::string("WavesLoop")],
            ),
            setter("SetSoundDuration", "gg_snd_Waves", &["7523"]),
            setter("SetSoundVolume", "gg_snd_Waves", &["127"]),
            setter("SetSoundDistances", "gg_snd_Waves", &["600.0", "10000.0"]),
            setter("SetSoundConeOrientation", "gg_snd_Waves", &["0", "0", "1"]),
        ]);
        let mut ctx = context(&tree);
        create_sound(&mut ctx, &tree, ids[0]).unwrap();
        for &id in &ids[1..] {
            assert!(apply_setter(&mut ctx, &tree, id).unwrap());
        }

        let sound = ctx.get::<Sound>("gg_snd_Waves").unwrap();
        assert_eq!(sound.label.as_deref(), Some("WavesLoop"));
        assert_eq!(sound.duration, Some(7523));
        assert_eq!(sound.volume, Some(127));
        assert_eq!((sound.min_distance, sound.max_distance), (Some(600.0), Some(10000.0)));
        assert_eq!(sound.cone_orientation, Some([0.0, 0.0, 1.0]));
        assert_eq!(sound.pitch, None);
    }

    #[test]
    fn test_unrelated_call_is_not_matched() {
        let (tree, ids) = main_with(vec![setter("StartSound", "gg_snd_Waves", &[])]);
        let mut ctx = context(&tree);
        assert!(!apply_setter(&mut ctx, &tree, ids[0]).unwrap());
    }
}
