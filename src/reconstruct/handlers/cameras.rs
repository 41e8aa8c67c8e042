use log::debug;
use std::str::FromStr;
use strum::EnumString;

use crate::error::Result;
use crate::reconstruct::context::ReconstructionContext;
use crate::reconstruct::handlers::{assigned_variable, expect_arguments, generated_name, handler_error, required};
use crate::reconstruct::records::Camera;
use crate::script::{NodeId, ScriptTree};

/// Camera fields settable through `CameraSetupSetField`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, strum::Display)]
pub enum CameraField {
    #[strum(serialize = "CAMERA_FIELD_TARGET_DISTANCE")]
    TargetDistance,
    #[strum(serialize = "CAMERA_FIELD_FARZ")]
    FarZ,
    #[strum(serialize = "CAMERA_FIELD_ANGLE_OF_ATTACK")]
    AngleOfAttack,
    #[strum(serialize = "CAMERA_FIELD_FIELD_OF_VIEW")]
    FieldOfView,
    #[strum(serialize = "CAMERA_FIELD_ROLL")]
    Roll,
    #[strum(serialize = "CAMERA_FIELD_ROTATION")]
    Rotation,
    #[strum(serialize = "CAMERA_FIELD_ZOFFSET")]
    ZOffset,
    #[strum(serialize = "CAMERA_FIELD_NEARZ")]
    NearZ,
    #[strum(serialize = "CAMERA_FIELD_LOCAL_PITCH")]
    LocalPitch,
    #[strum(serialize = "CAMERA_FIELD_LOCAL_YAW")]
    LocalYaw,
    #[strum(serialize = "CAMERA_FIELD_LOCAL_ROLL")]
    LocalRoll,
}

impl CameraField {
    pub fn apply(self, camera: &mut Camera, value: f32) {
        let slot = match self {
            CameraField::TargetDistance => &mut camera.distance,
            CameraField::FarZ => &mut camera.far_z,
            CameraField::AngleOfAttack => &mut camera.angle_of_attack,
            CameraField::FieldOfView => &mut camera.field_of_view,
            CameraField::Roll => &mut camera.roll,
            CameraField::Rotation => &mut camera.rotation,
            CameraField::ZOffset => &mut camera.z_offset,
            CameraField::NearZ => &mut camera.near_z,
            CameraField::LocalPitch => &mut camera.local_pitch,
            CameraField::LocalYaw => &mut camera.local_yaw,
            CameraField::LocalRoll => &mut camera.local_roll,
        };
        *slot = value;
    }
}

/// `gg_cam_<Name> = CreateCameraSetup()`
pub fn create_camera(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    if tree.find_call(statement, "CreateCameraSetup").is_none() {
        return Ok(false);
    }
    let Some(variable) = assigned_variable(tree, statement) else {
        return Ok(false);
    };
    let Some(name) = generated_name(variable, "cam") else {
        return Ok(false);
    };

    let camera = Camera {
        name: name.to_string(),
        ..Default::default()
    };
    ctx.add(camera, Some(variable));
    Ok(true)
}

/// `CameraSetupSetField(camera, CAMERA_FIELD_*, value, duration)`.
/// Unknown fields and non-literal values are skipped.
pub fn set_field(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    const HANDLER: &str = "camera_field";

    let Some((_, arguments)) = tree.find_call(statement, "CameraSetupSetField") else {
        return Ok(false);
    };
    expect_arguments(HANDLER, arguments, 3)?;

    let field_name = tree.render(arguments[1]);
    let Ok(field) = CameraField::from_str(&field_name) else {
        debug!("Ignoring unknown camera field {}", field_name);
        return Ok(true);
    };
    let Some(value) = tree.try_get_value::<f32>(arguments[2]) else {
        debug!("Ignoring non-literal value for {}", field);
        return Ok(true);
    };

    let camera = ctx
        .resolve_mut::<Camera>(tree.identifier_name(arguments[0]))
        .ok_or_else(|| handler_error(HANDLER, "no camera created yet"))?;
    field.apply(camera, value);
    Ok(true)
}

/// `CameraSetupSetDestPosition(camera, x, y, duration)`
pub fn set_destination(ctx: &mut ReconstructionContext, tree: &ScriptTree, statement: NodeId) -> Result<bool> {
    const HANDLER: &str = "camera_position";

    let Some((_, arguments)) = tree.find_call(statement, "CameraSetupSetDestPosition") else {
        return Ok(false);
    };
    expect_arguments(HANDLER, arguments, 3)?;

    let x: f32 = required(tree, arguments[1], HANDLER, "x")?;
    let y: f32 = required(tree, arguments[2], HANDLER, "y")?;
    let camera = ctx
        .resolve_mut::<Camera>(tree.identifier_name(arguments[0]))
        .ok_or_else(|| handler_error(HANDLER, "no camera created yet"))?;
    camera.target_x = x;
    camera.target_y = y;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::handlers::test_support::*;
    use crate::script::RawNode;

    fn set(camera: &str, field: &str, value: RawNode) -> RawNode {
        RawNode::call_statement(
            "CameraSetupSetField",
            vec![
                RawNode::identifier(camera),
                RawNode::identifier(field),
                value,
                RawNode::number("0.0"),
            ],
        )
    }

    #[test]
    fn test_field_names() {
        assert_eq!(CameraField::from_str("CAMERA_FIELD_ZOFFSET").ok(), Some(CameraField::ZOffset));
        assert!(CameraField::from_str("CAMERA_FIELD_SPIN").is_err());
        assert_eq!(CameraField::FarZ.to_string(), "CAMERA_FIELD_FARZ");
    }

    #[test]
    fn test_camera_setup_sequence() {
        let (tree, ids) = main_with(vec![
            RawNode::assign("gg_cam_Intro", RawNode::call("CreateCameraSetup", vec![])),
            set("gg_cam_Intro", "CAMERA_FIELD_ZOFFSET", RawNode::number("50.0")),
            set("gg_cam_Intro", "CAMERA_FIELD_ROTATION", RawNode::number("90.0")),
            set("gg_cam_Intro", "CAMERA_FIELD_SPIN", RawNode::number("1.0")),
            RawNode::call_statement(
                "CameraSetupSetDestPosition",
                vec![
                    RawNode::identifier("gg_cam_Intro"),
                    RawNode::unary("-", RawNode::number("320.0")),
                    RawNode::number("128.0"),
                    RawNode::number("0.0"),
                ],
            ),
        ]);
        let mut ctx = context(&tree);

        assert!(create_camera(&mut ctx, &tree, ids[0]).unwrap());
        for &id in &ids[1..4] {
            assert!(set_field(&mut ctx, &tree, id).unwrap());
        }
        assert!(set_destination(&mut ctx, &tree, ids[4]).unwrap());

        let camera = ctx.get::<Camera>("gg_cam_Intro").unwrap();
        assert_eq!(camera.name, "Intro");
        assert_eq!(camera.z_offset, 50.0);
        assert_eq!(camera.rotation, 90.0);
        assert_eq!((camera.target_x, camera.target_y), (-320.0, 128.0));
    }

    #[test]
    fn test_untracked_alias_mutates_last_created() {
        let (tree, ids) = main_with(vec![
            RawNode::assign("gg_cam_First", RawNode::call("CreateCameraSetup", vec![])),
            RawNode::assign("gg_cam_Second", RawNode::call("CreateCameraSetup", vec![])),
            set("whichSetup", "CAMERA_FIELD_FARZ", RawNode::number("5000.0")),
        ]);
        let mut ctx = context(&tree);
        create_camera(&mut ctx, &tree, ids[0]).unwrap();
        create_camera(&mut ctx, &tree, ids[1]).unwrap();
        set_field(&mut ctx, &tree, ids[2]).unwrap();

        assert_eq!(ctx.get::<Camera>("gg_cam_First").unwrap().far_z, 0.0);
        assert_eq!(ctx.get::<Camera>("gg_cam_Second").unwrap().far_z, 5000.0);
    }

    #[test]
    fn test_setter_without_camera_fails() {
        let (tree, ids) = main_with(vec![set("cam", "CAMERA_FIELD_ROLL", RawNode::number("1"))]);
        let mut ctx = context(&tree);
        assert!(set_field(&mut ctx, &tree, ids[0]).is_err());
    }
}
