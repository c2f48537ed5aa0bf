//! Fixtures and scene-driving actions for `TestScene`.

use bevy::prelude::*;

use crate::commands::SubsystemCommand;
use crate::input::SceneInput;
use crate::manifest::{AssetClass, SceneManifest};
use crate::model::{AssetError, Bounds, LoadedModel, ModelNode};
use crate::registry::BuildingId;
use crate::AssetLoadReport;

use super::TestScene;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Ground, one building and one model that fails to parse.
pub fn campus_manifest() -> SceneManifest {
    SceneManifest::default()
        .with_asset("地面.glb", AssetClass::Ground)
        .with_asset(
            "A1_Building.glb",
            AssetClass::Building {
                id: BuildingId::new("A1_Building"),
            },
        )
        .with_asset("corrupt.glb", AssetClass::Decoration)
        .with_display_name("A1_Building", "Library")
}

/// A flat 1000 x 800 ground at y = 0.
pub fn ground_model(name: &str) -> LoadedModel {
    LoadedModel::new(name).with_bounds(Bounds::new(
        Vec3::new(-500.0, 0.0, -400.0),
        Vec3::new(500.0, 0.0, 400.0),
    ))
}

/// A building with a root node and two mesh parts, 20 x 30 x 20 at `origin`.
pub fn building_model(name: &str, origin: Vec3) -> LoadedModel {
    LoadedModel::new(name)
        .with_nodes(vec![
            ModelNode::new(format!("{name}_root"), None, Transform::IDENTITY),
            ModelNode::new(format!("{name}_wall"), Some(0), Transform::IDENTITY).with_mesh(),
            ModelNode::new(format!("{name}_roof"), Some(0), Transform::IDENTITY).with_mesh(),
        ])
        .with_bounds(Bounds::new(origin, origin + Vec3::new(20.0, 30.0, 20.0)))
}

/// A scenery model with two tree markers, one lamp marker and both prototypes.
pub fn scenery_model(name: &str) -> LoadedModel {
    let at = |x: f32| Transform::from_xyz(x, 0.0, 0.0);
    LoadedModel::new(name).with_nodes(vec![
        ModelNode::new("zuobiao", None, Transform::IDENTITY),
        ModelNode::new("shu_1", Some(0), at(1.0)),
        ModelNode::new("shu_2", Some(0), at(2.0)),
        ModelNode::new("lamp_1", Some(0), at(3.0)),
        ModelNode::new("shili", None, Transform::IDENTITY),
        ModelNode::new("shu", Some(4), Transform::IDENTITY).with_mesh(),
        ModelNode::new("lamp", Some(4), Transform::IDENTITY).with_mesh(),
    ])
}

impl TestScene {
    // -----------------------------------------------------------------------
    // Loader side
    // -----------------------------------------------------------------------

    pub fn report_loaded(&mut self, name: &str, model: LoadedModel) -> &mut Self {
        self.app.world_mut().send_event(AssetLoadReport {
            name: name.to_string(),
            outcome: Ok(model),
        });
        self.app.update();
        self
    }

    pub fn report_failed(&mut self, name: &str, error: AssetError) -> &mut Self {
        self.app.world_mut().send_event(AssetLoadReport {
            name: name.to_string(),
            outcome: Err(error),
        });
        self.app.update();
        self
    }

    /// Settle the campus fixture batch: ground and building load, "corrupt"
    /// fails to parse.
    pub fn with_campus_loaded(mut self) -> Self {
        self.report_loaded("地面", ground_model("地面"))
            .report_loaded("A1_Building", building_model("A1_Building", Vec3::ZERO))
            .report_failed(
                "corrupt",
                AssetError::Malformed {
                    name: "corrupt".into(),
                    reason: "unexpected end of buffer".into(),
                },
            );
        self
    }

    // -----------------------------------------------------------------------
    // Host side
    // -----------------------------------------------------------------------

    pub fn command(&mut self, command: SubsystemCommand) -> &mut Self {
        self.app.world_mut().send_event(command);
        self.app.update();
        self
    }

    pub fn input(&mut self, input: SceneInput) -> &mut Self {
        self.app.world_mut().send_event(input);
        self.app.update();
        self
    }
}
