//! # TestScene - headless integration test harness for the campus scene
//!
//! Wraps `bevy::app::App` + `ScenePlugin` without a window or renderer. The
//! loader is played by the test: fetch requests are recorded, and outcomes
//! are fed back with `report_loaded` / `report_failed`.

mod assertions;
mod queries;
mod setup;

pub use setup::{building_model, campus_manifest, ground_model, scenery_model};

use std::time::Duration;

use bevy::app::App;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use bevy::time::TimeUpdateStrategy;

use crate::controller::SceneSubsystem;
use crate::manifest::{ManifestError, SceneManifest};
use crate::notifications::{HostNotification, HostNotificationEvent, SubsystemSwitchRequest};
use crate::{
    AssetAccepted, AssetFetchRequest, CameraMoveFinished, InstanceBatchReady, LightingRequest,
    ScenePlugin, SceneSet,
};

/// Fixed frame length used by the harness clock.
pub const FRAME: Duration = Duration::from_millis(16);

/// Everything the plugin published, accumulated across frames.
#[derive(Resource, Default, Debug)]
pub struct Recorded {
    pub fetched: Vec<String>,
    pub accepted: Vec<AssetAccepted>,
    pub batches: Vec<InstanceBatchReady>,
    pub lighting: Vec<LightingRequest>,
    pub finished_moves: Vec<CameraMoveFinished>,
    pub notifications: Vec<HostNotification>,
    pub switches: Vec<SubsystemSwitchRequest>,
}

#[allow(clippy::too_many_arguments)]
fn record_outputs(
    mut recorded: ResMut<Recorded>,
    mut fetches: EventReader<AssetFetchRequest>,
    mut accepted: EventReader<AssetAccepted>,
    mut batches: EventReader<InstanceBatchReady>,
    mut lighting: EventReader<LightingRequest>,
    mut finished: EventReader<CameraMoveFinished>,
    mut notifications: EventReader<HostNotificationEvent>,
    mut switches: EventReader<SubsystemSwitchRequest>,
) {
    for request in fetches.read() {
        recorded
            .fetched
            .extend(request.descriptors.iter().map(|d| d.name.clone()));
    }
    recorded.accepted.extend(accepted.read().cloned());
    recorded.batches.extend(batches.read().cloned());
    recorded.lighting.extend(lighting.read().copied());
    recorded.finished_moves.extend(finished.read().copied());
    recorded
        .notifications
        .extend(notifications.read().map(|n| n.0.clone()));
    recorded.switches.extend(switches.read().cloned());
}

/// A headless Bevy App wrapping `ScenePlugin` for integration testing.
pub struct TestScene {
    app: App,
}

impl TestScene {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Start a scene over `manifest`. After construction the load batch has
    /// been issued and is waiting for reports.
    pub fn new(manifest: SceneManifest) -> Self {
        Self::from_result(Ok(manifest))
    }

    /// Start a scene whose manifest fetch produced `result`.
    pub fn from_result(result: Result<SceneManifest, ManifestError>) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(StatesPlugin);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(FRAME));

        // Insert BEFORE ScenePlugin so the plugin keeps this instance.
        app.insert_resource(SceneSubsystem::new(result));
        app.add_plugins(ScenePlugin);
        app.init_resource::<Recorded>();
        app.add_systems(Update, record_outputs.after(SceneSet::Publish));

        // Run one update so Startup executes and the batch is published.
        app.update();
        Self { app }
    }

    /// The three-asset campus (ground, one building, one corrupt model),
    /// fully settled and ready to enter.
    pub fn loaded_campus() -> Self {
        Self::new(campus_manifest()).with_campus_loaded()
    }

    // -----------------------------------------------------------------------
    // Frames
    // -----------------------------------------------------------------------

    /// Run `n` full app updates of [`FRAME`] each.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.update();
        }
    }

    /// Run long enough for any scheduled camera motion to finish.
    pub fn settle_camera(&mut self) {
        self.tick(150);
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }
}
