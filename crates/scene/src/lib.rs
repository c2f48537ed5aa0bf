//! Campus scene core.
//!
//! Everything that decides *what* the outdoor campus scene does lives here
//! and runs headless: the load batch, the building registry, camera motion
//! scheduling, instance batching, input bindings and the subsystem state
//! machine. The `rendering` crate adapts it to Bevy's renderer by
//! fetching models, drawing labels, applying the camera rig and turning
//! pointer state into [`input::SceneInput`] events.

use bevy::prelude::*;

pub mod box_select;
pub mod camera_motion;
pub mod collaborators;
pub mod commands;
pub mod config;
pub mod controller;
pub mod input;
pub mod instancing;
pub mod load_batch;
pub mod manifest;
pub mod measure;
pub mod model;
pub mod notifications;
pub mod registry;
pub mod subscriptions;
pub mod track;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

use camera_motion::MotionTicket;
use commands::SubsystemCommand;
use controller::{AcceptedAsset, LightingRig, SceneSubsystem, SubMode, SubsystemPhase};
use input::SceneInput;
use instancing::{InstanceBatch, InstancePrototype};
use manifest::AssetDescriptor;
use model::{AssetError, LoadedModel};
use notifications::{HostNotificationEvent, SubsystemSwitchRequest};

// ---------------------------------------------------------------------------
// Events between the core and its adapters
// ---------------------------------------------------------------------------

/// Models the loader should fetch.
#[derive(Event, Debug, Clone)]
pub struct AssetFetchRequest {
    pub descriptors: Vec<AssetDescriptor>,
}

/// Outcome of one fetch, reported back by the loader.
#[derive(Event, Debug, Clone)]
pub struct AssetLoadReport {
    pub name: String,
    pub outcome: Result<LoadedModel, AssetError>,
}

/// A loaded asset was classified and should be shown.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct AssetAccepted(pub AcceptedAsset);

#[derive(Event, Debug, Clone, PartialEq)]
pub struct InstanceBatchReady {
    pub batch: InstanceBatch,
    pub prototype: InstancePrototype,
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct LightingRequest(pub LightingRig);

/// A camera motion ran to completion or was superseded.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraMoveFinished(pub MotionTicket);

/// Ordering of the core's per-frame work. Adapters that feed input should run
/// before [`SceneSet::Ingest`]; adapters that read the rig or outputs after
/// [`SceneSet::Publish`].
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneSet {
    Ingest,
    Advance,
    Publish,
}

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<SceneSubsystem>() {
            let manifest = app
                .world()
                .get_resource::<manifest::SceneManifest>()
                .cloned()
                .unwrap_or_default();
            app.insert_resource(SceneSubsystem::new(Ok(manifest)));
        }

        app.init_state::<SubsystemPhase>()
            .add_event::<SubsystemCommand>()
            .add_event::<SceneInput>()
            .add_event::<AssetFetchRequest>()
            .add_event::<AssetLoadReport>()
            .add_event::<AssetAccepted>()
            .add_event::<InstanceBatchReady>()
            .add_event::<LightingRequest>()
            .add_event::<CameraMoveFinished>()
            .add_event::<HostNotificationEvent>()
            .add_event::<SubsystemSwitchRequest>()
            .configure_sets(
                Update,
                (SceneSet::Ingest, SceneSet::Advance, SceneSet::Publish).chain(),
            )
            .add_systems(Startup, start_subsystem)
            .add_systems(
                Update,
                (
                    (receive_asset_reports, apply_subsystem_commands, route_scene_input)
                        .chain()
                        .in_set(SceneSet::Ingest),
                    tick_subsystem.in_set(SceneSet::Advance),
                    (flush_outputs, sync_phase_state)
                        .chain()
                        .in_set(SceneSet::Publish),
                ),
            );
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

fn start_subsystem(mut subsystem: ResMut<SceneSubsystem>) {
    if subsystem.autostart() && subsystem.phase() == SubsystemPhase::Created {
        subsystem.start();
    }
}

fn receive_asset_reports(
    mut reports: EventReader<AssetLoadReport>,
    mut subsystem: ResMut<SceneSubsystem>,
) {
    for report in reports.read() {
        subsystem.settle_asset(&report.name, report.outcome.clone());
    }
}

fn apply_subsystem_commands(
    mut commands: EventReader<SubsystemCommand>,
    mut subsystem: ResMut<SceneSubsystem>,
) {
    for command in commands.read() {
        if subsystem.phase() == SubsystemPhase::Destroyed {
            warn!("SceneSubsystem: {:?} after destroy", command);
            continue;
        }
        match command.clone() {
            SubsystemCommand::Activate => {
                subsystem.activate();
            }
            SubsystemCommand::Deactivate => {
                subsystem.deactivate();
            }
            SubsystemCommand::Reload => {
                subsystem.reload();
            }
            SubsystemCommand::Destroy => subsystem.destroy(),
            SubsystemCommand::UpdatePopulation(updates) => {
                subsystem.update_population(&updates);
            }
            SubsystemCommand::SetFilter(filter) => subsystem.set_filter(filter),
            SubsystemCommand::Search { id } => {
                subsystem.search(&id);
            }
            SubsystemCommand::StartMeasuringDistance => {
                subsystem.enter_sub_mode(SubMode::MeasuringDistance);
            }
            SubsystemCommand::StopMeasuringDistance => {
                subsystem.exit_sub_mode(SubMode::MeasuringDistance);
            }
            SubsystemCommand::StartMeasuringArea => {
                subsystem.enter_sub_mode(SubMode::MeasuringArea);
            }
            SubsystemCommand::StopMeasuringArea => {
                subsystem.exit_sub_mode(SubMode::MeasuringArea);
            }
            SubsystemCommand::StartBoxSelect => {
                subsystem.enter_sub_mode(SubMode::BoxSelect);
            }
            SubsystemCommand::StopBoxSelect => {
                subsystem.exit_sub_mode(SubMode::BoxSelect);
            }
            SubsystemCommand::Track(track) => subsystem.track_command(track),
            SubsystemCommand::ResetCamera { duration_ms } => {
                subsystem.reset_camera(std::time::Duration::from_millis(duration_ms));
            }
            SubsystemCommand::ShowAllLabels => subsystem.show_all_labels(),
            SubsystemCommand::HideAllLabels => subsystem.hide_all_labels(),
            SubsystemCommand::ShowLabel { id } => {
                subsystem.show_label(&id);
            }
            SubsystemCommand::HideLabel { id } => {
                subsystem.hide_label(&id);
            }
            SubsystemCommand::SetRoam { enabled } => subsystem.set_roam(enabled),
        }
    }
}

fn route_scene_input(mut inputs: EventReader<SceneInput>, mut subsystem: ResMut<SceneSubsystem>) {
    for input in inputs.read() {
        subsystem.handle_input(input);
    }
}

fn tick_subsystem(time: Res<Time>, mut subsystem: ResMut<SceneSubsystem>) {
    subsystem.tick(time.delta(), time.elapsed_secs());
}

#[allow(clippy::too_many_arguments)]
fn flush_outputs(
    mut subsystem: ResMut<SceneSubsystem>,
    mut fetches: EventWriter<AssetFetchRequest>,
    mut accepted: EventWriter<AssetAccepted>,
    mut batches: EventWriter<InstanceBatchReady>,
    mut lighting: EventWriter<LightingRequest>,
    mut finished: EventWriter<CameraMoveFinished>,
    mut notifications: EventWriter<HostNotificationEvent>,
    mut switches: EventWriter<SubsystemSwitchRequest>,
) {
    let outputs = subsystem.take_outputs();
    if !outputs.fetches.is_empty() {
        fetches.send(AssetFetchRequest {
            descriptors: outputs.fetches,
        });
    }
    if let Some(rig) = outputs.lighting {
        lighting.send(LightingRequest(rig));
    }
    for asset in outputs.accepted {
        accepted.send(AssetAccepted(asset));
    }
    for (batch, prototype) in outputs.instance_batches {
        batches.send(InstanceBatchReady { batch, prototype });
    }
    for ticket in outputs.finished_moves {
        finished.send(CameraMoveFinished(ticket));
    }
    for notification in outputs.notifications {
        notifications.send(HostNotificationEvent(notification));
    }
    for switch in outputs.switches {
        switches.send(switch);
    }
}

fn sync_phase_state(
    subsystem: Res<SceneSubsystem>,
    state: Res<State<SubsystemPhase>>,
    mut next: ResMut<NextState<SubsystemPhase>>,
) {
    if *state.get() != subsystem.phase() {
        next.set(subsystem.phase());
    }
}
