//! Scene subsystem controller.
//!
//! [`SceneSubsystem`] is the state machine of the outdoor campus scene:
//!
//! - `Created -> Initializing`: publish lighting, announce loading, issue the
//!   load batch.
//! - `Initializing -> Ready`: the batch finished. The first time, frame the
//!   campus with the arrival motion and tell the host loading is done.
//! - `Ready/Left -> Entered`: only once loaded. Bind Normal-mode input,
//!   resume roam, recompute labels, reset the camera (except on the very
//!   first activation).
//! - `Entered -> Left`: unbind everything, stop roam and tools, hide labels,
//!   drop transient overlays.
//! - `* -> Destroyed`: terminal.
//!
//! Lifecycle misuse never panics or returns an error; it logs and reports a
//! no-op outcome so the host can simply retry.
//!
//! Sub-mode switching lives in `controller/modes.rs`, registry commands,
//! camera framing and pointer input in `controller/interaction.rs`.

mod interaction;
mod modes;

use std::time::Duration;

use bevy::prelude::*;

use crate::camera_motion::{CameraConstraints, CameraMotions, CameraRig, CameraRoam, MotionTicket};
use crate::box_select::BoxSelection;
use crate::collaborators::{Collaborators, Tooltip};
use crate::config::{
    SubsystemConfig, AMBIENT_INTENSITY, ARRIVAL_DURATION_MS, DEFAULT_ALTITUDE, HOME_SCENE,
    KEY_LIGHT_INTENSITY, KEY_LIGHT_POSITION, RESET_DURATION_MS,
};
use crate::instancing::{self, collect_scenery, InstanceBatch, InstancePrototype, SceneryContent};
use crate::load_batch::{LoadBatch, LoadSink, Settled};
use crate::manifest::{AssetClass, AssetDescriptor, ManifestError, SceneManifest};
use crate::measure::{MeasureKind, MeasureTool};
use crate::model::{AssetError, Bounds, LoadedModel};
use crate::notifications::{HostNotification, SubsystemSwitchRequest};
use crate::registry::{BuildingId, Label, MeshRef, SpatialEntityRegistry};
use crate::subscriptions::{EventSubscriptionSet, NORMAL_CHANNELS};
use crate::track::TrackPlayback;

pub use modes::SubMode;

// =============================================================================
// Types
// =============================================================================

/// Lifecycle phase, mirrored into Bevy's state machine for run conditions.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubsystemPhase {
    #[default]
    Created,
    Initializing,
    Ready,
    Entered,
    Left,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Entered,
    AlreadyEntered,
    NotLoaded,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deactivation {
    Left,
    NotEntered,
}

/// The loaded ground plane.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundReference {
    pub asset: String,
    pub bounds: Bounds,
    /// Lowest point the camera may reach.
    pub altitude: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingRig {
    pub ambient_intensity: f32,
    pub key_intensity: f32,
    pub key_position: Vec3,
    pub shadows: bool,
}

impl Default for LightingRig {
    fn default() -> Self {
        Self {
            ambient_intensity: AMBIENT_INTENSITY,
            key_intensity: KEY_LIGHT_INTENSITY,
            key_position: KEY_LIGHT_POSITION,
            shadows: true,
        }
    }
}

/// A loaded asset the presentation layer should now show.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedAsset {
    pub name: String,
    pub class: AssetClass,
}

/// Everything the controller produced since the last flush.
#[derive(Debug, Default)]
pub struct SceneOutputs {
    pub notifications: Vec<HostNotification>,
    pub fetches: Vec<AssetDescriptor>,
    pub accepted: Vec<AcceptedAsset>,
    pub instance_batches: Vec<(InstanceBatch, InstancePrototype)>,
    pub lighting: Option<LightingRig>,
    pub switches: Vec<SubsystemSwitchRequest>,
    pub finished_moves: Vec<MotionTicket>,
}

// =============================================================================
// Controller
// =============================================================================

#[derive(Resource, Debug)]
pub struct SceneSubsystem {
    phase: SubsystemPhase,
    sub_mode: SubMode,
    loaded: bool,
    arrived: bool,
    first_activation_done: bool,
    resume_entered: bool,
    autostart: bool,

    manifest: SceneManifest,
    config: SubsystemConfig,
    batch: Option<LoadBatch>,
    scenery: SceneryContent,

    registry: SpatialEntityRegistry,
    ground: Option<GroundReference>,

    rig: CameraRig,
    motions: CameraMotions,
    roam: CameraRoam,

    normal: EventSubscriptionSet,
    mode_bindings: EventSubscriptionSet,

    distance: MeasureTool,
    area: MeasureTool,
    track: TrackPlayback,
    box_select: BoxSelection,

    collaborators: Collaborators,
    tooltip: Option<Tooltip>,
    search_id: Option<BuildingId>,
    pointer_over_building: bool,
    elapsed_secs: f32,

    outputs: SceneOutputs,
}

impl SceneSubsystem {
    /// Build a controller from the manifest fetch result. A failed fetch is a
    /// transport error: it is logged and the scene loads with zero assets.
    pub fn new(manifest: Result<SceneManifest, ManifestError>) -> Self {
        let manifest = manifest.unwrap_or_else(|err| {
            error!("SceneSubsystem: manifest unavailable, loading no assets: {}", err);
            SceneManifest::default()
        });
        Self {
            phase: SubsystemPhase::Created,
            sub_mode: SubMode::Normal,
            loaded: false,
            arrived: false,
            first_activation_done: false,
            resume_entered: false,
            autostart: true,
            config: manifest.settings.clone(),
            manifest,
            batch: None,
            scenery: SceneryContent::default(),
            registry: SpatialEntityRegistry::default(),
            ground: None,
            rig: CameraRig::default(),
            motions: CameraMotions::default(),
            roam: CameraRoam::default(),
            normal: EventSubscriptionSet::default(),
            mode_bindings: EventSubscriptionSet::default(),
            distance: MeasureTool::new(MeasureKind::Distance),
            area: MeasureTool::new(MeasureKind::Area),
            track: TrackPlayback::default(),
            box_select: BoxSelection::default(),
            collaborators: Collaborators::standard(),
            tooltip: None,
            search_id: None,
            pointer_over_building: false,
            elapsed_secs: 0.0,
            outputs: SceneOutputs::default(),
        }
    }

    /// Leave the controller in `Created` until [`SceneSubsystem::start`] is called.
    pub fn without_autostart(mut self) -> Self {
        self.autostart = false;
        self
    }

    pub fn autostart(&self) -> bool {
        self.autostart
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn phase(&self) -> SubsystemPhase {
        self.phase
    }

    pub fn sub_mode(&self) -> SubMode {
        self.sub_mode
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn manifest(&self) -> &SceneManifest {
        &self.manifest
    }

    pub fn config(&self) -> &SubsystemConfig {
        &self.config
    }

    pub fn registry(&self) -> &SpatialEntityRegistry {
        &self.registry
    }

    pub fn ground(&self) -> Option<&GroundReference> {
        self.ground.as_ref()
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    /// Mutable rig for user camera controls.
    pub fn rig_mut(&mut self) -> &mut CameraRig {
        &mut self.rig
    }

    pub fn motions(&self) -> &CameraMotions {
        &self.motions
    }

    pub fn is_roaming(&self) -> bool {
        self.roam.is_active()
    }

    pub fn normal_bindings(&self) -> &EventSubscriptionSet {
        &self.normal
    }

    pub fn mode_bindings(&self) -> &EventSubscriptionSet {
        &self.mode_bindings
    }

    pub fn distance_tool(&self) -> &MeasureTool {
        &self.distance
    }

    pub fn area_tool(&self) -> &MeasureTool {
        &self.area
    }

    pub fn track(&self) -> &TrackPlayback {
        &self.track
    }

    pub fn box_selection(&self) -> &BoxSelection {
        &self.box_select
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    /// Id of the last building searched by click.
    pub fn search_id(&self) -> Option<&BuildingId> {
        self.search_id.as_ref()
    }

    pub fn pointer_over_building(&self) -> bool {
        self.pointer_over_building
    }

    pub fn is_loading(&self) -> bool {
        self.batch.is_some()
    }

    pub fn take_outputs(&mut self) -> SceneOutputs {
        std::mem::take(&mut self.outputs)
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// `Created -> Initializing`: seed lighting and issue the load batch.
    pub fn start(&mut self) -> bool {
        if self.phase != SubsystemPhase::Created {
            warn!("SceneSubsystem: start ignored in {:?}", self.phase);
            return false;
        }
        info!("SceneSubsystem: initializing");
        self.outputs.lighting = Some(LightingRig::default());
        self.begin_batch();
        true
    }

    /// Load the manifest again without clearing existing registrations.
    pub fn reload(&mut self) -> bool {
        match self.phase {
            SubsystemPhase::Ready | SubsystemPhase::Entered | SubsystemPhase::Left => {}
            phase => {
                warn!("SceneSubsystem: reload ignored in {:?}", phase);
                return false;
            }
        }
        self.resume_entered = self.phase == SubsystemPhase::Entered;
        if self.resume_entered {
            self.deactivate();
        }
        info!("SceneSubsystem: reloading");
        self.loaded = false;
        self.begin_batch();
        true
    }

    fn begin_batch(&mut self) {
        let descriptors = self.manifest.descriptors();
        info!("SceneSubsystem: requesting {} assets", descriptors.len());
        self.phase = SubsystemPhase::Initializing;
        self.outputs.notifications.push(HostNotification::LoadingStarted);
        self.outputs.fetches.extend(descriptors.iter().cloned());

        let mut batch = LoadBatch::new(&descriptors);
        batch.start(self);
        if !batch.is_done() {
            self.batch = Some(batch);
        }
    }

    /// Feed one fetch outcome into the batch in flight.
    pub fn settle_asset(
        &mut self,
        name: &str,
        outcome: Result<LoadedModel, AssetError>,
    ) -> Settled {
        let Some(mut batch) = self.batch.take() else {
            warn!("SceneSubsystem: no load batch in flight for '{}'", name);
            return Settled::Ignored;
        };
        let settled = batch.settle(name, outcome, self);
        if !batch.is_done() {
            self.batch = Some(batch);
        }
        settled
    }

    fn accept_ground(&mut self, name: &str, model: &LoadedModel) {
        let bounds = model.bounds.unwrap_or_else(|| {
            warn!("SceneSubsystem: ground '{}' has no bounds", name);
            Bounds::new(Vec3::ZERO, Vec3::ZERO)
        });
        self.ground = Some(GroundReference {
            asset: name.to_string(),
            bounds,
            altitude: bounds.min.y,
        });
    }

    fn accept_building(&mut self, name: &str, model: &LoadedModel, id: BuildingId) {
        let meshes: Vec<MeshRef> = model
            .mesh_node_names()
            .map(|node| MeshRef::new(name, node))
            .collect();
        let anchor = model.bounds.map(|b| b.top_center()).unwrap_or(Vec3::ZERO);
        let text = self.manifest.display_name(&id);
        self.registry
            .register(id, meshes, Label::name(text, anchor), Label::population(anchor));
    }

    fn emit_instance_batches(&mut self) {
        let scenery = std::mem::take(&mut self.scenery);
        for batch in instancing::batch(&scenery.markers, &self.manifest.instancing) {
            let Some(prototype) = scenery.prototypes.iter().find(|p| p.node == batch.key) else {
                warn!(
                    "SceneSubsystem: no prototype for instance key '{}' ({} markers)",
                    batch.key,
                    batch.transforms.len()
                );
                continue;
            };
            self.outputs.instance_batches.push((batch, prototype.clone()));
        }
    }

    // -------------------------------------------------------------------------
    // Activation
    // -------------------------------------------------------------------------

    /// `Ready/Left -> Entered`. A no-op before loading completes.
    pub fn activate(&mut self) -> Activation {
        match self.phase {
            SubsystemPhase::Destroyed => {
                warn!("SceneSubsystem: activate after destroy");
                return Activation::Destroyed;
            }
            SubsystemPhase::Entered => {
                if self.sub_mode == SubMode::Normal {
                    self.normal.bind(NORMAL_CHANNELS);
                }
                return Activation::AlreadyEntered;
            }
            _ => {}
        }
        if !self.loaded {
            warn!("SceneSubsystem: activate before assets finished loading");
            return Activation::NotLoaded;
        }

        info!("SceneSubsystem: entered");
        self.phase = SubsystemPhase::Entered;
        self.sub_mode = SubMode::Normal;
        let altitude = self.ground.as_ref().map_or(DEFAULT_ALTITUDE, |g| g.altitude);
        self.rig.constraints = Some(CameraConstraints::with_altitude(altitude));
        self.registry.restore_labels();
        self.tooltip.get_or_insert_with(Tooltip::default);
        self.collaborators.enter();
        self.normal.bind(NORMAL_CHANNELS);
        self.run_enter_initialization();
        Activation::Entered
    }

    /// Roam and camera reset shared by re-entry and reload.
    fn run_enter_initialization(&mut self) {
        if self.config.roam_enabled {
            self.roam.start(self.config.roam_period_secs);
        }
        if self.first_activation_done {
            self.reset_camera(Duration::from_millis(RESET_DURATION_MS));
        }
        self.first_activation_done = true;
    }

    /// `Entered -> Left`.
    pub fn deactivate(&mut self) -> Deactivation {
        if self.phase != SubsystemPhase::Entered {
            warn!("SceneSubsystem: deactivate ignored in {:?}", self.phase);
            return Deactivation::NotEntered;
        }
        info!("SceneSubsystem: left");
        self.abandon_sub_mode();
        self.normal.unbind();
        self.mode_bindings.unbind();
        self.roam.stop();
        self.registry.hide_all_labels();
        self.search_id = None;
        self.rig.constraints = None;
        self.rig.controls_enabled = true;
        self.collaborators.leave();
        self.tooltip = None;
        self.pointer_over_building = false;
        self.phase = SubsystemPhase::Left;
        Deactivation::Left
    }

    /// Release everything. Terminal.
    pub fn destroy(&mut self) {
        if self.phase == SubsystemPhase::Destroyed {
            warn!("SceneSubsystem: already destroyed");
            return;
        }
        if self.phase == SubsystemPhase::Entered {
            self.deactivate();
        }
        info!("SceneSubsystem: destroyed");
        self.normal.unbind();
        self.mode_bindings.unbind();
        self.batch = None;
        self.tooltip = None;
        self.collaborators.clear();
        self.registry.clear();
        self.ground = None;
        self.phase = SubsystemPhase::Destroyed;
    }

    // -------------------------------------------------------------------------
    // Frame
    // -------------------------------------------------------------------------

    /// Advance camera motions, roam, collaborators and track playback.
    pub fn tick(&mut self, dt: Duration, elapsed_secs: f32) {
        self.elapsed_secs = elapsed_secs;
        if self.phase == SubsystemPhase::Destroyed {
            return;
        }
        let report = self.motions.advance(dt, &mut self.rig);
        self.outputs.finished_moves.extend(report.completed);

        if self.phase != SubsystemPhase::Entered {
            return;
        }
        if self.motions.is_idle() {
            self.roam.advance(dt, &mut self.rig);
        }
        self.collaborators.update(dt);
        if self.sub_mode == SubMode::Tracking {
            self.advance_track(dt);
        }
    }
}

impl LoadSink for SceneSubsystem {
    fn on_item(&mut self, model: LoadedModel, name: &str) {
        let class = self.manifest.classify(name);
        self.collaborators.asset_loaded(&model, &class);
        match &class {
            AssetClass::Ground => self.accept_ground(name, &model),
            AssetClass::Building { id } => self.accept_building(name, &model, id.clone()),
            AssetClass::Scenery => {
                let content = collect_scenery(&model, &self.manifest.instancing);
                self.scenery.markers.extend(content.markers);
                self.scenery.prototypes.extend(content.prototypes);
            }
            AssetClass::Decoration => {}
        }
        self.outputs.accepted.push(AcceptedAsset {
            name: name.to_string(),
            class,
        });
    }

    fn on_all_done(&mut self) {
        self.loaded = true;
        self.phase = SubsystemPhase::Ready;
        self.emit_instance_batches();
        info!(
            "SceneSubsystem: ready ({} buildings, ground {})",
            self.registry.len(),
            if self.ground.is_some() { "loaded" } else { "missing" }
        );

        if !self.arrived {
            self.arrived = true;
            self.outputs.notifications.push(HostNotification::LoadingFinished);
            self.outputs
                .notifications
                .push(HostNotification::ChangeIndoor(HOME_SCENE.to_string()));
            self.reset_camera(Duration::from_millis(ARRIVAL_DURATION_MS));
        } else if std::mem::take(&mut self.resume_entered) {
            self.activate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_motion::{Completion, MotionChannel};
    use crate::registry::PopulationUpdate;
    use crate::subscriptions::InputChannel;

    fn manifest() -> SceneManifest {
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

    fn ground_model() -> LoadedModel {
        LoadedModel::new("地面").with_bounds(Bounds::new(
            Vec3::new(-400.0, -2.0, -300.0),
            Vec3::new(400.0, 0.0, 300.0),
        ))
    }

    fn building_model() -> LoadedModel {
        LoadedModel::new("A1_Building")
            .with_nodes(vec![
                crate::model::ModelNode::new("A1_root", None, Transform::IDENTITY),
                crate::model::ModelNode::new("A1_wall", Some(0), Transform::IDENTITY).with_mesh(),
                crate::model::ModelNode::new("A1_roof", Some(0), Transform::IDENTITY).with_mesh(),
            ])
            .with_bounds(Bounds::new(Vec3::new(10.0, 0.0, 10.0), Vec3::new(20.0, 30.0, 20.0)))
    }

    fn loaded() -> SceneSubsystem {
        let mut s = SceneSubsystem::new(Ok(manifest()));
        s.start();
        s.settle_asset("地面", Ok(ground_model()));
        s.settle_asset("A1_Building", Ok(building_model()));
        s.settle_asset(
            "corrupt",
            Err(AssetError::Malformed {
                name: "corrupt".into(),
                reason: "truncated".into(),
            }),
        );
        s
    }

    fn finish_motions(s: &mut SceneSubsystem) {
        for _ in 0..200 {
            s.tick(Duration::from_millis(16), 0.0);
        }
    }

    #[test]
    fn test_start_requests_every_descriptor() {
        let mut s = SceneSubsystem::new(Ok(manifest()));
        assert_eq!(s.phase(), SubsystemPhase::Created);
        assert!(s.start());
        assert!(!s.start());
        assert_eq!(s.phase(), SubsystemPhase::Initializing);
        let out = s.take_outputs();
        assert_eq!(out.fetches.len(), 3);
        assert!(out.lighting.is_some());
        assert_eq!(out.notifications, vec![HostNotification::LoadingStarted]);
    }

    #[test]
    fn test_partial_failure_batch_reaches_ready() {
        let mut s = loaded();
        assert_eq!(s.phase(), SubsystemPhase::Ready);
        assert!(s.is_loaded());
        assert_eq!(s.registry().len(), 1);
        assert!(s.ground().is_some());
        let entity = s.registry().lookup(&BuildingId::new("A1_Building")).unwrap();
        assert_eq!(entity.meshes.len(), 2);
        assert_eq!(entity.name_label.text, "Library");
        assert_eq!(entity.name_label.anchor, Vec3::new(15.0, 30.0, 15.0));

        let out = s.take_outputs();
        let finished = out
            .notifications
            .iter()
            .filter(|n| **n == HostNotification::LoadingFinished)
            .count();
        assert_eq!(finished, 1);
        assert!(out
            .notifications
            .contains(&HostNotification::ChangeIndoor("home".into())));
        assert_eq!(out.accepted.len(), 2);
    }

    #[test]
    fn test_arrival_motion_scheduled_on_first_ready() {
        let s = loaded();
        assert!(s.motions().is_driving(MotionChannel::Position));
    }

    #[test]
    fn test_transport_failure_completes_with_nothing() {
        let err = ManifestError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let mut s = SceneSubsystem::new(Err(err));
        s.start();
        assert_eq!(s.phase(), SubsystemPhase::Ready);
        assert!(s.registry().is_empty());
        assert!(s.ground().is_none());
        // No ground: the arrival reset resolved without a motion.
        assert!(s.motions().is_idle());
    }

    #[test]
    fn test_activate_before_loaded_is_noop() {
        let mut s = SceneSubsystem::new(Ok(manifest()));
        s.start();
        assert_eq!(s.activate(), Activation::NotLoaded);
        assert_eq!(s.phase(), SubsystemPhase::Initializing);
        assert!(s.normal_bindings().is_empty());
    }

    #[test]
    fn test_activate_twice_binds_once() {
        let mut s = loaded();
        assert_eq!(s.activate(), Activation::Entered);
        assert_eq!(s.activate(), Activation::AlreadyEntered);
        assert_eq!(s.normal_bindings().len(), NORMAL_CHANNELS.len());
        assert!(s.normal_bindings().is_bound(InputChannel::GroundDoubleClick));
    }

    #[test]
    fn test_first_activation_skips_reset_reentry_resets() {
        let mut s = loaded();
        finish_motions(&mut s);
        assert!(s.motions().is_idle());

        s.activate();
        assert!(s.motions().is_idle());
        s.rig_mut().position = Vec3::new(900.0, 900.0, 900.0);
        s.deactivate();
        s.activate();
        assert!(s.motions().is_driving(MotionChannel::Position));
    }

    #[test]
    fn test_deactivate_releases_everything() {
        let mut s = loaded();
        s.activate();
        s.update_population(&[PopulationUpdate::new("A1_Building", 4)]);
        assert!(s.tooltip().is_some());

        assert_eq!(s.deactivate(), Deactivation::Left);
        assert!(s.normal_bindings().is_empty());
        assert!(s.mode_bindings().is_empty());
        assert!(s.tooltip().is_none());
        assert!(s.registry().labels_suppressed());
        assert!(s.rig().constraints.is_none());
        assert_eq!(s.deactivate(), Deactivation::NotEntered);
    }

    #[test]
    fn test_altitude_defaults_without_ground() {
        let manifest = SceneManifest::default().with_asset(
            "A1_Building.glb",
            AssetClass::Building {
                id: BuildingId::new("A1_Building"),
            },
        );
        let mut s = SceneSubsystem::new(Ok(manifest));
        s.start();
        s.settle_asset("A1_Building", Ok(building_model()));
        assert_eq!(s.activate(), Activation::Entered);
        let constraints = s.rig().constraints.as_ref().unwrap();
        assert_eq!(constraints.altitude, -20.0);
    }

    #[test]
    fn test_reentry_shows_name_labels() {
        let mut s = loaded();
        s.activate();
        s.deactivate();
        let id = BuildingId::new("A1_Building");
        assert!(!s.registry().lookup(&id).unwrap().name_label.visible);

        s.activate();
        assert!(s.registry().lookup(&id).unwrap().name_label.visible);
        assert!(!s.registry().labels_suppressed());
    }

    #[test]
    fn test_reset_without_ground_resolves_immediately() {
        let mut s = SceneSubsystem::new(Ok(SceneManifest::default()));
        let completion = s.reset_camera(Duration::from_millis(1000));
        assert_eq!(completion, Completion::Resolved);
        assert!(s.motions().is_idle());
    }

    #[test]
    fn test_destroy_is_terminal() {
        let mut s = loaded();
        s.activate();
        s.destroy();
        assert_eq!(s.phase(), SubsystemPhase::Destroyed);
        assert!(s.registry().is_empty());
        assert!(s.normal_bindings().is_empty());
        assert_eq!(s.activate(), Activation::Destroyed);
        assert!(!s.reload());
    }

    #[test]
    fn test_reload_resumes_entered_without_arrival() {
        let mut s = loaded();
        s.activate();
        finish_motions(&mut s);
        s.take_outputs();

        assert!(s.reload());
        assert_eq!(s.phase(), SubsystemPhase::Initializing);
        assert_eq!(s.activate(), Activation::NotLoaded);

        s.settle_asset("地面", Ok(ground_model()));
        s.settle_asset("A1_Building", Ok(building_model()));
        s.settle_asset("corrupt", Err(AssetError::Missing { name: "corrupt".into() }));

        assert_eq!(s.phase(), SubsystemPhase::Entered);
        assert_eq!(s.registry().len(), 1);
        let out = s.take_outputs();
        assert!(!out.notifications.contains(&HostNotification::LoadingFinished));
        assert_eq!(s.normal_bindings().len(), NORMAL_CHANNELS.len());
    }

    #[test]
    fn test_late_result_after_batch_is_ignored() {
        let mut s = loaded();
        assert_eq!(
            s.settle_asset("A1_Building", Ok(building_model())),
            Settled::Ignored
        );
    }
}
