//! Registry commands, search, pointer input and sub-modes through the plugin.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::camera_motion::MotionChannel;
use crate::commands::SubsystemCommand;
use crate::config::BOARD_FILTER;
use crate::controller::SubMode;
use crate::input::SceneInput;
use crate::manifest::{AssetClass, SceneManifest};
use crate::notifications::{HostNotification, SubsystemSwitchRequest};
use crate::registry::{BuildingId, MeshRef, PopulationUpdate};
use crate::subscriptions::{InputChannel, MEASURE_CHANNELS};
use crate::test_harness::{building_model, ground_model, TestScene};
use crate::track::{TrackCommand, TrackPoint};

/// Ground plus A1 and B2, entered with the arrival motion finished.
fn entered_scene() -> TestScene {
    let manifest = SceneManifest::default()
        .with_asset("ground.glb", AssetClass::Ground)
        .with_asset(
            "A1.glb",
            AssetClass::Building {
                id: BuildingId::new("A1"),
            },
        )
        .with_asset(
            "B2.glb",
            AssetClass::Building {
                id: BuildingId::new("B2"),
            },
        )
        .with_display_name("B2", "Gymnasium");
    let mut scene = TestScene::new(manifest);
    scene
        .report_loaded("ground", ground_model("ground"))
        .report_loaded("A1", building_model("A1", Vec3::new(-100.0, 0.0, 0.0)))
        .report_loaded("B2", building_model("B2", Vec3::new(100.0, 0.0, 0.0)));
    scene.settle_camera();
    scene.command(SubsystemCommand::Activate);
    scene.clear_recorded();
    scene
}

fn population(id: &str, number: u32) -> SubsystemCommand {
    SubsystemCommand::UpdatePopulation(vec![PopulationUpdate::new(id, number)])
}

fn badge_visible(scene: &TestScene, id: &str) -> bool {
    scene
        .registry()
        .lookup(&BuildingId::new(id))
        .map(|e| e.population_label.visible)
        .unwrap_or(false)
}

// ====================================================================
// Registry commands
// ====================================================================

#[test]
fn test_population_and_filter_drive_badge() {
    let mut scene = entered_scene();
    scene
        .command(population("A1", 5))
        .command(SubsystemCommand::SetFilter(vec![BOARD_FILTER.into()]));
    assert!(badge_visible(&scene, "A1"));
    assert_eq!(
        scene
            .registry()
            .lookup(&BuildingId::new("A1"))
            .unwrap()
            .population_label
            .text,
        "5"
    );

    scene.command(population("A1", 0));
    assert!(!badge_visible(&scene, "A1"));

    scene
        .command(population("A1", 3))
        .command(SubsystemCommand::SetFilter(vec![]));
    assert!(!badge_visible(&scene, "A1"));
    scene.assert_badge_invariant();
}

#[test]
fn test_unknown_population_id_is_ignored() {
    let mut scene = entered_scene();
    scene.command(SubsystemCommand::UpdatePopulation(vec![
        PopulationUpdate::new("unknown", 5),
        PopulationUpdate::new("B2", 7),
    ]));
    scene.assert_registered(2);
    assert_eq!(
        scene
            .registry()
            .lookup(&BuildingId::new("B2"))
            .unwrap()
            .population,
        7
    );
}

#[test]
fn test_badge_invariant_over_random_command_sequences() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut scene = entered_scene();
    for _ in 0..60 {
        let command = match rng.gen_range(0..3) {
            0 => population(["A1", "B2", "ghost"][rng.gen_range(0..3)], rng.gen_range(0..4)),
            1 => SubsystemCommand::SetFilter(vec![BOARD_FILTER.into()]),
            _ => SubsystemCommand::SetFilter(vec!["other".into()]),
        };
        scene.command(command);
        scene.assert_badge_invariant();
    }
}

#[test]
fn test_label_commands() {
    let mut scene = entered_scene();
    scene.command(SubsystemCommand::ShowLabel {
        id: BuildingId::new("B2"),
    });
    let visible: Vec<_> = scene
        .registry()
        .iter()
        .filter(|e| e.name_label.visible)
        .map(|e| e.id.as_str().to_string())
        .collect();
    assert_eq!(visible, vec!["B2"]);

    scene.command(SubsystemCommand::HideAllLabels);
    assert!(scene.registry().iter().all(|e| !e.name_label.visible));
    assert!(scene.registry().labels_suppressed());

    scene.command(SubsystemCommand::ShowAllLabels);
    assert!(scene.registry().iter().all(|e| e.name_label.visible));
    assert!(!scene.registry().labels_suppressed());
}

// ====================================================================
// Search and camera
// ====================================================================

#[test]
fn test_search_highlights_and_frames() {
    let mut scene = entered_scene();
    scene.command(SubsystemCommand::Search {
        id: BuildingId::new("B2"),
    });
    scene.assert_notified_once(&HostNotification::DetailRequested {
        id: BuildingId::new("B2"),
    });
    assert_eq!(scene.registry().highlighted(), Some(&BuildingId::new("B2")));

    scene.settle_camera();
    // Label anchor is the top center (110, 30, 10), plus the search offset.
    assert_eq!(scene.rig().target, Vec3::new(112.0, 32.0, 10.0));
    assert_eq!(scene.rig().look_at, scene.rig().target);
}

#[test]
fn test_reset_camera_within_tolerance_fires_no_hooks() {
    let mut scene = entered_scene();
    scene.command(SubsystemCommand::ResetCamera { duration_ms: 1000 });
    assert!(scene.subsystem().motions().is_idle());
    assert!(scene.recorded().finished_moves.is_empty());
    assert!(scene.rig().controls_enabled);
}

#[test]
fn test_reset_camera_without_ground_schedules_nothing() {
    let manifest = SceneManifest::default().with_asset(
        "A1.glb",
        AssetClass::Building {
            id: BuildingId::new("A1"),
        },
    );
    let mut scene = TestScene::new(manifest);
    scene.report_loaded("A1", building_model("A1", Vec3::ZERO));
    scene.command(SubsystemCommand::ResetCamera { duration_ms: 1000 });
    assert!(scene.subsystem().motions().is_idle());
    assert!(scene.rig().controls_enabled);
}

#[test]
fn test_overlapping_resets_resolve_superseded_motion() {
    let mut scene = entered_scene();
    scene.subsystem_mut().rig_mut().position = Vec3::new(900.0, 400.0, 0.0);
    scene
        .command(SubsystemCommand::ResetCamera { duration_ms: 1000 })
        .command(SubsystemCommand::ResetCamera { duration_ms: 1000 });
    // The first pair completed on supersede.
    assert_eq!(scene.recorded().finished_moves.len(), 2);
    assert!(scene.subsystem().motions().is_driving(MotionChannel::Position));
    scene.settle_camera();
    assert_eq!(scene.recorded().finished_moves.len(), 4);
    assert!(scene.rig().controls_enabled);
}

// ====================================================================
// Pointer input
// ====================================================================

#[test]
fn test_building_double_click_requests_indoor() {
    let mut scene = entered_scene();
    scene.input(SceneInput::BuildingDoubleClick(MeshRef::new("A1", "A1_roof")));
    assert_eq!(
        scene.recorded().switches,
        vec![SubsystemSwitchRequest {
            target: "indoorSubsystem".into(),
            key: "A1".into(),
        }]
    );
    scene.assert_notified_once(&HostNotification::EntityDoubleActivated(BuildingId::new(
        "A1",
    )));
}

#[test]
fn test_building_click_searches_owner() {
    let mut scene = entered_scene();
    scene.input(SceneInput::BuildingClick(MeshRef::new("B2", "B2_wall")));
    assert_eq!(scene.subsystem().search_id(), Some(&BuildingId::new("B2")));
    scene.assert_notified_once(&HostNotification::DetailRequested {
        id: BuildingId::new("B2"),
    });
    scene.assert_normal_bound();
}

#[test]
fn test_unowned_mesh_click_is_ignored() {
    let mut scene = entered_scene();
    scene.input(SceneInput::BuildingClick(MeshRef::new("ground", "plane")));
    assert!(scene.notifications().is_empty());
    assert!(scene.subsystem().search_id().is_none());
}

#[test]
fn test_inputs_after_leave_land_nowhere() {
    let mut scene = entered_scene();
    scene.command(SubsystemCommand::Deactivate);
    scene.clear_recorded();
    scene
        .input(SceneInput::BadgeClick(BuildingId::new("A1")))
        .input(SceneInput::BuildingDoubleClick(MeshRef::new("A1", "A1_roof")))
        .input(SceneInput::GroundDoubleClick(Vec3::ZERO));
    assert!(scene.notifications().is_empty());
    assert!(scene.recorded().switches.is_empty());
    assert!(scene.subsystem().motions().is_idle());
}

// ====================================================================
// Sub-modes
// ====================================================================

#[test]
fn test_measuring_distance_stop_rebinds_normal_and_resets() {
    let mut scene = entered_scene();
    scene.command(SubsystemCommand::StartMeasuringDistance);
    assert_eq!(scene.subsystem().sub_mode(), SubMode::MeasuringDistance);
    assert!(scene.subsystem().normal_bindings().is_empty());
    assert_eq!(
        scene.subsystem().mode_bindings().channels(),
        &MEASURE_CHANNELS
    );

    scene
        .input(SceneInput::MeasurePick(Vec3::ZERO))
        .input(SceneInput::MeasurePick(Vec3::new(6.0, 0.0, 8.0)));
    assert_eq!(scene.subsystem().distance_tool().length(), 10.0);

    // Move away so the reset has somewhere to go.
    scene.subsystem_mut().rig_mut().position = Vec3::new(0.0, 900.0, 0.0);
    scene.command(SubsystemCommand::StopMeasuringDistance);
    assert_eq!(scene.subsystem().sub_mode(), SubMode::Normal);
    scene.assert_normal_bound();
    assert!(scene.subsystem().motions().is_driving(MotionChannel::Position));
}

#[test]
fn test_measuring_area_reports_footprint() {
    let mut scene = entered_scene();
    scene.command(SubsystemCommand::StartMeasuringArea);
    for p in [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(10.0, 0.0, 5.0),
        Vec3::new(0.0, 0.0, 5.0),
    ] {
        scene.input(SceneInput::MeasurePick(p));
    }
    let tool = scene.subsystem().area_tool();
    assert_eq!(tool.area(), 50.0);
    assert_eq!(tool.perimeter(), 30.0);
    assert!(scene
        .subsystem()
        .mode_bindings()
        .is_bound(InputChannel::MeasurePreview));
}

#[test]
fn test_box_select_picks_buildings_inside() {
    let mut scene = entered_scene();
    scene
        .command(SubsystemCommand::StartBoxSelect)
        .input(SceneInput::BoxDragStart(Vec2::new(50.0, -50.0)))
        .input(SceneInput::BoxDragMove(Vec2::new(150.0, 50.0)))
        .input(SceneInput::BoxDragEnd);
    assert_eq!(
        scene.subsystem().box_selection().selected,
        vec![BuildingId::new("B2")]
    );

    scene.command(SubsystemCommand::StopBoxSelect);
    scene.assert_normal_bound();
}

#[test]
fn test_track_playback_reports_to_host() {
    let mut scene = entered_scene();
    let path = vec![
        TrackPoint { position: Vec3::ZERO, time: 0.0 },
        TrackPoint { position: Vec3::new(10.0, 0.0, 0.0), time: 0.1 },
        TrackPoint { position: Vec3::new(10.0, 0.0, 10.0), time: 0.2 },
    ];
    scene
        .command(SubsystemCommand::Track(TrackCommand::Init { path }))
        .command(SubsystemCommand::Track(TrackCommand::Play));
    assert_eq!(scene.subsystem().sub_mode(), SubMode::Tracking);
    scene.tick(30);

    scene.assert_notified_once(&HostNotification::TrackIndexChanged(1));
    scene.assert_notified_once(&HostNotification::TrackIndexChanged(2));
    scene.assert_notified_once(&HostNotification::TrackDone);

    scene.command(SubsystemCommand::Track(TrackCommand::Clear));
    assert_eq!(scene.subsystem().sub_mode(), SubMode::Normal);
    scene.assert_normal_bound();
}
