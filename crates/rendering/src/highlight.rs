//! Gizmo overlays: outlines for the highlighted building and hovered group,
//! measuring polylines, the box selection rectangle and the history track.

use bevy::math::Isometry3d;
use bevy::prelude::*;
use bevy::render::primitives::Aabb;

use scene::controller::{SceneSubsystem, SubsystemPhase};
use scene::measure::MeasureKind;

use crate::scene_spawn::PickMesh;

// =============================================================================
// Constants
// =============================================================================

/// Outline color for emphasized building meshes.
const HIGHLIGHT_COLOR: Color = Color::srgba(0.2, 0.7, 1.0, 0.9);

/// Outline boxes are grown slightly so they sit outside the mesh faces.
const OUTLINE_GROWTH: f32 = 1.05;

const MEASURE_COLOR: Color = Color::srgb(1.0, 0.86, 0.2);
const MEASURE_POINT_RADIUS: f32 = 0.6;

/// Color for the box selection rectangle outline.
const BOX_OUTLINE_COLOR: Color = Color::srgba(0.2, 0.8, 1.0, 0.9);

/// Color for the box selection fill (drawn as lines on ground).
const BOX_FILL_COLOR: Color = Color::srgba(0.2, 0.7, 1.0, 0.25);

/// Spacing of the box selection hatching, in world units.
const BOX_HATCH_STEP: f32 = 10.0;

/// Lift above the ground so overlays do not z-fight with it.
const GROUND_LIFT: f32 = 0.5;

const TRACK_COLOR: Color = Color::srgb(1.0, 0.35, 0.3);
const TRACK_HEAD_RADIUS: f32 = 1.5;

// =============================================================================
// Systems
// =============================================================================

/// Outline every mesh of the highlighted building and the hovered group.
pub fn draw_emphasis_outlines(
    subsystem: Res<SceneSubsystem>,
    meshes: Query<(&PickMesh, &Aabb, &GlobalTransform)>,
    mut gizmos: Gizmos,
) {
    if subsystem.phase() != SubsystemPhase::Entered {
        return;
    }
    let emphasized = subsystem.registry().emphasized_meshes();
    if emphasized.is_empty() {
        return;
    }

    for (pick, aabb, transform) in &meshes {
        if !emphasized.contains(&pick.0) {
            continue;
        }
        let local = Transform::from_translation(Vec3::from(aabb.center))
            .with_scale(Vec3::from(aabb.half_extents) * 2.0 * OUTLINE_GROWTH);
        gizmos.cuboid(transform.mul_transform(local), HIGHLIGHT_COLOR);
    }
}

/// Polyline (distance) or closed polygon (area) through the picked points.
pub fn draw_measurement(subsystem: Res<SceneSubsystem>, mut gizmos: Gizmos) {
    let Some(tool) = subsystem.active_measurement() else {
        return;
    };
    let mut outline: Vec<Vec3> = tool
        .outline()
        .into_iter()
        .map(|p| p + Vec3::Y * GROUND_LIFT)
        .collect();
    for &p in &outline {
        gizmos.sphere(Isometry3d::from_translation(p), MEASURE_POINT_RADIUS, MEASURE_COLOR);
    }
    if tool.kind() == MeasureKind::Area && outline.len() >= 3 {
        outline.push(outline[0]);
    }
    gizmos.linestrip(outline, MEASURE_COLOR);
}

/// Draw the translucent selection rectangle on the ground plane.
pub fn draw_box_selection_gizmo(subsystem: Res<SceneSubsystem>, mut gizmos: Gizmos) {
    let selection = subsystem.box_selection();
    if !selection.dragging {
        return;
    }

    let (min, max) = selection.bounds();
    let size = max - min;

    // Skip drawing if too small
    if size.x < 1.0 && size.y < 1.0 {
        return;
    }

    let y = subsystem.ground().map_or(0.0, |g| g.altitude) + GROUND_LIFT;

    let c0 = Vec3::new(min.x, y, min.y);
    let c1 = Vec3::new(max.x, y, min.y);
    let c2 = Vec3::new(max.x, y, max.y);
    let c3 = Vec3::new(min.x, y, max.y);

    gizmos.line(c0, c1, BOX_OUTLINE_COLOR);
    gizmos.line(c1, c2, BOX_OUTLINE_COLOR);
    gizmos.line(c2, c3, BOX_OUTLINE_COLOR);
    gizmos.line(c3, c0, BOX_OUTLINE_COLOR);

    let mut z = min.y;
    while z <= max.y {
        gizmos.line(Vec3::new(min.x, y, z), Vec3::new(max.x, y, z), BOX_FILL_COLOR);
        z += BOX_HATCH_STEP;
    }

    let mut x = min.x;
    while x <= max.x {
        gizmos.line(Vec3::new(x, y, min.y), Vec3::new(x, y, max.y), BOX_FILL_COLOR);
        x += BOX_HATCH_STEP;
    }
}

/// The loaded history track and a marker at the playback position.
pub fn draw_track(subsystem: Res<SceneSubsystem>, mut gizmos: Gizmos) {
    let track = subsystem.track();
    if !track.has_path() {
        return;
    }
    let lift = Vec3::Y * GROUND_LIFT;
    gizmos.linestrip(track.path().iter().map(|p| p.position + lift), TRACK_COLOR);
    if let Some(head) = track.position() {
        gizmos.sphere(
            Isometry3d::from_translation(head + lift),
            TRACK_HEAD_RADIUS,
            TRACK_COLOR,
        );
    }
}
