//! Pointer picking: turns raw mouse state into [`SceneInput`] events.
//!
//! Each frame the cursor ray is cast against the tagged meshes with Bevy's
//! [`MeshRayCast`] and against the ground plane at the scene's altitude. The nearest hit plus
//! button edges become scene inputs; the core decides which of them any
//! bound channel actually consumes.

use std::time::Duration;

use bevy::picking::mesh_picking::ray_cast::{MeshRayCast, RayCastSettings, RayCastVisibility};
use bevy::prelude::*;
use bevy::window::CursorMoved;
use bevy_egui::EguiContexts;

use scene::controller::{SceneSubsystem, SubMode};
use scene::input::SceneInput;
use scene::registry::MeshRef;

use crate::camera::{LeftClickDrag, SceneCamera};
use crate::egui_input_guard::egui_wants_pointer;
use crate::scene_spawn::PickMesh;

// =============================================================================
// Constants
// =============================================================================

/// Two releases within this window count as a double-click.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

/// Maximum cursor travel (pixels) between the two clicks of a double-click.
pub const DOUBLE_CLICK_SLOP: f32 = 6.0;

// =============================================================================
// Geometry
// =============================================================================

/// Nearest visible tagged mesh along the ray: its node, hit point and
/// distance. Untagged meshes (gizmos, outlines, sky) are skipped.
pub fn nearest_pick(
    ray_cast: &mut MeshRayCast,
    ray: Ray3d,
    pickables: &Query<&PickMesh>,
    visibility: RayCastVisibility,
) -> Option<(MeshRef, Vec3, f32)> {
    let filter = |entity: Entity| pickables.contains(entity);
    let settings = RayCastSettings::default()
        .with_filter(&filter)
        .with_visibility(visibility);
    let (entity, hit) = ray_cast.cast_ray(ray, &settings).first()?;
    let pick = pickables.get(*entity).ok()?;
    Some((pick.0.clone(), hit.point, hit.distance))
}

/// Where the ray meets the horizontal plane `y = altitude`.
pub fn ray_ground(origin: Vec3, dir: Vec3, altitude: f32) -> Option<Vec3> {
    if dir.y.abs() <= 0.001 {
        return None;
    }
    let t = (altitude - origin.y) / dir.y;
    (t > 0.0).then(|| origin + dir * t)
}

// =============================================================================
// Click timing
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct ClickTracker {
    last: Option<(Duration, Vec2)>,
}

impl ClickTracker {
    /// Record a click; `true` if it completes a double-click. A completed
    /// double-click starts a fresh sequence.
    pub fn register(&mut self, now: Duration, pos: Vec2) -> bool {
        if let Some((at, was)) = self.last.take() {
            if now.saturating_sub(at) <= DOUBLE_CLICK_WINDOW && was.distance(pos) <= DOUBLE_CLICK_SLOP
            {
                return true;
            }
        }
        self.last = Some((now, pos));
        false
    }
}

// =============================================================================
// Resources
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MeshHit {
    pub mesh: MeshRef,
    pub point: Vec3,
    pub distance: f32,
    /// The mesh belongs to the ground asset.
    pub on_ground: bool,
}

/// What the cursor is over this frame.
#[derive(Resource, Debug, Default)]
pub struct PointerHits {
    pub cursor: Option<Vec2>,
    pub mesh: Option<MeshHit>,
    pub ground: Option<Vec3>,
}

impl PointerHits {
    /// Nearest surface point: a mesh if one is hit, else the ground plane.
    pub fn surface_point(&self) -> Option<Vec3> {
        self.mesh.as_ref().map(|h| h.point).or(self.ground)
    }
}

#[derive(Default)]
pub struct ClickState {
    left: ClickTracker,
    right: ClickTracker,
    box_dragging: bool,
}

// =============================================================================
// Systems
// =============================================================================

pub fn update_pointer_hits(
    windows: Query<&Window>,
    camera_q: Query<(&Camera, &GlobalTransform), With<SceneCamera>>,
    pickables: Query<&PickMesh>,
    mut ray_cast: MeshRayCast,
    subsystem: Res<SceneSubsystem>,
    mut hits: ResMut<PointerHits>,
) {
    *hits = PointerHits::default();
    let Ok(window) = windows.get_single() else {
        return;
    };
    let Ok((camera, cam_transform)) = camera_q.get_single() else {
        return;
    };
    let Some(screen_pos) = window.cursor_position() else {
        return;
    };
    hits.cursor = Some(screen_pos);
    let Ok(ray) = camera.viewport_to_world(cam_transform, screen_pos) else {
        return;
    };

    let altitude = subsystem.ground().map_or(0.0, |g| g.altitude);
    hits.ground = ray_ground(ray.origin, *ray.direction, altitude);

    let ground_asset = subsystem.ground().map(|g| g.asset.as_str());
    hits.mesh = nearest_pick(&mut ray_cast, ray, &pickables, RayCastVisibility::VisibleInView)
        .map(|(mesh, point, distance)| MeshHit {
            on_ground: ground_asset == Some(mesh.asset.as_str()),
            mesh,
            point,
            distance,
        });
}

#[allow(clippy::too_many_arguments)]
pub fn emit_scene_inputs(
    buttons: Res<ButtonInput<MouseButton>>,
    mut moved: EventReader<CursorMoved>,
    time: Res<Time<Real>>,
    hits: Res<PointerHits>,
    left_drag: Res<LeftClickDrag>,
    subsystem: Res<SceneSubsystem>,
    mut contexts: EguiContexts,
    mut state: Local<ClickState>,
    mut inputs: EventWriter<SceneInput>,
) {
    let cursor_moved = moved.read().count() > 0;
    if egui_wants_pointer(&mut contexts) {
        return;
    }
    let Some(cursor) = hits.cursor else {
        return;
    };
    let now = time.elapsed();

    if cursor_moved {
        inputs.send(SceneInput::PointerMoved(
            hits.mesh.as_ref().map(|h| h.mesh.clone()),
        ));
        inputs.send(SceneInput::MeasurePreview(hits.surface_point()));
    }

    if subsystem.sub_mode() == SubMode::BoxSelect {
        emit_box_drag(&buttons, &hits, cursor_moved, &mut state, &mut inputs);
        return;
    }
    state.box_dragging = false;

    if buttons.just_released(MouseButton::Left) && !left_drag.is_dragging {
        let double = state.left.register(now, cursor);
        if let Some(point) = hits.surface_point() {
            inputs.send(SceneInput::MeasurePick(point));
        }
        match &hits.mesh {
            Some(hit) if !hit.on_ground => {
                inputs.send(SceneInput::BuildingClick(hit.mesh.clone()));
                if double {
                    inputs.send(SceneInput::BuildingDoubleClick(hit.mesh.clone()));
                }
            }
            Some(hit) if double => {
                inputs.send(SceneInput::GroundDoubleClick(hit.point));
            }
            None if double => {
                if let Some(point) = hits.ground {
                    inputs.send(SceneInput::GroundDoubleClick(point));
                }
            }
            _ => {}
        }
    }

    if buttons.just_released(MouseButton::Right) && state.right.register(now, cursor) {
        inputs.send(SceneInput::ResetGesture);
    }
}

fn emit_box_drag(
    buttons: &ButtonInput<MouseButton>,
    hits: &PointerHits,
    cursor_moved: bool,
    state: &mut ClickState,
    inputs: &mut EventWriter<SceneInput>,
) {
    let ground_xz = hits.ground.map(|p| Vec2::new(p.x, p.z));

    if buttons.just_pressed(MouseButton::Left) {
        if let Some(at) = ground_xz {
            state.box_dragging = true;
            inputs.send(SceneInput::BoxDragStart(at));
        }
        return;
    }

    if !state.box_dragging {
        return;
    }

    if buttons.just_released(MouseButton::Left) {
        state.box_dragging = false;
        inputs.send(SceneInput::BoxDragEnd);
    } else if cursor_moved {
        if let Some(at) = ground_xz {
            inputs.send(SceneInput::BoxDragMove(at));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bevy::ecs::system::RunSystemOnce;
    use bevy::render::mesh::MeshAabb;
    use bevy::render::primitives::Aabb;

    fn spawn_cube(world: &mut World, mesh: &Handle<Mesh>, aabb: Aabb, z: f32) -> Entity {
        let transform = Transform::from_xyz(0.0, 0.0, z);
        world
            .spawn((
                Mesh3d(mesh.clone()),
                transform,
                GlobalTransform::from(transform),
                aabb,
            ))
            .id()
    }

    fn cast_down_z(world: &mut World) -> Option<(MeshRef, Vec3, f32)> {
        let ray = Ray3d::new(Vec3::new(0.0, 0.0, 20.0), Dir3::NEG_Z);
        world
            .run_system_once(
                move |mut ray_cast: MeshRayCast, pickables: Query<&PickMesh>| {
                    nearest_pick(&mut ray_cast, ray, &pickables, RayCastVisibility::Any)
                },
            )
            .unwrap()
    }

    #[test]
    fn test_nearest_pick_skips_untagged_meshes() {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        let cube = Mesh::from(Cuboid::new(2.0, 2.0, 2.0));
        let aabb = cube.compute_aabb().unwrap();
        let handle = world.resource_mut::<Assets<Mesh>>().add(cube);

        // An untagged cube in front, tagged ones behind it.
        spawn_cube(&mut world, &handle, aabb, 5.0);
        let near = spawn_cube(&mut world, &handle, aabb, 0.0);
        let far = spawn_cube(&mut world, &handle, aabb, -10.0);
        world
            .entity_mut(near)
            .insert(PickMesh(MeshRef::new("zuobiao", "A1_North")));
        world
            .entity_mut(far)
            .insert(PickMesh(MeshRef::new("zuobiao", "B2")));

        let (mesh, point, distance) = cast_down_z(&mut world).unwrap();
        assert_eq!(mesh.node, "A1_North");
        assert!((point.z - 1.0).abs() < 1e-4);
        assert!((distance - 19.0).abs() < 1e-4);
    }

    #[test]
    fn test_nearest_pick_misses_without_tagged_meshes() {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        let cube = Mesh::from(Cuboid::new(2.0, 2.0, 2.0));
        let aabb = cube.compute_aabb().unwrap();
        let handle = world.resource_mut::<Assets<Mesh>>().add(cube);
        spawn_cube(&mut world, &handle, aabb, 0.0);

        assert_eq!(cast_down_z(&mut world), None);
    }

    #[test]
    fn test_ray_ground_at_altitude() {
        let hit = ray_ground(Vec3::new(0.0, 100.0, 0.0), Vec3::new(0.0, -1.0, 1.0), 20.0);
        assert_eq!(hit, Some(Vec3::new(0.0, 20.0, 80.0)));
    }

    #[test]
    fn test_ray_ground_parallel_misses() {
        assert_eq!(ray_ground(Vec3::Y, Vec3::X, 0.0), None);
    }

    #[test]
    fn test_double_click_within_window() {
        let mut clicks = ClickTracker::default();
        assert!(!clicks.register(Duration::from_millis(1000), Vec2::ZERO));
        assert!(clicks.register(Duration::from_millis(1200), Vec2::new(2.0, 2.0)));
        // The pair is consumed: a third click starts over.
        assert!(!clicks.register(Duration::from_millis(1300), Vec2::ZERO));
    }

    #[test]
    fn test_slow_or_distant_clicks_are_single() {
        let mut clicks = ClickTracker::default();
        clicks.register(Duration::from_millis(0), Vec2::ZERO);
        assert!(!clicks.register(Duration::from_millis(500), Vec2::ZERO));
        assert!(!clicks.register(Duration::from_millis(600), Vec2::new(40.0, 0.0)));
    }
}
