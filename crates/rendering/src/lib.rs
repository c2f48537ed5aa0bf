use bevy::prelude::*;
use bevy_egui::EguiPlugin;

use scene::controller::SubsystemPhase;
use scene::{LightingRequest, SceneSet};

pub mod camera;
pub mod egui_input_guard;
pub mod highlight;
pub mod instances;
pub mod labels;
pub mod model_loader;
pub mod picking;
pub mod scene_spawn;

use camera::{CameraDrag, CameraOrbitDrag, LeftClickDrag};
use model_loader::ModelLibrary;
use picking::PointerHits;

/// Ambient brightness per unit of scene ambient intensity.
const AMBIENT_BRIGHTNESS_SCALE: f32 = 240.0;
/// Key light illuminance (lux) per unit of scene key intensity.
const KEY_ILLUMINANCE_SCALE: f32 = 6500.0;

/// Draws the campus scene: loads models for the core, applies its camera
/// rig, turns the mouse into scene input and renders labels and outlines.
/// Expects `scene::ScenePlugin` to be added first.
pub struct RenderingPlugin;

impl Plugin for RenderingPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<EguiPlugin>() {
            app.add_plugins(EguiPlugin);
        }

        app.init_resource::<CameraDrag>()
            .init_resource::<CameraOrbitDrag>()
            .init_resource::<LeftClickDrag>()
            .init_resource::<PointerHits>()
            .init_resource::<ModelLibrary>()
            .add_systems(Startup, camera::setup_camera)
            .add_systems(
                Update,
                (
                    model_loader::poll_models,
                    (
                        camera::camera_pan_drag,
                        camera::camera_left_drag,
                        camera::camera_orbit_drag,
                        camera::camera_zoom,
                    )
                        .run_if(camera::camera_input_allowed),
                    picking::update_pointer_hits,
                    picking::emit_scene_inputs,
                    labels::draw_scene_overlays,
                )
                    .chain()
                    .before(SceneSet::Ingest),
            )
            .add_systems(
                Update,
                (
                    model_loader::request_models,
                    camera::apply_scene_camera,
                    apply_lighting,
                    scene_spawn::spawn_accepted_assets,
                    instances::spawn_instance_batches,
                    instances::update_foliage_lod,
                    camera::settle_left_drag,
                )
                    .after(SceneSet::Publish),
            )
            .add_systems(
                Update,
                (
                    scene_spawn::tag_pick_meshes,
                    scene_spawn::start_looping_clips,
                    scene_spawn::sync_clip_playback,
                ),
            )
            .add_systems(
                Update,
                (
                    highlight::draw_emphasis_outlines,
                    highlight::draw_measurement,
                    highlight::draw_box_selection_gizmo,
                    highlight::draw_track,
                )
                    .after(SceneSet::Publish),
            )
            .add_systems(
                OnEnter(SubsystemPhase::Destroyed),
                (scene_spawn::despawn_models, instances::despawn_instances),
            );
    }
}

/// Marker for the key light so repeated requests update it in place.
#[derive(Component)]
pub struct KeyLight;

fn apply_lighting(
    mut commands: Commands,
    mut requests: EventReader<LightingRequest>,
    mut key_light: Query<(&mut DirectionalLight, &mut Transform), With<KeyLight>>,
) {
    let Some(LightingRequest(rig)) = requests.read().last().copied() else {
        return;
    };

    // Ambient light for baseline illumination
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: rig.ambient_intensity * AMBIENT_BRIGHTNESS_SCALE,
    });

    // Key light aimed at the campus center
    let light = DirectionalLight {
        illuminance: rig.key_intensity * KEY_ILLUMINANCE_SCALE,
        shadows_enabled: rig.shadows,
        ..default()
    };
    let transform = Transform::from_translation(rig.key_position).looking_at(Vec3::ZERO, Vec3::Y);

    if let Ok((mut existing, mut existing_transform)) = key_light.get_single_mut() {
        *existing = light;
        *existing_transform = transform;
    } else {
        commands.spawn((KeyLight, light, transform));
    }
}
