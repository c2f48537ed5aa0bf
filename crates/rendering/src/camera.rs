use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy_egui::EguiContexts;

use scene::controller::{SceneSubsystem, SubMode, SubsystemPhase};

use crate::egui_input_guard::egui_wants_pointer;

const ZOOM_SPEED: f32 = 0.15;
const PAN_SCALE: f32 = 1.0 / 1000.0;

/// Marker for the one camera the scene rig drives.
#[derive(Component)]
pub struct SceneCamera;

#[derive(Resource, Default)]
pub struct CameraDrag {
    pub dragging: bool,
    pub last_pos: Vec2,
}

#[derive(Resource, Default)]
pub struct CameraOrbitDrag {
    pub dragging: bool,
    pub last_pos: Vec2,
}

/// Tracks left-click drag state: differentiates click from drag.
/// When the mouse moves beyond `LEFT_DRAG_THRESHOLD` pixels from the initial
/// press, it becomes a camera pan and the release is not a click.
#[derive(Resource, Default)]
pub struct LeftClickDrag {
    pub pressed: bool,
    pub start_pos: Vec2,
    pub last_pos: Vec2,
    /// True once the mouse has moved beyond the threshold.
    pub is_dragging: bool,
}

const LEFT_DRAG_THRESHOLD: f32 = 5.0;

pub fn setup_camera(mut commands: Commands, subsystem: Res<SceneSubsystem>) {
    commands.spawn((Camera3d::default(), SceneCamera, subsystem.rig().transform()));
}

/// Pan distance per pixel grows with the eye's distance to its target.
fn pan_scale(subsystem: &SceneSubsystem) -> f32 {
    let rig = subsystem.rig();
    (rig.position - rig.target).length() * PAN_SCALE
}

/// Run condition for user camera input: only the entered scene listens.
pub fn camera_input_allowed(subsystem: Res<SceneSubsystem>) -> bool {
    subsystem.phase() == SubsystemPhase::Entered
}

/// System: copy the rig onto the camera transform after the core has run.
pub fn apply_scene_camera(
    subsystem: Res<SceneSubsystem>,
    mut query: Query<&mut Transform, With<SceneCamera>>,
) {
    if !subsystem.is_changed() {
        return;
    }
    let Ok(mut transform) = query.get_single_mut() else {
        return;
    };
    let target = subsystem.rig().transform();
    if *transform != target {
        *transform = target;
    }
}

/// Middle-mouse drag: pan.
pub fn camera_pan_drag(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    mut drag: ResMut<CameraDrag>,
    mut subsystem: ResMut<SceneSubsystem>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };

    if buttons.just_pressed(MouseButton::Middle) {
        if let Some(pos) = window.cursor_position() {
            drag.dragging = true;
            drag.last_pos = pos;
        }
    }

    // Releases may land while input is gated off.
    if !buttons.pressed(MouseButton::Middle) {
        drag.dragging = false;
    }

    if drag.dragging {
        if let Some(pos) = window.cursor_position() {
            let delta = pos - drag.last_pos;
            if delta != Vec2::ZERO {
                let scale = pan_scale(&subsystem);
                subsystem
                    .rig_mut()
                    .pan_by(Vec2::new(-delta.x, delta.y) * scale);
            }
            drag.last_pos = pos;
        }
    }
}

/// Right-mouse drag: orbit around the target.
pub fn camera_orbit_drag(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    mut drag: ResMut<CameraOrbitDrag>,
    mut subsystem: ResMut<SceneSubsystem>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };

    if buttons.just_pressed(MouseButton::Right) {
        if let Some(pos) = window.cursor_position() {
            drag.dragging = true;
            drag.last_pos = pos;
        }
    }

    if !buttons.pressed(MouseButton::Right) {
        drag.dragging = false;
    }

    if drag.dragging {
        if let Some(pos) = window.cursor_position() {
            let delta = pos - drag.last_pos;
            if delta != Vec2::ZERO {
                subsystem.rig_mut().orbit_by(delta);
            }
            drag.last_pos = pos;
        }
    }
}

/// Left-mouse drag: pan (with threshold to distinguish from clicks). Box
/// selection owns the left drag while it is active.
pub fn camera_left_drag(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    mut left_drag: ResMut<LeftClickDrag>,
    mut subsystem: ResMut<SceneSubsystem>,
    mut contexts: EguiContexts,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };

    if buttons.just_pressed(MouseButton::Left) && !egui_wants_pointer(&mut contexts) {
        if let Some(pos) = window.cursor_position() {
            left_drag.pressed = true;
            left_drag.start_pos = pos;
            left_drag.last_pos = pos;
            left_drag.is_dragging = false;
        }
    }

    if !buttons.pressed(MouseButton::Left) {
        left_drag.pressed = false;
    }

    if !left_drag.pressed {
        return;
    }
    let Some(pos) = window.cursor_position() else {
        return;
    };

    if !left_drag.is_dragging && (pos - left_drag.start_pos).length() > LEFT_DRAG_THRESHOLD {
        left_drag.is_dragging = true;
        left_drag.last_pos = pos;
    }

    if left_drag.is_dragging && subsystem.sub_mode() != SubMode::BoxSelect {
        let delta = pos - left_drag.last_pos;
        if delta != Vec2::ZERO {
            let scale = pan_scale(&subsystem);
            subsystem
                .rig_mut()
                .pan_by(Vec2::new(-delta.x, delta.y) * scale);
        }
    }
    left_drag.last_pos = pos;
}

/// Clear the drag flag one frame after release so click handlers can still
/// see that the release ended a drag.
pub fn settle_left_drag(mut left_drag: ResMut<LeftClickDrag>) {
    if !left_drag.pressed && left_drag.is_dragging {
        left_drag.is_dragging = false;
    }
}

/// Scroll wheel: zoom toward the target.
pub fn camera_zoom(
    mut scroll_evts: EventReader<MouseWheel>,
    mut subsystem: ResMut<SceneSubsystem>,
    mut contexts: EguiContexts,
) {
    if egui_wants_pointer(&mut contexts) {
        scroll_evts.clear();
        return;
    }
    for evt in scroll_evts.read() {
        let dy = match evt.unit {
            MouseScrollUnit::Line => evt.y,
            MouseScrollUnit::Pixel => evt.y / 100.0,
        };
        subsystem.rig_mut().zoom_by(1.0 - dy * ZOOM_SPEED);
    }
}
