//! Screen-space overlays drawn with egui: building name labels, population
//! badges, the hover tooltip, the scene hint and the measuring readout.
//!
//! World anchors are projected through the scene camera every frame; an
//! anchor behind the camera simply draws nothing. Badge clicks come back as
//! [`SceneInput::BadgeClick`]; name label clicks, double-clicks and hover
//! come back as the `Label*` inputs.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use scene::collaborators::SceneHintCollaborator;
use scene::controller::{SceneSubsystem, SubMode, SubsystemPhase};
use scene::input::SceneInput;
use scene::measure::MeasureKind;
use scene::registry::BuildingId;

use crate::camera::SceneCamera;

const NAME_COLOR: egui::Color32 = egui::Color32::from_rgb(235, 240, 255);
const BADGE_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(20, 40, 60, 220);
const BADGE_TEXT: egui::Color32 = egui::Color32::from_rgb(100, 200, 255);
const TOOLTIP_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(10, 10, 10, 200);
const READOUT_TEXT: egui::Color32 = egui::Color32::from_rgb(255, 220, 50);

/// Screen offset between a name label and the badge stacked above it.
const BADGE_LIFT: f32 = 22.0;

fn project(camera: &Camera, transform: &GlobalTransform, anchor: Vec3) -> Option<egui::Pos2> {
    camera
        .world_to_viewport(transform, anchor)
        .ok()
        .map(|p| egui::pos2(p.x, p.y))
}

pub fn draw_scene_overlays(
    mut contexts: EguiContexts,
    subsystem: Res<SceneSubsystem>,
    camera_q: Query<(&Camera, &GlobalTransform), With<SceneCamera>>,
    mut inputs: EventWriter<SceneInput>,
    mut hovered_label: Local<Option<BuildingId>>,
) {
    if subsystem.phase() != SubsystemPhase::Entered {
        return;
    }
    let Ok((camera, cam_transform)) = camera_q.get_single() else {
        return;
    };
    let ctx = contexts.ctx_mut().clone();
    let registry = subsystem.registry();
    let mut hovered = None;

    for building in registry.iter() {
        let label = &building.name_label;
        if label.visible {
            if let Some(pos) = project(camera, cam_transform, label.anchor) {
                egui::Area::new(egui::Id::new(("name_label", building.id.as_str())))
                    .order(egui::Order::Background)
                    .pivot(egui::Align2::CENTER_BOTTOM)
                    .fixed_pos(pos)
                    .show(&ctx, |ui| {
                        let name = egui::Label::new(
                            egui::RichText::new(&label.text).strong().color(NAME_COLOR),
                        )
                        .sense(egui::Sense::click());
                        let response = ui.add(name);
                        if response.double_clicked() {
                            inputs.send(SceneInput::LabelDoubleClick(building.id.clone()));
                        } else if response.clicked() {
                            inputs.send(SceneInput::LabelClick(building.id.clone()));
                        }
                        if response.hovered() {
                            hovered = Some(building.id.clone());
                        }
                    });
            }
        }

        if building.visible && !registry.labels_suppressed() {
            let Some(pos) = project(camera, cam_transform, building.population_label.anchor)
            else {
                continue;
            };
            egui::Area::new(egui::Id::new(("badge", building.id.as_str())))
                .pivot(egui::Align2::CENTER_BOTTOM)
                .fixed_pos(pos - egui::vec2(0.0, BADGE_LIFT))
                .show(&ctx, |ui| {
                    egui::Frame::popup(ui.style())
                        .fill(BADGE_FILL)
                        .show(ui, |ui| {
                            let badge = egui::Label::new(
                                egui::RichText::new(building.population.to_string())
                                    .color(BADGE_TEXT),
                            )
                            .sense(egui::Sense::click());
                            if ui.add(badge).clicked() {
                                inputs.send(SceneInput::BadgeClick(building.id.clone()));
                            }
                        });
                });
        }
    }

    if *hovered_label != hovered {
        inputs.send(SceneInput::LabelHover(hovered.clone()));
        *hovered_label = hovered;
    }

    if let Some(tooltip) = subsystem.tooltip().filter(|t| t.visible) {
        if let Some(pos) = project(camera, cam_transform, tooltip.anchor) {
            egui::Area::new(egui::Id::new("building_tooltip"))
                .order(egui::Order::Tooltip)
                .pivot(egui::Align2::CENTER_BOTTOM)
                .fixed_pos(pos)
                .interactable(false)
                .show(&ctx, |ui| {
                    egui::Frame::popup(ui.style())
                        .fill(TOOLTIP_FILL)
                        .show(ui, |ui| {
                            ui.colored_label(egui::Color32::WHITE, &tooltip.text);
                        });
                });
        }
    }

    if let Some(hint) = subsystem
        .collaborators()
        .get::<SceneHintCollaborator>()
        .and_then(|h| h.text())
    {
        let screen = ctx.screen_rect();
        egui::Area::new(egui::Id::new("scene_hint"))
            .pivot(egui::Align2::CENTER_BOTTOM)
            .fixed_pos(egui::pos2(screen.center().x, screen.bottom() - 16.0))
            .interactable(false)
            .show(&ctx, |ui| {
                ui.colored_label(egui::Color32::LIGHT_GRAY, hint);
            });
    }

    draw_mode_readout(&ctx, &subsystem);
}

/// Top-center indicator for the active sub-mode.
fn draw_mode_readout(ctx: &egui::Context, subsystem: &SceneSubsystem) {
    let text = if let Some(tool) = subsystem.active_measurement() {
        match tool.kind() {
            MeasureKind::Distance => format!("Distance: {:.1} m", tool.value()),
            MeasureKind::Area => format!(
                "Area: {:.1} m²  Perimeter: {:.1} m",
                tool.value(),
                tool.perimeter()
            ),
        }
    } else if subsystem.sub_mode() == SubMode::BoxSelect {
        format!(
            "Box Select: {} building(s)",
            subsystem.box_selection().selected.len()
        )
    } else if subsystem.sub_mode() == SubMode::Tracking {
        format!("Track: {:.1} s", subsystem.track().clock())
    } else {
        return;
    };

    egui::Area::new(egui::Id::new("mode_readout"))
        .fixed_pos(egui::pos2(ctx.screen_rect().center().x - 80.0, 42.0))
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style())
                .fill(BADGE_FILL)
                .show(ui, |ui| {
                    ui.colored_label(READOUT_TEXT, text);
                });
        });
}
