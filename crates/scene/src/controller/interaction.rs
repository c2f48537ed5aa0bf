//! Registry commands, camera framing and Normal-mode input handling.

use std::time::Duration;

use bevy::prelude::*;

use crate::camera_motion::{focus_framing, reset_framing, Completion};
use crate::config::{
    GROUND_FOCUS_DISTANCE, GROUND_FOCUS_DURATION_MS, GROUND_FOCUS_OFFSET, INDOOR_SUBSYSTEM,
    LABEL_TOOLTIP_LIFT, RESET_DURATION_MS, SEARCH_DISTANCE, SEARCH_DURATION_MS, SEARCH_OFFSET,
    TOOLTIP_LIFT,
};
use crate::input::SceneInput;
use crate::notifications::{HostNotification, SubsystemSwitchRequest};
use crate::registry::{BuildingId, MeshRef, PopulationUpdate};
use crate::subscriptions::{InputChannel, NORMAL_CHANNELS};

use super::{SceneSubsystem, SubsystemPhase};

impl SceneSubsystem {
    // =========================================================================
    // Registry commands
    // =========================================================================

    /// Apply a bulk population update. Returns how many ids were known.
    pub fn update_population(&mut self, updates: &[PopulationUpdate]) -> usize {
        let applied = self.registry.update_population(updates);
        debug!(
            "SceneSubsystem: population update applied {}/{}",
            applied,
            updates.len()
        );
        applied
    }

    pub fn set_filter(&mut self, filter: Vec<String>) {
        self.registry.set_filter(filter);
    }

    pub fn show_all_labels(&mut self) {
        self.registry.restore_labels();
    }

    pub fn hide_all_labels(&mut self) {
        self.registry.hide_all_labels();
    }

    pub fn show_label(&mut self, id: &BuildingId) -> bool {
        self.registry.show_single_name_label(id)
    }

    /// Hide one name label. Drops the search and highlight with it.
    pub fn hide_label(&mut self, id: &BuildingId) -> bool {
        self.search_id = None;
        self.registry.clear_highlight();
        self.registry.hide_name_label(id)
    }

    // =========================================================================
    // Camera
    // =========================================================================

    /// Frame the whole campus. Without a ground there is nothing to frame.
    pub fn reset_camera(&mut self, duration: Duration) -> Completion {
        let Some(ground) = &self.ground else {
            warn!("SceneSubsystem: reset_camera without a ground, skipping");
            return Completion::Resolved;
        };
        let (position, target) = reset_framing(&ground.bounds);
        self.motions.frame(&mut self.rig, position, target, duration)
    }

    /// Move the target to `point + offset`, keeping the viewing direction and
    /// backing the eye off by `distance`.
    pub fn lerp_to(
        &mut self,
        point: Vec3,
        distance: f32,
        duration: Duration,
        offset: Vec3,
    ) -> Completion {
        let (position, target) = focus_framing(&self.rig, point, distance, offset);
        self.motions.frame(&mut self.rig, position, target, duration)
    }

    /// Highlight a building and frame it. The host always hears about the
    /// request, even for ids that are not registered.
    pub fn search(&mut self, id: &BuildingId) -> Completion {
        self.outputs
            .notifications
            .push(HostNotification::DetailRequested { id: id.clone() });
        if !self.registry.highlight(id) {
            debug!("SceneSubsystem: search for unknown building '{}'", id);
            return Completion::Resolved;
        }
        let Some(anchor) = self.registry.lookup(id).map(|e| e.name_label.anchor) else {
            return Completion::Resolved;
        };
        self.lerp_to(
            anchor,
            SEARCH_DISTANCE,
            Duration::from_millis(SEARCH_DURATION_MS),
            SEARCH_OFFSET,
        )
    }

    fn common_search(&mut self, id: BuildingId) {
        self.search_id = Some(id.clone());
        self.search(&id);
        self.normal.unbind();
        self.normal.bind(NORMAL_CHANNELS);
    }

    pub fn set_roam(&mut self, enabled: bool) {
        self.config.roam_enabled = enabled;
        if !enabled {
            self.roam.stop();
        } else if self.phase == SubsystemPhase::Entered {
            self.roam.start(self.config.roam_period_secs);
        }
    }

    // =========================================================================
    // Input
    // =========================================================================

    fn is_listening(&self, channel: InputChannel) -> bool {
        self.normal.is_bound(channel) || self.mode_bindings.is_bound(channel)
    }

    /// Route one input to whichever bound handler consumes it. Inputs whose
    /// channels are all unbound are dropped.
    pub fn handle_input(&mut self, input: &SceneInput) {
        if !input.channels().iter().any(|c| self.is_listening(*c)) {
            return;
        }
        match input {
            SceneInput::BuildingDoubleClick(mesh) => self.on_building_double_click(mesh),
            SceneInput::BuildingClick(mesh) => {
                if let Some(id) = self.registry.owner_of(mesh).cloned() {
                    self.common_search(id);
                }
            }
            SceneInput::PointerMoved(mesh) => self.on_pointer_moved(mesh.as_ref()),
            SceneInput::ResetGesture => {
                self.reset_camera(Duration::from_millis(RESET_DURATION_MS));
            }
            SceneInput::BadgeClick(id) => {
                if self.registry.lookup(id).is_some() {
                    self.outputs
                        .notifications
                        .push(HostNotification::EntitySingleActivated(id.clone()));
                }
            }
            SceneInput::LabelClick(id) => {
                if self.registry.lookup(id).is_some() {
                    self.common_search(id.clone());
                }
            }
            SceneInput::LabelDoubleClick(id) => {
                if self.registry.lookup(id).is_some() {
                    info!("SceneSubsystem: entering building '{}' from its label", id);
                    self.outputs.switches.push(SubsystemSwitchRequest {
                        target: INDOOR_SUBSYSTEM.to_string(),
                        key: id.group_key().to_string(),
                    });
                }
            }
            SceneInput::LabelHover(id) => self.on_label_hover(id.as_ref()),
            SceneInput::GroundDoubleClick(point) => {
                self.lerp_to(
                    *point,
                    GROUND_FOCUS_DISTANCE,
                    Duration::from_millis(GROUND_FOCUS_DURATION_MS),
                    GROUND_FOCUS_OFFSET,
                );
            }
            SceneInput::MeasurePick(point) => {
                if let Some(tool) = self.active_measure_tool() {
                    tool.add_point(*point);
                }
            }
            SceneInput::MeasurePreview(point) => {
                if let Some(tool) = self.active_measure_tool() {
                    tool.set_preview(*point);
                }
            }
            SceneInput::BoxDragStart(at) => self.box_select.begin(*at),
            SceneInput::BoxDragMove(at) => self.box_select.drag_to(*at),
            SceneInput::BoxDragEnd => {
                let count = self.box_select.finish(&self.registry).len();
                info!("SceneSubsystem: box selected {} buildings", count);
            }
        }
    }

    fn on_building_double_click(&mut self, mesh: &MeshRef) {
        let Some(id) = self.registry.owner_of(mesh).cloned() else {
            return;
        };
        info!("SceneSubsystem: entering building '{}'", id);
        self.outputs.switches.push(SubsystemSwitchRequest {
            target: INDOOR_SUBSYSTEM.to_string(),
            key: id.group_key().to_string(),
        });
        self.outputs
            .notifications
            .push(HostNotification::EntityDoubleActivated(id));
    }

    fn on_pointer_moved(&mut self, mesh: Option<&MeshRef>) {
        let owner = mesh.and_then(|m| self.registry.owner_of(m)).cloned();
        if self.normal.is_bound(InputChannel::PointerCursor) {
            self.pointer_over_building = owner.is_some();
        }
        if !self.normal.is_bound(InputChannel::BuildingHover) || !self.hover_slot_open() {
            return;
        }

        let Some(entity) = owner.as_ref().and_then(|id| self.registry.lookup(id)) else {
            self.registry.set_hovered_group(None);
            if let Some(tooltip) = &mut self.tooltip {
                tooltip.hide();
            }
            return;
        };
        let key = entity.id.group_key().to_string();
        let text = entity.name_label.text.clone();
        let anchor = entity.name_label.anchor + Vec3::Y * TOOLTIP_LIFT;
        self.registry.set_hovered_group(Some(key));
        if let Some(tooltip) = &mut self.tooltip {
            tooltip.show(text, anchor);
        }
    }

    /// Tooltip just above a hovered name label; not throttled.
    fn on_label_hover(&mut self, id: Option<&BuildingId>) {
        let Some(tooltip) = &mut self.tooltip else {
            return;
        };
        match id.and_then(|id| self.registry.lookup(id)) {
            Some(entity) => tooltip.show(
                entity.name_label.text.clone(),
                entity.name_label.anchor + Vec3::Y * LABEL_TOOLTIP_LIFT,
            ),
            None => tooltip.hide(),
        }
    }

    /// Hover reacts only on even slots of elapsed time.
    fn hover_slot_open(&self) -> bool {
        let slot = self.config.hover_slot_secs;
        if slot <= 0.0 {
            return true;
        }
        (self.elapsed_secs / slot).floor() as u64 % 2 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_motion::MotionChannel;
    use crate::controller::{Activation, SubMode};
    use crate::manifest::{AssetClass, SceneManifest};
    use crate::model::{Bounds, LoadedModel, ModelNode};

    fn building(name: &str, x: f32) -> LoadedModel {
        LoadedModel::new(name)
            .with_nodes(vec![ModelNode::new(
                format!("{name}_mesh"),
                None,
                Transform::IDENTITY,
            )
            .with_mesh()])
            .with_bounds(Bounds::new(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 10.0, 20.0, 10.0)))
    }

    /// Loaded and entered, arrival motion finished.
    fn entered() -> SceneSubsystem {
        let manifest = SceneManifest::default()
            .with_asset("ground.glb", AssetClass::Ground)
            .with_asset(
                "A1_North.glb",
                AssetClass::Building {
                    id: BuildingId::new("A1_North"),
                },
            )
            .with_asset(
                "A1_South.glb",
                AssetClass::Building {
                    id: BuildingId::new("A1_South"),
                },
            )
            .with_asset(
                "B2_Hall.glb",
                AssetClass::Building {
                    id: BuildingId::new("B2_Hall"),
                },
            );
        let mut s = SceneSubsystem::new(Ok(manifest));
        s.start();
        s.settle_asset(
            "ground",
            Ok(LoadedModel::new("ground").with_bounds(Bounds::new(
                Vec3::new(-500.0, 0.0, -500.0),
                Vec3::new(500.0, 0.0, 500.0),
            ))),
        );
        s.settle_asset("A1_North", Ok(building("A1_North", 0.0)));
        s.settle_asset("A1_South", Ok(building("A1_South", 40.0)));
        s.settle_asset("B2_Hall", Ok(building("B2_Hall", 80.0)));
        assert_eq!(s.activate(), Activation::Entered);
        for _ in 0..200 {
            s.tick(Duration::from_millis(16), 0.0);
        }
        s.take_outputs();
        s
    }

    fn mesh(name: &str) -> MeshRef {
        MeshRef::new(name, format!("{name}_mesh"))
    }

    #[test]
    fn test_double_click_requests_indoor_switch() {
        let mut s = entered();
        s.handle_input(&SceneInput::BuildingDoubleClick(mesh("A1_South")));
        let out = s.take_outputs();
        assert_eq!(
            out.switches,
            vec![SubsystemSwitchRequest {
                target: "indoorSubsystem".into(),
                key: "A1".into(),
            }]
        );
        assert_eq!(
            out.notifications,
            vec![HostNotification::EntityDoubleActivated(BuildingId::new("A1_South"))]
        );
    }

    #[test]
    fn test_click_searches_and_keeps_normal_bound() {
        let mut s = entered();
        s.handle_input(&SceneInput::BuildingClick(mesh("B2_Hall")));
        assert_eq!(s.search_id(), Some(&BuildingId::new("B2_Hall")));
        assert_eq!(s.registry().highlighted(), Some(&BuildingId::new("B2_Hall")));
        assert_eq!(s.normal_bindings().len(), NORMAL_CHANNELS.len());
        assert!(s.motions().is_driving(MotionChannel::Target));
        let out = s.take_outputs();
        assert_eq!(
            out.notifications,
            vec![HostNotification::DetailRequested {
                id: BuildingId::new("B2_Hall")
            }]
        );
    }

    #[test]
    fn test_search_unknown_still_notifies() {
        let mut s = entered();
        assert_eq!(s.search(&BuildingId::new("Z9")), Completion::Resolved);
        assert!(s.registry().highlighted().is_none());
        assert_eq!(s.take_outputs().notifications.len(), 1);
    }

    #[test]
    fn test_search_replaces_highlight() {
        let mut s = entered();
        s.search(&BuildingId::new("A1_North"));
        s.search(&BuildingId::new("B2_Hall"));
        assert_eq!(s.registry().highlighted(), Some(&BuildingId::new("B2_Hall")));
    }

    #[test]
    fn test_hover_outlines_group_on_even_slot() {
        let mut s = entered();
        // Slot 1 is closed.
        s.tick(Duration::ZERO, 0.15);
        s.handle_input(&SceneInput::PointerMoved(Some(mesh("A1_North"))));
        assert!(s.pointer_over_building());
        assert!(s.registry().hovered_group().is_none());

        s.tick(Duration::ZERO, 0.25);
        s.handle_input(&SceneInput::PointerMoved(Some(mesh("A1_North"))));
        assert_eq!(s.registry().hovered_group(), Some("A1"));
        assert_eq!(s.registry().emphasized_meshes().len(), 2);
        let tooltip = s.tooltip().unwrap();
        assert!(tooltip.visible);
        assert_eq!(tooltip.anchor.y, 30.0);

        s.handle_input(&SceneInput::PointerMoved(None));
        assert!(!s.pointer_over_building());
        assert!(s.registry().hovered_group().is_none());
        assert!(!s.tooltip().unwrap().visible);
    }

    #[test]
    fn test_badge_click_notifies_known_ids() {
        let mut s = entered();
        s.handle_input(&SceneInput::BadgeClick(BuildingId::new("A1_North")));
        s.handle_input(&SceneInput::BadgeClick(BuildingId::new("nope")));
        assert_eq!(
            s.take_outputs().notifications,
            vec![HostNotification::EntitySingleActivated(BuildingId::new("A1_North"))]
        );
    }

    #[test]
    fn test_label_click_searches_building() {
        let mut s = entered();
        s.take_outputs();
        s.handle_input(&SceneInput::LabelClick(BuildingId::new("B2_Hall")));
        assert_eq!(s.search_id(), Some(&BuildingId::new("B2_Hall")));
        assert_eq!(s.registry().highlighted(), Some(&BuildingId::new("B2_Hall")));
        assert_eq!(
            s.take_outputs().notifications,
            vec![HostNotification::DetailRequested {
                id: BuildingId::new("B2_Hall")
            }]
        );
    }

    #[test]
    fn test_label_double_click_requests_indoor() {
        let mut s = entered();
        s.take_outputs();
        s.handle_input(&SceneInput::LabelDoubleClick(BuildingId::new("A1_South")));
        let outputs = s.take_outputs();
        assert_eq!(
            outputs.switches,
            vec![SubsystemSwitchRequest {
                target: INDOOR_SUBSYSTEM.to_string(),
                key: "A1".to_string(),
            }]
        );
        assert!(outputs.notifications.is_empty());
    }

    #[test]
    fn test_label_hover_lifts_tooltip_above_label() {
        let mut s = entered();
        // Label hover ignores the hover throttle.
        s.tick(Duration::ZERO, 0.15);
        s.handle_input(&SceneInput::LabelHover(Some(BuildingId::new("A1_North"))));
        let tooltip = s.tooltip().unwrap();
        assert!(tooltip.visible);
        assert_eq!(tooltip.text, "A1_North");
        assert_eq!(tooltip.anchor.y, 25.0);

        s.handle_input(&SceneInput::LabelHover(None));
        assert!(!s.tooltip().unwrap().visible);
    }

    #[test]
    fn test_label_inputs_dropped_in_sub_mode() {
        let mut s = entered();
        s.enter_sub_mode(SubMode::MeasuringDistance);
        s.handle_input(&SceneInput::LabelClick(BuildingId::new("B2_Hall")));
        assert!(s.search_id().is_none());
    }

    #[test]
    fn test_ground_double_click_focuses_point() {
        let mut s = entered();
        s.handle_input(&SceneInput::GroundDoubleClick(Vec3::new(100.0, 0.0, 100.0)));
        for _ in 0..100 {
            s.tick(Duration::from_millis(16), 0.0);
        }
        assert_eq!(s.rig().target, Vec3::new(100.0, 10.0, 100.0));
        let distance = s.rig().position.distance(s.rig().target);
        assert!((distance - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_inputs_dropped_when_not_entered() {
        let mut s = entered();
        s.deactivate();
        s.take_outputs();
        s.handle_input(&SceneInput::BadgeClick(BuildingId::new("A1_North")));
        s.handle_input(&SceneInput::BuildingDoubleClick(mesh("A1_North")));
        let out = s.take_outputs();
        assert!(out.notifications.is_empty());
        assert!(out.switches.is_empty());
    }

    #[test]
    fn test_hide_label_clears_search() {
        let mut s = entered();
        s.handle_input(&SceneInput::BuildingClick(mesh("A1_North")));
        assert!(s.hide_label(&BuildingId::new("A1_North")));
        assert!(s.search_id().is_none());
        assert!(s.registry().highlighted().is_none());
        assert!(
            !s.registry()
                .lookup(&BuildingId::new("A1_North"))
                .unwrap()
                .name_label
                .visible
        );
    }

    #[test]
    fn test_roam_toggle_only_runs_while_entered() {
        let mut s = entered();
        s.set_roam(true);
        assert!(s.is_roaming());
        s.deactivate();
        assert!(!s.is_roaming());
        s.activate();
        assert!(s.is_roaming());
        s.set_roam(false);
        assert!(!s.is_roaming());
    }
}
