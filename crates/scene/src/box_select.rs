//! Box selection sub-mode: drag a rectangle on the ground to pick buildings.

use bevy::prelude::*;

use crate::registry::{BuildingId, SpatialEntityRegistry};

/// Drags shorter than this (world units, either axis) are treated as clicks.
const MIN_BOX_SIZE: f32 = 1.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxSelection {
    /// Whether a drag is in progress.
    pub dragging: bool,
    /// Ground position (XZ) where the drag started.
    pub start: Vec2,
    /// Current ground position (XZ) of the pointer.
    pub current: Vec2,
    /// Buildings picked by the last completed drag.
    pub selected: Vec<BuildingId>,
}

impl BoxSelection {
    /// Returns the rectangle as (min, max) in ground XZ coordinates.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.start.min(self.current), self.start.max(self.current))
    }

    pub fn size(&self) -> Vec2 {
        let (min, max) = self.bounds();
        max - min
    }

    pub fn begin(&mut self, at: Vec2) {
        self.dragging = true;
        self.start = at;
        self.current = at;
    }

    pub fn drag_to(&mut self, at: Vec2) {
        if self.dragging {
            self.current = at;
        }
    }

    /// Finish the drag and select every building whose label anchor is inside.
    pub fn finish(&mut self, registry: &SpatialEntityRegistry) -> &[BuildingId] {
        if !self.dragging {
            return &self.selected;
        }
        self.dragging = false;
        let size = self.size();
        if size.x < MIN_BOX_SIZE && size.y < MIN_BOX_SIZE {
            self.selected.clear();
            return &self.selected;
        }
        let (min, max) = self.bounds();
        self.selected = registry
            .iter()
            .filter(|e| {
                let p = Vec2::new(e.name_label.anchor.x, e.name_label.anchor.z);
                p.cmpge(min).all() && p.cmple(max).all()
            })
            .map(|e| e.id.clone())
            .collect();
        &self.selected
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
