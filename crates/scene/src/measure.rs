//! Distance and area measuring tools.
//!
//! Both tools collect ground picks while their sub-mode is active. Distance
//! reports the length of the picked polyline; area closes the picked polygon
//! and reports its footprint on the XZ plane (shoelace formula) and its
//! perimeter. A preview point follows the pointer between picks.

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureKind {
    Distance,
    Area,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasureTool {
    kind: MeasureKind,
    active: bool,
    points: Vec<Vec3>,
    preview: Option<Vec3>,
}

impl MeasureTool {
    pub fn new(kind: MeasureKind) -> Self {
        Self {
            kind,
            active: false,
            points: Vec::new(),
            preview: None,
        }
    }

    pub fn kind(&self) -> MeasureKind {
        self.kind
    }

    /// Begin a fresh measurement, discarding any previous one.
    pub fn start(&mut self) {
        self.active = true;
        self.points.clear();
        self.preview = None;
    }

    pub fn end(&mut self) {
        self.active = false;
        self.points.clear();
        self.preview = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn add_point(&mut self, point: Vec3) {
        if self.active {
            self.points.push(point);
        }
    }

    pub fn set_preview(&mut self, point: Option<Vec3>) {
        if self.active {
            self.preview = point;
        }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn preview(&self) -> Option<Vec3> {
        self.preview
    }

    /// Picked points followed by the preview point, if any.
    pub fn outline(&self) -> Vec<Vec3> {
        let mut out = self.points.clone();
        out.extend(self.preview);
        out
    }

    /// Length of the open polyline through the picked points.
    pub fn length(&self) -> f32 {
        polyline_length(&self.points)
    }

    /// Closed perimeter (area tool) or polyline length (distance tool).
    pub fn perimeter(&self) -> f32 {
        match self.kind {
            MeasureKind::Distance => self.length(),
            MeasureKind::Area if self.points.len() < 3 => self.length(),
            MeasureKind::Area => {
                let closing = match (self.points.first(), self.points.last()) {
                    (Some(a), Some(b)) => a.distance(*b),
                    _ => 0.0,
                };
                self.length() + closing
            }
        }
    }

    /// Footprint area on the ground plane; zero for fewer than three points.
    pub fn area(&self) -> f32 {
        polygon_area_xz(&self.points)
    }

    /// Headline value of the tool: length or area.
    pub fn value(&self) -> f32 {
        match self.kind {
            MeasureKind::Distance => self.length(),
            MeasureKind::Area => self.area(),
        }
    }
}

pub fn polyline_length(points: &[Vec3]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

pub fn polygon_area_xz(points: &[Vec3]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f32 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.z - b.x * a.z)
        .sum();
    twice.abs() * 0.5
}
