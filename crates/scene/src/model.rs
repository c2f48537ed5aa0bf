//! Engine-neutral view of a loaded model.
//!
//! The rendering adapter flattens a glTF node tree into a [`LoadedModel`]
//! (names, world transforms, mesh flags, bounds and clip names) so the scene
//! core can classify, register and batch assets without touching Bevy's
//! asset types.

use std::fmt;

use bevy::prelude::*;

/// Axis-aligned bounds in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Smallest bounds containing every point, `None` for an empty input.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Radius of the bounding sphere around [`Bounds::center`].
    pub fn radius(&self) -> f32 {
        self.size().length() * 0.5
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow by `horizontal` on x/z and by `headroom` above. The floor stays.
    pub fn padded(&self, horizontal: f32, headroom: f32) -> Bounds {
        Bounds {
            min: self.min - Vec3::new(horizontal, 0.0, horizontal),
            max: self.max + Vec3::new(horizontal, headroom, horizontal),
        }
    }

    /// Anchor for labels: the center of the top face.
    pub fn top_center(&self) -> Vec3 {
        let c = self.center();
        Vec3::new(c.x, self.max.y, c.z)
    }
}

/// One node of a flattened model hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub parent: Option<usize>,
    /// World-space transform.
    pub transform: Transform,
    pub has_mesh: bool,
}

impl ModelNode {
    pub fn new(name: impl Into<String>, parent: Option<usize>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            parent,
            transform,
            has_mesh: false,
        }
    }

    pub fn with_mesh(mut self) -> Self {
        self.has_mesh = true;
        self
    }
}

/// A successfully loaded asset, ready for classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedModel {
    pub name: String,
    /// Parents always precede their children.
    pub nodes: Vec<ModelNode>,
    pub bounds: Option<Bounds>,
    pub animations: Vec<String>,
}

impl LoadedModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..default()
        }
    }

    pub fn with_nodes(mut self, nodes: Vec<ModelNode>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_animations(mut self, clips: Vec<String>) -> Self {
        self.animations = clips;
        self
    }

    /// Names of mesh-bearing nodes, in node order.
    pub fn mesh_node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|n| n.has_mesh)
            .map(|n| n.name.as_str())
    }

    /// Indices of the direct children of `index`.
    pub fn children_of(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(index))
            .map(|(i, _)| i)
    }

    /// Indices of every descendant of `index` (excluding `index`), in node order.
    pub fn descendants_of(&self, index: usize) -> Vec<usize> {
        let mut inside = vec![false; self.nodes.len()];
        if let Some(slot) = inside.get_mut(index) {
            *slot = true;
        }
        let mut out = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                if parent < i && inside[parent] {
                    inside[i] = true;
                    out.push(i);
                }
            }
        }
        out
    }

    /// Indices of nodes whose name contains `needle`.
    pub fn nodes_named_like<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.name.contains(needle))
            .map(|(i, _)| i)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Per-item load failure. Never fatal: the item is skipped and still counted
/// toward batch completion.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetError {
    /// The asset could not be fetched at all.
    Missing { name: String },
    /// The asset was fetched but has no usable scene.
    Malformed { name: String, reason: String },
    /// A result arrived for a name the batch never asked for.
    Unexpected { name: String },
}

impl AssetError {
    pub fn name(&self) -> &str {
        match self {
            AssetError::Missing { name }
            | AssetError::Malformed { name, .. }
            | AssetError::Unexpected { name } => name,
        }
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Missing { name } => write!(f, "asset '{name}' could not be loaded"),
            AssetError::Malformed { name, reason } => {
                write!(f, "asset '{name}' is malformed: {reason}")
            }
            AssetError::Unexpected { name } => {
                write!(f, "asset '{name}' is not part of the current batch")
            }
        }
    }
}

impl std::error::Error for AssetError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> LoadedModel {
        LoadedModel::new("scenery").with_nodes(vec![
            ModelNode::new("root", None, Transform::IDENTITY),
            ModelNode::new("zuobiao", Some(0), Transform::IDENTITY),
            ModelNode::new("shu_01", Some(1), Transform::from_xyz(1.0, 0.0, 0.0)),
            ModelNode::new("deng_01", Some(1), Transform::from_xyz(2.0, 0.0, 0.0)),
            ModelNode::new("shili", Some(0), Transform::IDENTITY),
            ModelNode::new("shu", Some(4), Transform::IDENTITY).with_mesh(),
        ])
    }

    #[test]
    fn test_bounds_radius_and_top_center() {
        let b = Bounds::new(Vec3::new(-3.0, 0.0, -4.0), Vec3::new(3.0, 10.0, 4.0));
        assert_eq!(b.top_center(), Vec3::new(0.0, 10.0, 0.0));
        let expected = (36.0_f32 + 100.0 + 64.0).sqrt() * 0.5;
        assert!((b.radius() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_bounds_new_orders_corners() {
        let b = Bounds::new(Vec3::ONE, Vec3::ZERO);
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::ONE);
    }

    #[test]
    fn test_bounds_from_points_empty_is_none() {
        assert!(Bounds::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_bounds_padded_adds_headroom_on_top_only() {
        let b = Bounds::new(Vec3::ZERO, Vec3::splat(10.0)).padded(100.0, 500.0);
        assert_eq!(b.min, Vec3::new(-100.0, 0.0, -100.0));
        assert_eq!(b.max, Vec3::new(110.0, 510.0, 110.0));
    }

    #[test]
    fn test_descendants_excludes_self_and_siblings() {
        let model = tree();
        assert_eq!(model.descendants_of(1), vec![2, 3]);
        assert_eq!(model.descendants_of(0), vec![1, 2, 3, 4, 5]);
        assert!(model.descendants_of(5).is_empty());
    }

    #[test]
    fn test_children_and_name_search() {
        let model = tree();
        assert_eq!(model.children_of(0).collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(model.nodes_named_like("shu").collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(model.mesh_node_names().collect::<Vec<_>>(), vec!["shu"]);
    }

    #[test]
    fn test_asset_error_display_names_the_asset() {
        let err = AssetError::Malformed {
            name: "corrupt".into(),
            reason: "no default scene".into(),
        };
        assert_eq!(err.to_string(), "asset 'corrupt' is malformed: no default scene");
        assert_eq!(err.name(), "corrupt");
    }
}
