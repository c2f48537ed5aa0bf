//! glTF model loading.
//!
//! Answers [`AssetFetchRequest`]s by loading each model through the
//! `AssetServer` and, once the glTF and its dependencies are in, flattening
//! its node tree into the [`LoadedModel`] the scene core understands. Every
//! requested model produces exactly one [`AssetLoadReport`], success or not.

use std::collections::HashMap;

use bevy::asset::LoadState;
use bevy::gltf::{Gltf, GltfMesh, GltfNode};
use bevy::prelude::*;
use bevy::render::mesh::MeshAabb;

use scene::manifest::AssetDescriptor;
use scene::model::{AssetError, Bounds, LoadedModel, ModelNode};
use scene::{AssetFetchRequest, AssetLoadReport};

// =============================================================================
// Library
// =============================================================================

struct PendingModel {
    name: String,
    handle: Handle<Gltf>,
}

/// glTF handles by asset name. Handles stay alive for the whole session so
/// scene spawning and instancing can reuse them.
#[derive(Resource, Default)]
pub struct ModelLibrary {
    pending: Vec<PendingModel>,
    handles: HashMap<String, Handle<Gltf>>,
    paths: HashMap<String, String>,
}

impl ModelLibrary {
    pub fn gltf(&self, name: &str) -> Option<&Handle<Gltf>> {
        self.handles.get(name)
    }

    pub fn path(&self, name: &str) -> Option<&str> {
        self.paths.get(name).map(String::as_str)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn request(&mut self, descriptor: &AssetDescriptor, asset_server: &AssetServer) {
        let handle: Handle<Gltf> = asset_server.load(descriptor.path.clone());
        self.paths
            .insert(descriptor.name.clone(), descriptor.path.clone());
        self.handles.insert(descriptor.name.clone(), handle.clone());
        self.pending.push(PendingModel {
            name: descriptor.name.clone(),
            handle,
        });
    }
}

// =============================================================================
// Flattening
// =============================================================================

/// One glTF node reduced to what flattening needs.
#[derive(Debug, Clone)]
pub struct RawNode {
    pub name: String,
    pub children: Vec<usize>,
    pub transform: Transform,
    /// Mesh bounds in the node's local space.
    pub mesh_bounds: Option<Bounds>,
}

/// Depth-first walk from every root so parents always precede children.
/// World transforms accumulate down the tree; model bounds are the union of
/// every mesh's world-space box.
pub fn flatten(name: &str, raw: &[RawNode], animations: Vec<String>) -> LoadedModel {
    let mut is_child = vec![false; raw.len()];
    for node in raw {
        for &c in &node.children {
            if let Some(flag) = is_child.get_mut(c) {
                *flag = true;
            }
        }
    }

    let mut nodes = Vec::with_capacity(raw.len());
    let mut corners = Vec::new();
    let mut visited = vec![false; raw.len()];
    let mut stack: Vec<(usize, Option<usize>, Transform)> = (0..raw.len())
        .rev()
        .filter(|&i| !is_child[i])
        .map(|i| (i, None, Transform::IDENTITY))
        .collect();

    while let Some((index, parent, parent_world)) = stack.pop() {
        if std::mem::replace(&mut visited[index], true) {
            continue;
        }
        let node = &raw[index];
        let world = parent_world.mul_transform(node.transform);
        let mut flat = ModelNode::new(node.name.clone(), parent, world);
        if let Some(local) = node.mesh_bounds {
            flat = flat.with_mesh();
            let matrix = world.compute_matrix();
            corners.extend(box_corners(&local).map(|c| matrix.transform_point3(c)));
        }
        let flat_index = nodes.len();
        nodes.push(flat);
        for &child in node.children.iter().rev() {
            if child < raw.len() {
                stack.push((child, Some(flat_index), world));
            }
        }
    }

    let mut model = LoadedModel::new(name)
        .with_nodes(nodes)
        .with_animations(animations);
    if let Some(bounds) = Bounds::from_points(corners) {
        model = model.with_bounds(bounds);
    }
    model
}

fn box_corners(b: &Bounds) -> [Vec3; 8] {
    let (lo, hi) = (b.min, b.max);
    [
        Vec3::new(lo.x, lo.y, lo.z),
        Vec3::new(hi.x, lo.y, lo.z),
        Vec3::new(lo.x, hi.y, lo.z),
        Vec3::new(hi.x, hi.y, lo.z),
        Vec3::new(lo.x, lo.y, hi.z),
        Vec3::new(hi.x, lo.y, hi.z),
        Vec3::new(lo.x, hi.y, hi.z),
        Vec3::new(hi.x, hi.y, hi.z),
    ]
}

fn raw_nodes(
    gltf: &Gltf,
    nodes: &Assets<GltfNode>,
    gltf_meshes: &Assets<GltfMesh>,
    meshes: &Assets<Mesh>,
) -> Vec<RawNode> {
    let index_of: HashMap<AssetId<GltfNode>, usize> = gltf
        .nodes
        .iter()
        .enumerate()
        .map(|(i, h)| (h.id(), i))
        .collect();

    gltf.nodes
        .iter()
        .enumerate()
        .map(|(i, handle)| {
            let Some(node) = nodes.get(handle) else {
                return RawNode {
                    name: format!("node{i}"),
                    children: Vec::new(),
                    transform: Transform::IDENTITY,
                    mesh_bounds: None,
                };
            };
            let mesh_bounds = node
                .mesh
                .as_ref()
                .and_then(|h| gltf_meshes.get(h))
                .and_then(|gm| {
                    let points = gm
                        .primitives
                        .iter()
                        .filter_map(|p| meshes.get(&p.mesh))
                        .filter_map(|m| m.compute_aabb())
                        .flat_map(|aabb| [Vec3::from(aabb.min()), Vec3::from(aabb.max())]);
                    Bounds::from_points(points)
                });
            RawNode {
                name: node.name.clone(),
                children: node
                    .children
                    .iter()
                    .filter_map(|c| index_of.get(&c.id()).copied())
                    .collect(),
                transform: node.transform,
                mesh_bounds,
            }
        })
        .collect()
}

// =============================================================================
// Systems
// =============================================================================

pub fn request_models(
    mut requests: EventReader<AssetFetchRequest>,
    asset_server: Res<AssetServer>,
    mut library: ResMut<ModelLibrary>,
) {
    for request in requests.read() {
        for descriptor in &request.descriptors {
            library.request(descriptor, &asset_server);
        }
        info!(
            "ModelLibrary: fetching {} models",
            request.descriptors.len()
        );
    }
}

/// Report every pending model that finished loading or failed.
pub fn poll_models(
    asset_server: Res<AssetServer>,
    gltfs: Res<Assets<Gltf>>,
    nodes: Res<Assets<GltfNode>>,
    gltf_meshes: Res<Assets<GltfMesh>>,
    meshes: Res<Assets<Mesh>>,
    mut library: ResMut<ModelLibrary>,
    mut reports: EventWriter<AssetLoadReport>,
) {
    if library.pending.is_empty() {
        return;
    }

    let pending = std::mem::take(&mut library.pending);
    for model in pending {
        let outcome = match asset_server.get_load_state(&model.handle) {
            Some(LoadState::Failed(err)) => {
                warn!("ModelLibrary: '{}' failed to load: {err}", model.name);
                Err(AssetError::Missing {
                    name: model.name.clone(),
                })
            }
            None => Err(AssetError::Missing {
                name: model.name.clone(),
            }),
            Some(_) if !asset_server.is_loaded_with_dependencies(&model.handle) => {
                library.pending.push(model);
                continue;
            }
            Some(_) => match gltfs.get(&model.handle) {
                Some(gltf) if !gltf.nodes.is_empty() => {
                    let mut clips: Vec<String> = gltf
                        .named_animations
                        .keys()
                        .map(|k| k.to_string())
                        .collect();
                    clips.sort();
                    let raw = raw_nodes(gltf, &nodes, &gltf_meshes, &meshes);
                    Ok(flatten(&model.name, &raw, clips))
                }
                _ => Err(AssetError::Malformed {
                    name: model.name.clone(),
                    reason: "no nodes".to_string(),
                }),
            },
        };
        reports.send(AssetLoadReport {
            name: model.name,
            outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, children: Vec<usize>, at: Vec3, mesh: bool) -> RawNode {
        RawNode {
            name: name.to_string(),
            children,
            transform: Transform::from_translation(at),
            mesh_bounds: mesh.then(|| Bounds::new(Vec3::splat(-1.0), Vec3::splat(1.0))),
        }
    }

    #[test]
    fn test_parents_precede_children() {
        // Child listed before its parent in the source order.
        let nodes = vec![
            raw("wall", vec![], Vec3::ZERO, true),
            raw("root", vec![0], Vec3::ZERO, false),
        ];
        let model = flatten("A1", &nodes, Vec::new());
        assert_eq!(model.nodes[0].name, "root");
        assert_eq!(model.nodes[1].name, "wall");
        assert_eq!(model.nodes[1].parent, Some(0));
    }

    #[test]
    fn test_bounds_use_world_transforms() {
        let nodes = vec![
            raw("root", vec![1], Vec3::new(10.0, 0.0, 0.0), false),
            raw("roof", vec![], Vec3::new(0.0, 5.0, 0.0), true),
        ];
        let model = flatten("A1", &nodes, Vec::new());
        let bounds = model.bounds.unwrap();
        assert_eq!(bounds.min, Vec3::new(9.0, 4.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(11.0, 6.0, 1.0));
    }

    #[test]
    fn test_nodes_carry_world_transforms() {
        let nodes = vec![
            raw("zuobiao", vec![1], Vec3::new(100.0, 0.0, 0.0), false),
            raw("shu_1", vec![], Vec3::new(1.0, 0.0, 0.0), false),
        ];
        let model = flatten("trees", &nodes, Vec::new());
        assert_eq!(model.nodes[1].name, "shu_1");
        assert_eq!(
            model.nodes[1].transform.translation,
            Vec3::new(101.0, 0.0, 0.0)
        );
    }

    #[test]
    fn test_meshless_model_has_no_bounds() {
        let nodes = vec![raw("empty", vec![], Vec3::ZERO, false)];
        let model = flatten("x", &nodes, vec!["Idle".into()]);
        assert!(model.bounds.is_none());
        assert_eq!(model.animations, vec!["Idle".to_string()]);
    }

    #[test]
    fn test_cyclic_children_visit_once() {
        let nodes = vec![
            raw("a", vec![1], Vec3::ZERO, false),
            raw("b", vec![0], Vec3::ZERO, false),
            raw("c", vec![], Vec3::ZERO, false),
        ];
        let model = flatten("loop", &nodes, Vec::new());
        // Only "c" is a root; the a/b cycle is unreachable.
        assert_eq!(model.nodes.len(), 1);
        assert_eq!(model.nodes[0].name, "c");
    }
}
