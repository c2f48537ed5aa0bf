//! Scenery instancing.
//!
//! Every [`InstanceBatchReady`] spawns one entity per marker transform, all
//! sharing the prototype's mesh and material handles so the renderer can
//! batch them. Foliage is hidden when the camera pulls far back.

use bevy::gltf::{Gltf, GltfMesh, GltfNode};
use bevy::prelude::*;

use scene::controller::SceneSubsystem;
use scene::InstanceBatchReady;

use crate::model_loader::ModelLibrary;

/// Camera-to-target distance beyond which foliage instances are hidden.
const FOLIAGE_LOD_DISTANCE: f32 = 1500.0;

/// One placed copy of a scenery prototype.
#[derive(Component, Debug)]
pub struct SceneryInstance {
    pub key: String,
}

#[derive(Component)]
pub struct Foliage;

/// Mesh primitive of a prototype, relative to the prototype node.
struct PrototypePart {
    mesh: Handle<Mesh>,
    material: Handle<StandardMaterial>,
    transform: Transform,
}

fn collect_parts(
    node: &GltfNode,
    relative: Transform,
    nodes: &Assets<GltfNode>,
    gltf_meshes: &Assets<GltfMesh>,
    out: &mut Vec<PrototypePart>,
) {
    if let Some(gltf_mesh) = node.mesh.as_ref().and_then(|h| gltf_meshes.get(h)) {
        for primitive in &gltf_mesh.primitives {
            out.push(PrototypePart {
                mesh: primitive.mesh.clone(),
                material: primitive.material.clone().unwrap_or_default(),
                transform: relative,
            });
        }
    }
    for child in node.children.iter().filter_map(|h| nodes.get(h)) {
        collect_parts(
            child,
            relative.mul_transform(child.transform),
            nodes,
            gltf_meshes,
            out,
        );
    }
}

pub fn spawn_instance_batches(
    mut commands: Commands,
    mut batches: EventReader<InstanceBatchReady>,
    library: Res<ModelLibrary>,
    gltfs: Res<Assets<Gltf>>,
    nodes: Res<Assets<GltfNode>>,
    gltf_meshes: Res<Assets<GltfMesh>>,
    existing: Query<(Entity, &SceneryInstance)>,
) {
    for InstanceBatchReady { batch, prototype } in batches.read() {
        for (entity, instance) in &existing {
            if instance.key == batch.key {
                commands.entity(entity).despawn_recursive();
            }
        }

        let node = library
            .gltf(&prototype.asset)
            .and_then(|h| gltfs.get(h))
            .and_then(|g| g.named_nodes.get(prototype.node.as_str()))
            .and_then(|h| nodes.get(h));
        let Some(node) = node else {
            warn!(
                "Instances: prototype '{}' not found in '{}'",
                prototype.node, prototype.asset
            );
            continue;
        };

        let mut parts = Vec::new();
        collect_parts(node, Transform::IDENTITY, &nodes, &gltf_meshes, &mut parts);
        if parts.is_empty() {
            warn!("Instances: prototype '{}' has no meshes", prototype.node);
            continue;
        }

        for transform in &batch.transforms {
            let placed = transform.with_scale(transform.scale * batch.scale);
            let mut instance = commands.spawn((
                SceneryInstance {
                    key: batch.key.clone(),
                },
                placed,
                Visibility::default(),
            ));
            if batch.foliage {
                instance.insert(Foliage);
            }
            instance.with_children(|parent| {
                for part in &parts {
                    parent.spawn((
                        Mesh3d(part.mesh.clone()),
                        MeshMaterial3d(part.material.clone()),
                        part.transform,
                    ));
                }
            });
        }
        info!(
            "Instances: spawned {} x '{}'",
            batch.transforms.len(),
            batch.key
        );
    }
}

/// LOD: hide foliage when the camera is far from its target.
pub fn update_foliage_lod(
    subsystem: Res<SceneSubsystem>,
    mut foliage: Query<&mut Visibility, With<Foliage>>,
) {
    if !subsystem.is_changed() {
        return;
    }
    let rig = subsystem.rig();
    let visibility = if rig.position.distance(rig.target) <= FOLIAGE_LOD_DISTANCE {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    for mut vis in &mut foliage {
        vis.set_if_neq(visibility);
    }
}

pub fn despawn_instances(mut commands: Commands, instances: Query<Entity, With<SceneryInstance>>) {
    for entity in &instances {
        commands.entity(entity).despawn_recursive();
    }
}
