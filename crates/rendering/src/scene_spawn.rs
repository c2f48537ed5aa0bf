//! Spawning accepted models into the world.
//!
//! Each accepted asset becomes one [`SceneRoot`] tagged with [`AssetRoot`].
//! Once the scene spawner has filled it in, every mesh entity gets a
//! [`PickMesh`] naming the glTF node it came from, so picking and outlines
//! can talk to the registry in [`MeshRef`] terms.

use bevy::gltf::Gltf;
use bevy::prelude::*;

use scene::collaborators::AnimationCollaborator;
use scene::controller::SceneSubsystem;
use scene::manifest::AssetClass;
use scene::registry::MeshRef;
use scene::AssetAccepted;

use crate::model_loader::ModelLibrary;

/// Root entity of one spawned model.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct AssetRoot {
    pub name: String,
    pub class: AssetClass,
}

/// A pickable mesh entity and the model node that owns it.
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PickMesh(pub MeshRef);

/// Walk up the hierarchy to the owning model root.
pub fn asset_root_of<'a>(
    mut entity: Entity,
    parents: &Query<&Parent>,
    roots: &'a Query<&AssetRoot>,
) -> Option<&'a AssetRoot> {
    loop {
        if let Ok(root) = roots.get(entity) {
            return Some(root);
        }
        entity = parents.get(entity).ok()?.get();
    }
}

pub fn spawn_accepted_assets(
    mut commands: Commands,
    mut accepted: EventReader<AssetAccepted>,
    library: Res<ModelLibrary>,
    gltfs: Res<Assets<Gltf>>,
    existing: Query<(Entity, &AssetRoot)>,
) {
    for AssetAccepted(asset) in accepted.read() {
        // A reload accepts the same names again.
        for (entity, root) in &existing {
            if root.name == asset.name {
                commands.entity(entity).despawn_recursive();
            }
        }

        let scene = library
            .gltf(&asset.name)
            .and_then(|h| gltfs.get(h))
            .and_then(|g| g.default_scene.clone().or_else(|| g.scenes.first().cloned()));
        let Some(scene) = scene else {
            warn!("SceneSpawn: '{}' has no scene to spawn", asset.name);
            continue;
        };

        commands.spawn((
            AssetRoot {
                name: asset.name.clone(),
                class: asset.class.clone(),
            },
            SceneRoot(scene),
            Transform::default(),
            Visibility::default(),
        ));
    }
}

/// Tag freshly spawned mesh entities with the node they belong to. Scenery
/// prototypes are hidden: they are drawn through instancing only.
pub fn tag_pick_meshes(
    mut commands: Commands,
    new_meshes: Query<(Entity, &Parent), (Added<Mesh3d>, Without<PickMesh>)>,
    names: Query<&Name>,
    parents: Query<&Parent>,
    roots: Query<&AssetRoot>,
    subsystem: Res<SceneSubsystem>,
) {
    let prototype_group = &subsystem.manifest().instancing.prototype_group;

    for (entity, parent) in &new_meshes {
        let node_entity = parent.get();
        let Some(root) = asset_root_of(node_entity, &parents, &roots) else {
            // Instances and gizmo meshes have no model root.
            continue;
        };
        let Ok(node_name) = names.get(node_entity) else {
            continue;
        };

        let mut entity_commands = commands.entity(entity);
        entity_commands.insert(PickMesh(MeshRef::new(
            root.name.as_str(),
            node_name.as_str(),
        )));

        if root.class == AssetClass::Scenery
            && in_group(node_entity, prototype_group, &names, &parents)
        {
            entity_commands.insert(Visibility::Hidden);
        }
    }
}

fn in_group(mut entity: Entity, group: &str, names: &Query<&Name>, parents: &Query<&Parent>) -> bool {
    loop {
        if names
            .get(entity)
            .is_ok_and(|n| n.as_str().contains(group))
        {
            return true;
        }
        match parents.get(entity) {
            Ok(p) => entity = p.get(),
            Err(_) => return false,
        }
    }
}

// =============================================================================
// Clip playback
// =============================================================================

/// Start the looping clip for every animated model as its player appears.
#[allow(clippy::too_many_arguments)]
pub fn start_looping_clips(
    mut commands: Commands,
    mut players: Query<(Entity, &mut AnimationPlayer), Added<AnimationPlayer>>,
    parents: Query<&Parent>,
    roots: Query<&AssetRoot>,
    subsystem: Res<SceneSubsystem>,
    library: Res<ModelLibrary>,
    gltfs: Res<Assets<Gltf>>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
) {
    let Some(animation) = subsystem.collaborators().get::<AnimationCollaborator>() else {
        return;
    };

    for (entity, mut player) in &mut players {
        let Some(root) = asset_root_of(entity, &parents, &roots) else {
            continue;
        };
        let Some(looping) = animation.clips().iter().find(|c| c.asset == root.name) else {
            continue;
        };
        let clip = library
            .gltf(&root.name)
            .and_then(|h| gltfs.get(h))
            .and_then(|g| g.named_animations.get(looping.clip.as_str()).cloned());
        let Some(clip) = clip else {
            warn!(
                "SceneSpawn: clip '{}' missing from '{}'",
                looping.clip, root.name
            );
            continue;
        };

        let (graph, index) = AnimationGraph::from_clip(clip);
        commands
            .entity(entity)
            .insert(AnimationGraphHandle(graphs.add(graph)));
        player.play(index).repeat();
        if !animation.is_playing() {
            player.pause_all();
        }
    }
}

/// Pause clips while the scene is not entered.
pub fn sync_clip_playback(
    subsystem: Res<SceneSubsystem>,
    mut players: Query<&mut AnimationPlayer>,
    mut was_playing: Local<bool>,
) {
    let playing = subsystem
        .collaborators()
        .get::<AnimationCollaborator>()
        .is_some_and(|a| a.is_playing());
    if playing == *was_playing {
        return;
    }
    *was_playing = playing;
    for mut player in &mut players {
        if playing {
            player.resume_all();
        } else {
            player.pause_all();
        }
    }
}

/// Drop every spawned model once the subsystem is destroyed.
pub fn despawn_models(mut commands: Commands, roots: Query<Entity, With<AssetRoot>>) {
    for entity in &roots {
        commands.entity(entity).despawn_recursive();
    }
}
