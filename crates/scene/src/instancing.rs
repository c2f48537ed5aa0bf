//! Instance batching for repeated scenery.
//!
//! Scenery assets place hundreds of identical props (trees, lamps, benches)
//! as empty marker nodes named `<key>_<n>` under a marker group, plus one
//! prototype mesh per key under a prototype group. [`batch`] partitions the
//! markers by key and produces one [`InstanceBatch`] per key. It is a
//! one-shot transform over the load-time marker list.
//!
//! Foliage keys keep only marker positions; their yaw comes from a seeded
//! `ChaCha8Rng` so repeated loads look identical.

use std::collections::HashMap;
use std::f32::consts::TAU;

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::GROUP_SEPARATOR;
use crate::model::LoadedModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstancingRules {
    /// Nodes whose name contains this hold instance markers.
    pub marker_group: String,
    /// Nodes whose name contains this hold one prototype per key.
    pub prototype_group: String,
    pub separator: char,
    /// Keys containing any of these are foliage.
    pub foliage_keys: Vec<String>,
    pub scale: f32,
    pub seed: u64,
}

impl Default for InstancingRules {
    fn default() -> Self {
        Self {
            marker_group: "zuobiao".to_string(),
            prototype_group: "shili".to_string(),
            separator: GROUP_SEPARATOR,
            foliage_keys: vec!["shu".to_string()],
            scale: 1.0,
            seed: 0x5EED,
        }
    }
}

impl InstancingRules {
    pub fn is_foliage(&self, key: &str) -> bool {
        self.foliage_keys.iter().any(|f| key.contains(f.as_str()))
    }
}

/// Prefix of `name` before the first `separator` (the whole name if absent).
pub fn group_key(name: &str, separator: char) -> &str {
    name.split(separator).next().unwrap_or(name)
}

/// One placed copy of a prototype.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceMarker {
    pub name: String,
    /// World-space transform of the marker.
    pub transform: Transform,
}

/// A prototype mesh available for instancing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstancePrototype {
    pub asset: String,
    pub node: String,
}

/// One batched drawable: a prototype key and every placement of it.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceBatch {
    pub key: String,
    pub transforms: Vec<Transform>,
    pub foliage: bool,
    pub scale: f32,
}

/// Markers and prototypes found in one scenery model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneryContent {
    pub markers: Vec<InstanceMarker>,
    pub prototypes: Vec<InstancePrototype>,
}

/// Pull markers (descendants of marker groups) and prototypes (direct
/// children of prototype groups) out of a scenery model.
pub fn collect_scenery(model: &LoadedModel, rules: &InstancingRules) -> SceneryContent {
    let mut content = SceneryContent::default();
    for group in model.nodes_named_like(&rules.marker_group) {
        for index in model.descendants_of(group) {
            let node = &model.nodes[index];
            content.markers.push(InstanceMarker {
                name: node.name.clone(),
                transform: node.transform,
            });
        }
    }
    for group in model.nodes_named_like(&rules.prototype_group) {
        for index in model.children_of(group) {
            content.prototypes.push(InstancePrototype {
                asset: model.name.clone(),
                node: model.nodes[index].name.clone(),
            });
        }
    }
    content
}

/// Partition markers by key, in first-appearance order.
pub fn batch(markers: &[InstanceMarker], rules: &InstancingRules) -> Vec<InstanceBatch> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&InstanceMarker>> = HashMap::new();
    for marker in markers {
        let key = group_key(&marker.name, rules.separator);
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(marker);
    }

    order
        .into_iter()
        .map(|key| {
            let members = groups.remove(key).unwrap_or_default();
            let foliage = rules.is_foliage(key);
            let transforms = if foliage {
                let mut rng = ChaCha8Rng::seed_from_u64(rules.seed ^ key_hash(key));
                members
                    .iter()
                    .map(|m| {
                        Transform::from_translation(m.transform.translation)
                            .with_rotation(Quat::from_rotation_y(rng.gen_range(0.0..TAU)))
                    })
                    .collect()
            } else {
                members
                    .iter()
                    .map(|m| {
                        Transform::from_translation(m.transform.translation)
                            .with_rotation(m.transform.rotation)
                    })
                    .collect()
            };
            InstanceBatch {
                key: key.to_string(),
                transforms,
                foliage,
                scale: rules.scale,
            }
        })
        .collect()
}

/// FNV-1a, so per-key seeds are stable across platforms and runs.
fn key_hash(key: &str) -> u64 {
    key.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}
