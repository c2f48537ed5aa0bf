//! Spatial entity registry.
//!
//! Single source of truth for every building in the scene: its meshes, its
//! name label, its population badge and the search highlight. Meshes map back
//! to their owning building through a lookup table (`MeshRef -> BuildingId`),
//! so hit tests never walk a scene graph.
//!
//! Badge visibility is always derived: a badge is visible iff the building's
//! population is positive and the active filter contains [`BOARD_FILTER`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{BOARD_FILTER, GROUP_SEPARATOR, POPULATION_LABEL_SCALE};
use crate::instancing::group_key;

// =============================================================================
// Identifiers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(String);

impl BuildingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix shared by every part of one physical building (`A1_roof` -> `A1`).
    pub fn group_key(&self) -> &str {
        group_key(&self.0, GROUP_SEPARATOR)
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BuildingId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identity of one drawable: the asset it came from and its node name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshRef {
    pub asset: String,
    pub node: String,
}

impl MeshRef {
    pub fn new(asset: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            node: node.into(),
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A screen-anchored label attached to a world position.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub anchor: Vec3,
    pub visible: bool,
    pub scale: f32,
}

impl Label {
    pub fn name(text: impl Into<String>, anchor: Vec3) -> Self {
        Self {
            text: text.into(),
            anchor,
            visible: true,
            scale: 1.0,
        }
    }

    pub fn population(anchor: Vec3) -> Self {
        Self {
            text: "0".to_string(),
            anchor,
            visible: false,
            scale: POPULATION_LABEL_SCALE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingEntity {
    pub id: BuildingId,
    pub meshes: Vec<MeshRef>,
    pub name_label: Label,
    pub population_label: Label,
    pub population: u32,
    /// Same as `population_label.visible`.
    pub visible: bool,
}

/// One entry of a bulk population update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationUpdate {
    pub id: BuildingId,
    pub number: u32,
}

impl PopulationUpdate {
    pub fn new(id: &str, number: u32) -> Self {
        Self {
            id: BuildingId::new(id),
            number,
        }
    }
}

pub fn badge_visible(population: u32, filter: &BTreeSet<String>) -> bool {
    population > 0 && filter.contains(BOARD_FILTER)
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug)]
pub struct SpatialEntityRegistry {
    entities: BTreeMap<BuildingId, BuildingEntity>,
    mesh_owner: HashMap<MeshRef, BuildingId>,
    filter: BTreeSet<String>,
    highlighted: Option<BuildingId>,
    hovered_group: Option<String>,
    labels_suppressed: bool,
}

impl Default for SpatialEntityRegistry {
    fn default() -> Self {
        Self {
            entities: BTreeMap::new(),
            mesh_owner: HashMap::new(),
            filter: BTreeSet::from([BOARD_FILTER.to_string()]),
            highlighted: None,
            hovered_group: None,
            labels_suppressed: false,
        }
    }
}

impl SpatialEntityRegistry {
    /// Insert a building. Returns `false` and changes nothing if `id` exists.
    pub fn register(
        &mut self,
        id: BuildingId,
        meshes: Vec<MeshRef>,
        name_label: Label,
        population_label: Label,
    ) -> bool {
        if self.entities.contains_key(&id) {
            warn!("Registry: building '{}' already registered, ignoring", id);
            return false;
        }
        for mesh in &meshes {
            if let Some(previous) = self.mesh_owner.insert(mesh.clone(), id.clone()) {
                warn!(
                    "Registry: mesh {:?} moved from '{}' to '{}'",
                    mesh, previous, id
                );
            }
        }
        let mut entity = BuildingEntity {
            id: id.clone(),
            meshes,
            name_label,
            population_label,
            population: 0,
            visible: false,
        };
        Self::apply_visibility(&mut entity, &self.filter);
        self.entities.insert(id, entity);
        true
    }

    /// Apply updates in order; unknown ids are skipped. Returns how many applied.
    pub fn update_population(&mut self, updates: &[PopulationUpdate]) -> usize {
        let mut applied = 0;
        for update in updates {
            let Some(entity) = self.entities.get_mut(&update.id) else {
                debug!("Registry: population update for unknown '{}'", update.id);
                continue;
            };
            entity.population = update.number;
            entity.population_label.text = update.number.to_string();
            Self::apply_visibility(entity, &self.filter);
            applied += 1;
        }
        applied
    }

    /// Replace the filter set and recompute every badge.
    pub fn set_filter<I, S>(&mut self, filter: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = filter.into_iter().map(Into::into).collect();
        self.refresh_visibility();
    }

    pub fn refresh_visibility(&mut self) {
        for entity in self.entities.values_mut() {
            Self::apply_visibility(entity, &self.filter);
        }
    }

    fn apply_visibility(entity: &mut BuildingEntity, filter: &BTreeSet<String>) {
        entity.visible = badge_visible(entity.population, filter);
        entity.population_label.visible = entity.visible;
    }

    pub fn filter(&self) -> &BTreeSet<String> {
        &self.filter
    }

    pub fn lookup(&self, id: &BuildingId) -> Option<&BuildingEntity> {
        self.entities.get(id)
    }

    pub fn owner_of(&self, mesh: &MeshRef) -> Option<&BuildingId> {
        self.mesh_owner.get(mesh)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildingEntity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.mesh_owner.clear();
        self.highlighted = None;
        self.hovered_group = None;
    }

    // -------------------------------------------------------------------------
    // Highlight and hover
    // -------------------------------------------------------------------------

    /// Make `id` the single highlighted building. Unknown ids are ignored.
    pub fn highlight(&mut self, id: &BuildingId) -> bool {
        if !self.entities.contains_key(id) {
            return false;
        }
        self.highlighted = Some(id.clone());
        true
    }

    pub fn clear_highlight(&mut self) -> Option<BuildingId> {
        self.highlighted.take()
    }

    pub fn highlighted(&self) -> Option<&BuildingId> {
        self.highlighted.as_ref()
    }

    pub fn set_hovered_group(&mut self, key: Option<String>) {
        self.hovered_group = key;
    }

    pub fn hovered_group(&self) -> Option<&str> {
        self.hovered_group.as_deref()
    }

    /// Every mesh owned by a building whose id shares `key`.
    pub fn group_meshes(&self, key: &str) -> Vec<&MeshRef> {
        self.entities
            .values()
            .filter(|e| e.id.group_key() == key)
            .flat_map(|e| e.meshes.iter())
            .collect()
    }

    /// Meshes to outline: the hovered group plus the highlighted building.
    pub fn emphasized_meshes(&self) -> BTreeSet<&MeshRef> {
        let mut out: BTreeSet<&MeshRef> = BTreeSet::new();
        if let Some(key) = &self.hovered_group {
            out.extend(self.group_meshes(key));
        }
        if let Some(entity) = self.highlighted.as_ref().and_then(|id| self.entities.get(id)) {
            out.extend(entity.meshes.iter());
        }
        out
    }

    // -------------------------------------------------------------------------
    // Labels
    // -------------------------------------------------------------------------

    pub fn show_all_name_labels(&mut self) {
        for entity in self.entities.values_mut() {
            entity.name_label.visible = true;
        }
    }

    /// Hide every name label, suppress badges and drop highlight and hover.
    pub fn hide_all_labels(&mut self) {
        for entity in self.entities.values_mut() {
            entity.name_label.visible = false;
        }
        self.labels_suppressed = true;
        self.highlighted = None;
        self.hovered_group = None;
    }

    /// Show every name label again, lift badge suppression and recompute
    /// badges against the filter.
    pub fn restore_labels(&mut self) {
        self.show_all_name_labels();
        self.labels_suppressed = false;
        self.refresh_visibility();
    }

    pub fn labels_suppressed(&self) -> bool {
        self.labels_suppressed
    }

    /// Show only `id`'s name label.
    pub fn show_single_name_label(&mut self, id: &BuildingId) -> bool {
        if !self.entities.contains_key(id) {
            return false;
        }
        for entity in self.entities.values_mut() {
            entity.name_label.visible = &entity.id == id;
        }
        true
    }

    pub fn hide_name_label(&mut self, id: &BuildingId) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        entity.name_label.visible = false;
        true
    }
}
