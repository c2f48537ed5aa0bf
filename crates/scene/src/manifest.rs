//! Static scene manifest.
//!
//! The manifest is the single persisted input of the scene: which model files
//! make up the campus, how each one is classified, the display name of every
//! building, the instancing rules for repeated scenery and the runtime
//! [`SubsystemConfig`]. It is read once when the subsystem starts
//! initializing and treated as immutable afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SubsystemConfig;
use crate::instancing::InstancingRules;
use crate::registry::BuildingId;

// =============================================================================
// Descriptors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Glb,
    Gltf,
}

impl AssetKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "glb" => Some(AssetKind::Glb),
            "gltf" => Some(AssetKind::Gltf),
            _ => None,
        }
    }
}

/// One model to fetch. Created from the manifest, consumed once by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub name: String,
    pub path: String,
    pub kind: AssetKind,
}

impl AssetDescriptor {
    /// Build a descriptor from a model file name inside `dir`.
    ///
    /// The asset name is the file stem; files with an unsupported extension
    /// yield `None`.
    pub fn from_file(dir: &str, file: &str) -> Option<Self> {
        let path = Path::new(file);
        let kind = AssetKind::from_extension(path.extension()?.to_str()?)?;
        let name = path.file_stem()?.to_str()?.to_string();
        let dir = dir.trim_end_matches('/');
        let path = if dir.is_empty() {
            file.to_string()
        } else {
            format!("{dir}/{file}")
        };
        Some(Self { name, path, kind })
    }
}

// =============================================================================
// Classification
// =============================================================================

/// What a loaded asset means to the scene, resolved once at load time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "lowercase")]
pub enum AssetClass {
    /// The ground plane: camera framing, altitude floor and weather bounds.
    Ground,
    /// A building registered in the spatial registry under `id`.
    Building { id: BuildingId },
    /// Drawn as-is, never registered.
    #[default]
    Decoration,
    /// Carries instance markers and prototypes for the instance batcher.
    Scenery,
}

// =============================================================================
// Manifest
// =============================================================================

fn default_model_dir() -> String {
    "models/outDoor".to_string()
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneManifest {
    #[serde(default = "default_model_dir")]
    pub model_dir: String,
    /// Model file names, relative to `model_dir`.
    #[serde(default)]
    pub models: Vec<String>,
    /// Asset name -> class. Unlisted assets are decorations.
    #[serde(default)]
    pub classification: BTreeMap<String, AssetClass>,
    /// Building id -> label text.
    #[serde(default)]
    pub display_names: BTreeMap<BuildingId, String>,
    #[serde(default)]
    pub instancing: InstancingRules,
    #[serde(default)]
    pub settings: SubsystemConfig,
}

impl Default for SceneManifest {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            models: Vec::new(),
            classification: BTreeMap::new(),
            display_names: BTreeMap::new(),
            instancing: InstancingRules::default(),
            settings: SubsystemConfig::default(),
        }
    }
}

impl SceneManifest {
    pub fn from_json_str(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Descriptors for every model with a supported extension, in manifest order.
    pub fn descriptors(&self) -> Vec<AssetDescriptor> {
        self.models
            .iter()
            .filter_map(|file| {
                let descriptor = AssetDescriptor::from_file(&self.model_dir, file);
                if descriptor.is_none() {
                    warn!("Manifest: skipping '{}' (unsupported model file)", file);
                }
                descriptor
            })
            .collect()
    }

    pub fn classify(&self, asset_name: &str) -> AssetClass {
        self.classification
            .get(asset_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Label text for a building, falling back to its id.
    pub fn display_name(&self, id: &BuildingId) -> String {
        self.display_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.as_str().to_string())
    }

    /// Insert a classification entry (builder style, mainly for hosts and tests).
    pub fn with_asset(mut self, file: &str, class: AssetClass) -> Self {
        if let Some(descriptor) = AssetDescriptor::from_file("", file) {
            self.classification.insert(descriptor.name, class);
        }
        self.models.push(file.to_string());
        self
    }

    pub fn with_display_name(mut self, id: &str, text: &str) -> Self {
        self.display_names.insert(BuildingId::new(id), text.to_string());
        self
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Failure to obtain the manifest as a whole (transport-level).
#[derive(Debug)]
pub enum ManifestError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Io(e) => write!(f, "manifest I/O error: {e}"),
            ManifestError::Parse(e) => write!(f, "manifest parse error: {e}"),
        }
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ManifestError::Io(e) => Some(e),
            ManifestError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ManifestError {
    fn from(e: std::io::Error) -> Self {
        ManifestError::Io(e)
    }
}

impl From<serde_json::Error> for ManifestError {
    fn from(e: serde_json::Error) -> Self {
        ManifestError::Parse(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "model_dir": "models/outDoor/",
        "models": ["地面.glb", "A1_Building.glb", "trees.gltf", "readme.txt"],
        "classification": {
            "地面": {"class": "ground"},
            "A1_Building": {"class": "building", "id": "A1_Building"},
            "trees": {"class": "scenery"}
        },
        "display_names": {"A1_Building": "Library"}
    }"#;

    #[test]
    fn test_descriptor_from_file_splits_stem_and_kind() {
        let d = AssetDescriptor::from_file("models/outDoor", "A1_Building.glb").unwrap();
        assert_eq!(d.name, "A1_Building");
        assert_eq!(d.path, "models/outDoor/A1_Building.glb");
        assert_eq!(d.kind, AssetKind::Glb);
        assert!(AssetDescriptor::from_file("models", "notes.txt").is_none());
        assert!(AssetDescriptor::from_file("models", "no_extension").is_none());
    }

    #[test]
    fn test_manifest_descriptors_skip_unsupported_files() {
        let manifest = SceneManifest::from_json_str(SAMPLE).unwrap();
        let names: Vec<_> = manifest.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["地面", "A1_Building", "trees"]);
    }

    #[test]
    fn test_manifest_classification_defaults_to_decoration() {
        let manifest = SceneManifest::from_json_str(SAMPLE).unwrap();
        assert_eq!(manifest.classify("地面"), AssetClass::Ground);
        assert_eq!(
            manifest.classify("A1_Building"),
            AssetClass::Building {
                id: BuildingId::new("A1_Building")
            }
        );
        assert_eq!(manifest.classify("bench"), AssetClass::Decoration);
    }

    #[test]
    fn test_manifest_display_name_falls_back_to_id() {
        let manifest = SceneManifest::from_json_str(SAMPLE).unwrap();
        assert_eq!(manifest.display_name(&BuildingId::new("A1_Building")), "Library");
        assert_eq!(manifest.display_name(&BuildingId::new("B2")), "B2");
    }

    #[test]
    fn test_manifest_minimal_document_uses_defaults() {
        let manifest = SceneManifest::from_json_str("{}").unwrap();
        assert_eq!(manifest.model_dir, "models/outDoor");
        assert!(manifest.descriptors().is_empty());
        assert_eq!(manifest.instancing, InstancingRules::default());
    }

    #[test]
    fn test_manifest_parse_error_is_reported() {
        let err = SceneManifest::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
        assert!(err.to_string().starts_with("manifest parse error"));
    }

    #[test]
    fn test_manifest_missing_file_is_io_error() {
        let err = SceneManifest::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
    }
}
