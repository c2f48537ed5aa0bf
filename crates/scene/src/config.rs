//! Scene tuning constants and runtime settings.
//!
//! Compile-time values live here as `pub const`s. The handful of knobs that a
//! deployment may want to change without a rebuild are collected in
//! [`SubsystemConfig`], which is read from the `settings` block of the scene
//! manifest.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// =============================================================================
// Camera
// =============================================================================

/// Distance below which a camera endpoint counts as "already there".
pub const CAMERA_TOLERANCE: f32 = 5.0;

/// Duration of the one-off arrival framing after the first load.
pub const ARRIVAL_DURATION_MS: u64 = 1500;

/// Duration of the reset issued on every re-entry and on sub-mode exit.
pub const RESET_DURATION_MS: u64 = 1000;

/// Duration of the framing motion that follows a search.
pub const SEARCH_DURATION_MS: u64 = 1000;
pub const SEARCH_DISTANCE: f32 = 20.0;
pub const SEARCH_OFFSET: Vec3 = Vec3::new(2.0, 2.0, 0.0);

/// Ground double-click focus.
pub const GROUND_FOCUS_DURATION_MS: u64 = 1000;
pub const GROUND_FOCUS_DISTANCE: f32 = 50.0;
pub const GROUND_FOCUS_OFFSET: Vec3 = Vec3::new(0.0, 10.0, 0.0);

/// Reset framing: camera sits at `(0, r * RESET_HEIGHT_FACTOR, r * RESET_DEPTH_FACTOR)`.
pub const RESET_HEIGHT_FACTOR: f32 = 0.25;
pub const RESET_DEPTH_FACTOR: f32 = 0.68;

/// User-controlled camera (and its target) stays inside this sphere.
pub const CAMERA_SPHERE_RADIUS: f32 = 2880.0;

/// Altitude floor used until a ground asset reports its own.
pub const DEFAULT_ALTITUDE: f32 = -20.0;

/// The camera may not orbit below the horizon.
pub const MAX_POLAR_ANGLE: f32 = std::f32::consts::FRAC_PI_2;

// =============================================================================
// Labels and overlays
// =============================================================================

/// Filter key that enables population badges.
pub const BOARD_FILTER: &str = "buildingBoard";

/// Separator between a group key and the rest of a name (`A1_Building` -> `A1`).
pub const GROUP_SEPARATOR: char = '_';

pub const POPULATION_LABEL_SCALE: f32 = 0.2;

/// Height of the hover tooltip above a building's top.
pub const TOOLTIP_LIFT: f32 = 10.0;
/// Height of the tooltip above a hovered name label.
pub const LABEL_TOOLTIP_LIFT: f32 = 5.0;

pub const SCENE_HINT: &str = "Double right-click to restore the default view";

// =============================================================================
// Host integration
// =============================================================================

/// Subsystem the host switches to when a building is double-clicked.
pub const INDOOR_SUBSYSTEM: &str = "indoorSubsystem";

/// Indoor scene announced to the host on first arrival.
pub const HOME_SCENE: &str = "home";

// =============================================================================
// Lighting
// =============================================================================

pub const AMBIENT_INTENSITY: f32 = 1.25;
pub const KEY_LIGHT_INTENSITY: f32 = 1.55;
pub const KEY_LIGHT_POSITION: Vec3 = Vec3::new(-800.0, 1300.0, 1000.0);

// =============================================================================
// Weather
// =============================================================================

/// Horizontal padding applied to the ground bounds.
pub const WEATHER_PADDING: f32 = 100.0;
/// Headroom added above the ground bounds.
pub const WEATHER_HEADROOM: f32 = 500.0;

// =============================================================================
// Runtime settings
// =============================================================================

/// Deployment-level settings embedded in the manifest under `settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsystemConfig {
    /// Resume the slow camera orbit whenever the scene is entered.
    pub roam_enabled: bool,
    /// Seconds for one full roam revolution.
    pub roam_period_secs: f32,
    /// Only react to hover on alternating slots of this length (seconds).
    pub hover_slot_secs: f32,
}

impl Default for SubsystemConfig {
    fn default() -> Self {
        Self {
            roam_enabled: false,
            roam_period_secs: 120.0,
            hover_slot_secs: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let cfg: SubsystemConfig = serde_json::from_str(r#"{"roam_enabled": true}"#).unwrap();
        assert!(cfg.roam_enabled);
        assert_eq!(cfg.roam_period_secs, 120.0);
        assert_eq!(cfg.hover_slot_secs, 0.1);
    }
}
