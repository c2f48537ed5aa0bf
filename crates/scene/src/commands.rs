//! Inbound commands from the host orchestrator.
//!
//! Commands are plain method calls on the controller wrapped in a Bevy event
//! so the host (or a JSON bridge) can queue them from anywhere. The JSON form
//! mirrors the outbound protocol: `{"cmd": <name>, "param": <payload>}`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::registry::{BuildingId, PopulationUpdate};
use crate::track::TrackCommand;

#[derive(Event, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "param", rename_all = "camelCase")]
pub enum SubsystemCommand {
    Activate,
    Deactivate,
    Reload,
    Destroy,
    UpdatePopulation(Vec<PopulationUpdate>),
    SetFilter(Vec<String>),
    Search { id: BuildingId },
    StartMeasuringDistance,
    StopMeasuringDistance,
    StartMeasuringArea,
    StopMeasuringArea,
    StartBoxSelect,
    StopBoxSelect,
    Track(TrackCommand),
    ResetCamera { duration_ms: u64 },
    ShowAllLabels,
    HideAllLabels,
    ShowLabel { id: BuildingId },
    HideLabel { id: BuildingId },
    SetRoam { enabled: bool },
}

impl SubsystemCommand {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
