//! Outbound notifications for the host page.
//!
//! The controller appends [`HostNotification`]s to an outbox at fixed
//! lifecycle points; `flush_notifications` turns them into
//! [`HostNotificationEvent`]s every frame. The serialised form is the host
//! messaging protocol: `{"cmd": <name>, "param": <payload>}`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::registry::BuildingId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "param")]
pub enum HostNotification {
    #[serde(rename = "onLoading")]
    LoadingStarted,
    #[serde(rename = "onLoaded")]
    LoadingFinished,
    /// Ask the host to show an indoor scene.
    #[serde(rename = "web3dChangeIndoor")]
    ChangeIndoor(String),
    #[serde(rename = "buildingDetail")]
    DetailRequested { id: BuildingId },
    /// The "enter building" trigger.
    #[serde(rename = "dbClickBuilding")]
    EntityDoubleActivated(BuildingId),
    /// The "show info panel" trigger.
    #[serde(rename = "switchByBuildingId")]
    EntitySingleActivated(BuildingId),
    #[serde(rename = "alarmTrackIndex")]
    TrackIndexChanged(usize),
    // The host protocol spells these two "histroy".
    #[serde(rename = "histroyTrackRunning")]
    TrackRunning { time: f32 },
    #[serde(rename = "histroyTrackDone")]
    TrackDone,
}

impl HostNotification {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct HostNotificationEvent(pub HostNotification);

/// Request for the host orchestrator to switch the live subsystem.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct SubsystemSwitchRequest {
    pub target: String,
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_notification_shape() {
        assert_eq!(
            HostNotification::LoadingFinished.to_json().unwrap(),
            r#"{"cmd":"onLoaded"}"#
        );
    }

    #[test]
    fn test_detail_request_carries_id() {
        let json = HostNotification::DetailRequested {
            id: BuildingId::new("A1"),
        }
        .to_json()
        .unwrap();
        assert_eq!(json, r#"{"cmd":"buildingDetail","param":{"id":"A1"}}"#);
    }

    #[test]
    fn test_track_running_uses_host_spelling() {
        let json = HostNotification::TrackRunning { time: 1.5 }.to_json().unwrap();
        assert_eq!(json, r#"{"cmd":"histroyTrackRunning","param":{"time":1.5}}"#);
    }

    #[test]
    fn test_change_indoor_parses_back() {
        let parsed: HostNotification =
            serde_json::from_str(r#"{"cmd":"web3dChangeIndoor","param":"home"}"#).unwrap();
        assert_eq!(parsed, HostNotification::ChangeIndoor("home".into()));
    }
}
