//! History track playback.
//!
//! A track is a timed polyline (for example the recorded route of a person
//! through the campus). Playback advances a clock over it and reports each
//! time the current point changes, a running timestamp while playing, and a
//! single "done" when the end is reached.

use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub position: Vec3,
    /// Seconds since the start of the track.
    pub time: f32,
}

/// Inbound track command from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "param", rename_all = "camelCase")]
pub enum TrackCommand {
    #[serde(rename = "trackInit")]
    Init { path: Vec<TrackPoint> },
    #[serde(rename = "trackPlay")]
    Play,
    #[serde(rename = "trackPause")]
    Pause,
    #[serde(rename = "trackClear")]
    Clear,
}

/// Something the host should hear about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackEvent {
    IndexChanged(usize),
    Running(f32),
    Done,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackPlayback {
    path: Vec<TrackPoint>,
    clock: f32,
    index: usize,
    playing: bool,
    finished: bool,
}

impl TrackPlayback {
    pub fn load(&mut self, path: Vec<TrackPoint>) {
        self.path = path;
        self.clock = 0.0;
        self.index = 0;
        self.playing = false;
        self.finished = false;
    }

    pub fn clear(&mut self) {
        self.load(Vec::new());
    }

    pub fn play(&mut self) {
        if !self.path.is_empty() && !self.finished {
            self.playing = true;
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn path(&self) -> &[TrackPoint] {
        &self.path
    }

    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// Interpolated position at the current clock.
    pub fn position(&self) -> Option<Vec3> {
        let current = self.path.get(self.index)?;
        let Some(next) = self.path.get(self.index + 1) else {
            return Some(current.position);
        };
        let span = next.time - current.time;
        if span <= f32::EPSILON {
            return Some(current.position);
        }
        let t = ((self.clock - current.time) / span).clamp(0.0, 1.0);
        Some(current.position.lerp(next.position, t))
    }

    pub fn advance(&mut self, dt: Duration) -> Vec<TrackEvent> {
        let mut events = Vec::new();
        if !self.playing {
            return events;
        }
        let end = self.path.last().map(|p| p.time).unwrap_or(0.0);
        self.clock = (self.clock + dt.as_secs_f32()).min(end);

        let mut index = self.index;
        while index + 1 < self.path.len() && self.path[index + 1].time <= self.clock {
            index += 1;
        }
        if index != self.index {
            self.index = index;
            events.push(TrackEvent::IndexChanged(index));
        }
        events.push(TrackEvent::Running(self.clock));

        if self.clock >= end {
            self.playing = false;
            self.finished = true;
            events.push(TrackEvent::Done);
        }
        events
    }
}
