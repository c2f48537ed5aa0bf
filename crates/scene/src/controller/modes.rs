//! Sub-modes of the entered scene.
//!
//! A sub-mode swaps the Normal handler set for its own (or for none, in the
//! case of track playback). Entering one quietly ends whichever other
//! sub-mode was running; leaving one rebinds Normal and frames the campus.

use std::time::Duration;

use bevy::prelude::*;

use crate::camera_motion::Completion;
use crate::config::RESET_DURATION_MS;
use crate::measure::MeasureTool;
use crate::notifications::HostNotification;
use crate::subscriptions::{BOX_SELECT_CHANNELS, MEASURE_CHANNELS, NORMAL_CHANNELS};
use crate::track::{TrackCommand, TrackEvent};

use super::{SceneSubsystem, SubsystemPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubMode {
    #[default]
    Normal,
    MeasuringDistance,
    MeasuringArea,
    Tracking,
    BoxSelect,
}

impl SceneSubsystem {
    /// Switch into `mode`. Only legal while entered; re-entering the current
    /// mode changes nothing.
    pub fn enter_sub_mode(&mut self, mode: SubMode) -> bool {
        if self.phase != SubsystemPhase::Entered {
            warn!("SceneSubsystem: {:?} ignored in {:?}", mode, self.phase);
            return false;
        }
        if mode == SubMode::Normal {
            return self.exit_sub_mode(self.sub_mode).is_some();
        }
        if self.sub_mode == mode {
            return true;
        }

        self.abandon_sub_mode();
        self.normal.unbind();
        match mode {
            SubMode::MeasuringDistance => {
                self.distance.start();
                self.mode_bindings.bind(MEASURE_CHANNELS);
            }
            SubMode::MeasuringArea => {
                self.area.start();
                self.mode_bindings.bind(MEASURE_CHANNELS);
            }
            SubMode::Tracking => {
                self.registry.clear_highlight();
                self.registry.set_hovered_group(None);
                if let Some(tooltip) = &mut self.tooltip {
                    tooltip.hide();
                }
            }
            SubMode::BoxSelect => {
                self.box_select.reset();
                self.mode_bindings.bind(BOX_SELECT_CHANNELS);
            }
            SubMode::Normal => {}
        }
        info!("SceneSubsystem: sub-mode {:?}", mode);
        self.sub_mode = mode;
        true
    }

    /// Leave `mode` if it is the current sub-mode: rebind Normal and reset
    /// the camera. Returns the reset's completion, `None` if nothing changed.
    pub fn exit_sub_mode(&mut self, mode: SubMode) -> Option<Completion> {
        if self.phase != SubsystemPhase::Entered
            || mode == SubMode::Normal
            || self.sub_mode != mode
        {
            debug!(
                "SceneSubsystem: exit {:?} ignored (current {:?})",
                mode, self.sub_mode
            );
            return None;
        }
        self.abandon_sub_mode();
        self.normal.bind(NORMAL_CHANNELS);
        info!("SceneSubsystem: back to normal");
        Some(self.reset_camera(Duration::from_millis(RESET_DURATION_MS)))
    }

    /// Tear down the current sub-mode without rebinding or moving the camera.
    pub(super) fn abandon_sub_mode(&mut self) {
        match self.sub_mode {
            SubMode::MeasuringDistance => {
                info!("SceneSubsystem: measured distance {:.2}", self.distance.value());
                self.distance.end();
            }
            SubMode::MeasuringArea => {
                info!(
                    "SceneSubsystem: measured area {:.2} (perimeter {:.2})",
                    self.area.value(),
                    self.area.perimeter()
                );
                self.area.end();
            }
            SubMode::Tracking => self.track.pause(),
            SubMode::BoxSelect => self.box_select.reset(),
            SubMode::Normal => {}
        }
        self.mode_bindings.unbind();
        self.sub_mode = SubMode::Normal;
    }

    /// The measuring tool of the current sub-mode, if it is a measuring one.
    pub fn active_measurement(&self) -> Option<&MeasureTool> {
        match self.sub_mode {
            SubMode::MeasuringDistance => Some(&self.distance),
            SubMode::MeasuringArea => Some(&self.area),
            _ => None,
        }
    }

    pub(super) fn active_measure_tool(&mut self) -> Option<&mut MeasureTool> {
        match self.sub_mode {
            SubMode::MeasuringDistance => Some(&mut self.distance),
            SubMode::MeasuringArea => Some(&mut self.area),
            _ => None,
        }
    }

    // =========================================================================
    // Track playback
    // =========================================================================

    pub fn track_command(&mut self, command: TrackCommand) {
        if self.phase != SubsystemPhase::Entered {
            warn!("SceneSubsystem: track command ignored in {:?}", self.phase);
            return;
        }
        match command {
            TrackCommand::Init { path } => {
                self.enter_sub_mode(SubMode::Tracking);
                info!("SceneSubsystem: track loaded ({} points)", path.len());
                self.track.load(path);
            }
            TrackCommand::Play if self.sub_mode == SubMode::Tracking => self.track.play(),
            TrackCommand::Pause if self.sub_mode == SubMode::Tracking => self.track.pause(),
            TrackCommand::Clear if self.sub_mode == SubMode::Tracking => {
                self.track.clear();
                self.exit_sub_mode(SubMode::Tracking);
            }
            other => debug!("SceneSubsystem: {:?} ignored outside tracking", other),
        }
    }

    pub(super) fn advance_track(&mut self, dt: Duration) {
        for event in self.track.advance(dt) {
            let notification = match event {
                TrackEvent::IndexChanged(index) => HostNotification::TrackIndexChanged(index),
                TrackEvent::Running(time) => HostNotification::TrackRunning { time },
                TrackEvent::Done => HostNotification::TrackDone,
            };
            self.outputs.notifications.push(notification);
        }
    }
}
