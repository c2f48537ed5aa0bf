//! Assertion helpers for `TestScene` integration tests.

use crate::config::BOARD_FILTER;
use crate::controller::SubsystemPhase;
use crate::notifications::HostNotification;
use crate::subscriptions::NORMAL_CHANNELS;

use super::TestScene;

impl TestScene {
    pub fn assert_phase(&self, expected: SubsystemPhase) {
        let phase = self.phase();
        assert_eq!(phase, expected, "Expected phase {expected:?}, got {phase:?}");
    }

    pub fn assert_registered(&self, expected: usize) {
        let count = self.registry().len();
        assert_eq!(
            count, expected,
            "Expected {expected} registered buildings, got {count}"
        );
    }

    /// Every badge is visible exactly when its population is positive and
    /// the board filter is on.
    pub fn assert_badge_invariant(&self) {
        let board = self.registry().filter().contains(BOARD_FILTER);
        for entity in self.registry().iter() {
            let expected = entity.population > 0 && board;
            assert_eq!(
                entity.population_label.visible, expected,
                "Badge of '{}' (population {}) visible={}, expected {}",
                entity.id, entity.population, entity.population_label.visible, expected
            );
            assert_eq!(entity.visible, entity.population_label.visible);
        }
    }

    /// Exactly the Normal handler set is bound, once.
    pub fn assert_normal_bound(&self) {
        let bound = self.subsystem().normal_bindings().channels();
        assert_eq!(bound, &NORMAL_CHANNELS, "Normal handler set not bound once");
        assert!(
            self.subsystem().mode_bindings().is_empty(),
            "Sub-mode handlers still bound"
        );
    }

    pub fn assert_nothing_bound(&self) {
        assert!(self.subsystem().normal_bindings().is_empty());
        assert!(self.subsystem().mode_bindings().is_empty());
    }

    pub fn assert_notified_once(&self, notification: &HostNotification) {
        let count = self.notification_count(notification);
        assert_eq!(count, 1, "Expected {notification:?} once, got {count}");
    }
}
