//! Input subscription bookkeeping.
//!
//! Input handlers are Bevy systems that exist for the lifetime of the app;
//! whether one of them is *listening* is decided by the channels currently
//! bound in an [`EventSubscriptionSet`]. Binding is a no-op while any channel
//! is bound, and unbinding an empty set is harmless, so every lifecycle path
//! can simply "ensure bound" or "ensure unbound".

use bevy::prelude::*;

/// A logical input handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputChannel {
    /// Double-click on a building: request the indoor scene.
    BuildingDoubleClick,
    /// Single click on a building: search it.
    BuildingClick,
    /// Pointer cursor over buildings.
    PointerCursor,
    /// Hover outline and tooltip.
    BuildingHover,
    /// Right double-click restores the default view.
    ResetGesture,
    /// Click on a population badge.
    BadgeClick,
    /// Double-click on the ground focuses the camera there.
    GroundDoubleClick,
    /// Ground pick while measuring.
    MeasurePick,
    /// Rubber-band preview while measuring.
    MeasurePreview,
    /// Screen-space drag while box selecting.
    BoxDrag,
}

/// Handler set bound while the scene is entered with no sub-mode.
pub const NORMAL_CHANNELS: [InputChannel; 7] = [
    InputChannel::BuildingDoubleClick,
    InputChannel::BuildingClick,
    InputChannel::PointerCursor,
    InputChannel::BuildingHover,
    InputChannel::ResetGesture,
    InputChannel::BadgeClick,
    InputChannel::GroundDoubleClick,
];

pub const MEASURE_CHANNELS: [InputChannel; 2] =
    [InputChannel::MeasurePick, InputChannel::MeasurePreview];

pub const BOX_SELECT_CHANNELS: [InputChannel; 1] = [InputChannel::BoxDrag];

#[derive(Debug, Clone, Default)]
pub struct EventSubscriptionSet {
    bound: Vec<InputChannel>,
}

impl EventSubscriptionSet {
    /// Bind `channels` in order. Returns `false` (and binds nothing) if the
    /// set already holds listeners.
    pub fn bind(&mut self, channels: impl IntoIterator<Item = InputChannel>) -> bool {
        if !self.bound.is_empty() {
            return false;
        }
        for channel in channels {
            if !self.bound.contains(&channel) {
                self.bound.push(channel);
            }
        }
        true
    }

    /// Tear down every binding in registration order and empty the set.
    pub fn unbind(&mut self) -> Vec<InputChannel> {
        let released = std::mem::take(&mut self.bound);
        for channel in &released {
            debug!("Subscriptions: released {:?}", channel);
        }
        released
    }

    pub fn is_bound(&self, channel: InputChannel) -> bool {
        self.bound.contains(&channel)
    }

    pub fn channels(&self) -> &[InputChannel] {
        &self.bound
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_twice_keeps_one_set() {
        let mut set = EventSubscriptionSet::default();
        assert!(set.bind(NORMAL_CHANNELS));
        assert!(!set.bind(NORMAL_CHANNELS));
        assert_eq!(set.len(), NORMAL_CHANNELS.len());
    }

    #[test]
    fn test_unbind_twice_is_safe() {
        let mut set = EventSubscriptionSet::default();
        set.bind(MEASURE_CHANNELS);
        assert_eq!(set.unbind(), MEASURE_CHANNELS.to_vec());
        assert!(set.unbind().is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn test_unbind_preserves_registration_order() {
        let mut set = EventSubscriptionSet::default();
        set.bind(NORMAL_CHANNELS);
        assert_eq!(set.unbind(), NORMAL_CHANNELS.to_vec());
    }

    #[test]
    fn test_rebind_after_unbind() {
        let mut set = EventSubscriptionSet::default();
        set.bind(BOX_SELECT_CHANNELS);
        set.unbind();
        assert!(set.bind(NORMAL_CHANNELS));
        assert!(set.is_bound(InputChannel::GroundDoubleClick));
        assert!(!set.is_bound(InputChannel::BoxDrag));
    }

    #[test]
    fn test_duplicate_channels_bind_once() {
        let mut set = EventSubscriptionSet::default();
        set.bind([InputChannel::BoxDrag, InputChannel::BoxDrag]);
        assert_eq!(set.channels(), &[InputChannel::BoxDrag]);
    }
}
