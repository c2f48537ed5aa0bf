//! Query methods for `TestScene`.

use bevy::prelude::*;

use crate::camera_motion::CameraRig;
use crate::controller::{SceneSubsystem, SubsystemPhase};
use crate::notifications::HostNotification;
use crate::registry::SpatialEntityRegistry;

use super::{Recorded, TestScene};

impl TestScene {
    pub fn subsystem(&self) -> &SceneSubsystem {
        self.app.world().resource::<SceneSubsystem>()
    }

    pub fn subsystem_mut(&mut self) -> Mut<'_, SceneSubsystem> {
        self.app.world_mut().resource_mut::<SceneSubsystem>()
    }

    pub fn phase(&self) -> SubsystemPhase {
        self.subsystem().phase()
    }

    /// The phase as Bevy's state machine sees it (one frame behind).
    pub fn state_phase(&self) -> SubsystemPhase {
        *self.app.world().resource::<State<SubsystemPhase>>().get()
    }

    pub fn registry(&self) -> &SpatialEntityRegistry {
        self.subsystem().registry()
    }

    pub fn rig(&self) -> &CameraRig {
        self.subsystem().rig()
    }

    pub fn recorded(&self) -> &Recorded {
        self.app.world().resource::<Recorded>()
    }

    pub fn notifications(&self) -> &[HostNotification] {
        &self.recorded().notifications
    }

    /// How many times `notification` has been published.
    pub fn notification_count(&self, notification: &HostNotification) -> usize {
        self.notifications()
            .iter()
            .filter(|n| *n == notification)
            .count()
    }

    /// Forget everything recorded so far.
    pub fn clear_recorded(&mut self) {
        *self.app.world_mut().resource_mut::<Recorded>() = Recorded::default();
    }
}
