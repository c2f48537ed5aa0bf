//! Pointer input as the scene core sees it.
//!
//! The rendering crate turns raw mouse state into [`SceneInput`] events
//! (already resolved to a mesh, a ground point or a badge). Each input
//! belongs to one [`InputChannel`]; the controller drops inputs whose channel
//! is not currently bound.

use bevy::prelude::*;

use crate::registry::{BuildingId, MeshRef};
use crate::subscriptions::InputChannel;

#[derive(Event, Debug, Clone, PartialEq)]
pub enum SceneInput {
    BuildingDoubleClick(MeshRef),
    BuildingClick(MeshRef),
    /// Mesh under the pointer, `None` when over nothing pickable.
    PointerMoved(Option<MeshRef>),
    /// Right-button double-click.
    ResetGesture,
    BadgeClick(BuildingId),
    /// Name label clicks and hover. They share the building channels.
    LabelClick(BuildingId),
    LabelDoubleClick(BuildingId),
    LabelHover(Option<BuildingId>),
    GroundDoubleClick(Vec3),
    MeasurePick(Vec3),
    MeasurePreview(Option<Vec3>),
    /// Box drag positions are ground XZ coordinates.
    BoxDragStart(Vec2),
    BoxDragMove(Vec2),
    BoxDragEnd,
}

impl SceneInput {
    /// Channels that may consume this input.
    pub fn channels(&self) -> &'static [InputChannel] {
        match self {
            SceneInput::BuildingDoubleClick(_) | SceneInput::LabelDoubleClick(_) => {
                &[InputChannel::BuildingDoubleClick]
            }
            SceneInput::BuildingClick(_) | SceneInput::LabelClick(_) => {
                &[InputChannel::BuildingClick]
            }
            SceneInput::LabelHover(_) => &[InputChannel::BuildingHover],
            SceneInput::PointerMoved(_) => {
                &[InputChannel::PointerCursor, InputChannel::BuildingHover]
            }
            SceneInput::ResetGesture => &[InputChannel::ResetGesture],
            SceneInput::BadgeClick(_) => &[InputChannel::BadgeClick],
            SceneInput::GroundDoubleClick(_) => &[InputChannel::GroundDoubleClick],
            SceneInput::MeasurePick(_) => &[InputChannel::MeasurePick],
            SceneInput::MeasurePreview(_) => &[InputChannel::MeasurePreview],
            SceneInput::BoxDragStart(_) | SceneInput::BoxDragMove(_) | SceneInput::BoxDragEnd => {
                &[InputChannel::BoxDrag]
            }
        }
    }
}
