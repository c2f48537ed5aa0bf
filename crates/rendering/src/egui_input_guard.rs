//! Keeps pointer input over egui overlays (badges, readouts) from reaching
//! the scene underneath.

use bevy_egui::EguiContexts;

/// `true` while the cursor is over an egui area or egui owns a drag.
#[inline]
pub fn egui_wants_pointer(contexts: &mut EguiContexts) -> bool {
    let ctx = contexts.ctx_mut();
    ctx.wants_pointer_input() || ctx.is_pointer_over_area()
}
