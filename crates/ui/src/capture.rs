use bevy::prelude::*;
use bevy_egui::EguiContexts;

#[derive(Resource, Default, Clone, Copy, Debug)]
pub struct UiInputCapture {
    /// True when egui wants mouse/pointer input.
    pub pointer: bool,
    /// True when egui wants keyboard input (a focused text field).
    pub keyboard: bool,
}

pub fn update_ui_input_capture(mut contexts: EguiContexts, mut capture: ResMut<UiInputCapture>) {
    let ctx = match contexts.ctx_mut() {
        Ok(ctx) => ctx,
        Err(_) => {
            *capture = UiInputCapture::default();
            return;
        }
    };

    // Hovering a panel counts as capture so camera drags don't start under it.
    capture.pointer = ctx.wants_pointer_input() || ctx.is_pointer_over_area();
    capture.keyboard = ctx.wants_keyboard_input();
}
