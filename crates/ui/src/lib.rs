pub mod capture;
pub mod panel;

pub use capture::{UiInputCapture, update_ui_input_capture};
pub use panel::{
    TerrainCursorReadout, TerrainPanelState, sync_panel_seed, terrain_panel_system,
    update_display_hotkeys,
};

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(UiInputCapture::default())
            .init_resource::<TerrainPanelState>()
            .init_resource::<TerrainCursorReadout>()
            .add_systems(
                Update,
                (update_ui_input_capture, update_display_hotkeys, sync_panel_seed).chain(),
            )
            .add_systems(EguiPrimaryContextPass, terrain_panel_system);
    }
}
