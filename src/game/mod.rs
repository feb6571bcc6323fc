pub mod camera;
pub mod input;
pub mod lighting;

use bevy::prelude::*;

pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(camera::OrbitCameraSettings::default())
            .add_systems(Startup, (camera::setup_viewer, lighting::setup_sun_light))
            .add_systems(
                Update,
                (
                    camera::orbit_camera_input,
                    input::follow_terrain_height,
                    camera::update_orbit_camera,
                    input::update_terrain_viewer_world_xz,
                    input::update_cursor_hit,
                )
                    .chain()
                    .after(ui::update_ui_input_capture)
                    .before(terrain::render::refresh_terrain_window),
            );
    }
}
