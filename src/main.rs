use bevy::prelude::*;
use bevy_egui::EguiPlugin;

mod game;

use game::GamePlugin;

fn main() {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.60, 0.80, 0.95)))
        .insert_resource(AmbientLight {
            color: Color::WHITE,
            brightness: 30.0,
            affects_lightmapped_meshes: false,
        })
        .add_plugins(DefaultPlugins)
        .add_plugins(EguiPlugin::default())
        .add_plugins(terrain::TerrainPlugin::default())
        .add_plugins(ui::UiPlugin)
        .add_plugins(GamePlugin)
        .run();
}
