pub mod assets;
pub mod error;
pub mod heightmap;
pub mod mesh;
pub mod noise;
pub mod render;
pub mod ribbon;
pub mod types;
pub mod window;

pub use error::*;
pub use heightmap::{CancelToken, Heightmap, HeightmapGenerator, HeightmapSettings, generate};
pub use mesh::TerrainMesh;
pub use noise::{CoherentNoise, NoiseField, NoiseKind, PerlinField};
pub use ribbon::{ReferenceRibbon, RibbonMesh};
pub use types::*;
pub use window::{EdgePolicy, TerrainParameters, TerrainWindow, WindowState};

use bevy::prelude::*;

pub struct TerrainPlugin {
    /// Asset path of the RON terrain config.
    pub config_path: String,
}

impl Default for TerrainPlugin {
    fn default() -> Self {
        Self {
            config_path: "terrain.ron".to_string(),
        }
    }
}

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(render::TerrainConfigPath(self.config_path.clone()))
            .init_resource::<types::TerrainViewerWorldXz>()
            .init_resource::<types::TerrainDisplay>()
            .init_resource::<types::TerrainStatus>()
            .init_resource::<types::TerrainEntities>()
            .init_resource::<types::RegenerateTerrain>()
            .init_asset::<assets::TerrainConfigAsset>()
            .init_asset_loader::<assets::TerrainConfigAssetLoader>()
            .add_systems(Startup, render::setup_terrain_renderer)
            .add_systems(
                Update,
                (
                    render::finish_config_load,
                    render::start_generation,
                    render::collect_generation,
                    render::refresh_terrain_window,
                    render::apply_display_settings,
                )
                    .chain(),
            );
    }
}
