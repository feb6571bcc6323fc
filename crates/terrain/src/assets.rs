use bevy::asset::io::Reader;
use bevy::asset::{AssetLoader, LoadContext};
use bevy::prelude::*;
use bevy::reflect::TypePath;

use crate::error::ConfigLoadError;
use crate::types::TerrainConfig;

#[derive(Asset, TypePath, Debug, Clone)]
pub struct TerrainConfigAsset(pub TerrainConfig);

#[derive(Default)]
pub struct TerrainConfigAssetLoader;

impl AssetLoader for TerrainConfigAssetLoader {
    type Asset = TerrainConfigAsset;
    type Settings = ();
    type Error = ConfigLoadError;

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;

        let text = std::str::from_utf8(&bytes)?;
        let config = TerrainConfig::from_ron_str(text)?;

        Ok(TerrainConfigAsset(config))
    }

    fn extensions(&self) -> &[&str] {
        &["ron"]
    }
}
