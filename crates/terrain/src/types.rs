use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::Task;
use glam::Vec2;
use serde::Deserialize;

use crate::error::{ConfigError, ConfigLoadError, GenerationError};
use crate::heightmap::{CancelToken, Heightmap, HeightmapSettings};
use crate::noise::NoiseKind;
use crate::window::{EdgePolicy, TerrainParameters, TerrainWindow, validate_window};

// --- Config ---

#[derive(Resource, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub map_sub_x: usize,
    pub map_sub_z: usize,
    /// `None` draws a fresh random seed on every generation.
    pub seed: Option<f64>,
    pub noise_scale: f64,
    pub elevation_scale: f64,
    pub noise: NoiseKind,
    pub terrain_sub: usize,
    pub edge_policy: EdgePolicy,
    pub sub_tolerance: usize,
    pub compute_normals: bool,
    pub wireframe: bool,
    pub show_reference: bool,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            map_sub_x: 1000,
            map_sub_z: 800,
            seed: Some(0.3),
            noise_scale: 0.03,
            elevation_scale: 6.0,
            noise: NoiseKind::Simplex,
            terrain_sub: 200,
            edge_policy: EdgePolicy::Wrap,
            sub_tolerance: 1,
            compute_normals: true,
            wireframe: false,
            show_reference: true,
        }
    }
}

impl TerrainConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.heightmap_settings(self.seed.unwrap_or_default())
            .validate()?;
        validate_window(
            self.terrain_sub,
            self.sub_tolerance,
            self.map_sub_x,
            self.map_sub_z,
        )
    }

    pub fn resolve_seed(&self) -> f64 {
        self.seed.unwrap_or_else(rand::random::<f64>)
    }

    pub fn heightmap_settings(&self, seed: f64) -> HeightmapSettings {
        HeightmapSettings {
            map_sub_x: self.map_sub_x,
            map_sub_z: self.map_sub_z,
            seed,
            noise_scale: self.noise_scale,
            elevation_scale: self.elevation_scale,
            noise: self.noise,
        }
    }

    pub fn window_parameters(&self, map: Arc<Heightmap>) -> TerrainParameters {
        TerrainParameters {
            map,
            terrain_sub: self.terrain_sub,
            edge_policy: self.edge_policy,
            sub_tolerance: self.sub_tolerance,
            compute_normals: self.compute_normals,
        }
    }
}

// --- Resources ---

/// Set by the root game crate to indicate where the viewer is (XZ plane).
#[derive(Resource, Default, Clone, Copy, Debug)]
pub struct TerrainViewerWorldXz(pub Vec2);

/// Cosmetic switches, passed straight through to the renderer.
#[derive(Resource, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainDisplay {
    pub wireframe: bool,
    pub show_reference: bool,
}

impl Default for TerrainDisplay {
    fn default() -> Self {
        Self {
            wireframe: false,
            show_reference: true,
        }
    }
}

/// Ask for a new heightmap. `seed: None` keeps the configured seed policy.
#[derive(Resource, Default, Clone, Copy, Debug)]
pub struct RegenerateTerrain {
    pub requested: bool,
    pub seed: Option<f64>,
}

impl RegenerateTerrain {
    pub fn request(&mut self, seed: Option<f64>) {
        self.requested = true;
        self.seed = seed;
    }
}

#[derive(Resource, Default, Clone, Debug, PartialEq)]
pub enum TerrainStatus {
    #[default]
    Loading,
    Generating {
        seed: f64,
    },
    Ready {
        seed: f64,
    },
    Failed(String),
}

#[derive(Resource)]
pub struct TerrainWindowRes(pub TerrainWindow);

#[derive(Resource)]
pub struct PendingGeneration {
    pub task: Task<Result<Heightmap, GenerationError>>,
    pub cancel: CancelToken,
    pub seed: f64,
}

#[derive(Resource, Default)]
pub struct TerrainEntities {
    pub window: Option<Entity>,
    pub reference: Option<Entity>,
}

#[derive(Resource)]
pub struct TerrainMaterials {
    pub window: Handle<StandardMaterial>,
    pub reference: Handle<StandardMaterial>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = TerrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.map_sub_x, 1000);
        assert_eq!(config.map_sub_z, 800);
        assert_eq!(config.resolve_seed(), 0.3);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let text = include_str!("../../../assets/terrain.ron");
        assert_eq!(TerrainConfig::from_ron_str(text).unwrap(), TerrainConfig::default());
    }

    #[test]
    fn test_partial_ron_fills_defaults() {
        let config = TerrainConfig::from_ron_str(
            "(map_sub_x: 64, map_sub_z: 32, terrain_sub: 16, edge_policy: Clamp, noise: Perlin)",
        )
        .unwrap();
        assert_eq!(config.map_sub_x, 64);
        assert_eq!(config.terrain_sub, 16);
        assert_eq!(config.edge_policy, EdgePolicy::Clamp);
        assert_eq!(config.noise, NoiseKind::Perlin);
        assert_eq!(config.noise_scale, 0.03);
    }

    #[test]
    fn test_random_seed_when_unset() {
        let config = TerrainConfig::from_ron_str(
            "(map_sub_x: 8, map_sub_z: 8, terrain_sub: 4, seed: None)",
        )
        .unwrap();
        let seed = config.resolve_seed();
        assert!((0.0..1.0).contains(&seed));
    }

    #[test]
    fn test_rejects_oversized_window() {
        let err = TerrainConfig::from_ron_str("(map_sub_x: 4, map_sub_z: 4, terrain_sub: 10)")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid(ConfigError::WindowTooLarge { terrain_sub: 10, .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_ron() {
        let err = TerrainConfig::from_ron_str("(map_sub_x: \"wide\")").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse(_)));
    }

    #[test]
    fn test_rejects_non_positive_noise_scale() {
        let err = TerrainConfig::from_ron_str(
            "(map_sub_x: 8, map_sub_z: 8, terrain_sub: 4, noise_scale: -0.5)",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid(ConfigError::InvalidScale { name: "noise_scale", .. })
        ));
    }
}
