//! The backing heightfield: a flat row-major buffer of `(x, y, z)` triples.
//!
//! Generated once from a [`CoherentNoise`] source and read-only afterwards.
//! Rows are independent, so generation fans out over `rayon` with a
//! cooperative cancellation check before each row.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use glam::{Vec2, Vec3};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{ConfigError, GenerationError};
use crate::noise::{CoherentNoise, NoiseKind};

/// World distance between neighbouring generated samples.
pub const GRID_SPACING: f32 = 2.0;

/// Immutable grid of elevation samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Heightmap {
    data: Vec<f32>,
    sub_x: usize,
    sub_z: usize,
    origin: Vec2,
    spacing: f32,
}

impl Heightmap {
    /// Wrap an externally produced buffer.
    ///
    /// The buffer must hold `sub_x * sub_z` triples laid out row by row on a
    /// regular square lattice; origin and spacing are read back from it.
    pub fn from_raw(data: Vec<f32>, sub_x: usize, sub_z: usize) -> Result<Self, ConfigError> {
        check_dimensions(sub_x, sub_z)?;
        let expected = sub_x * sub_z * 3;
        if data.len() != expected {
            return Err(ConfigError::BufferLength {
                expected,
                actual: data.len(),
            });
        }

        let origin = Vec2::new(data[0], data[2]);
        let step_x = (sub_x > 1).then(|| data[3] - data[0]);
        let step_z = (sub_z > 1).then(|| data[sub_x * 3 + 2] - data[2]);
        let spacing = match (step_x, step_z) {
            (Some(x), Some(z)) if !same_step(x, z) => {
                return Err(ConfigError::IrregularSpacing(z));
            }
            (Some(x), _) => x,
            (None, Some(z)) => z,
            (None, None) => GRID_SPACING,
        };
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(ConfigError::IrregularSpacing(spacing));
        }

        // Every sample must sit on the square lattice implied by the first step.
        for (i, p) in data.chunks_exact(3).enumerate() {
            let expected_x = origin.x + (i % sub_x) as f32 * spacing;
            let expected_z = origin.y + (i / sub_x) as f32 * spacing;
            if !on_lattice(p[0], expected_x, spacing) || !on_lattice(p[2], expected_z, spacing) {
                return Err(ConfigError::IrregularSpacing(spacing));
            }
        }

        Ok(Self {
            data,
            sub_x,
            sub_z,
            origin,
            spacing,
        })
    }

    pub fn sub_x(&self) -> usize {
        self.sub_x
    }

    pub fn sub_z(&self) -> usize {
        self.sub_z
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// World XZ of sample `(0, 0)`.
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// World XZ of sample `(sub_x / 2, sub_z / 2)`.
    pub fn center(&self) -> Vec2 {
        let p = self.point(self.sub_x / 2, self.sub_z / 2);
        Vec2::new(p.x, p.z)
    }

    /// World-space XZ bounds `(min, max)` covered by the samples.
    pub fn extent(&self) -> (Vec2, Vec2) {
        let max = self.origin
            + Vec2::new(
                (self.sub_x - 1) as f32 * self.spacing,
                (self.sub_z - 1) as f32 * self.spacing,
            );
        (self.origin, max)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn points(&self) -> &[[f32; 3]] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn sample_count(&self) -> usize {
        self.sub_x * self.sub_z
    }

    /// Flat float index of sample `(w, l)`.
    #[inline]
    pub fn index(&self, w: usize, l: usize) -> usize {
        3 * (l * self.sub_x + w)
    }

    #[inline]
    pub fn point(&self, w: usize, l: usize) -> Vec3 {
        let i = self.index(w, l);
        Vec3::new(self.data[i], self.data[i + 1], self.data[i + 2])
    }

    #[inline]
    pub fn height(&self, w: usize, l: usize) -> f32 {
        self.data[self.index(w, l) + 1]
    }

    /// Fractional lattice coordinates of a world position.
    pub fn grid_coords(&self, x: f32, z: f32) -> Vec2 {
        Vec2::new(
            (x - self.origin.x) / self.spacing,
            (z - self.origin.y) / self.spacing,
        )
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        let g = self.grid_coords(x, z);
        g.x >= 0.0
            && g.y >= 0.0
            && g.x <= (self.sub_x - 1) as f32
            && g.y <= (self.sub_z - 1) as f32
    }

    /// Bilinearly interpolated height at a world position, `None` off the map.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        if !self.contains(x, z) {
            return None;
        }
        let g = self.grid_coords(x, z);
        let w0 = (g.x.floor() as usize).min(self.sub_x - 1);
        let l0 = (g.y.floor() as usize).min(self.sub_z - 1);
        let w1 = (w0 + 1).min(self.sub_x - 1);
        let l1 = (l0 + 1).min(self.sub_z - 1);
        let fx = g.x - w0 as f32;
        let fz = g.y - l0 as f32;

        let h00 = self.height(w0, l0);
        let h10 = self.height(w1, l0);
        let h01 = self.height(w0, l1);
        let h11 = self.height(w1, l1);
        let near = h00 + (h10 - h00) * fx;
        let far = h01 + (h11 - h01) * fx;
        Some(near + (far - near) * fz)
    }
}

fn same_step(a: f32, b: f32) -> bool {
    (a - b).abs() <= a.abs().max(b.abs()) * 1e-4
}

fn on_lattice(actual: f32, expected: f32, spacing: f32) -> bool {
    (actual - expected).abs() <= spacing * 1e-3 + expected.abs() * 1e-6
}

/// Inputs that fully determine a generated heightmap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightmapSettings {
    pub map_sub_x: usize,
    pub map_sub_z: usize,
    pub seed: f64,
    pub noise_scale: f64,
    pub elevation_scale: f64,
    pub noise: NoiseKind,
}

impl HeightmapSettings {
    pub fn new(
        map_sub_x: usize,
        map_sub_z: usize,
        seed: f64,
        noise_scale: f64,
        elevation_scale: f64,
    ) -> Self {
        Self {
            map_sub_x,
            map_sub_z,
            seed,
            noise_scale,
            elevation_scale,
            noise: NoiseKind::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_dimensions(self.map_sub_x, self.map_sub_z)?;
        if !self.seed.is_finite() {
            return Err(ConfigError::NonFiniteSeed(self.seed));
        }
        if !self.noise_scale.is_finite() || self.noise_scale <= 0.0 {
            return Err(ConfigError::InvalidScale {
                name: "noise_scale",
                requirement: "finite and > 0",
                value: self.noise_scale,
            });
        }
        if !self.elevation_scale.is_finite() || self.elevation_scale < 0.0 {
            return Err(ConfigError::InvalidScale {
                name: "elevation_scale",
                requirement: "finite and >= 0",
                value: self.elevation_scale,
            });
        }
        Ok(())
    }
}

fn check_dimensions(sub_x: usize, sub_z: usize) -> Result<(), ConfigError> {
    if sub_x == 0 {
        return Err(ConfigError::ZeroDimension {
            axis: "map_sub_x",
            value: sub_x,
        });
    }
    if sub_z == 0 {
        return Err(ConfigError::ZeroDimension {
            axis: "map_sub_z",
            value: sub_z,
        });
    }
    let fits = sub_x
        .checked_mul(sub_z)
        .and_then(|n| n.checked_mul(3 * std::mem::size_of::<f32>()))
        .is_some_and(|bytes| bytes <= isize::MAX as usize);
    if !fits {
        return Err(ConfigError::MapTooLarge {
            map_sub_x: sub_x,
            map_sub_z: sub_z,
        });
    }
    Ok(())
}

/// Flattens low ground and exaggerates peaks: `n * (0.5 + n) * n * scale`.
#[inline]
pub fn shape_elevation(n: f64, elevation_scale: f64) -> f64 {
    n * ((0.5 + n) * n * elevation_scale)
}

/// Shared flag polled between rows of a running generation.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct HeightmapGenerator {
    settings: HeightmapSettings,
    noise: Box<dyn CoherentNoise>,
}

impl HeightmapGenerator {
    pub fn new(settings: HeightmapSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            noise: settings.noise.build(settings.seed),
            settings,
        })
    }

    /// Use a caller-supplied noise source instead of `settings.noise`.
    pub fn with_noise(
        settings: HeightmapSettings,
        noise: Box<dyn CoherentNoise>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self { settings, noise })
    }

    pub fn settings(&self) -> &HeightmapSettings {
        &self.settings
    }

    /// The `(x, y, z)` triple stored at grid index `(w, l)`.
    pub fn sample(&self, w: usize, l: usize) -> [f32; 3] {
        let s = &self.settings;
        let x = (w as f64 - s.map_sub_x as f64 * 0.5) * GRID_SPACING as f64;
        let z = (l as f64 - s.map_sub_z as f64 * 0.5) * GRID_SPACING as f64;
        let n = self.noise.elevation(x * s.noise_scale, z * s.noise_scale);
        let y = shape_elevation(n, s.elevation_scale);
        [x as f32, y as f32, z as f32]
    }

    pub fn generate(&self) -> Result<Heightmap, GenerationError> {
        self.generate_cancellable(&CancelToken::new())
    }

    /// Build the full buffer, or nothing if `cancel` fires before the last row.
    pub fn generate_cancellable(&self, cancel: &CancelToken) -> Result<Heightmap, GenerationError> {
        let sub_x = self.settings.map_sub_x;
        let sub_z = self.settings.map_sub_z;
        let started = Instant::now();
        debug!(sub_x, sub_z, seed = self.settings.seed, "generating heightmap");

        let row_len = sub_x * 3;
        let mut data = vec![0.0_f32; row_len * sub_z];
        let completed = AtomicUsize::new(0);

        let outcome = data
            .par_chunks_mut(row_len)
            .enumerate()
            .try_for_each(|(l, row)| {
                if cancel.is_cancelled() {
                    return Err(());
                }
                for (w, out) in row.chunks_exact_mut(3).enumerate() {
                    out.copy_from_slice(&self.sample(w, l));
                }
                completed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            });

        if outcome.is_err() {
            let completed_rows = completed.load(Ordering::Relaxed);
            info!(completed_rows, total_rows = sub_z, "heightmap generation aborted");
            return Err(GenerationError::Aborted {
                completed_rows,
                total_rows: sub_z,
            });
        }

        info!(
            sub_x,
            sub_z,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "heightmap generated"
        );

        Ok(Heightmap {
            data,
            sub_x,
            sub_z,
            origin: Vec2::new(
                -(sub_x as f32) * 0.5 * GRID_SPACING,
                -(sub_z as f32) * 0.5 * GRID_SPACING,
            ),
            spacing: GRID_SPACING,
        })
    }
}

/// One-shot generation with the default simplex noise.
pub fn generate(
    map_sub_x: usize,
    map_sub_z: usize,
    seed: f64,
    noise_scale: f64,
    elevation_scale: f64,
) -> Result<Heightmap, GenerationError> {
    let settings = HeightmapSettings::new(map_sub_x, map_sub_z, seed, noise_scale, elevation_scale);
    HeightmapGenerator::new(settings)?.generate()
}
