//! Fixed-size terrain mesh that follows a viewpoint over a larger heightmap.
//!
//! The window holds `terrain_sub x terrain_sub` vertices sampled from the
//! shared [`Heightmap`] with a uniform stride. Moving the viewpoint only
//! shifts an integer lattice offset; a refresh copies the selected samples
//! into the existing vertex buffer, so its cost depends on `terrain_sub`
//! alone and nothing is reallocated.

use std::sync::Arc;

use glam::{I64Vec2, Vec2, Vec3};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ConfigError, WindowError};
use crate::heightmap::Heightmap;
use crate::mesh::{TerrainMesh, grid_normals};

/// Lattice indices are clamped to this magnitude before wrapping so the
/// period offsets added to vertex positions stay exact in `f32`.
pub const MAX_LATTICE_INDEX: i64 = 1 << 24;

/// How the window behaves when it reaches the edge of the backing map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum EdgePolicy {
    /// The map repeats toroidally; the window can travel forever.
    #[default]
    Wrap,
    /// The window stops at the map border and keeps showing the last
    /// full-size block.
    Clamp,
}

#[derive(Clone, Debug)]
pub struct TerrainParameters {
    pub map: Arc<Heightmap>,
    pub terrain_sub: usize,
    pub edge_policy: EdgePolicy,
    /// Minimum viewpoint travel, in map samples, before vertices are rewritten.
    pub sub_tolerance: usize,
    pub compute_normals: bool,
}

impl TerrainParameters {
    pub fn new(map: Arc<Heightmap>, terrain_sub: usize) -> Self {
        Self {
            map,
            terrain_sub,
            edge_policy: EdgePolicy::default(),
            sub_tolerance: 1,
            compute_normals: true,
        }
    }

    pub fn map_sub_x(&self) -> usize {
        self.map.sub_x()
    }

    pub fn map_sub_z(&self) -> usize {
        self.map.sub_z()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_window(
            self.terrain_sub,
            self.sub_tolerance,
            self.map_sub_x(),
            self.map_sub_z(),
        )
    }
}

pub(crate) fn validate_window(
    terrain_sub: usize,
    sub_tolerance: usize,
    map_sub_x: usize,
    map_sub_z: usize,
) -> Result<(), ConfigError> {
    if terrain_sub == 0 {
        return Err(ConfigError::ZeroTerrainSub);
    }
    if terrain_sub > map_sub_x.min(map_sub_z) {
        return Err(ConfigError::WindowTooLarge {
            terrain_sub,
            map_sub_x,
            map_sub_z,
        });
    }
    if sub_tolerance == 0 {
        return Err(ConfigError::ZeroTolerance);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowState {
    Built,
    Disposed,
}

pub struct TerrainWindow {
    map: Arc<Heightmap>,
    terrain_sub: usize,
    stride: usize,
    edge_policy: EdgePolicy,
    sub_tolerance: usize,
    compute_normals: bool,
    /// Lattice index of vertex `(0, 0)`, before wrapping.
    origin: I64Vec2,
    center: Vec2,
    mesh: TerrainMesh,
    state: WindowState,
    last_writes: usize,
}

impl TerrainWindow {
    /// Validate `params`, allocate the vertex buffer and fill it around the
    /// map center.
    pub fn new(params: TerrainParameters) -> Result<Self, ConfigError> {
        params.validate()?;

        let terrain_sub = params.terrain_sub;
        let stride = params.map.sub_x().min(params.map.sub_z()) / terrain_sub;
        let center = params.map.center();

        let mut window = Self {
            terrain_sub,
            stride,
            edge_policy: params.edge_policy,
            sub_tolerance: params.sub_tolerance,
            compute_normals: params.compute_normals,
            origin: I64Vec2::ZERO,
            center,
            mesh: TerrainMesh::grid(terrain_sub, terrain_sub),
            state: WindowState::Built,
            last_writes: 0,
            map: params.map,
        };
        window.origin = window.origin_for(center);
        window.fill();

        debug!(
            terrain_sub,
            stride,
            policy = ?window.edge_policy,
            "terrain window built"
        );
        Ok(window)
    }

    /// Move the reference point and rewrite the vertices if the window
    /// shifted by at least `sub_tolerance` samples. Only X and Z are read.
    ///
    /// Returns whether the vertex buffer changed. Non-finite positions are
    /// ignored and leave the previous mesh in place.
    pub fn refresh(&mut self, reference: Vec3) -> Result<bool, WindowError> {
        self.ensure_built()?;
        if !reference.x.is_finite() || !reference.z.is_finite() {
            warn!(?reference, "ignoring non-finite terrain reference position");
            self.last_writes = 0;
            return Ok(false);
        }
        self.center = Vec2::new(reference.x, reference.z);
        self.update(false)
    }

    /// Re-derive the window from the current center; `force` rewrites the
    /// vertices even when the offset has not moved.
    pub fn update(&mut self, force: bool) -> Result<bool, WindowError> {
        self.ensure_built()?;
        let next = self.origin_for(self.center);
        let moved = (next - self.origin).abs().max_element();
        if !force && moved < self.sub_tolerance as i64 {
            self.last_writes = 0;
            return Ok(false);
        }
        self.origin = next;
        self.fill();
        Ok(true)
    }

    /// Release the vertex buffers. Further refreshes fail with
    /// [`WindowError::Disposed`].
    pub fn dispose(&mut self) {
        if self.state == WindowState::Disposed {
            return;
        }
        self.mesh = TerrainMesh::default();
        self.state = WindowState::Disposed;
        self.last_writes = 0;
        debug!("terrain window disposed");
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn is_disposed(&self) -> bool {
        self.state == WindowState::Disposed
    }

    pub fn map(&self) -> &Arc<Heightmap> {
        &self.map
    }

    pub fn terrain_sub(&self) -> usize {
        self.terrain_sub
    }

    /// Map samples skipped between neighbouring vertices.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Map samples covered by the window along each axis.
    pub fn span(&self) -> usize {
        (self.terrain_sub - 1) * self.stride + 1
    }

    pub fn edge_policy(&self) -> EdgePolicy {
        self.edge_policy
    }

    pub fn window_origin(&self) -> I64Vec2 {
        self.origin
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn mesh(&self) -> &TerrainMesh {
        &self.mesh
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.mesh.positions
    }

    /// Vertex positions as `terrain_sub * terrain_sub * 3` floats.
    pub fn positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.mesh.positions)
    }

    /// Vertices written by the most recent refresh or update.
    pub fn last_refresh_writes(&self) -> usize {
        self.last_writes
    }

    /// Whether a world position lies inside the current window footprint.
    pub fn contains(&self, x: f32, z: f32) -> bool {
        let (Some(first), Some(last)) = (self.mesh.positions.first(), self.mesh.positions.last())
        else {
            return false;
        };
        x >= first[0] && x <= last[0] && z >= first[2] && z <= last[2]
    }

    /// Map height at a world position, resolved with the edge policy.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let g = self.map.grid_coords(x, z);
        let (gx, gz) = match self.edge_policy {
            EdgePolicy::Wrap => (g.x, g.y),
            EdgePolicy::Clamp => (
                g.x.clamp(0.0, (self.map.sub_x() - 1) as f32),
                g.y.clamp(0.0, (self.map.sub_z() - 1) as f32),
            ),
        };
        let bound = MAX_LATTICE_INDEX as f32;
        let (gx, gz) = (gx.clamp(-bound, bound), gz.clamp(-bound, bound));

        let x0 = gx.floor();
        let z0 = gz.floor();
        let fx = gx - x0;
        let fz = gz - z0;
        let w0 = self.resolve(x0 as i64, self.map.sub_x());
        let w1 = self.resolve(x0 as i64 + 1, self.map.sub_x());
        let l0 = self.resolve(z0 as i64, self.map.sub_z());
        let l1 = self.resolve(z0 as i64 + 1, self.map.sub_z());

        let h00 = self.map.height(w0, l0);
        let h10 = self.map.height(w1, l0);
        let h01 = self.map.height(w0, l1);
        let h11 = self.map.height(w1, l1);
        let near = h00 + (h10 - h00) * fx;
        let far = h01 + (h11 - h01) * fx;
        near + (far - near) * fz
    }

    fn ensure_built(&self) -> Result<(), WindowError> {
        match self.state {
            WindowState::Built => Ok(()),
            WindowState::Disposed => Err(WindowError::Disposed),
        }
    }

    fn resolve(&self, index: i64, len: usize) -> usize {
        match self.edge_policy {
            EdgePolicy::Wrap => index.rem_euclid(len as i64) as usize,
            EdgePolicy::Clamp => index.clamp(0, len as i64 - 1) as usize,
        }
    }

    /// Lattice index of the first window sample for a reference position.
    fn origin_for(&self, center: Vec2) -> I64Vec2 {
        let g = self.map.grid_coords(center.x, center.y);
        let bound = MAX_LATTICE_INDEX as f32;
        let cx = g.x.round().clamp(-bound, bound) as i64;
        let cz = g.y.round().clamp(-bound, bound) as i64;
        let half = ((self.terrain_sub - 1) * self.stride / 2) as i64;
        let origin = I64Vec2::new(cx - half, cz - half);

        match self.edge_policy {
            EdgePolicy::Wrap => origin,
            EdgePolicy::Clamp => {
                let span = self.span() as i64;
                let max_x = self.map.sub_x() as i64 - span;
                let max_z = self.map.sub_z() as i64 - span;
                I64Vec2::new(origin.x.clamp(0, max_x), origin.y.clamp(0, max_z))
            }
        }
    }

    fn fill(&mut self) {
        let sub = self.terrain_sub;
        let stride = self.stride as i64;
        let sub_x = self.map.sub_x() as i64;
        let sub_z = self.map.sub_z() as i64;
        let period_x = sub_x as f32 * self.map.spacing();
        let period_z = sub_z as f32 * self.map.spacing();

        for j in 0..sub {
            let lz = self.origin.y + j as i64 * stride;
            let l = lz.rem_euclid(sub_z) as usize;
            let z_shift = lz.div_euclid(sub_z) as f32 * period_z;
            let row = j * sub;

            for i in 0..sub {
                let lx = self.origin.x + i as i64 * stride;
                let w = lx.rem_euclid(sub_x) as usize;
                let x_shift = lx.div_euclid(sub_x) as f32 * period_x;

                let p = self.map.point(w, l);
                self.mesh.positions[row + i] = [p.x + x_shift, p.y, p.z + z_shift];
            }
        }

        if self.compute_normals {
            grid_normals(&self.mesh.positions, sub, sub, &mut self.mesh.normals);
        }
        self.last_writes = sub * sub;
    }
}
