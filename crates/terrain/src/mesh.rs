/// Render-facing vertex data for the terrain window.
///
/// `indices` and `line_indices` describe a fixed grid topology and are built
/// once; refreshes only rewrite `positions` and `normals`.
#[derive(Clone, Debug, Default)]
pub struct TerrainMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub line_indices: Vec<u32>,
}

impl TerrainMesh {
    /// Allocate a flat `cols x rows` grid with upward normals.
    pub fn grid(cols: usize, rows: usize) -> Self {
        let vertex_count = cols * rows;
        let mut uvs = Vec::with_capacity(vertex_count);
        let u_den = cols.saturating_sub(1).max(1) as f32;
        let v_den = rows.saturating_sub(1).max(1) as f32;
        for j in 0..rows {
            for i in 0..cols {
                uvs.push([i as f32 / u_den, j as f32 / v_den]);
            }
        }

        Self {
            positions: vec![[0.0; 3]; vertex_count],
            normals: vec![[0.0, 1.0, 0.0]; vertex_count],
            uvs,
            indices: grid_triangle_indices(cols, rows),
            line_indices: grid_line_indices(cols, rows),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Two triangles per cell of a row-major vertex grid, CCW seen from +Y.
pub fn grid_triangle_indices(cols: usize, rows: usize) -> Vec<u32> {
    let cells = cols.saturating_sub(1) * rows.saturating_sub(1);
    let mut indices = Vec::with_capacity(cells * 6);
    for j in 0..rows.saturating_sub(1) {
        for i in 0..cols.saturating_sub(1) {
            let top_left = (j * cols + i) as u32;
            let top_right = top_left + 1;
            let bottom_left = ((j + 1) * cols + i) as u32;
            let bottom_right = bottom_left + 1;

            indices.extend_from_slice(&[top_left, bottom_left, top_right]);
            indices.extend_from_slice(&[top_right, bottom_left, bottom_right]);
        }
    }
    indices
}

/// Row and column edges of a row-major vertex grid, as a line list.
pub fn grid_line_indices(cols: usize, rows: usize) -> Vec<u32> {
    let edges = rows * cols.saturating_sub(1) + cols * rows.saturating_sub(1);
    let mut indices = Vec::with_capacity(edges * 2);
    for j in 0..rows {
        for i in 0..cols {
            let v = (j * cols + i) as u32;
            if i + 1 < cols {
                indices.extend_from_slice(&[v, v + 1]);
            }
            if j + 1 < rows {
                indices.extend_from_slice(&[v, v + cols as u32]);
            }
        }
    }
    indices
}

/// Smooth per-vertex normals from a row-major position grid.
///
/// Central differences, falling back to one-sided at the border.
pub fn grid_normals(positions: &[[f32; 3]], cols: usize, rows: usize, normals: &mut [[f32; 3]]) {
    if cols == 0 || rows == 0 {
        return;
    }
    let last_col = cols - 1;
    let last_row = rows - 1;

    for j in 0..rows {
        for i in 0..cols {
            let i_l = i.saturating_sub(1);
            let i_r = (i + 1).min(last_col);
            let j_d = j.saturating_sub(1);
            let j_u = (j + 1).min(last_row);

            let l = positions[j * cols + i_l];
            let r = positions[j * cols + i_r];
            let d = positions[j_d * cols + i];
            let u = positions[j_u * cols + i];

            let dx = r[0] - l[0];
            let dz = u[2] - d[2];
            let dhdx = if dx.abs() > f32::EPSILON { (r[1] - l[1]) / dx } else { 0.0 };
            let dhdz = if dz.abs() > f32::EPSILON { (u[1] - d[1]) / dz } else { 0.0 };

            let n = glam::Vec3::new(-dhdx, 1.0, -dhdz).normalize_or_zero();
            normals[j * cols + i] = [n.x, n.y, n.z];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_index_counts() {
        let mesh = TerrainMesh::grid(4, 3);
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.uvs.len(), 12);
        assert_eq!(mesh.indices.len(), 3 * 2 * 6);
        // 3 rows x 3 horizontal edges + 4 cols x 2 vertical edges
        assert_eq!(mesh.line_indices.len(), (9 + 8) * 2);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < 12));
    }

    #[test]
    fn test_single_vertex_grid_has_no_primitives() {
        let mesh = TerrainMesh::grid(1, 1);
        assert_eq!(mesh.vertex_count(), 1);
        assert!(mesh.indices.is_empty());
        assert!(mesh.line_indices.is_empty());
        assert_eq!(mesh.uvs[0], [0.0, 0.0]);
    }

    #[test]
    fn test_first_cell_winding() {
        let indices = grid_triangle_indices(3, 3);
        assert_eq!(&indices[..6], &[0, 3, 1, 1, 3, 4]);
    }

    #[test]
    fn test_normals_on_slope() {
        // Plane rising 1 unit per unit of x.
        let mut positions = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                positions.push([i as f32, i as f32, j as f32]);
            }
        }
        let mut normals = vec![[0.0; 3]; 9];
        grid_normals(&positions, 3, 3, &mut normals);
        let expected = glam::Vec3::new(-1.0, 1.0, 0.0).normalize();
        for n in normals {
            assert!((glam::Vec3::from(n) - expected).length() < 1e-6);
        }
    }
}
