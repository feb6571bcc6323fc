//! Static wireframe of the whole heightmap, for comparing against the window.

use crate::heightmap::Heightmap;
use crate::mesh::grid_line_indices;

#[derive(Clone, Debug, Default)]
pub struct RibbonMesh {
    pub positions: Vec<[f32; 3]>,
    pub line_indices: Vec<u32>,
}

pub struct ReferenceRibbon;

impl ReferenceRibbon {
    /// Drawn slightly below the window so the two surfaces don't z-fight.
    pub const VERTICAL_OFFSET: f32 = -1.0;

    /// One path per map row, stitched into a grid.
    pub fn build(map: &Heightmap) -> RibbonMesh {
        RibbonMesh {
            positions: map.points().to_vec(),
            line_indices: grid_line_indices(map.sub_x(), map.sub_z()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::generate;

    #[test]
    fn test_ribbon_covers_whole_map() {
        let map = generate(5, 3, 0.3, 0.03, 6.0).unwrap();
        let ribbon = ReferenceRibbon::build(&map);
        assert_eq!(ribbon.positions.len(), 15);
        assert_eq!(ribbon.positions.as_slice(), map.points());
        // 3 rows x 4 + 5 cols x 2
        assert_eq!(ribbon.line_indices.len(), (12 + 10) * 2);
    }

    #[test]
    fn test_ribbon_lines_join_grid_neighbours() {
        let map = generate(4, 4, 0.3, 0.03, 6.0).unwrap();
        let ribbon = ReferenceRibbon::build(&map);
        for edge in ribbon.line_indices.chunks_exact(2) {
            let (a, b) = (edge[0] as usize, edge[1] as usize);
            assert!(b < ribbon.positions.len());
            // Either the next sample in the row or the same column one row on.
            assert!((b == a + 1 && a % 4 != 3) || b == a + 4, "bad edge {a}-{b}");
        }
    }
}
