//! Coherent 2D noise sources.
//!
//! [`NoiseField`] is a seeded simplex lattice: the same seed and coordinates
//! give bit-identical output on every run and platform, which the generator
//! and its tests rely on. Output stays within [-1, 1]; callers scale it.

use parrot::Perlin;
use serde::Deserialize;

/// A continuous scalar field over the XZ plane.
pub trait CoherentNoise: Send + Sync {
    fn elevation(&self, x: f64, z: f64) -> f64;
}

/// Which noise implementation backs the heightmap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum NoiseKind {
    #[default]
    Simplex,
    Perlin,
}

impl NoiseKind {
    pub fn build(self, seed: f64) -> Box<dyn CoherentNoise> {
        match self {
            NoiseKind::Simplex => Box::new(NoiseField::new(seed)),
            NoiseKind::Perlin => Box::new(PerlinField::new(seed)),
        }
    }
}

// Ken Perlin's reference permutation.
const PERMUTATION: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

// 3D edge gradients; only x/y are used in 2D.
const GRAD3: [(f64, f64); 12] = [
    (1.0, 1.0),
    (-1.0, 1.0),
    (1.0, -1.0),
    (-1.0, -1.0),
    (1.0, 0.0),
    (-1.0, 0.0),
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (0.0, 1.0),
    (0.0, -1.0),
];

/// (sqrt(3) - 1) / 2
const F2: f64 = 0.366_025_403_784_438_6;
/// (3 - sqrt(3)) / 6
const G2: f64 = 0.211_324_865_405_187_13;

/// Seeded 2D simplex noise.
///
/// The lattice tables are owned by the value, so independently seeded fields
/// can coexist. Sampling takes `&self` and never mutates.
#[derive(Clone)]
pub struct NoiseField {
    perm: [u8; 512],
    grad: [u8; 512],
    seed: f64,
}

impl NoiseField {
    pub fn new(seed: f64) -> Self {
        let mut field = Self {
            perm: [0; 512],
            grad: [0; 512],
            seed,
        };
        field.seed(seed);
        field
    }

    pub fn current_seed(&self) -> f64 {
        self.seed
    }

    /// Rebuild the permutation and gradient tables from `value`.
    ///
    /// Seeds in (0, 1) are spread over 16 bits first so `rand`-style unit
    /// seeds still touch both mixing bytes.
    pub fn seed(&mut self, value: f64) {
        self.seed = value;

        let mut scaled = value;
        if scaled > 0.0 && scaled < 1.0 {
            scaled *= 65536.0;
        }
        let floored = scaled.floor();
        let mut s = to_int32(floored);
        // Mirroring is decided on the full value, not the truncated one.
        if floored < 256.0 {
            s |= s.wrapping_shl(8);
        }

        let lo = (s & 255) as u8;
        let hi = ((s >> 8) & 255) as u8;
        for (i, &p) in PERMUTATION.iter().enumerate() {
            let v = if i & 1 == 1 { p ^ lo } else { p ^ hi };
            self.perm[i] = v;
            self.perm[i + 256] = v;
            self.grad[i] = v % 12;
            self.grad[i + 256] = v % 12;
        }
    }

    pub fn simplex2(&self, xin: f64, yin: f64) -> f64 {
        let s = (xin + yin) * F2;
        let i = (xin + s).floor();
        let j = (yin + s).floor();
        let t = (i + j) * G2;
        let x0 = xin - i + t;
        let y0 = yin - j + t;

        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + G2;
        let y1 = y0 - j1 as f64 + G2;
        let x2 = x0 - 1.0 + 2.0 * G2;
        let y2 = y0 - 1.0 + 2.0 * G2;

        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;
        let gi0 = self.gradient(ii + self.perm[jj] as usize);
        let gi1 = self.gradient(ii + i1 + self.perm[jj + j1] as usize);
        let gi2 = self.gradient(ii + 1 + self.perm[jj + 1] as usize);

        let n0 = corner(0.5 - x0 * x0 - y0 * y0, gi0, x0, y0);
        let n1 = corner(0.5 - x1 * x1 - y1 * y1, gi1, x1, y1);
        let n2 = corner(0.5 - x2 * x2 - y2 * y2, gi2, x2, y2);

        70.0 * (n0 + n1 + n2)
    }

    fn gradient(&self, index: usize) -> (f64, f64) {
        GRAD3[self.grad[index] as usize]
    }
}

/// Modular float to `i32` conversion: wraps instead of saturating, and maps
/// non-finite input to zero.
fn to_int32(v: f64) -> i32 {
    if !v.is_finite() {
        return 0;
    }
    let m = v.trunc().rem_euclid(4_294_967_296.0);
    if m >= 2_147_483_648.0 {
        (m - 4_294_967_296.0) as i32
    } else {
        m as i32
    }
}

fn corner(t: f64, g: (f64, f64), x: f64, y: f64) -> f64 {
    if t < 0.0 {
        return 0.0;
    }
    let t = t * t;
    t * t * (g.0 * x + g.1 * y)
}

impl CoherentNoise for NoiseField {
    fn elevation(&self, x: f64, z: f64) -> f64 {
        self.simplex2(x, z)
    }
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField").field("seed", &self.seed).finish()
    }
}

/// Gradient noise backed by `parrot`'s Perlin implementation.
pub struct PerlinField {
    perlin: Perlin,
}

impl PerlinField {
    pub fn new(seed: f64) -> Self {
        Self {
            perlin: Perlin::new(seed.to_bits()),
        }
    }
}

impl CoherentNoise for PerlinField {
    fn elevation(&self, x: f64, z: f64) -> f64 {
        self.perlin.noise2d(x, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_reference_values_seed_0_3() {
        let noise = NoiseField::new(0.3);
        assert_close(noise.elevation(0.5, 0.25), 0.022256965396991867);
        assert_close(noise.elevation(1.3, -2.7), 0.8372757114967201);
        assert_close(noise.elevation(10.0, 20.0), 0.04849727591719245);
    }

    #[test]
    fn test_reference_values_integer_seed() {
        let noise = NoiseField::new(42.0);
        assert_close(noise.elevation(0.5, 0.25), -0.7342936161846805);
        assert_close(noise.elevation(1.3, -2.7), 0.8354942176649526);
    }

    #[test]
    fn test_lattice_origin_is_zero() {
        let noise = NoiseField::new(0.3);
        assert_eq!(noise.elevation(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_reseed_matches_fresh_field() {
        let mut reseeded = NoiseField::new(7.0);
        reseeded.seed(0.3);
        let fresh = NoiseField::new(0.3);
        for k in 0..50 {
            let x = k as f64 * 0.37 - 9.0;
            let z = k as f64 * -0.21 + 4.0;
            assert_eq!(reseeded.elevation(x, z).to_bits(), fresh.elevation(x, z).to_bits());
        }
        assert_eq!(reseeded.current_seed(), 0.3);
    }

    #[test]
    fn test_independent_fields_coexist() {
        let a = NoiseField::new(0.3);
        let b = NoiseField::new(42.0);
        assert_ne!(a.elevation(0.5, 0.25), b.elevation(0.5, 0.25));
        // Sampling b must not disturb a.
        assert_close(a.elevation(0.5, 0.25), 0.022256965396991867);
    }

    #[test]
    fn test_output_bounded() {
        let noise = NoiseField::new(0.3);
        for xi in -60..60 {
            for zi in -60..60 {
                let v = noise.elevation(xi as f64 * 0.173, zi as f64 * 0.291);
                assert!((-1.0..=1.0).contains(&v), "noise {v} out of range");
            }
        }
    }

    #[test]
    fn test_continuous_across_integer_boundaries() {
        let noise = NoiseField::new(0.3);
        let eps = 1e-6;
        for k in -20..20 {
            let c = k as f64;
            let below = noise.elevation(c - eps, 0.4);
            let above = noise.elevation(c + eps, 0.4);
            assert!((below - above).abs() < 1e-4, "jump at x={c}");
            let below = noise.elevation(0.4, c - eps);
            let above = noise.elevation(0.4, c + eps);
            assert!((below - above).abs() < 1e-4, "jump at z={c}");
        }
    }

    #[test]
    fn test_large_seeds_wrap_without_mirroring() {
        let wrapped = NoiseField::new(4_294_967_301.0);
        assert_close(wrapped.elevation(0.5, 0.25), 0.0522537187745388);

        // Same low 32 bits, both above the mirroring threshold.
        let twice = NoiseField::new(8_589_934_597.0);
        let small = NoiseField::new(5.0);
        let mut differs = false;
        for (x, z) in [(0.5, 0.25), (1.3, -2.7), (-3.7, 8.1)] {
            assert_eq!(wrapped.elevation(x, z).to_bits(), twice.elevation(x, z).to_bits());
            differs |= wrapped.elevation(x, z) != small.elevation(x, z);
        }
        assert!(differs);

        let big = NoiseField::new(4_294_967_296.0 + 768.0);
        let plain = NoiseField::new(768.0);
        assert_eq!(big.elevation(1.3, -2.7).to_bits(), plain.elevation(1.3, -2.7).to_bits());
    }

    #[test]
    fn test_to_int32_wraps() {
        assert_eq!(to_int32(5.0), 5);
        assert_eq!(to_int32(4_294_967_301.0), 5);
        assert_eq!(to_int32(2_147_483_648.0), i32::MIN);
        assert_eq!(to_int32(-1.0), -1);
        assert_eq!(to_int32(f64::NAN), 0);
    }

    #[test]
    fn test_negative_and_large_seeds_are_deterministic() {
        for seed in [-1.0, -12345.75, 1e12, 65535.0] {
            let a = NoiseField::new(seed);
            let b = NoiseField::new(seed);
            assert_eq!(a.elevation(3.3, -1.1).to_bits(), b.elevation(3.3, -1.1).to_bits());
        }
    }
}
