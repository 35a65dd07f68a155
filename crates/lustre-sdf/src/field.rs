//! Land masks and the signed distance field built from them
//!
//! Both grids use the same equirectangular layout: row 0 is the north pole
//! row, column 0 is longitude -180 degrees. The field stores the signed
//! distance from each cell centre to the nearest coastline, negative inside
//! land, in texture-space units (texels divided by the grid width).

use glam::Vec3;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;
use std::f32::consts::{PI, TAU};
use std::fmt;

/// Stand-in for "infinitely far" inside the distance transform.
/// Finite so the parabola intersection arithmetic never produces NaN.
const FAR: f32 = 1e20;

// ============================================================================
// Land mask
// ============================================================================

/// Boolean land/sea grid on an equirectangular projection
#[derive(Clone, PartialEq, Eq)]
pub struct LandMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl LandMask {
    /// Create a mask from row-major cells (`true` = land).
    ///
    /// Returns `None` for an empty grid or when `cells` does not hold
    /// exactly `width * height` entries.
    pub fn from_cells(width: usize, height: usize, cells: Vec<bool>) -> Option<Self> {
        if width == 0 || height == 0 || cells.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    /// Build a mask by evaluating `f(x, y)` for every cell
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> bool) -> Option<Self> {
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self::from_cells(width, height, cells)
    }

    /// Procedural continents: fractal Perlin noise sampled on the unit
    /// sphere, so the wrap seam and the poles stay continuous.
    pub fn procedural(seed: u32, width: usize, height: usize) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let fbm: Fbm<Perlin> = Fbm::new(seed)
            .set_octaves(5)
            .set_frequency(1.4)
            .set_persistence(0.5);

        let cells: Vec<bool> = (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                let fbm = &fbm;
                (0..width).map(move |x| {
                    let (u, v) = cell_uv(x, y, width, height);
                    let d = uv_to_direction(u, v);
                    let n = fbm.get([f64::from(d.x), f64::from(d.y), f64::from(d.z)]);
                    n > 0.08
                })
            })
            .collect();

        Self::from_cells(width, height, cells)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the cell at column `x`, row `y` is land
    pub fn is_land(&self, x: usize, y: usize) -> bool {
        self.cells[y * self.width + x]
    }

    /// Fraction of cells that are land
    pub fn land_fraction(&self) -> f32 {
        let land = self.cells.iter().filter(|&&c| c).count();
        land as f32 / self.cells.len() as f32
    }
}

impl fmt::Debug for LandMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LandMask")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("land_fraction", &self.land_fraction())
            .finish()
    }
}

// ============================================================================
// Distance field
// ============================================================================

/// Signed distance to the coastline, one value per mask cell
#[derive(Clone, PartialEq)]
pub struct DistanceField {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl DistanceField {
    /// Compute the signed distance field for a land mask.
    ///
    /// Exact Euclidean distance transform (lower envelope of parabolas),
    /// run once towards land and once towards sea. Rows wrap around in
    /// longitude; columns do not wrap across the poles. The output depends
    /// only on the mask.
    pub fn generate(mask: &LandMask) -> Self {
        let (w, h) = (mask.width, mask.height);

        let to_land = squared_distances(mask, true);
        let to_sea = squared_distances(mask, false);

        // A grid without any coastline gets a constant-sign field
        let cap = (w + h) as f32;

        let values = mask
            .cells
            .par_iter()
            .zip(to_land.par_iter().zip(to_sea.par_iter()))
            .map(|(&land, (&dl, &ds))| {
                let texels = if land {
                    -(ds.sqrt().min(cap) - 0.5)
                } else {
                    dl.sqrt().min(cap) - 0.5
                };
                texels / w as f32
            })
            .collect();

        Self {
            width: w,
            height: h,
            values,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw row-major values (texture upload layout)
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at column `x`, row `y`
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    /// Bilinear sample at texture coordinates, wrapping `u` and clamping `v`
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let x = u * self.width as f32 - 0.5;
        let y = (v * self.height as f32 - 0.5).clamp(0.0, (self.height - 1) as f32);

        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let w = self.width as i64;
        let xa = (x0 as i64).rem_euclid(w) as usize;
        let xb = (x0 as i64 + 1).rem_euclid(w) as usize;
        let ya = y0 as usize;
        let yb = (ya + 1).min(self.height - 1);

        let top = lerp(self.get(xa, ya), self.get(xb, ya), fx);
        let bottom = lerp(self.get(xa, yb), self.get(xb, yb), fx);
        lerp(top, bottom, fy)
    }

    /// Sample the field in the direction of a 3D point
    pub fn sample_direction(&self, p: Vec3) -> f32 {
        let (u, v) = direction_to_uv(p);
        self.sample(u, v)
    }
}

impl fmt::Debug for DistanceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistanceField")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Projection helpers
// ============================================================================

/// Texture coordinates of a cell centre
pub fn cell_uv(x: usize, y: usize, width: usize, height: usize) -> (f32, f32) {
    (
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    )
}

/// Equirectangular lookup: `u` from the azimuth around +z, `v` from the
/// polar angle measured from +z.
pub fn direction_to_uv(p: Vec3) -> (f32, f32) {
    let u = p.y.atan2(p.x) / TAU + 0.5;
    let v = p.truncate().length().atan2(p.z) / PI;
    (u, v)
}

/// Inverse of [`direction_to_uv`], returning a unit vector
pub fn uv_to_direction(u: f32, v: f32) -> Vec3 {
    let azimuth = (u - 0.5) * TAU;
    let polar = v * PI;
    Vec3::new(
        polar.sin() * azimuth.cos(),
        polar.sin() * azimuth.sin(),
        polar.cos(),
    )
}

// ============================================================================
// Distance transform
// ============================================================================

/// Squared texel distance from every cell to the nearest cell whose land
/// flag equals `target`
fn squared_distances(mask: &LandMask, target: bool) -> Vec<f32> {
    let (w, h) = (mask.width, mask.height);

    // Horizontal pass with longitude wrap: transform three copies of the
    // row laid end to end and keep the middle one.
    let mut grid = vec![0.0f32; w * h];
    grid.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let tripled: Vec<f32> = (0..3 * w)
            .map(|i| {
                if mask.is_land(i % w, y) == target {
                    0.0
                } else {
                    FAR
                }
            })
            .collect();
        let out = transform_1d(&tripled);
        row.copy_from_slice(&out[w..2 * w]);
    });

    // Vertical pass on the transposed grid
    let mut columns = vec![0.0f32; w * h];
    columns.par_chunks_mut(h).enumerate().for_each(|(x, col)| {
        let f: Vec<f32> = (0..h).map(|y| grid[y * w + x]).collect();
        col.copy_from_slice(&transform_1d(&f));
    });

    let mut result = vec![0.0f32; w * h];
    result.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, value) in row.iter_mut().enumerate() {
            *value = columns[x * h + y];
        }
    });
    result
}

/// One-dimensional squared distance transform of a sampled function
/// (Felzenszwalb & Huttenlocher)
fn transform_1d(f: &[f32]) -> Vec<f32> {
    let n = f.len();
    let mut d = vec![0.0f32; n];
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f32; n + 1];

    let mut k = 0usize;
    z[0] = f32::NEG_INFINITY;
    z[1] = f32::INFINITY;

    let intersect = |q: usize, p: usize| -> f32 {
        let (qf, pf) = (q as f32, p as f32);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
    };

    for q in 1..n {
        let mut s = intersect(q, v[k]);
        while s <= z[k] {
            k -= 1;
            s = intersect(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f32::INFINITY;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f32 {
            k += 1;
        }
        let offset = q as f32 - v[k] as f32;
        *out = offset * offset + f[v[k]];
    }
    d
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn island(width: usize, height: usize) -> LandMask {
        // A square island in the middle of the grid
        LandMask::from_fn(width, height, |x, y| {
            (24..40).contains(&x) && (10..22).contains(&y)
        })
        .unwrap()
    }

    #[test]
    fn from_cells_rejects_bad_shapes() {
        assert!(LandMask::from_cells(0, 4, vec![]).is_none());
        assert!(LandMask::from_cells(2, 2, vec![true; 3]).is_none());
        assert!(LandMask::from_cells(2, 2, vec![true; 4]).is_some());
    }

    #[test]
    fn transform_1d_matches_brute_force() {
        let f = [FAR, FAR, 0.0, FAR, FAR, FAR, 0.0, FAR];
        let d = transform_1d(&f);
        let expected = [4.0, 1.0, 0.0, 1.0, 4.0, 1.0, 0.0, 1.0];
        for (a, b) in d.iter().zip(expected) {
            assert_relative_eq!(*a, b);
        }
    }

    #[test]
    fn field_is_signed_by_mask() {
        let mask = island(64, 32);
        let field = DistanceField::generate(&mask);

        for y in 0..mask.height() {
            for x in 0..mask.width() {
                let d = field.get(x, y);
                if mask.is_land(x, y) {
                    assert!(d < 0.0, "land cell ({x},{y}) has {d}");
                } else {
                    assert!(d > 0.0, "sea cell ({x},{y}) has {d}");
                }
            }
        }
    }

    #[test]
    fn field_measures_euclidean_distance() {
        let mask = island(64, 32);
        let field = DistanceField::generate(&mask);

        // Three cells left of the island edge at x = 24: nearest land is
        // 3 texels away, minus the half texel to the boundary.
        assert_relative_eq!(field.get(21, 15) * 64.0, 2.5, epsilon = 1e-4);

        // Diagonal from the island corner (24, 10)
        let expected = (3.0f32 * 3.0 + 4.0 * 4.0).sqrt() - 0.5;
        assert_relative_eq!(field.get(20, 7) * 64.0, expected, epsilon = 1e-4);
    }

    #[test]
    fn rows_wrap_in_longitude() {
        // Land only in the first column: the last column is one texel away
        let mask = LandMask::from_fn(16, 4, |x, _| x == 0).unwrap();
        let field = DistanceField::generate(&mask);
        assert_relative_eq!(field.get(15, 2) * 16.0, 0.5, epsilon = 1e-5);
        assert_relative_eq!(field.get(1, 2) * 16.0, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn field_without_coastline_is_capped() {
        let mask = LandMask::from_cells(8, 4, vec![false; 32]).unwrap();
        let field = DistanceField::generate(&mask);
        assert!(field.values().iter().all(|v| v.is_finite() && *v > 0.0));
    }

    #[test]
    fn generation_is_deterministic() {
        let mask = LandMask::procedural(7, 128, 64).unwrap();
        let a = DistanceField::generate(&mask);
        let b = DistanceField::generate(&mask);
        assert_eq!(a, b);
    }

    #[test]
    fn procedural_mask_has_land_and_sea() {
        let mask = LandMask::procedural(3, 128, 64).unwrap();
        let fraction = mask.land_fraction();
        assert!(fraction > 0.05 && fraction < 0.95, "land fraction {fraction}");
    }

    #[test]
    fn uv_direction_round_trip() {
        let d = uv_to_direction(0.3, 0.7);
        let (u, v) = direction_to_uv(d * 42.0);
        assert_relative_eq!(u, 0.3, epsilon = 1e-5);
        assert_relative_eq!(v, 0.7, epsilon = 1e-5);
    }

    #[test]
    fn sample_at_cell_centre_returns_cell_value() {
        let mask = island(64, 32);
        let field = DistanceField::generate(&mask);
        let (u, v) = cell_uv(30, 16, 64, 32);
        assert_relative_eq!(field.sample(u, v), field.get(30, 16), epsilon = 1e-6);
    }
}
