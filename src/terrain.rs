//! Heightfield terrain built from directional sine dunes plus gradient noise.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::shapes::Vertex;

/// Parameters that fully determine a terrain mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Cells per side of the unit square.
    pub resolution: u32,
    /// Entries in the random gradient table.
    pub lookup_size: usize,
    pub seed: u64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            resolution: 100,
            lookup_size: 1024,
            seed: 1230,
        }
    }
}

/// Triangle list plus one albedo per vertex.
#[derive(Debug, Clone, Default)]
pub struct TerrainMesh {
    pub vertices: Vec<Vertex>,
    pub colors: Vec<Vec3>,
}

#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    resolution: u32,
    gradients: Vec<Vec2>,
}

impl TerrainGenerator {
    pub fn new(config: TerrainConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let gradients = (0..config.lookup_size.max(1))
            .map(|_| Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0)))
            .collect();
        Self {
            resolution: config.resolution.max(1),
            gradients,
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Height at a normalized planar coordinate. The dune pattern repeats
    /// every unit in both directions.
    pub fn height(&self, x: f32, y: f32) -> f32 {
        let ax = TAU * x;
        let ay = TAU * y;

        let mut dunes = 0.0;
        let mut amplitude = 0.5;
        let mut frequency = 1.0;
        for octave in 0..5 {
            let octave = octave as f32;
            let phase_x = 0.7 * octave + 0.3;
            let phase_y = 1.1 * octave + 0.9;
            dunes +=
                amplitude * (frequency * ax + phase_x).sin() * (frequency * ay + phase_y).sin();
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        let detail = self.perlin(x * 6.0, y * 6.0);
        1.2 * (0.75 * dunes + 0.35 * detail)
    }

    /// Grid vertex position: `(row, col)` scaled into the unit square, height in z.
    pub fn position(&self, row: i32, col: i32) -> Vec3 {
        let x = row as f32 / self.resolution as f32;
        let y = col as f32 / self.resolution as f32;
        Vec3::new(x, y, self.height(x, y))
    }

    /// Averages the fan of face normals formed with the eight neighbours.
    pub fn normal(&self, row: i32, col: i32) -> Vec3 {
        const RING: [(i32, i32); 8] = [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
            (1, 0),
            (1, -1),
            (0, -1),
        ];
        let center = self.position(row, col);
        let ring = RING.map(|(dr, dc)| self.position(row + dr, col + dc) - center);
        let sum = (0..ring.len()).fold(Vec3::ZERO, |acc, i| {
            acc - ring[i].cross(ring[(i + 1) % ring.len()])
        });
        sum.normalize_or_zero()
    }

    /// Heights of every grid vertex, row-major over `(resolution + 1)^2`.
    pub fn heights(&self) -> Vec<f32> {
        let n = self.resolution as i32;
        (0..=n)
            .flat_map(|row| (0..=n).map(move |col| (row, col)))
            .map(|(row, col)| self.position(row, col).z)
            .collect()
    }

    /// Two triangles per cell; texture coordinates carry the planar position.
    pub fn generate(&self) -> TerrainMesh {
        let n = self.resolution as i32;
        let stride = (n + 1) as usize;
        let mut grid = Vec::with_capacity(stride * stride);
        for row in 0..=n {
            for col in 0..=n {
                let position = self.position(row, col);
                let normal = self.normal(row, col);
                grid.push((position, normal, sand_color(normal, position)));
            }
        }

        let cells = (n * n) as usize;
        let mut mesh = TerrainMesh {
            vertices: Vec::with_capacity(cells * 6),
            colors: Vec::with_capacity(cells * 6),
        };
        let index = |row: i32, col: i32| row as usize * stride + col as usize;
        for x in 0..n {
            for y in 0..n {
                let p1 = index(x, y);
                let p2 = index(x + 1, y);
                let p3 = index(x + 1, y + 1);
                let p4 = index(x, y + 1);
                for corner in [p1, p2, p3, p1, p3, p4] {
                    let (position, normal, color) = grid[corner];
                    mesh.vertices
                        .push(Vertex::new(position, normal, position.truncate()));
                    mesh.colors.push(color);
                }
            }
        }
        mesh
    }

    fn gradient(&self, row: i32, col: i32) -> Vec2 {
        // Negative keys wrap as unsigned, which keeps the lookup total.
        let key = row.wrapping_mul(41).wrapping_add(col.wrapping_mul(43)) as u32 as usize;
        self.gradients[key % self.gradients.len()]
    }

    fn perlin(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor() as i32;
        let y0 = y.floor() as i32;
        let point = Vec2::new(x, y);
        let corner = |cx: i32, cy: i32| {
            let offset = point - Vec2::new(cx as f32, cy as f32);
            offset.dot(self.gradient(cx, cy).normalize_or_zero())
        };

        let top_left = corner(x0, y0);
        let top_right = corner(x0 + 1, y0);
        let bottom_right = corner(x0 + 1, y0 + 1);
        let bottom_left = corner(x0, y0 + 1);

        let sx = x - x0 as f32;
        let sy = y - y0 as f32;
        let top = ease(top_left, top_right, sx);
        let bottom = ease(bottom_left, bottom_right, sx);
        ease(top, bottom, sy)
    }
}

impl Default for TerrainGenerator {
    fn default() -> Self {
        Self::new(TerrainConfig::default())
    }
}

fn ease(a: f32, b: f32, alpha: f32) -> f32 {
    if alpha.abs() < 1e-6 {
        return a;
    }
    if (alpha - 1.0).abs() < 1e-6 {
        return b;
    }
    a + (3.0 * alpha * alpha - 2.0 * alpha * alpha * alpha) * (b - a)
}

/// Sand albedo: slightly brighter on crests, darker on steep slopes.
pub fn sand_color(normal: Vec3, position: Vec3) -> Vec3 {
    const SAND: Vec3 = Vec3::new(0.98, 0.89, 0.8);
    let crest = (position.z * 1.2 + 0.5).clamp(0.0, 1.0);
    let brightness = lerp(0.9, 1.1, crest);
    let slope = 1.0 - normal.dot(Vec3::Z).abs();
    SAND * brightness * lerp(1.0, 0.7, slope)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> TerrainConfig {
        TerrainConfig {
            resolution: 16,
            ..TerrainConfig::default()
        }
    }

    #[test]
    fn same_seed_gives_identical_heights() {
        let first = TerrainGenerator::new(small()).heights();
        let second = TerrainGenerator::new(small()).heights();
        let bits = |heights: &[f32]| heights.iter().map(|h| h.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
        assert_eq!(first.len(), 17 * 17);
    }

    #[test]
    fn different_seed_changes_detail() {
        let first = TerrainGenerator::new(small()).heights();
        let second = TerrainGenerator::new(TerrainConfig { seed: 7, ..small() }).heights();
        assert_ne!(first, second);
    }

    #[test]
    fn mesh_has_two_triangles_per_cell() {
        let mesh = TerrainGenerator::new(small()).generate();
        assert_eq!(mesh.vertices.len(), 16 * 16 * 6);
        assert_eq!(mesh.colors.len(), mesh.vertices.len());
    }

    #[test]
    fn normals_face_up_out_of_the_plane() {
        let terrain = TerrainGenerator::new(small());
        for row in 0..=16 {
            for col in 0..=16 {
                let normal = terrain.normal(row, col);
                assert!((normal.length() - 1.0).abs() < 1e-4);
                assert!(normal.z > 0.0);
            }
        }
    }

    #[test]
    fn gradient_lookup_accepts_negative_coordinates() {
        let terrain = TerrainGenerator::default();
        let _ = terrain.gradient(-1, -1);
        let _ = terrain.perlin(-3.5, 2.25);
    }

    #[test]
    fn easing_hits_endpoints() {
        assert_eq!(ease(2.0, 5.0, 0.0), 2.0);
        assert_eq!(ease(2.0, 5.0, 1.0), 5.0);
        assert!((ease(2.0, 5.0, 0.5) - 3.5).abs() < 1e-6);
    }

    #[test]
    fn flat_ground_keeps_base_sand_tone() {
        let color = sand_color(Vec3::Z, Vec3::new(0.0, 0.0, 0.0));
        assert!(color.abs_diff_eq(Vec3::new(0.98, 0.89, 0.8), 1e-5));
    }
}
