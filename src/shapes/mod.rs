//! Procedural tessellation for the built-in primitive kinds.
//!
//! Every generator shares the same contract: two tessellation parameters go
//! in, a flat, non-indexed triangle list of [`Vertex`] values comes out.
//! Generators clamp their own inputs, so callers may pass any value.

mod cone;
mod cube;
mod cylinder;
mod sphere;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Interleaved vertex layout shared by every mesh uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const STRIDE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }

    pub fn uv(&self) -> Vec2 {
        Vec2::from_array(self.uv)
    }
}

/// Closed set of primitive kinds a scene can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Cube,
    Sphere,
    Cylinder,
    Cone,
    /// Triangles come from an imported mesh file instead of a generator.
    Mesh,
}

type Generator = fn(u32, u32) -> Vec<Vertex>;

impl PrimitiveKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_lowercase().as_str() {
            "cube" => Self::Cube,
            "sphere" => Self::Sphere,
            "cylinder" => Self::Cylinder,
            "cone" => Self::Cone,
            "mesh" => Self::Mesh,
            _ => return None,
        })
    }

    pub fn is_procedural(self) -> bool {
        self.generator().is_some()
    }

    fn generator(self) -> Option<Generator> {
        match self {
            Self::Cube => Some(cube::generate),
            Self::Sphere => Some(sphere::generate),
            Self::Cylinder => Some(cylinder::generate),
            Self::Cone => Some(cone::generate),
            Self::Mesh => None,
        }
    }
}

/// Tessellates a procedural primitive. Mesh primitives yield no vertices here.
pub fn generate(kind: PrimitiveKind, param1: u32, param2: u32) -> Vec<Vertex> {
    kind.generator()
        .map(|generator| generator(param1, param2))
        .unwrap_or_default()
}

/// Number of vertices [`generate`] emits for the given parameters.
pub fn vertex_count(kind: PrimitiveKind, param1: u32, param2: u32) -> usize {
    match kind {
        PrimitiveKind::Cube => {
            let divisions = param1.max(1) as usize;
            6 * divisions * divisions * 6
        }
        PrimitiveKind::Sphere => {
            let divisions = param1.max(2) as usize;
            let slices = param2.max(3) as usize;
            6 * divisions * slices
        }
        PrimitiveKind::Cylinder => {
            let divisions = param1.max(1) as usize;
            let slices = param2.max(3) as usize;
            slices * (2 * cap_ring_vertices(divisions) + 6 * divisions)
        }
        PrimitiveKind::Cone => {
            let divisions = param1.max(1) as usize;
            let slices = param2.max(3) as usize;
            slices * (cap_ring_vertices(divisions) + 6 * divisions)
        }
        PrimitiveKind::Mesh => 0,
    }
}

/// Vertices in one cap wedge: a centre triangle plus a quad per outer ring.
fn cap_ring_vertices(divisions: usize) -> usize {
    3 + 6 * (divisions - 1)
}

/// Growable vertex list with helpers for the triangle orderings the
/// generators share.
#[derive(Debug, Default)]
pub(crate) struct Tessellation {
    vertices: Vec<Vertex>,
}

impl Tessellation {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, position: Vec3, normal: Vec3, uv: Vec2) {
        self.vertices.push(Vertex::new(position, normal, uv));
    }

    /// Emits (top-left, bottom-right, bottom-left) and
    /// (bottom-right, top-left, top-right), the order used by every curved
    /// surface.
    pub(crate) fn curved_quad(&mut self, corners: [Corner; 4]) {
        let [top_left, top_right, bottom_left, bottom_right] = corners;
        for corner in [top_left, bottom_right, bottom_left, bottom_right, top_left, top_right] {
            self.push(corner.position, corner.normal, corner.uv);
        }
    }

    pub(crate) fn finish(self) -> Vec<Vertex> {
        self.vertices
    }
}

/// A quad corner with its shading attributes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Corner {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

/// Texture coordinate for a point on a side or slope surface: the angle is
/// unwrapped horizontally and `y` in `[-0.5, 0.5]` maps to `v` with the top at 0.
pub(crate) fn side_uv(theta: f32, y: f32) -> Vec2 {
    let u = theta / std::f32::consts::TAU;
    let v = y + 0.5;
    Vec2::new(1.0 - u, 1.0 - v)
}

/// Planar projection of a cap point onto the unit square.
pub(crate) fn cap_uv(point: Vec3, radius: f32, flip_v: bool) -> Vec2 {
    let u = 0.5 + point.x / (2.0 * radius);
    let v = 0.5 + point.z / (2.0 * radius);
    Vec2::new(u, if flip_v { 1.0 - v } else { v })
}

pub(crate) fn ring_point(radius: f32, theta: f32, y: f32) -> Vec3 {
    Vec3::new(radius * theta.cos(), y, radius * theta.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [PrimitiveKind; 4] = [
        PrimitiveKind::Cube,
        PrimitiveKind::Sphere,
        PrimitiveKind::Cylinder,
        PrimitiveKind::Cone,
    ];

    #[test]
    fn vertex_counts_match_closed_form() {
        for kind in KINDS {
            for p1 in 1..=6 {
                for p2 in 1..=8 {
                    let vertices = generate(kind, p1, p2);
                    assert_eq!(
                        vertices.len(),
                        vertex_count(kind, p1, p2),
                        "{kind:?} p1={p1} p2={p2}"
                    );
                    assert_eq!(vertices.len() % 3, 0);
                }
            }
        }
    }

    #[test]
    fn known_counts_for_small_parameters() {
        assert_eq!(generate(PrimitiveKind::Cube, 1, 1).len(), 36);
        assert_eq!(generate(PrimitiveKind::Cube, 2, 9).len(), 144);
        assert_eq!(generate(PrimitiveKind::Sphere, 2, 3).len(), 36);
        assert_eq!(generate(PrimitiveKind::Cylinder, 1, 3).len(), 36);
        assert_eq!(generate(PrimitiveKind::Cone, 2, 4).len(), 4 * (9 + 12));
    }

    #[test]
    fn inputs_below_minimum_are_clamped() {
        assert_eq!(
            generate(PrimitiveKind::Sphere, 0, 0),
            generate(PrimitiveKind::Sphere, 2, 3)
        );
        assert_eq!(
            generate(PrimitiveKind::Cone, 0, 1),
            generate(PrimitiveKind::Cone, 1, 3)
        );
    }

    #[test]
    fn generated_normals_are_unit_length() {
        for kind in KINDS {
            for vertex in generate(kind, 3, 7) {
                let length = vertex.normal().length();
                assert!((length - 1.0).abs() < 1e-4, "{kind:?} normal {length}");
            }
        }
    }

    #[test]
    fn primitives_fit_the_unit_cube() {
        for kind in KINDS {
            for vertex in generate(kind, 4, 9) {
                let p = vertex.position();
                assert!(p.abs().max_element() <= 0.5 + 1e-5, "{kind:?} {p}");
            }
        }
    }

    #[test]
    fn mesh_kind_has_no_generator() {
        assert!(generate(PrimitiveKind::Mesh, 5, 5).is_empty());
        assert!(!PrimitiveKind::Mesh.is_procedural());
        assert_eq!(PrimitiveKind::from_name(" Sphere "), Some(PrimitiveKind::Sphere));
        assert_eq!(PrimitiveKind::from_name("torus"), None);
    }

    #[test]
    fn vertex_stride_matches_layout() {
        assert_eq!(Vertex::STRIDE, 32);
    }
}
