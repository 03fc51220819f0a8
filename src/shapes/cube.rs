use glam::{Vec2, Vec3};

use super::{Tessellation, Vertex};

/// Faces as (top-left, top-right, bottom-left, bottom-right) seen from outside.
const FACES: [[Vec3; 4]; 6] = [
    // +Z
    [
        Vec3::new(-0.5, 0.5, 0.5),
        Vec3::new(0.5, 0.5, 0.5),
        Vec3::new(-0.5, -0.5, 0.5),
        Vec3::new(0.5, -0.5, 0.5),
    ],
    // -Z
    [
        Vec3::new(0.5, 0.5, -0.5),
        Vec3::new(-0.5, 0.5, -0.5),
        Vec3::new(0.5, -0.5, -0.5),
        Vec3::new(-0.5, -0.5, -0.5),
    ],
    // -X
    [
        Vec3::new(-0.5, 0.5, -0.5),
        Vec3::new(-0.5, 0.5, 0.5),
        Vec3::new(-0.5, -0.5, -0.5),
        Vec3::new(-0.5, -0.5, 0.5),
    ],
    // +X
    [
        Vec3::new(0.5, 0.5, 0.5),
        Vec3::new(0.5, 0.5, -0.5),
        Vec3::new(0.5, -0.5, 0.5),
        Vec3::new(0.5, -0.5, -0.5),
    ],
    // +Y
    [
        Vec3::new(-0.5, 0.5, -0.5),
        Vec3::new(0.5, 0.5, -0.5),
        Vec3::new(-0.5, 0.5, 0.5),
        Vec3::new(0.5, 0.5, 0.5),
    ],
    // -Y
    [
        Vec3::new(-0.5, -0.5, 0.5),
        Vec3::new(0.5, -0.5, 0.5),
        Vec3::new(-0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, -0.5),
    ],
];

/// Unit cube with `param1` subdivisions per face edge.
pub(super) fn generate(param1: u32, _param2: u32) -> Vec<Vertex> {
    let divisions = param1.max(1);
    let mut mesh = Tessellation::with_capacity(36 * (divisions * divisions) as usize);
    for face in FACES {
        face_tiles(&mut mesh, face, divisions);
    }
    mesh.finish()
}

fn face_tiles(
    mesh: &mut Tessellation,
    [top_left, top_right, bottom_left, _]: [Vec3; 4],
    divisions: u32,
) {
    let steps = divisions as f32;
    let step_x = (top_right - top_left) / steps;
    let step_y = (bottom_left - top_left) / steps;

    for i in 0..divisions {
        for j in 0..divisions {
            let (fi, fj) = (i as f32, j as f32);
            let tl = top_left + fj * step_x + fi * step_y;
            let tr = tl + step_x;
            let bl = tl + step_y;
            let br = tl + step_x + step_y;

            let uv = |col: f32, row: f32| Vec2::new(col / steps, row / steps);
            let normal = (tl - bl).cross(tl - tr).normalize();

            mesh.push(tl, normal, uv(fj, fi));
            mesh.push(bl, normal, uv(fj, fi + 1.0));
            mesh.push(br, normal, uv(fj + 1.0, fi + 1.0));

            mesh.push(tl, normal, uv(fj, fi));
            mesh.push(br, normal, uv(fj + 1.0, fi + 1.0));
            mesh.push(tr, normal, uv(fj + 1.0, fi));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_normals_point_outwards() {
        for vertex in generate(2, 1) {
            let normal = vertex.normal();
            let position = vertex.position();
            assert!(normal.dot(position) > 0.0);
            assert_eq!(normal.abs().max_element(), 1.0);
        }
    }

    #[test]
    fn triangles_wind_counter_clockwise_from_outside() {
        for triangle in generate(1, 1).chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| triangle[i].position());
            let face = (b - a).cross(c - a);
            assert!(face.dot(triangle[0].normal()) > 0.0);
        }
    }
}
