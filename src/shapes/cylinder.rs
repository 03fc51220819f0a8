use std::f32::consts::TAU;

use glam::{Vec2, Vec3};

use super::{cap_uv, ring_point, side_uv, Corner, Tessellation, Vertex};

const RADIUS: f32 = 0.5;

/// Capped cylinder: `param1` radial and vertical divisions, `param2` slices.
pub(super) fn generate(param1: u32, param2: u32) -> Vec<Vertex> {
    let divisions = param1.max(1);
    let slices = param2.max(3);
    let mut mesh = Tessellation::with_capacity(super::vertex_count(
        super::PrimitiveKind::Cylinder,
        divisions,
        slices,
    ));

    let step = TAU / slices as f32;
    for slice in 0..slices {
        let theta = slice as f32 * step;
        let next_theta = (slice + 1) as f32 * step;
        cap_wedge(&mut mesh, theta, next_theta, divisions, false);
        cap_wedge(&mut mesh, theta, next_theta, divisions, true);
        side_wedge(&mut mesh, theta, next_theta, divisions);
    }
    mesh.finish()
}

fn cap_wedge(mesh: &mut Tessellation, theta: f32, next_theta: f32, divisions: u32, top: bool) {
    let y = if top { 0.5 } else { -0.5 };
    let normal = if top { Vec3::Y } else { Vec3::NEG_Y };
    let radius_step = RADIUS / divisions as f32;
    let uv = |point: Vec3| cap_uv(point, RADIUS, !top);

    for ring in 0..divisions {
        let inner = ring as f32 * radius_step;
        let outer = (ring + 1) as f32 * radius_step;
        let outer0 = ring_point(outer, theta, y);
        let outer1 = ring_point(outer, next_theta, y);

        if ring == 0 {
            let center = Vec3::new(0.0, y, 0.0);
            let (first, second) = if top { (outer1, outer0) } else { (outer0, outer1) };
            mesh.push(center, normal, Vec2::splat(0.5));
            mesh.push(first, normal, uv(first));
            mesh.push(second, normal, uv(second));
            continue;
        }

        let inner0 = ring_point(inner, theta, y);
        let inner1 = ring_point(inner, next_theta, y);
        let order = if top {
            [inner0, outer1, outer0, inner0, inner1, outer1]
        } else {
            [inner0, outer0, outer1, inner0, outer1, inner1]
        };
        for point in order {
            mesh.push(point, normal, uv(point));
        }
    }
}

fn side_wedge(mesh: &mut Tessellation, theta: f32, next_theta: f32, divisions: u32) {
    let step_y = 1.0 / divisions as f32;
    let normal = |angle: f32| Vec3::new(angle.cos(), 0.0, angle.sin());

    for band in 0..divisions {
        let y_top = 0.5 - band as f32 * step_y;
        let y_bottom = 0.5 - (band + 1) as f32 * step_y;
        let corner = |angle: f32, y: f32| Corner {
            position: ring_point(RADIUS, angle, y),
            normal: normal(angle),
            uv: side_uv(angle, y),
        };
        mesh.curved_quad([
            corner(theta, y_top),
            corner(next_theta, y_top),
            corner(theta, y_bottom),
            corner(next_theta, y_bottom),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_normals_are_axis_aligned() {
        let vertices = generate(3, 5);
        let caps = vertices
            .iter()
            .filter(|v| v.normal()[1].abs() > 0.5)
            .collect::<Vec<_>>();
        assert_eq!(caps.len(), 5 * 2 * (3 + 6 * 2));
        for vertex in caps {
            assert_eq!(vertex.normal()[1].signum(), vertex.position[1].signum());
        }
    }

    #[test]
    fn bottom_cap_flips_v() {
        let point = Vec3::new(0.25, -0.5, 0.25);
        assert_eq!(cap_uv(point, RADIUS, true), Vec2::new(0.75, 0.25));
        assert_eq!(cap_uv(point, RADIUS, false), Vec2::new(0.75, 0.75));
    }
}
