use std::f32::consts::TAU;

use glam::{Vec2, Vec3};

use super::{cap_uv, ring_point, side_uv, Corner, Tessellation, Vertex};

const RADIUS: f32 = 0.5;

/// Cone with its apex at `y = 0.5`: `param1` divisions along the slope and
/// across the base, `param2` slices.
pub(super) fn generate(param1: u32, param2: u32) -> Vec<Vertex> {
    let divisions = param1.max(1);
    let slices = param2.max(3);
    let mut mesh = Tessellation::with_capacity(super::vertex_count(
        super::PrimitiveKind::Cone,
        divisions,
        slices,
    ));

    let step = TAU / slices as f32;
    for slice in 0..slices {
        let theta = slice as f32 * step;
        let next_theta = (slice + 1) as f32 * step;
        base_wedge(&mut mesh, theta, next_theta, divisions);
        slope_wedge(&mut mesh, theta, next_theta, divisions);
    }
    mesh.finish()
}

/// Gradient of the implicit cone surface, normalized.
fn slope_normal(point: Vec3) -> Vec3 {
    Vec3::new(2.0 * point.x, -0.25 * (2.0 * point.y - 1.0), 2.0 * point.z).normalize()
}

fn base_wedge(mesh: &mut Tessellation, theta: f32, next_theta: f32, divisions: u32) {
    const Y: f32 = -0.5;
    let radius_step = RADIUS / divisions as f32;
    let uv = |point: Vec3| cap_uv(point, RADIUS, true);

    for ring in 0..divisions {
        let inner = ring as f32 * radius_step;
        let outer = (ring + 1) as f32 * radius_step;
        let outer0 = ring_point(outer, theta, Y);
        let outer1 = ring_point(outer, next_theta, Y);

        if ring == 0 {
            mesh.push(Vec3::new(0.0, Y, 0.0), Vec3::NEG_Y, Vec2::splat(0.5));
            mesh.push(outer0, Vec3::NEG_Y, uv(outer0));
            mesh.push(outer1, Vec3::NEG_Y, uv(outer1));
            continue;
        }

        let inner0 = ring_point(inner, theta, Y);
        let inner1 = ring_point(inner, next_theta, Y);
        for point in [inner0, outer0, outer1, inner0, outer1, inner1] {
            mesh.push(point, Vec3::NEG_Y, uv(point));
        }
    }
}

fn slope_wedge(mesh: &mut Tessellation, theta: f32, next_theta: f32, divisions: u32) {
    let steps = divisions as f32;
    for band in 0..divisions {
        let y_top = 0.5 - band as f32 / steps;
        let y_bottom = 0.5 - (band + 1) as f32 / steps;
        let r_top = RADIUS * (band as f32 / steps);
        let r_bottom = RADIUS * ((band + 1) as f32 / steps);

        let top_left = ring_point(r_top, theta, y_top);
        let top_right = ring_point(r_top, next_theta, y_top);
        let bottom_left = ring_point(r_bottom, theta, y_bottom);
        let bottom_right = ring_point(r_bottom, next_theta, y_bottom);

        // At the apex every top corner collapses to one point, so both take
        // the normal of the wedge's midline on the ring below.
        let (n_top_left, n_top_right) = if band == 0 {
            let mid = ring_point(r_bottom, 0.5 * (theta + next_theta), y_bottom);
            let tip = slope_normal(mid);
            (tip, tip)
        } else {
            (slope_normal(top_left), slope_normal(top_right))
        };

        mesh.curved_quad([
            Corner {
                position: top_left,
                normal: n_top_left,
                uv: side_uv(theta, y_top),
            },
            Corner {
                position: top_right,
                normal: n_top_right,
                uv: side_uv(next_theta, y_top),
            },
            Corner {
                position: bottom_left,
                normal: slope_normal(bottom_left),
                uv: side_uv(theta, y_bottom),
            },
            Corner {
                position: bottom_right,
                normal: slope_normal(bottom_right),
                uv: side_uv(next_theta, y_bottom),
            },
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apex_normals_follow_the_wedge_midline() {
        let vertices = generate(1, 4);
        let apex = vertices
            .iter()
            .find(|v| (v.position[1] - 0.5).abs() < 1e-6)
            .expect("apex vertex");
        let normal = apex.normal();
        assert!(normal[1] > 0.0);
        assert!(normal.x > 0.0 && normal.z > 0.0);
    }

    #[test]
    fn slope_normals_tilt_upwards() {
        for vertex in generate(3, 8) {
            if vertex.normal()[1] > -0.99 {
                assert!(vertex.normal()[1] > 0.0);
            }
        }
    }
}
