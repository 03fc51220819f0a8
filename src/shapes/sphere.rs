use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use super::{Corner, Tessellation, Vertex};

const RADIUS: f32 = 0.5;

/// UV sphere: `param1` latitude bands, `param2` longitude slices.
pub(super) fn generate(param1: u32, param2: u32) -> Vec<Vertex> {
    let divisions = param1.max(2);
    let slices = param2.max(3);
    let mut mesh = Tessellation::with_capacity((6 * divisions * slices) as usize);

    let theta_step = TAU / slices as f32;
    for slice in 0..slices {
        let theta = slice as f32 * theta_step;
        let next_theta = (slice + 1) as f32 * theta_step;
        wedge(&mut mesh, theta, next_theta, divisions);
    }
    mesh.finish()
}

fn wedge(mesh: &mut Tessellation, theta: f32, next_theta: f32, divisions: u32) {
    let phi_step = PI / divisions as f32;
    for band in 0..divisions {
        let phi = band as f32 * phi_step;
        // The last band closes exactly at the south pole.
        let next_phi = if band + 1 == divisions {
            PI
        } else {
            (band + 1) as f32 * phi_step
        };

        let mut uv_tl = uv(theta, phi);
        let mut uv_tr = uv(next_theta, phi);
        let mut uv_bl = uv(theta, next_phi);
        let mut uv_br = uv(next_theta, next_phi);
        unwrap_seam(&mut uv_tl, &mut uv_tr);
        unwrap_seam(&mut uv_bl, &mut uv_br);

        mesh.curved_quad([
            corner(theta, phi, uv_tl),
            corner(next_theta, phi, uv_tr),
            corner(theta, next_phi, uv_bl),
            corner(next_theta, next_phi, uv_br),
        ]);
    }
}

fn corner(theta: f32, phi: f32, uv: Vec2) -> Corner {
    let position = Vec3::new(
        RADIUS * theta.cos() * phi.sin(),
        RADIUS * phi.cos(),
        RADIUS * theta.sin() * phi.sin(),
    );
    Corner {
        position,
        normal: position.normalize(),
        uv,
    }
}

fn uv(theta: f32, phi: f32) -> Vec2 {
    Vec2::new(1.0 - theta / TAU, phi / PI)
}

/// Shifts whichever side of a tile wrapped past the 0/1 seam down by one so
/// interpolation does not sweep across the whole texture.
fn unwrap_seam(left: &mut Vec2, right: &mut Vec2) {
    if right.x - left.x > 0.5 {
        right.x -= 1.0;
    }
    if left.x - right.x > 0.5 {
        left.x -= 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normals_are_radial() {
        for vertex in generate(4, 6) {
            let expected = vertex.position().normalize();
            assert!(vertex.normal().abs_diff_eq(expected, 1e-6));
        }
    }

    #[test]
    fn seam_unwrapping_moves_the_wrapped_side() {
        let mut left = Vec2::new(0.1, 0.0);
        let mut right = Vec2::new(0.9, 0.0);
        unwrap_seam(&mut left, &mut right);
        assert!((right.x - -0.1).abs() < 1e-6);
        assert_eq!(left.x, 0.1);

        let mut left = Vec2::new(0.95, 0.0);
        let mut right = Vec2::new(0.05, 0.0);
        unwrap_seam(&mut left, &mut right);
        assert!((left.x - -0.05).abs() < 1e-6);
    }

    #[test]
    fn last_band_reaches_south_pole() {
        let lowest = generate(7, 5)
            .iter()
            .map(|v| v.position[1])
            .fold(f32::INFINITY, f32::min);
        assert!((lowest + RADIUS).abs() < 1e-6);
    }
}
