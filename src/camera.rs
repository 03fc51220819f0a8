use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Camera as declared by a scene description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraData {
    pub position: Vec3,
    pub look: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub height_angle: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            look: Vec3::NEG_Z,
            up: Vec3::Y,
            height_angle: 45f32.to_radians(),
        }
    }
}

/// Perspective camera. `look` and `up` are stored normalized but are not
/// kept orthogonal until a rotation re-orthonormalizes them.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    look: Vec3,
    up: Vec3,
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        let data = CameraData::default();
        Self {
            position: data.position,
            look: data.look,
            up: data.up,
            fov_y: data.height_angle,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces position, orientation and field of view; projection clip
    /// planes and aspect ratio are kept.
    pub fn set_from_scene(&mut self, data: &CameraData) {
        self.position = data.position;
        self.set_look(data.look);
        self.set_up(data.up);
        self.fov_y = data.height_angle;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn look(&self) -> Vec3 {
        self.look
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_look(&mut self, look: Vec3) {
        self.look = look.try_normalize().unwrap_or(Vec3::NEG_Z);
    }

    pub fn set_up(&mut self, up: Vec3) {
        self.up = up.try_normalize().unwrap_or(Vec3::Y);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    /// Unit vector pointing to the camera's right.
    pub fn right(&self) -> Vec3 {
        self.look.cross(self.up).normalize_or_zero()
    }

    /// World-to-view transform built from the orthonormal basis
    /// (right, true up, -look).
    pub fn view_matrix(&self) -> Mat4 {
        let f = self.look.normalize();
        let s = f.cross(self.up.normalize()).normalize();
        let u = s.cross(f);
        let eye = self.position;
        Mat4::from_cols(
            glam::Vec4::new(s.x, u.x, -f.x, 0.0),
            glam::Vec4::new(s.y, u.y, -f.y, 0.0),
            glam::Vec4::new(s.z, u.z, -f.z, 0.0),
            glam::Vec4::new(-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0),
        )
    }

    /// Right-handed perspective projection with depth mapped to `[0, 1]`.
    /// A non-positive aspect ratio falls back to square.
    pub fn projection_matrix(&self) -> Mat4 {
        let aspect = if self.aspect > 0.0 { self.aspect } else { 1.0 };
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Applies a mouse-look rotation: yaw about world up, then pitch about the
    /// right vector taken before the yaw. The basis is re-orthonormalized
    /// afterwards.
    pub fn rotate(&mut self, yaw: f32, pitch: f32) {
        let mut look = self.look;
        let mut up = self.up;
        let right = look.cross(up).normalize_or_zero();

        if yaw != 0.0 {
            look = rodrigues(look, Vec3::Y, yaw);
            up = rodrigues(up, Vec3::Y, yaw);
        }
        if pitch != 0.0 && right != Vec3::ZERO {
            look = rodrigues(look, right, pitch);
            up = rodrigues(up, right, pitch);
        }

        let look = look.normalize();
        let right = look.cross(up).normalize();
        let up = right.cross(look).normalize();
        if look.is_finite() && up.is_finite() {
            self.look = look;
            self.up = up;
        }
    }
}

/// Rotates `v` about `axis` by `angle` radians.
pub fn rodrigues(v: Vec3, axis: Vec3, angle: f32) -> Vec3 {
    let k = axis.normalize();
    let (sin, cos) = angle.sin_cos();
    v * cos + k.cross(v) * sin + k * k.dot(v) * (1.0 - cos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat3;

    fn assert_orthonormal(view: Mat4) {
        let basis = Mat3::from_mat4(view);
        let rows = [basis.row(0), basis.row(1), basis.row(2)];
        for (i, row) in rows.iter().enumerate() {
            assert!((row.length() - 1.0).abs() < 1e-5, "row {i} length {}", row.length());
            for other in &rows[i + 1..] {
                assert!(row.dot(*other).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn view_basis_is_orthonormal_for_skewed_up() {
        let mut camera = Camera::new();
        camera.set_position(Vec3::new(3.0, -2.0, 7.0));
        camera.set_look(Vec3::new(1.0, 0.3, -2.0));
        camera.set_up(Vec3::new(0.2, 1.0, 0.4));
        assert_orthonormal(camera.view_matrix());
    }

    #[test]
    fn view_matches_look_to() {
        let mut camera = Camera::new();
        camera.set_position(Vec3::new(1.0, 2.0, 3.0));
        camera.set_look(Vec3::new(-1.0, 0.0, -1.0));
        let expected = Mat4::look_to_rh(camera.position(), camera.look(), camera.up());
        assert!(camera.view_matrix().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn projection_falls_back_to_square_aspect() {
        let mut camera = Camera::new();
        camera.set_aspect(0.0);
        let square = Mat4::perspective_rh(camera.fov_y(), 1.0, 0.1, 100.0);
        assert!(camera.projection_matrix().abs_diff_eq(square, 1e-6));
    }

    #[test]
    fn rotation_keeps_basis_orthonormal() {
        let mut camera = Camera::new();
        camera.set_up(Vec3::new(0.3, 1.0, 0.1));
        for step in 0..500 {
            camera.rotate(0.013 * (step % 7) as f32, -0.007 * (step % 5) as f32);
        }
        assert!((camera.look().length() - 1.0).abs() < 1e-5);
        assert!(camera.look().dot(camera.up()).abs() < 1e-5);
        assert_orthonormal(camera.view_matrix());
    }

    #[test]
    fn yaw_turns_about_world_up() {
        let mut camera = Camera::new();
        camera.rotate(std::f32::consts::FRAC_PI_2, 0.0);
        assert!(camera.look().abs_diff_eq(Vec3::NEG_X, 1e-5));
        assert!(camera.up().abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn rodrigues_quarter_turn() {
        let rotated = rodrigues(Vec3::X, Vec3::Z, std::f32::consts::FRAC_PI_2);
        assert!(rotated.abs_diff_eq(Vec3::Y, 1e-6));
    }
}
