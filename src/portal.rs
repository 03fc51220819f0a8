//! The portal quad: placement, ray picking and the push-through traversal
//! state machine.

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;

const DEPTH_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Quad extent along local X.
    pub width: f32,
    /// Quad extent along local Y.
    pub height: f32,
    /// Virtual distance the viewer has to push through.
    pub depth_max: f32,
    /// Units per second the remaining distance recovers when not pushing.
    pub recovery_rate: f32,
    /// Seconds after a transition during which traversal is ignored.
    pub cooldown: f32,
    /// Distance in front of the camera at which the portal is placed.
    pub placement_distance: f32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            width: 0.6,
            height: 0.8,
            depth_max: 1.0,
            recovery_rate: 1.5,
            cooldown: 0.4,
            placement_distance: 2.0,
        }
    }
}

/// How the portal is positioned relative to the active camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortalPlacement {
    /// Keyboard toggle: hang the quad along the current gaze, facing the camera.
    InFrontOfCamera,
    /// After a scene switch: stand the quad upright at eye height in front
    /// of the new camera and keep it at eye height from then on.
    RecenterOnSwitch,
}

/// Where a ray met the portal, in quad UV space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalHit {
    pub distance: f32,
    pub uv: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portal {
    config: PortalConfig,
    enabled: bool,
    model: Mat4,
    auto_center_y: bool,
    depth: f32,
    cooldown_timer: f32,
}

impl Default for Portal {
    fn default() -> Self {
        Self::new(PortalConfig::default())
    }
}

impl Portal {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config,
            enabled: false,
            model: Mat4::IDENTITY,
            auto_center_y: false,
            depth: config.depth_max,
            cooldown_timer: 0.0,
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.depth = self.config.depth_max;
        }
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn auto_center_y(&self) -> bool {
        self.auto_center_y
    }

    /// Remaining push-through distance.
    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn in_cooldown(&self) -> bool {
        self.cooldown_timer > 0.0
    }

    pub fn place(&mut self, camera: &Camera, placement: PortalPlacement) {
        let distance = self.config.placement_distance;
        match placement {
            PortalPlacement::InFrontOfCamera => {
                let center = camera.position() + camera.look() * distance;
                self.model = facing_basis(center, -camera.look(), camera.up());
                self.auto_center_y = false;
            }
            PortalPlacement::RecenterOnSwitch => {
                let flat = Vec3::new(camera.look().x, 0.0, camera.look().z)
                    .try_normalize()
                    .unwrap_or(Vec3::NEG_Z);
                let center = camera.position() + flat * distance;
                self.model = facing_basis(center, -flat, Vec3::Y);
                self.auto_center_y = true;
            }
        }
    }

    /// Keeps an auto-centered portal at the camera's eye height.
    pub fn follow(&mut self, camera: &Camera) {
        if self.auto_center_y {
            self.model.w_axis.y = camera.position().y;
        }
    }

    /// Intersects a ray with the quad. Rays parallel to the plane or
    /// pointing away from it miss.
    pub fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<PortalHit> {
        let inverse = self.model.inverse();
        let local_origin = inverse.transform_point3(origin);
        let local_direction = inverse.transform_vector3(direction);
        if local_direction.z.abs() < 1e-6 {
            return None;
        }
        let t = -local_origin.z / local_direction.z;
        if t <= 0.0 {
            return None;
        }
        let point = local_origin + local_direction * t;
        let uv = Vec2::new(
            point.x / self.config.width + 0.5,
            point.y / self.config.height + 0.5,
        );
        if !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) {
            return None;
        }
        Some(PortalHit {
            distance: t * direction.length(),
            uv,
        })
    }

    /// Picks along the camera's gaze.
    pub fn pick(&self, camera: &Camera) -> Option<PortalHit> {
        self.intersect(camera.position(), camera.look())
    }

    /// Advances the traversal state. Returns `true` on the tick the viewer
    /// makes it through.
    pub fn update(&mut self, dt: f32, pushing: bool, on_portal: bool, speed: f32) -> bool {
        let dt = dt.max(0.0);
        self.cooldown_timer = (self.cooldown_timer - dt).max(0.0);

        if self.enabled && pushing && on_portal && self.cooldown_timer <= 0.0 {
            self.depth -= speed * dt;
            if self.depth <= DEPTH_EPSILON {
                self.depth = self.config.depth_max;
                self.cooldown_timer = self.config.cooldown;
                return true;
            }
        } else {
            self.depth = (self.depth + self.config.recovery_rate * dt).min(self.config.depth_max);
        }
        false
    }

    /// Corners of the quad in world space, as two counter-clockwise
    /// triangles with their UVs.
    pub fn quad_vertices(&self) -> [(Vec3, Vec2); 6] {
        let half_w = self.config.width * 0.5;
        let half_h = self.config.height * 0.5;
        let corner = |x: f32, y: f32, uv: Vec2| {
            (self.model.transform_point3(Vec3::new(x, y, 0.0)), uv)
        };
        let bl = corner(-half_w, -half_h, Vec2::new(0.0, 0.0));
        let br = corner(half_w, -half_h, Vec2::new(1.0, 0.0));
        let tr = corner(half_w, half_h, Vec2::new(1.0, 1.0));
        let tl = corner(-half_w, half_h, Vec2::new(0.0, 1.0));
        [bl, br, tr, bl, tr, tl]
    }
}

/// Model matrix whose local +Z is `normal` and whose local +Y leans toward `up`.
fn facing_basis(center: Vec3, normal: Vec3, up: Vec3) -> Mat4 {
    let z = normal.try_normalize().unwrap_or(Vec3::Z);
    let x = up
        .cross(z)
        .try_normalize()
        .or_else(|| Vec3::Y.cross(z).try_normalize())
        .unwrap_or(Vec3::X);
    let y = z.cross(x);
    Mat4::from_cols(
        x.extend(0.0),
        y.extend(0.0),
        z.extend(0.0),
        center.extend(1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed_portal() -> (Portal, Camera) {
        let camera = Camera::new();
        let mut portal = Portal::default();
        portal.set_enabled(true);
        portal.place(&camera, PortalPlacement::InFrontOfCamera);
        (portal, camera)
    }

    #[test]
    fn keyboard_placement_faces_the_camera() {
        let (portal, camera) = placed_portal();
        let center = portal.model().transform_point3(Vec3::ZERO);
        assert!(center.abs_diff_eq(camera.position() + camera.look() * 2.0, 1e-5));
        let normal = portal.model().transform_vector3(Vec3::Z);
        assert!(normal.abs_diff_eq(-camera.look(), 1e-5));
        assert!(!portal.auto_center_y());
    }

    #[test]
    fn recenter_placement_stays_upright_and_follows_eye_height() {
        let mut camera = Camera::new();
        camera.set_look(Vec3::new(1.0, -1.0, 0.0));
        let mut portal = Portal::default();
        portal.place(&camera, PortalPlacement::RecenterOnSwitch);
        let up = portal.model().transform_vector3(Vec3::Y);
        assert!(up.abs_diff_eq(Vec3::Y, 1e-5));
        assert!(portal.auto_center_y());

        camera.set_position(Vec3::new(0.0, 7.0, 5.0));
        portal.follow(&camera);
        assert_eq!(portal.model().w_axis.y, 7.0);
    }

    #[test]
    fn gaze_through_center_hits_middle_of_quad() {
        let (portal, camera) = placed_portal();
        let hit = portal.pick(&camera).expect("camera looks at the portal");
        assert!(hit.uv.abs_diff_eq(Vec2::splat(0.5), 1e-5));
        assert!((hit.distance - 2.0).abs() < 1e-4);
    }

    #[test]
    fn rays_outside_the_quad_or_behind_miss() {
        let (portal, camera) = placed_portal();
        let beside = camera.position() + Vec3::X;
        assert!(portal.intersect(beside, camera.look()).is_none());
        assert!(portal.intersect(camera.position(), -camera.look()).is_none());
        assert!(portal.intersect(camera.position(), Vec3::X).is_none());
    }

    #[test]
    fn holding_for_depth_over_speed_triggers_once() {
        let (mut portal, _) = placed_portal();
        let speed = 5.0;
        let mut transitions = 0;
        for _ in 0..4 {
            if portal.update(0.05, true, true, speed) {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 1);
        assert!(portal.in_cooldown());

        let mut elapsed = 0.0;
        while elapsed < 0.35 {
            assert!(!portal.update(0.05, true, true, speed));
            elapsed += 0.05;
        }
    }

    #[test]
    fn releasing_recovers_gradually() {
        let (mut portal, _) = placed_portal();
        portal.update(0.1, true, true, 5.0);
        assert!((portal.depth() - 0.5).abs() < 1e-5);
        portal.update(0.1, false, true, 5.0);
        assert!((portal.depth() - 0.65).abs() < 1e-5);
        portal.update(1.0, true, false, 5.0);
        assert_eq!(portal.depth(), 1.0);
    }

    #[test]
    fn disabled_portal_never_transitions() {
        let (mut portal, _) = placed_portal();
        portal.set_enabled(false);
        for _ in 0..100 {
            assert!(!portal.update(0.1, true, true, 5.0));
        }
    }

    #[test]
    fn quad_vertices_span_configured_size() {
        let portal = Portal::default();
        let vertices = portal.quad_vertices();
        assert_eq!(vertices[0].0, Vec3::new(-0.3, -0.4, 0.0));
        assert_eq!(vertices[2].0, Vec3::new(0.3, 0.4, 0.0));
        assert_eq!(vertices[2].1, Vec2::ONE);
    }
}
