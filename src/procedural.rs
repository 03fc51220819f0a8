//! Built-in content drawn through the geometry pipeline when no scene file
//! is loaded: the bare terrain and the planet demo.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec3};

use crate::camera::CameraData;
use crate::geometry::{DrawItem, GeometryBatch, ObjectAnimation};
use crate::render_data::LightData;
use crate::scene::{GlobalData, LightKind, Material};
use crate::shapes::{self, PrimitiveKind};
use crate::terrain::TerrainGenerator;

/// A fully built scene that bypasses scene-file parsing.
#[derive(Debug, Clone)]
pub struct ProceduralScene {
    pub globals: GlobalData,
    pub lights: Vec<LightData>,
    pub batch: GeometryBatch,
    /// Where to put the camera when the scene is entered, if anywhere.
    pub camera: Option<CameraData>,
}

fn directional(direction: Vec3, color: Vec3) -> LightData {
    LightData {
        kind: LightKind::Directional,
        color,
        position: Vec3::ZERO,
        direction: direction.normalize_or_zero(),
        attenuation: Vec3::X,
        angle: 0.0,
        penumbra: 0.0,
    }
}

fn material(ka: f32, kd: f32, ks: f32, shininess: f32) -> Material {
    Material {
        ambient: Vec3::splat(ka),
        diffuse: Vec3::splat(kd),
        specular: Vec3::splat(ks),
        shininess,
        texture: None,
    }
}

/// The terrain patch on its own, centered on the origin and facing +Z.
/// Drawn double-sided.
pub fn terrain_scene(terrain: &TerrainGenerator) -> ProceduralScene {
    let mesh = terrain.generate();
    let mut batch = GeometryBatch::new();
    let range = batch.append(&mesh.vertices, Some(&mesh.colors));
    let model = Mat4::from_translation(Vec3::new(-0.5, -0.5, 0.0));
    batch.push(DrawItem::new(range, model, &material(0.2, 0.5, 0.1, 8.0)));

    ProceduralScene {
        globals: GlobalData {
            ka: 0.1,
            kd: 1.0,
            ks: 0.3,
            kt: 0.0,
        },
        lights: vec![directional(Vec3::new(0.3, -1.0, 0.2), Vec3::ONE)],
        batch,
        camera: None,
    }
}

const PLANET_CENTER: Vec3 = Vec3::new(0.0, 12.0, -30.0);

/// Desert floor, a banded planet with an orbiting moon, and a bobbing cube.
pub fn planet_scene(terrain: &TerrainGenerator) -> ProceduralScene {
    let mut batch = GeometryBatch::new();

    // The terrain grid lies in XY with heights along Z; stand it up so
    // heights run along world Y and the patch spans 60 x 60 units.
    let mesh = terrain.generate();
    let range = batch.append(&mesh.vertices, Some(&mesh.colors));
    let ground = Mat4::from_translation(Vec3::new(-30.0, -2.0, 30.0))
        * Mat4::from_scale(Vec3::new(60.0, 6.0, 60.0))
        * Mat4::from_rotation_x(-FRAC_PI_2);
    batch.push(
        DrawItem::new(range, ground, &material(0.3, 0.8, 0.05, 4.0))
            .with_animation(ObjectAnimation::Sand),
    );

    let planet = shapes::generate(PrimitiveKind::Sphere, 32, 64);
    let range = batch.append(&planet, None);
    let model = Mat4::from_scale_rotation_translation(
        Vec3::splat(16.0),
        Quat::from_rotation_z(0.35),
        PLANET_CENTER,
    );
    batch.push(
        DrawItem::new(range, model, &material(0.2, 0.9, 0.1, 12.0)).with_animation(
            ObjectAnimation::Planet {
                color_a: Vec3::new(0.93, 0.78, 0.58),
                color_b: Vec3::new(0.62, 0.38, 0.26),
                spin_rate: 0.15,
            },
        ),
    );

    // The orbit offset is added in the vertex stage; the model only sizes
    // the moon.
    let moon = shapes::generate(PrimitiveKind::Sphere, 16, 32);
    let range = batch.append(&moon, None);
    batch.push(
        DrawItem::new(
            range,
            Mat4::from_scale(Vec3::splat(2.0)),
            &material(0.15, 0.7, 0.2, 16.0),
        )
        .with_animation(ObjectAnimation::Moon {
            center: PLANET_CENTER,
            radius: 15.0,
            angular_speed: 0.3,
        }),
    );

    let cube = shapes::generate(PrimitiveKind::Cube, 3, 1);
    let range = batch.append(&cube, None);
    let model = Mat4::from_translation(Vec3::new(3.0, 1.5, -4.0))
        * Mat4::from_rotation_y(30f32.to_radians());
    let mut cube_material = material(0.2, 0.8, 0.5, 32.0);
    cube_material.diffuse = Vec3::new(0.35, 0.55, 0.9);
    batch.push(
        DrawItem::new(range, model, &cube_material).with_animation(ObjectAnimation::FloatingCube {
            amplitude: 0.4,
            frequency: 0.5,
        }),
    );

    ProceduralScene {
        globals: GlobalData {
            ka: 0.25,
            kd: 0.9,
            ks: 0.3,
            kt: 0.0,
        },
        lights: vec![directional(
            Vec3::new(-0.4, -1.0, -0.3),
            Vec3::new(1.0, 0.95, 0.85),
        )],
        batch,
        camera: Some(CameraData {
            position: Vec3::new(0.0, 3.0, 12.0),
            look: (Vec3::new(0.0, 6.0, -20.0) - Vec3::new(0.0, 3.0, 12.0)).normalize(),
            up: Vec3::Y,
            height_angle: 45f32.to_radians(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TerrainConfig;

    fn terrain() -> TerrainGenerator {
        TerrainGenerator::new(TerrainConfig {
            resolution: 8,
            ..TerrainConfig::default()
        })
    }

    #[test]
    fn terrain_scene_is_one_tinted_item() {
        let scene = terrain_scene(&terrain());
        assert_eq!(scene.batch.draws.len(), 1);
        assert_eq!(scene.batch.draws[0].count, 8 * 8 * 6);
        assert_eq!(scene.batch.tints.len(), scene.batch.vertices.len());
        assert_eq!(scene.lights.len(), 1);
        assert_eq!(scene.lights[0].direction, Vec3::new(0.3, -1.0, 0.2).normalize());
        assert_eq!(scene.globals.kd, 1.0);
    }

    #[test]
    fn planet_scene_has_one_object_per_animation() {
        let scene = planet_scene(&terrain());
        assert_eq!(scene.batch.draws.len(), 4);
        assert!(matches!(scene.batch.draws[0].animation, ObjectAnimation::Sand));
        assert!(matches!(scene.batch.draws[1].animation, ObjectAnimation::Planet { .. }));
        assert!(matches!(scene.batch.draws[2].animation, ObjectAnimation::Moon { .. }));
        assert!(matches!(
            scene.batch.draws[3].animation,
            ObjectAnimation::FloatingCube { .. }
        ));
        assert!(scene.camera.is_some());
    }

    #[test]
    fn ground_heights_run_along_world_up() {
        let scene = planet_scene(&terrain());
        let ground = scene.batch.draws[0].model;
        let up = ground.transform_vector3(Vec3::Z).normalize();
        assert!(up.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn draw_ranges_are_contiguous() {
        let scene = planet_scene(&terrain());
        let mut next = 0;
        for draw in &scene.batch.draws {
            assert_eq!(draw.first, next);
            next += draw.count;
        }
        assert_eq!(next, scene.batch.vertex_count());
    }
}
