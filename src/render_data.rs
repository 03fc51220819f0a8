//! Flattens a scene hierarchy into world-space lights and shapes.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::camera::CameraData;
use crate::scene::{
    GlobalData, LightDecl, LightKind, Primitive, SceneDescription, SceneNode, Transform,
};

/// World-space light ready for upload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightData {
    pub kind: LightKind,
    pub color: Vec3,
    /// Unused for directional lights.
    pub position: Vec3,
    /// Unused for point lights.
    pub direction: Vec3,
    pub attenuation: Vec3,
    pub angle: f32,
    pub penumbra: f32,
}

/// A primitive paired with its cumulative transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeData {
    pub primitive: Primitive,
    pub ctm: Mat4,
}

/// Everything the engine needs to draw one scene, in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderData {
    pub globals: GlobalData,
    pub camera: CameraData,
    pub lights: Vec<LightData>,
    pub shapes: Vec<ShapeData>,
}

impl RenderData {
    /// Walks the hierarchy depth first. At every node the node's own
    /// transforms are appended to the parent's, then its primitives and
    /// lights are emitted before its children are visited.
    pub fn from_scene(scene: &SceneDescription) -> Self {
        let mut data = Self {
            globals: scene.globals,
            camera: scene.camera,
            lights: Vec::new(),
            shapes: Vec::new(),
        };
        data.visit(&scene.root, Mat4::IDENTITY);
        data
    }

    fn visit(&mut self, node: &SceneNode, parent: Mat4) {
        let ctm = node.transforms.iter().fold(parent, apply_transform);

        for primitive in &node.primitives {
            self.shapes.push(ShapeData {
                primitive: primitive.clone(),
                ctm,
            });
        }
        for light in &node.lights {
            self.lights.push(world_light(light, ctm));
        }
        for child in &node.children {
            self.visit(child, ctm);
        }
    }
}

/// Appends one transform to the cumulative matrix.
///
/// An explicit matrix pre-multiplies, and one that is the identity or all
/// zeros leaves the matrix untouched.
pub fn apply_transform(ctm: Mat4, transform: &Transform) -> Mat4 {
    match *transform {
        Transform::Translate(offset) => ctm * Mat4::from_translation(offset),
        Transform::Rotate(axis, angle) => match axis.try_normalize() {
            Some(axis) => ctm * Mat4::from_axis_angle(axis, angle),
            None => ctm,
        },
        Transform::Scale(factors) => ctm * Mat4::from_scale(factors),
        Transform::Matrix(matrix) => {
            if matrix == Mat4::IDENTITY || matrix == Mat4::ZERO {
                ctm
            } else {
                matrix * ctm
            }
        }
    }
}

fn world_light(light: &LightDecl, ctm: Mat4) -> LightData {
    let position = match light.kind {
        LightKind::Directional => Vec3::ZERO,
        LightKind::Point | LightKind::Spot => (ctm * Vec4::W).truncate(),
    };
    let direction = match light.kind {
        LightKind::Point => Vec3::ZERO,
        LightKind::Directional | LightKind::Spot => (ctm * light.direction.extend(0.0)).truncate(),
    };
    LightData {
        kind: light.kind,
        color: light.color,
        position,
        direction,
        attenuation: light.attenuation,
        angle: light.angle,
        penumbra: light.penumbra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Material;
    use crate::shapes::PrimitiveKind;

    fn cube() -> Primitive {
        Primitive {
            kind: PrimitiveKind::Cube,
            mesh_file: None,
            material: Material::default(),
        }
    }

    fn light(kind: LightKind) -> LightDecl {
        LightDecl {
            kind,
            color: Vec3::ONE,
            attenuation: Vec3::X,
            direction: Vec3::NEG_Z,
            angle: 0.5,
            penumbra: 0.1,
        }
    }

    #[test]
    fn transforms_accumulate_down_the_hierarchy() {
        let scene = SceneDescription {
            root: SceneNode {
                transforms: vec![Transform::Translate(Vec3::new(1.0, 0.0, 0.0))],
                primitives: vec![cube()],
                children: vec![SceneNode {
                    transforms: vec![Transform::Scale(Vec3::splat(2.0))],
                    primitives: vec![cube()],
                    ..SceneNode::default()
                }],
                ..SceneNode::default()
            },
            ..SceneDescription::default()
        };
        let data = RenderData::from_scene(&scene);
        assert_eq!(data.shapes.len(), 2);
        let child = data.shapes[1].ctm;
        assert_eq!(child.transform_point3(Vec3::ONE), Vec3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn node_transforms_apply_in_declaration_order() {
        let ctm = [
            Transform::Translate(Vec3::X),
            Transform::Rotate(Vec3::Z, std::f32::consts::FRAC_PI_2),
        ]
        .iter()
        .fold(Mat4::IDENTITY, apply_transform);
        let moved = ctm.transform_point3(Vec3::X);
        assert!(moved.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn identity_and_zero_matrices_are_ignored() {
        let base = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(apply_transform(base, &Transform::Matrix(Mat4::IDENTITY)), base);
        assert_eq!(apply_transform(base, &Transform::Matrix(Mat4::ZERO)), base);
        let scale = Mat4::from_scale(Vec3::splat(2.0));
        assert_eq!(apply_transform(base, &Transform::Matrix(scale)), scale * base);
    }

    #[test]
    fn lights_take_world_position_and_direction() {
        let scene = SceneDescription {
            root: SceneNode {
                transforms: vec![
                    Transform::Translate(Vec3::new(0.0, 3.0, 0.0)),
                    Transform::Rotate(Vec3::Y, std::f32::consts::FRAC_PI_2),
                ],
                lights: vec![
                    light(LightKind::Point),
                    light(LightKind::Directional),
                    light(LightKind::Spot),
                ],
                ..SceneNode::default()
            },
            ..SceneDescription::default()
        };
        let data = RenderData::from_scene(&scene);
        let [point, directional, spot] = [data.lights[0], data.lights[1], data.lights[2]];
        assert_eq!(point.position, Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(point.direction, Vec3::ZERO);
        assert_eq!(directional.position, Vec3::ZERO);
        assert!(directional.direction.abs_diff_eq(Vec3::NEG_X, 1e-6));
        assert_eq!(spot.position, Vec3::new(0.0, 3.0, 0.0));
        assert!(spot.direction.abs_diff_eq(Vec3::NEG_X, 1e-6));
    }
}
