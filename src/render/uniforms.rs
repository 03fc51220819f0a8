//! `repr(C)` mirrors of the WGSL uniform blocks.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::geometry::{DrawItem, ObjectAnimation};
use crate::render_data::LightData;

/// Lights beyond this many are not uploaded.
pub const MAX_LIGHTS: usize = 8;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    /// Type id, spot angle, penumbra, unused.
    pub info: [f32; 4],
    pub color: [f32; 4],
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub attenuation: [f32; 4],
}

impl LightUniform {
    pub fn from_light(light: &LightData) -> Self {
        Self {
            info: [
                light.kind.shader_id() as f32,
                light.angle,
                light.penumbra,
                0.0,
            ],
            color: light.color.extend(1.0).to_array(),
            position: light.position.extend(1.0).to_array(),
            direction: light.direction.normalize_or_zero().extend(0.0).to_array(),
            attenuation: light.attenuation.extend(0.0).to_array(),
        }
    }
}

/// Per-frame block shared by the shadow and geometry passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub prev_view: [[f32; 4]; 4],
    pub prev_projection: [[f32; 4]; 4],
    pub light_space: [[f32; 4]; 4],
    /// Camera position, frame time in `w`.
    pub camera_position: [f32; 4],
    /// Global ka, kd, ks, kt.
    pub globals: [f32; 4],
    /// Fog color, density in `w`.
    pub fog: [f32; 4],
    /// Fog enabled, light count, previous frame time, shadow caster index
    /// plus one (0 when nothing casts shadows).
    pub params: [f32; 4],
    pub lights: [LightUniform; MAX_LIGHTS],
}

impl FrameUniforms {
    /// Packs at most [`MAX_LIGHTS`] lights; the rest are dropped.
    pub fn pack_lights(&mut self, lights: &[LightData]) {
        self.lights = [LightUniform::zeroed(); MAX_LIGHTS];
        let count = lights.len().min(MAX_LIGHTS);
        for (slot, light) in self.lights.iter_mut().zip(&lights[..count]) {
            *slot = LightUniform::from_light(light);
        }
        self.params[1] = count as f32;
    }

    pub fn light_count(&self) -> usize {
        self.params[1] as usize
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub prev_model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    /// Ambient color, shininess in `w`.
    pub ambient: [f32; 4],
    /// Diffuse color, has-texture flag in `w`.
    pub diffuse: [f32; 4],
    /// Specular color, texture blend in `w`.
    pub specular: [f32; 4],
    /// Texture repeat, animation kind, unused.
    pub texture: [f32; 4],
    pub animation_a: [f32; 4],
    pub animation_b: [f32; 4],
    pub animation_c: [f32; 4],
}

impl ObjectUniforms {
    pub fn from_draw(draw: &DrawItem, has_texture: bool) -> Self {
        let (repeat, blend) = match (&draw.texture, has_texture) {
            (Some(texture), true) => (texture.repeat, texture.blend),
            _ => (Vec2::ONE, 0.0),
        };
        let (kind, a, b, c) = animation_params(&draw.animation);
        Self {
            model: draw.model.to_cols_array_2d(),
            prev_model: draw.prev_model.to_cols_array_2d(),
            normal: mat3_to_3x4(draw.normal_matrix),
            ambient: draw.ambient.extend(draw.shininess).to_array(),
            diffuse: draw
                .diffuse
                .extend(if has_texture { 1.0 } else { 0.0 })
                .to_array(),
            specular: draw.specular.extend(blend).to_array(),
            texture: [repeat.x, repeat.y, kind, 0.0],
            animation_a: a.to_array(),
            animation_b: b.to_array(),
            animation_c: c.to_array(),
        }
    }
}

fn animation_params(animation: &ObjectAnimation) -> (f32, Vec4, Vec4, Vec4) {
    match *animation {
        ObjectAnimation::Static => (0.0, Vec4::ZERO, Vec4::ZERO, Vec4::ZERO),
        ObjectAnimation::Planet {
            color_a,
            color_b,
            spin_rate,
        } => (
            1.0,
            color_a.extend(1.0),
            color_b.extend(1.0),
            Vec4::new(spin_rate, 0.0, 0.0, 0.0),
        ),
        ObjectAnimation::Sand => (2.0, Vec4::ZERO, Vec4::ZERO, Vec4::ZERO),
        ObjectAnimation::Moon {
            center,
            radius,
            angular_speed,
        } => (
            3.0,
            center.extend(1.0),
            Vec4::ZERO,
            Vec4::new(radius, angular_speed, 0.0, 0.0),
        ),
        ObjectAnimation::FloatingCube {
            amplitude,
            frequency,
        } => (
            4.0,
            Vec4::ZERO,
            Vec4::ZERO,
            Vec4::new(amplitude, frequency, 0.0, 0.0),
        ),
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    [
        matrix.x_axis.extend(0.0).to_array(),
        matrix.y_axis.extend(0.0).to_array(),
        matrix.z_axis.extend(0.0).to_array(),
    ]
}

/// Parameters shared by every full-screen post stage.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PostUniforms {
    /// Maps clip space back to world space; the toon stage derives sky
    /// directions from it.
    pub inverse_view_projection: [[f32; 4]; 4],
    /// Texel width and height, target width and height.
    pub texel: [f32; 4],
    /// Near, far, focus distance, focus range.
    pub depth_of_field: [f32; 4],
    /// Max blur radius, DOF enabled, unused, unused.
    pub blur: [f32; 4],
    /// Max motion blur pixels, sample count, directional blur strength,
    /// has sky texture.
    pub motion: [f32; 4],
    /// Frame time, unused.
    pub time: [f32; 4],
}

/// Inputs of the raymarched scenes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AnalyticUniforms {
    /// Width, height, pixel aspect, time.
    pub resolution: [f32; 4],
    /// Cursor position and click position in pixels, origin bottom-left.
    pub mouse: [f32; 4],
    /// Camera position, vertical field of view in `w`.
    pub camera_position: [f32; 4],
    /// Look direction, frame counter in `w`.
    pub camera_look: [f32; 4],
    pub camera_up: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PortalUniforms {
    pub view_projection: [[f32; 4]; 4],
    /// Opacity, unused.
    pub params: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PortalVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl PortalVertex {
    pub fn new(position: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            uv: uv.to_array(),
        }
    }
}

/// Column-major arrays of a matrix, the layout WGSL expects.
pub fn mat4(matrix: Mat4) -> [[f32; 4]; 4] {
    matrix.to_cols_array_2d()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TextureBinding;
    use crate::scene::{LightKind, Material};

    fn light(kind: LightKind) -> LightData {
        LightData {
            kind,
            color: Vec3::new(1.0, 0.5, 0.25),
            position: Vec3::new(1.0, 2.0, 3.0),
            direction: Vec3::new(0.0, -4.0, 0.0),
            attenuation: Vec3::new(1.0, 0.1, 0.01),
            angle: 0.5,
            penumbra: 0.1,
        }
    }

    #[test]
    fn lights_are_truncated_at_eight() {
        let lights = vec![light(LightKind::Point); 11];
        let mut frame = FrameUniforms::zeroed();
        frame.pack_lights(&lights);
        assert_eq!(frame.light_count(), MAX_LIGHTS);
        assert_eq!(frame.lights[7].color[0], 1.0);
    }

    #[test]
    fn light_packing_encodes_type_and_unit_direction() {
        let packed = LightUniform::from_light(&light(LightKind::Spot));
        assert_eq!(packed.info, [2.0, 0.5, 0.1, 0.0]);
        assert_eq!(packed.direction, [0.0, -1.0, 0.0, 0.0]);
        assert_eq!(LightUniform::from_light(&light(LightKind::Directional)).info[0], 0.0);
        assert_eq!(LightUniform::from_light(&light(LightKind::Point)).info[0], 1.0);
    }

    #[test]
    fn untextured_objects_ignore_texture_parameters() {
        let mut draw = DrawItem::new(0..3, Mat4::IDENTITY, &Material::default());
        draw.texture = Some(TextureBinding {
            path: "missing.png".into(),
            repeat: Vec2::new(4.0, 2.0),
            blend: 0.5,
        });
        let untextured = ObjectUniforms::from_draw(&draw, false);
        assert_eq!(untextured.diffuse[3], 0.0);
        assert_eq!(untextured.texture[..2], [1.0, 1.0]);
        let textured = ObjectUniforms::from_draw(&draw, true);
        assert_eq!(textured.diffuse[3], 1.0);
        assert_eq!(textured.texture[..2], [4.0, 2.0]);
        assert_eq!(textured.specular[3], 0.5);
    }

    #[test]
    fn animation_kind_and_parameters_are_packed() {
        let draw = DrawItem::new(0..3, Mat4::IDENTITY, &Material::default()).with_animation(
            ObjectAnimation::Moon {
                center: Vec3::new(1.0, 2.0, 3.0),
                radius: 5.0,
                angular_speed: 0.5,
            },
        );
        let packed = ObjectUniforms::from_draw(&draw, false);
        assert_eq!(packed.texture[2], 3.0);
        assert_eq!(packed.animation_a, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(packed.animation_c[..2], [5.0, 0.5]);
    }

    #[test]
    fn uniform_sizes_are_sixteen_byte_multiples() {
        for size in [
            std::mem::size_of::<FrameUniforms>(),
            std::mem::size_of::<ObjectUniforms>(),
            std::mem::size_of::<PostUniforms>(),
            std::mem::size_of::<AnalyticUniforms>(),
            std::mem::size_of::<PortalUniforms>(),
        ] {
            assert_eq!(size % 16, 0);
        }
    }
}
