//! Packs every shape of a scene into one shared vertex buffer, choosing
//! tessellation density per shape.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::obj::load_obj;
use crate::render_data::ShapeData;
use crate::scene::{Material, TextureMap};
use crate::shapes::{self, PrimitiveKind, Vertex};

/// Level-of-detail tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodConfig {
    /// Lower bound for both scale factors.
    pub min_scale: f32,
    /// Distance falloff in `1 / (1 + falloff * distance)`.
    pub distance_falloff: f32,
    /// Camera travel that triggers a distance-LOD rebuild.
    pub rebuild_distance: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.25,
            distance_falloff: 0.2,
            rebuild_distance: 0.25,
        }
    }
}

impl LodConfig {
    /// Scale shared by every shape when many shapes are on screen.
    pub fn population_scale(&self, shape_count: usize) -> f32 {
        if shape_count == 0 {
            return 1.0;
        }
        (1.0 / (shape_count as f32).sqrt()).clamp(self.min_scale, 1.0)
    }

    /// Per-shape scale that falls off with distance to the camera.
    pub fn distance_scale(&self, distance: f32) -> f32 {
        (1.0 / (1.0 + self.distance_falloff * distance.max(0.0))).clamp(self.min_scale, 1.0)
    }
}

/// Scales a tessellation parameter, keeping 1 as a fixed point.
pub fn scale_parameter(value: u32, scale: f32) -> u32 {
    let scaled = (1.0 + (value.max(1) - 1) as f32 * scale).round();
    (scaled as u32).max(1)
}

/// Texture reference carried by a draw item until the GPU cache resolves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureBinding {
    pub path: PathBuf,
    pub repeat: Vec2,
    pub blend: f32,
}

impl From<&TextureMap> for TextureBinding {
    fn from(map: &TextureMap) -> Self {
        Self {
            path: map.path.clone(),
            repeat: Vec2::new(map.repeat_u, map.repeat_v),
            blend: map.blend,
        }
    }
}

/// Shape-specific animation evaluated in the vertex stage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ObjectAnimation {
    #[default]
    Static,
    /// Banded gas planet spinning about its local Y axis.
    Planet {
        color_a: Vec3,
        color_b: Vec3,
        spin_rate: f32,
    },
    /// Terrain shaded with per-vertex sand albedo.
    Sand,
    /// Circular orbit in the XZ plane.
    Moon {
        center: Vec3,
        radius: f32,
        angular_speed: f32,
    },
    /// Vertical bobbing.
    FloatingCube { amplitude: f32, frequency: f32 },
}

/// One renderable object instance.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub first: u32,
    pub count: u32,
    pub model: Mat4,
    pub inverse_model: Mat4,
    pub normal_matrix: Mat3,
    pub prev_model: Mat4,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub texture: Option<TextureBinding>,
    pub animation: ObjectAnimation,
}

impl DrawItem {
    pub fn new(range: Range<u32>, model: Mat4, material: &Material) -> Self {
        let mut item = Self {
            first: range.start,
            count: range.end - range.start,
            model,
            inverse_model: Mat4::IDENTITY,
            normal_matrix: Mat3::IDENTITY,
            prev_model: model,
            ambient: material.ambient,
            diffuse: material.diffuse,
            specular: material.specular,
            shininess: material.shininess,
            texture: material.texture.as_ref().map(TextureBinding::from),
            animation: ObjectAnimation::Static,
        };
        item.set_model(model);
        item.prev_model = model;
        item
    }

    pub fn with_animation(mut self, animation: ObjectAnimation) -> Self {
        self.animation = animation;
        self
    }

    /// Updates the model matrix and its derived inverse and normal matrices.
    pub fn set_model(&mut self, model: Mat4) {
        self.model = model;
        self.inverse_model = model.inverse();
        self.normal_matrix = Mat3::from_mat4(self.inverse_model.transpose());
    }

    pub fn vertex_range(&self) -> Range<u32> {
        self.first..self.first + self.count
    }

    /// World-space origin of the object.
    pub fn center(&self) -> Vec3 {
        (self.model * Vec4::W).truncate()
    }

    pub fn end_frame(&mut self) {
        self.prev_model = self.model;
    }
}

/// One shared vertex buffer plus the draw items that slice it.
#[derive(Debug, Clone, Default)]
pub struct GeometryBatch {
    pub vertices: Vec<Vertex>,
    /// Per-vertex albedo multiplier, parallel to `vertices`.
    pub tints: Vec<[f32; 4]>,
    pub draws: Vec<DrawItem>,
    revision: u64,
}

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

impl GeometryBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Changes whenever vertex data is appended; an empty batch is 0.
    /// Unique across batches, so a renderer can tell when to re-upload.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Appends a vertex range and returns it. Vertices without a tint list
    /// are untinted (white).
    pub fn append(&mut self, vertices: &[Vertex], tints: Option<&[Vec3]>) -> Range<u32> {
        let start = self.vertex_count();
        self.vertices.extend_from_slice(vertices);
        match tints {
            Some(tints) if tints.len() == vertices.len() => self
                .tints
                .extend(tints.iter().map(|tint| tint.extend(1.0).to_array())),
            _ => self
                .tints
                .extend(std::iter::repeat([1.0; 4]).take(vertices.len())),
        }
        self.revision = NEXT_REVISION.fetch_add(1, Ordering::Relaxed);
        start..self.vertex_count()
    }

    pub fn push(&mut self, item: DrawItem) {
        self.draws.push(item);
    }

    /// Copies the current model matrices into the previous-frame slots.
    pub fn end_frame(&mut self) {
        for draw in &mut self.draws {
            draw.end_frame();
        }
    }
}

/// Inputs that decide tessellation density for a build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildParams {
    pub param1: u32,
    pub param2: u32,
    pub population_lod: bool,
    pub distance_lod: bool,
    pub camera_position: Vec3,
}

/// Builds geometry batches from flattened shapes, caching imported meshes
/// across rebuilds.
#[derive(Debug, Default)]
pub struct GeometryBuilder {
    lod: LodConfig,
    mesh_cache: HashMap<PathBuf, Arc<[Vertex]>>,
    missing_meshes: HashSet<PathBuf>,
}

impl GeometryBuilder {
    pub fn new(lod: LodConfig) -> Self {
        Self {
            lod,
            ..Self::default()
        }
    }

    pub fn lod(&self) -> &LodConfig {
        &self.lod
    }

    /// Packs every shape in declaration order. Shapes whose mesh file cannot
    /// be imported are skipped.
    pub fn build(&mut self, shapes: &[ShapeData], params: &BuildParams) -> GeometryBatch {
        let population = if params.population_lod {
            self.lod.population_scale(shapes.len())
        } else {
            1.0
        };

        let mut batch = GeometryBatch::new();
        for shape in shapes {
            let kind = shape.primitive.kind;
            let range = if kind.is_procedural() {
                let (p1, p2) = self.shape_parameters(shape, params, population);
                batch.append(&shapes::generate(kind, p1, p2), None)
            } else {
                let Some(path) = shape.primitive.mesh_file.as_deref() else {
                    continue;
                };
                let Some(vertices) = self.mesh_vertices(path) else {
                    continue;
                };
                batch.append(&vertices, None)
            };
            batch.push(DrawItem::new(range, shape.ctm, &shape.primitive.material));
        }

        debug!(
            "built {} draw items with {} vertices",
            batch.draws.len(),
            batch.vertices.len()
        );
        batch
    }

    /// Effective tessellation for one procedural shape.
    pub fn shape_parameters(
        &self,
        shape: &ShapeData,
        params: &BuildParams,
        population_scale: f32,
    ) -> (u32, u32) {
        let mut p1 = scale_parameter(params.param1, population_scale);
        let mut p2 = scale_parameter(params.param2, population_scale);
        // Distance LOD rescales the already rounded population result.
        if params.distance_lod {
            let center = (shape.ctm * Vec4::W).truncate();
            let scale = self.lod.distance_scale(center.distance(params.camera_position));
            p1 = scale_parameter(p1, scale);
            p2 = scale_parameter(p2, scale);
        }
        (p1, p2)
    }

    fn mesh_vertices(&mut self, path: &Path) -> Option<Arc<[Vertex]>> {
        if let Some(vertices) = self.mesh_cache.get(path) {
            return Some(Arc::clone(vertices));
        }
        if self.missing_meshes.contains(path) {
            return None;
        }
        match load_obj(path) {
            Ok(vertices) => {
                let vertices: Arc<[Vertex]> = vertices.into();
                self.mesh_cache
                    .insert(path.to_path_buf(), Arc::clone(&vertices));
                Some(vertices)
            }
            Err(err) => {
                error!("skipping mesh {}: {err:?}", path.display());
                self.missing_meshes.insert(path.to_path_buf());
                None
            }
        }
    }

    /// Forgets cached imports, e.g. when a different scene is loaded.
    pub fn clear_cache(&mut self) {
        self.mesh_cache.clear();
        self.missing_meshes.clear();
    }
}

/// Rebuild trigger for distance LOD: fires only after the camera has moved
/// further than the threshold since the last rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodTracker {
    threshold: f32,
    anchor: Option<Vec3>,
}

impl LodTracker {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            anchor: None,
        }
    }

    pub fn should_rebuild(&mut self, camera_position: Vec3) -> bool {
        match self.anchor {
            None => {
                self.anchor = Some(camera_position);
                false
            }
            Some(anchor) if anchor.distance(camera_position) > self.threshold => {
                self.anchor = Some(camera_position);
                true
            }
            Some(_) => false,
        }
    }

    /// Records a rebuild made at `camera_position` for another reason.
    pub fn anchor_at(&mut self, camera_position: Vec3) {
        self.anchor = Some(camera_position);
    }

    pub fn reset(&mut self) {
        self.anchor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Primitive;
    use std::io::Write;

    fn shape(kind: PrimitiveKind, at: Vec3) -> ShapeData {
        ShapeData {
            primitive: Primitive {
                kind,
                mesh_file: None,
                material: Material::default(),
            },
            ctm: Mat4::from_translation(at),
        }
    }

    fn params(population_lod: bool, distance_lod: bool) -> BuildParams {
        BuildParams {
            param1: 10,
            param2: 20,
            population_lod,
            distance_lod,
            camera_position: Vec3::ZERO,
        }
    }

    #[test]
    fn one_is_a_fixed_point_of_scaling() {
        for scale in [0.25, 0.5, 0.9, 1.0] {
            assert_eq!(scale_parameter(1, scale), 1);
        }
        assert_eq!(scale_parameter(0, 0.25), 1);
        assert_eq!(scale_parameter(10, 1.0), 10);
        assert_eq!(scale_parameter(10, 0.5), 6);
    }

    #[test]
    fn population_scale_is_monotonic_and_clamped() {
        let lod = LodConfig::default();
        let mut previous = f32::INFINITY;
        for count in 1..100 {
            let scale = lod.population_scale(count);
            assert!(scale <= previous);
            assert!((0.25..=1.0).contains(&scale));
            previous = scale;
        }
        assert_eq!(lod.population_scale(4), 0.5);
        assert_eq!(lod.population_scale(1000), 0.25);
    }

    #[test]
    fn distance_scale_is_monotonic_and_clamped() {
        let lod = LodConfig::default();
        let mut previous = f32::INFINITY;
        for step in 0..200 {
            let scale = lod.distance_scale(step as f32 * 0.5);
            assert!(scale <= previous);
            assert!((0.25..=1.0).contains(&scale));
            previous = scale;
        }
        assert_eq!(lod.distance_scale(0.0), 1.0);
        assert_eq!(lod.distance_scale(5.0), 0.5);
    }

    #[test]
    fn scaled_parameters_never_increase_with_scale_drop() {
        for value in 1..50 {
            let mut previous = u32::MAX;
            for step in 0..=12 {
                let scaled = scale_parameter(value, 1.0 - step as f32 / 16.0);
                assert!(scaled <= previous && scaled >= 1);
                previous = scaled;
            }
        }
    }

    #[test]
    fn draw_ranges_partition_the_shared_buffer() {
        let shapes = vec![
            shape(PrimitiveKind::Cube, Vec3::ZERO),
            shape(PrimitiveKind::Sphere, Vec3::X),
            shape(PrimitiveKind::Cone, Vec3::Y),
        ];
        let batch = GeometryBuilder::default().build(&shapes, &params(false, false));
        assert_eq!(batch.draws.len(), 3);
        let mut next = 0;
        for (draw, shape) in batch.draws.iter().zip(&shapes) {
            assert_eq!(draw.first, next);
            assert_eq!(
                draw.count as usize,
                shapes::vertex_count(shape.primitive.kind, 10, 20)
            );
            next += draw.count;
        }
        assert_eq!(next, batch.vertex_count());
        assert_eq!(batch.tints.len(), batch.vertices.len());
    }

    #[test]
    fn population_lod_reduces_every_shape() {
        let shapes = vec![shape(PrimitiveKind::Sphere, Vec3::ZERO); 4];
        let full = GeometryBuilder::default().build(&shapes, &params(false, false));
        let reduced = GeometryBuilder::default().build(&shapes, &params(true, false));
        assert_eq!(
            reduced.draws[0].count as usize,
            shapes::vertex_count(PrimitiveKind::Sphere, 6, 11)
        );
        assert!(reduced.vertex_count() < full.vertex_count());
    }

    #[test]
    fn distance_lod_coarsens_far_shapes() {
        let shapes = vec![
            shape(PrimitiveKind::Sphere, Vec3::new(0.0, 0.0, -1.0)),
            shape(PrimitiveKind::Sphere, Vec3::new(0.0, 0.0, -30.0)),
        ];
        let batch = GeometryBuilder::default().build(&shapes, &params(false, true));
        assert!(batch.draws[1].count < batch.draws[0].count);
    }

    #[test]
    fn combined_lod_rounds_after_each_policy() {
        let shapes = vec![
            shape(PrimitiveKind::Sphere, Vec3::new(0.0, 0.0, -5.0)),
            shape(PrimitiveKind::Sphere, Vec3::ZERO),
            shape(PrimitiveKind::Sphere, Vec3::ZERO),
            shape(PrimitiveKind::Sphere, Vec3::ZERO),
        ];
        let builder = GeometryBuilder::default();
        let population = builder.lod().population_scale(shapes.len());
        assert_eq!(
            builder.shape_parameters(&shapes[0], &params(true, true), population),
            (4, 6)
        );
        assert_eq!(
            builder.shape_parameters(&shapes[1], &params(true, true), population),
            (6, 11)
        );

        let batch = GeometryBuilder::default().build(&shapes, &params(true, true));
        assert_eq!(
            batch.draws[0].count as usize,
            shapes::vertex_count(PrimitiveKind::Sphere, 4, 6)
        );
    }

    #[test]
    fn unreadable_mesh_is_skipped() {
        let mut shapes = vec![shape(PrimitiveKind::Cube, Vec3::ZERO)];
        let mut mesh = shape(PrimitiveKind::Mesh, Vec3::ZERO);
        mesh.primitive.mesh_file = Some(PathBuf::from("/missing/mesh.obj"));
        shapes.push(mesh);
        shapes.push(shape(PrimitiveKind::Cube, Vec3::X));
        let batch = GeometryBuilder::default().build(&shapes, &params(false, false));
        assert_eq!(batch.draws.len(), 2);
        assert_eq!(batch.draws[1].first, batch.draws[0].count);
    }

    #[test]
    fn imported_meshes_are_exempt_from_lod() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 2 4 3").unwrap();
        let mut mesh = shape(PrimitiveKind::Mesh, Vec3::new(0.0, 0.0, -50.0));
        mesh.primitive.mesh_file = Some(file.path().to_path_buf());
        let shapes = vec![mesh.clone(), mesh.clone(), mesh];
        let batch = GeometryBuilder::default().build(&shapes, &params(true, true));
        assert!(batch.draws.iter().all(|draw| draw.count == 6));
    }

    #[test]
    fn tracker_waits_for_threshold() {
        let mut tracker = LodTracker::new(0.25);
        assert!(!tracker.should_rebuild(Vec3::ZERO));
        assert!(!tracker.should_rebuild(Vec3::new(0.2, 0.0, 0.0)));
        assert!(tracker.should_rebuild(Vec3::new(0.3, 0.0, 0.0)));
        assert!(!tracker.should_rebuild(Vec3::new(0.5, 0.0, 0.0)));
        assert!(tracker.should_rebuild(Vec3::new(0.6, 0.0, 0.0)));

        tracker.anchor_at(Vec3::new(5.0, 0.0, 0.0));
        assert!(!tracker.should_rebuild(Vec3::new(5.1, 0.0, 0.0)));
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let item = DrawItem::new(0..3, model, &Material::default());
        let normal = item.normal_matrix * Vec3::new(1.0, 1.0, 0.0);
        assert!(normal.abs_diff_eq(Vec3::new(0.5, 1.0, 0.0), 1e-6));
        assert_eq!(item.prev_model, model);
    }

    #[test]
    fn appending_changes_revision() {
        let mut batch = GeometryBatch::new();
        assert_eq!(batch.revision(), 0);
        let cube = shapes::generate(PrimitiveKind::Cube, 1, 1);
        batch.append(&cube, None);
        let first = batch.revision();
        assert_ne!(first, 0);
        batch.append(&cube, None);
        assert_ne!(batch.revision(), first);
        assert_eq!(batch.clone().revision(), batch.revision());
    }
}
