//! XML scene descriptions: a transform hierarchy of primitives and lights.

use std::fs;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::CameraData;
use crate::shapes::PrimitiveKind;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scene XML")]
    Xml(#[from] roxmltree::Error),
    #[error("root element must be <scene>, found <{0}>")]
    UnexpectedRoot(String),
    #[error("<{0}> tag is missing")]
    MissingElement(&'static str),
    #[error("invalid value {value:?} in <{tag}>: expected {expected}")]
    InvalidValue {
        tag: String,
        value: String,
        expected: &'static str,
    },
    #[error("unknown primitive type {0:?}")]
    UnknownPrimitive(String),
    #[error("unknown light type {0:?}")]
    UnknownLight(String),
}

/// Parsed scene file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    pub globals: GlobalData,
    pub camera: CameraData,
    pub root: SceneNode,
}

/// Scene-wide lighting coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalData {
    pub ka: f32,
    pub kd: f32,
    pub ks: f32,
    pub kt: f32,
}

impl Default for GlobalData {
    fn default() -> Self {
        Self {
            ka: 0.5,
            kd: 0.5,
            ks: 0.5,
            kt: 0.0,
        }
    }
}

/// One level of the transform hierarchy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneNode {
    /// Applied in declaration order.
    pub transforms: Vec<Transform>,
    pub primitives: Vec<Primitive>,
    pub lights: Vec<LightDecl>,
    pub children: Vec<SceneNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    Translate(Vec3),
    /// Axis and angle in radians.
    Rotate(Vec3, f32),
    Scale(Vec3),
    Matrix(Mat4),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub mesh_file: Option<PathBuf>,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub texture: Option<TextureMap>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec3::ZERO,
            diffuse: Vec3::ONE,
            specular: Vec3::ZERO,
            shininess: 1.0,
            texture: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureMap {
    pub path: PathBuf,
    pub repeat_u: f32,
    pub repeat_v: f32,
    /// Mix factor between material diffuse and texture color.
    pub blend: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

impl LightKind {
    /// Identifier shared with the shading stage.
    pub fn shader_id(self) -> u32 {
        match self {
            Self::Directional => 0,
            Self::Point => 1,
            Self::Spot => 2,
        }
    }
}

/// Light as declared inside a node, in the node's local space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightDecl {
    pub kind: LightKind,
    pub color: Vec3,
    pub attenuation: Vec3,
    pub direction: Vec3,
    /// Spot cone half angle in radians.
    pub angle: f32,
    /// Spot falloff width in radians.
    pub penumbra: f32,
}

impl SceneDescription {
    /// Reads and parses a scene file. Relative asset paths resolve against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let xml = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_xml(&xml, base)
    }

    pub fn from_xml(xml: &str, base_dir: &Path) -> Result<Self, SceneError> {
        let document = Document::parse(xml)?;
        let root = document.root_element();
        if !root.has_tag_name("scene") {
            return Err(SceneError::UnexpectedRoot(
                root.tag_name().name().to_string(),
            ));
        }

        let globals = match child(&root, "globaldata") {
            Some(node) => parse_globals(&node)?,
            None => GlobalData::default(),
        };
        let camera = match child(&root, "camera") {
            Some(node) => parse_camera(&node)?,
            None => CameraData::default(),
        };
        let root = parse_node(&root, base_dir)?;

        Ok(Self {
            globals,
            camera,
            root,
        })
    }
}

fn parse_node(node: &Node<'_, '_>, base_dir: &Path) -> Result<SceneNode, SceneError> {
    let mut scene_node = SceneNode::default();
    for element in node.children().filter(Node::is_element) {
        match element.tag_name().name() {
            "translate" => scene_node
                .transforms
                .push(Transform::Translate(vec3_of(&element)?)),
            "scale" => scene_node
                .transforms
                .push(Transform::Scale(vec3_of(&element)?)),
            "rotate" => {
                let [x, y, z, degrees] = floats::<4>(&element)?;
                scene_node
                    .transforms
                    .push(Transform::Rotate(Vec3::new(x, y, z), degrees.to_radians()));
            }
            "matrix" => {
                let rows = floats::<16>(&element)?;
                scene_node
                    .transforms
                    .push(Transform::Matrix(Mat4::from_cols_array(&rows).transpose()));
            }
            "primitive" => scene_node
                .primitives
                .push(parse_primitive(&element, base_dir)?),
            "light" => scene_node.lights.push(parse_light(&element)?),
            "object" => scene_node.children.push(parse_node(&element, base_dir)?),
            _ => {}
        }
    }
    Ok(scene_node)
}

fn parse_globals(node: &Node<'_, '_>) -> Result<GlobalData, SceneError> {
    let defaults = GlobalData::default();
    Ok(GlobalData {
        ka: optional_f32(node, "ambient")?.unwrap_or(defaults.ka),
        kd: optional_f32(node, "diffuse")?.unwrap_or(defaults.kd),
        ks: optional_f32(node, "specular")?.unwrap_or(defaults.ks),
        kt: optional_f32(node, "transparent")?.unwrap_or(defaults.kt),
    })
}

fn parse_camera(node: &Node<'_, '_>) -> Result<CameraData, SceneError> {
    let defaults = CameraData::default();
    let position = optional_vec3(node, "position")?.unwrap_or(defaults.position);
    let look = match (optional_vec3(node, "look")?, optional_vec3(node, "focus")?) {
        (Some(look), _) => look,
        (None, Some(focus)) => focus - position,
        (None, None) => defaults.look,
    };
    Ok(CameraData {
        position,
        look,
        up: optional_vec3(node, "up")?.unwrap_or(defaults.up),
        height_angle: optional_f32(node, "heightangle")?
            .map(f32::to_radians)
            .unwrap_or(defaults.height_angle),
    })
}

fn parse_primitive(node: &Node<'_, '_>, base_dir: &Path) -> Result<Primitive, SceneError> {
    let type_name = required_text(node, "type")?;
    let kind = PrimitiveKind::from_name(&type_name)
        .ok_or_else(|| SceneError::UnknownPrimitive(type_name.clone()))?;
    let mesh_file = optional_text(node, "meshfile").map(|file| base_dir.join(file));
    if kind == PrimitiveKind::Mesh && mesh_file.is_none() {
        return Err(SceneError::MissingElement("meshfile"));
    }

    let defaults = Material::default();
    let texture = match optional_text(node, "texture") {
        Some(file) => Some(TextureMap {
            path: base_dir.join(file),
            repeat_u: optional_f32(node, "repeatu")?.unwrap_or(1.0),
            repeat_v: optional_f32(node, "repeatv")?.unwrap_or(1.0),
            blend: optional_f32(node, "blend")?.unwrap_or(1.0),
        }),
        None => None,
    };
    let material = Material {
        ambient: optional_vec3(node, "ambient")?.unwrap_or(defaults.ambient),
        diffuse: optional_vec3(node, "diffuse")?.unwrap_or(defaults.diffuse),
        specular: optional_vec3(node, "specular")?.unwrap_or(defaults.specular),
        shininess: optional_f32(node, "shininess")?.unwrap_or(defaults.shininess),
        texture,
    };

    Ok(Primitive {
        kind,
        mesh_file,
        material,
    })
}

fn parse_light(node: &Node<'_, '_>) -> Result<LightDecl, SceneError> {
    let type_name = required_text(node, "type")?;
    let kind = match type_name.to_ascii_lowercase().as_str() {
        "directional" => LightKind::Directional,
        "point" => LightKind::Point,
        "spot" => LightKind::Spot,
        _ => return Err(SceneError::UnknownLight(type_name)),
    };
    Ok(LightDecl {
        kind,
        color: optional_vec3(node, "color")?.unwrap_or(Vec3::ONE),
        attenuation: optional_vec3(node, "attenuation")?.unwrap_or(Vec3::X),
        direction: optional_vec3(node, "direction")?.unwrap_or(Vec3::NEG_Y),
        angle: optional_f32(node, "angle")?.unwrap_or(0.0).to_radians(),
        penumbra: optional_f32(node, "penumbra")?.unwrap_or(0.0).to_radians(),
    })
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &'static str) -> Result<String, SceneError> {
    optional_text(node, tag).ok_or(SceneError::MissingElement(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn optional_f32(node: &Node<'_, '_>, tag: &str) -> Result<Option<f32>, SceneError> {
    child(node, tag)
        .map(|element| floats::<1>(&element).map(|[value]| value))
        .transpose()
}

fn optional_vec3(node: &Node<'_, '_>, tag: &str) -> Result<Option<Vec3>, SceneError> {
    child(node, tag).map(|element| vec3_of(&element)).transpose()
}

fn vec3_of(element: &Node<'_, '_>) -> Result<Vec3, SceneError> {
    floats::<3>(element).map(Vec3::from_array)
}

/// Exactly `N` whitespace separated numbers from an element's text.
fn floats<const N: usize>(element: &Node<'_, '_>) -> Result<[f32; N], SceneError> {
    let text = element.text().unwrap_or("").trim();
    let invalid = || SceneError::InvalidValue {
        tag: element.tag_name().name().to_string(),
        value: text.to_string(),
        expected: match N {
            1 => "a number",
            3 => "three numbers",
            4 => "four numbers",
            _ => "sixteen numbers",
        },
    };
    let values = text
        .split_whitespace()
        .map(str::parse::<f32>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    values.try_into().map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <scene>
        <globaldata>
            <ambient>0.2</ambient>
            <diffuse>0.8</diffuse>
        </globaldata>
        <camera>
            <position>0 1 6</position>
            <focus>0 1 0</focus>
            <heightangle>60</heightangle>
        </camera>
        <object>
            <translate>1 0 0</translate>
            <rotate>0 1 0 90</rotate>
            <primitive>
                <type>sphere</type>
                <diffuse>1 0 0</diffuse>
                <texture>bricks.png</texture>
                <repeatu>2</repeatu>
            </primitive>
            <light>
                <type>spot</type>
                <direction>0 0 -1</direction>
                <angle>30</angle>
            </light>
            <object>
                <scale>2 2 2</scale>
                <primitive><type>mesh</type><meshfile>teapot.obj</meshfile></primitive>
            </object>
        </object>
    </scene>
    "#;

    #[test]
    fn parse_scene_populates_hierarchy() {
        let scene = SceneDescription::from_xml(SAMPLE, Path::new("assets")).unwrap();
        assert_eq!(scene.globals.ka, 0.2);
        assert_eq!(scene.globals.ks, 0.5);
        assert_eq!(scene.camera.look, Vec3::new(0.0, 0.0, -6.0));
        assert!((scene.camera.height_angle - 60f32.to_radians()).abs() < 1e-6);

        let object = &scene.root.children[0];
        assert_eq!(object.transforms.len(), 2);
        assert_eq!(object.transforms[0], Transform::Translate(Vec3::X));
        let sphere = &object.primitives[0];
        assert_eq!(sphere.kind, PrimitiveKind::Sphere);
        let texture = sphere.material.texture.as_ref().unwrap();
        assert_eq!(texture.path, Path::new("assets").join("bricks.png"));
        assert_eq!(texture.repeat_u, 2.0);
        assert_eq!(texture.repeat_v, 1.0);
        assert_eq!(object.lights[0].kind, LightKind::Spot);

        let nested = &object.children[0].primitives[0];
        assert_eq!(nested.mesh_file.as_deref(), Some(Path::new("assets/teapot.obj")));
    }

    #[test]
    fn matrix_is_read_row_major() {
        let xml = "<scene><object><matrix>1 0 0 5  0 1 0 6  0 0 1 7  0 0 0 1</matrix></object></scene>";
        let scene = SceneDescription::from_xml(xml, Path::new("")).unwrap();
        let Transform::Matrix(matrix) = scene.root.children[0].transforms[0] else {
            panic!("expected matrix transform");
        };
        assert_eq!(matrix.w_axis.truncate(), Vec3::new(5.0, 6.0, 7.0));
    }

    #[test]
    fn unknown_primitive_is_an_error() {
        let bad = "<scene><object><primitive><type>torus</type></primitive></object></scene>";
        assert!(matches!(
            SceneDescription::from_xml(bad, Path::new("")),
            Err(SceneError::UnknownPrimitive(name)) if name == "torus"
        ));
    }

    #[test]
    fn malformed_vector_is_an_error() {
        let bad = "<scene><object><translate>1 two 3</translate></object></scene>";
        assert!(matches!(
            SceneDescription::from_xml(bad, Path::new("")),
            Err(SceneError::InvalidValue { .. })
        ));
    }

    #[test]
    fn wrong_root_is_rejected() {
        assert!(matches!(
            SceneDescription::from_xml("<world/>", Path::new("")),
            Err(SceneError::UnexpectedRoot(_))
        ));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = SceneDescription::load(Path::new("/definitely/not/here.xml")).unwrap_err();
        assert!(matches!(err, SceneError::Io { .. }));
    }
}
