use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};

use crate::shapes::Vertex;

/// Reads an OBJ file from disk; see [`load_obj_from_str`].
pub fn load_obj(path: &Path) -> Result<Vec<Vertex>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("unable to read mesh file {}", path.display()))?;
    load_obj_from_str(&data).with_context(|| format!("failed to parse OBJ mesh {}", path.display()))
}

/// Parses OBJ text into a non-indexed triangle list.
///
/// Stored normals and texture coordinates are ignored: every triangle gets
/// its face normal and all texture coordinates are `(0, 0)`.
pub fn load_obj_from_str(data: &str) -> Result<Vec<Vertex>> {
    let mut positions = Vec::new();
    let mut faces: Vec<[usize; 3]> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => positions.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
            ),
            "f" => {
                // Relative indices count back from the vertices declared so far.
                let polygon = parse_face(parts, positions.len())
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                triangulate_face(&polygon, &mut faces);
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    let mut vertices = Vec::with_capacity(faces.len() * 3);
    for face in &faces {
        let mut corners = [Vec3::ZERO; 3];
        for (corner, &index) in corners.iter_mut().zip(face) {
            *corner = positions[index];
        }
        let normal = face_normal(corners);
        for corner in corners {
            vertices.push(Vertex::new(corner, normal, Vec2::ZERO));
        }
    }
    Ok(vertices)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut component = || -> Result<f32> {
        Ok(parts
            .next()
            .ok_or_else(|| anyhow!("missing vector component"))?
            .parse::<f32>()?)
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

/// Zero-based position indices of one polygon, resolved against the
/// `declared` positions. Accepts `v`, `v/vt`, `v//vn` and `v/vt/vn` tokens.
fn parse_face<'a>(parts: impl Iterator<Item = &'a str>, declared: usize) -> Result<Vec<usize>> {
    let indices = parts
        .map(|part| {
            let index = part
                .split('/')
                .next()
                .filter(|index| !index.is_empty())
                .ok_or_else(|| anyhow!("missing vertex index in {part:?}"))?
                .parse::<i32>()
                .with_context(|| format!("invalid vertex index in {part:?}"))?;
            fix_index(index, declared)
                .ok_or_else(|| anyhow!("vertex index {index} is out of range"))
        })
        .collect::<Result<Vec<_>>>()?;
    if indices.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(indices)
}

fn triangulate_face(polygon: &[usize], faces: &mut Vec<[usize; 3]>) {
    for i in 1..polygon.len().saturating_sub(1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

fn fix_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let abs = index.unsigned_abs() as usize;
        (abs <= len).then_some(len - abs)
    } else {
        None
    }
}

fn face_normal([a, b, c]: [Vec3; 3]) -> Vec3 {
    (b - a).cross(c - a).try_normalize().unwrap_or(Vec3::Y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_triangle() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let vertices = load_obj_from_str(obj).unwrap();
        assert_eq!(vertices.len(), 3);
        for vertex in &vertices {
            assert_eq!(vertex.normal(), Vec3::Z);
            assert_eq!(vertex.uv(), Vec2::ZERO);
        }
    }

    #[test]
    fn stored_normals_are_replaced_by_face_normals() {
        let obj = "v 0 0 0\nv 0 0 1\nv 1 0 0\nvn 0 0 1\nvt 0.5 0.5\nf 1/1/1 2/1/1 3/1/1\n";
        let vertices = load_obj_from_str(obj).unwrap();
        assert_eq!(vertices[0].normal(), Vec3::Y);
    }

    #[test]
    fn quads_fan_into_triangles_with_negative_indices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf -4//1 -3//1 -2//1 -1//1\n";
        let vertices = load_obj_from_str(obj).unwrap();
        assert_eq!(vertices.len(), 6);
        assert_eq!(vertices[5].position(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn negative_indices_count_back_from_the_face_line() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\nv 5 5 5\nv 6 5 5\nv 5 6 5\n";
        let vertices = load_obj_from_str(obj).unwrap();
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[0].position(), Vec3::ZERO);
        assert_eq!(vertices[1].position(), Vec3::X);
        assert_eq!(vertices[2].position(), Vec3::Y);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        assert!(load_obj_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n").is_err());
        assert!(load_obj_from_str("f 1 2 3\n").is_err());
    }

    #[test]
    fn degenerate_face_gets_fallback_normal() {
        let vertices = load_obj_from_str("v 0 0 0\nv 1 0 0\nv 2 0 0\nf 1 2 3\n").unwrap();
        assert_eq!(vertices[0].normal(), Vec3::Y);
    }
}
