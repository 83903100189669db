use anyhow::{anyhow, Context, Result};
use glam::Vec3;

use crate::geometry::Bounds;

/// Triangle soup read from an OBJ file. Only positions and faces are kept;
/// the painter needs the extent of a template, not its shading.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl ObjMesh {
    /// Bounds of the vertices referenced by faces, or of every vertex for
    /// point clouds.
    pub fn bounds(&self) -> Option<Bounds> {
        let referenced: Vec<Vec3> = self
            .triangles
            .iter()
            .flatten()
            .filter_map(|&index| self.positions.get(index as usize).copied())
            .collect();
        let points = if referenced.is_empty() {
            &self.positions
        } else {
            &referenced
        };
        let (&first, rest) = points.split_first()?;
        let (min, max) = rest
            .iter()
            .fold((first, first), |(min, max), &p| (min.min(p), max.max(p)));
        Some(Bounds::from_min_max(min, max))
    }
}

/// Parses an OBJ file from memory. Polygons are fanned into triangles.
pub fn load_obj_from_str(data: &str) -> Result<ObjMesh> {
    let mut positions = Vec::new();
    let mut faces: Vec<Vec<i32>> = Vec::new();

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
            "f" => faces.push(
                parse_face(parts)
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?,
            ),
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    let mut triangles = Vec::new();
    for polygon in &faces {
        let resolved = polygon
            .iter()
            .map(|&index| {
                fix_index(index, positions.len())
                    .map(|i| i as u32)
                    .ok_or_else(|| anyhow!("invalid vertex index {index}"))
            })
            .collect::<Result<Vec<u32>>>()?;
        for i in 1..(resolved.len() - 1) {
            triangles.push([resolved[0], resolved[i], resolved[i + 1]]);
        }
    }

    Ok(ObjMesh {
        positions,
        triangles,
    })
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut next = || -> Result<f32> {
        Ok(parts
            .next()
            .ok_or_else(|| anyhow!("missing vector component"))?
            .parse::<f32>()?)
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

/// Vertex indices of a face; texture and normal references are skipped.
fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<i32>> {
    let mut indices = Vec::new();
    for part in parts {
        let vertex = part
            .split('/')
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i32>()?;
        indices.push(vertex);
    }
    if indices.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(indices)
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
