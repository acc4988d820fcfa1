//! Wavefront OBJ (geometry only: `v`, `vn`, `f`). Materials, texture
//! coordinates and groups are read past; polygons are fan-triangulated.

use std::collections::HashMap;

use crate::mesh::Mesh;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjError {
    pub line: usize,
    pub reason: String,
}

impl std::fmt::Display for ObjError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OBJ line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for ObjError {}

pub fn parse_obj(text: &str) -> Result<Mesh, ObjError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut mesh = Mesh::new();
    let mut vertex_map: HashMap<(usize, Option<usize>), u32> = HashMap::new();
    let mut any_missing_normal = false;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        let err = |reason: String| ObjError {
            line: line_no,
            reason,
        };

        match keyword {
            "v" => positions.push(parse_vec3(&mut parts).map_err(err)?),
            "vn" => normals.push(parse_vec3(&mut parts).map_err(err)?),
            "f" => {
                let mut corners: Vec<u32> = Vec::new();
                for token in parts {
                    let (vi, ni) = parse_face_vertex(token, positions.len(), normals.len())
                        .map_err(err)?;
                    if ni.is_none() {
                        any_missing_normal = true;
                    }
                    let idx = *vertex_map.entry((vi, ni)).or_insert_with(|| {
                        mesh.positions.push(positions[vi]);
                        mesh.normals
                            .push(ni.map(|n| normals[n]).unwrap_or([0.0, 0.0, 0.0]));
                        (mesh.positions.len() - 1) as u32
                    });
                    corners.push(idx);
                }
                if corners.len() < 3 {
                    return Err(err(format!(
                        "face needs at least 3 vertices, got {}",
                        corners.len()
                    )));
                }
                for k in 1..corners.len() - 1 {
                    mesh.indices
                        .extend_from_slice(&[corners[0], corners[k], corners[k + 1]]);
                }
            }
            // Texture coordinates, parameter space, groups, smoothing, materials.
            _ => {}
        }
    }

    if any_missing_normal {
        mesh.compute_normals();
    }
    Ok(mesh)
}

fn parse_vec3<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<[f32; 3], String> {
    let mut out = [0.0f32; 3];
    for slot in &mut out {
        let token = parts
            .next()
            .ok_or_else(|| "expected 3 coordinates".to_string())?;
        *slot = token
            .parse::<f32>()
            .map_err(|e| format!("bad coordinate {token:?}: {e}"))?;
    }
    Ok(out)
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`; 1-based, negative values count back
/// from the most recent element.
fn parse_face_vertex(
    token: &str,
    position_count: usize,
    normal_count: usize,
) -> Result<(usize, Option<usize>), String> {
    let mut fields = token.split('/');
    let v = fields
        .next()
        .ok_or_else(|| format!("empty face vertex {token:?}"))?;
    let vi = resolve_index(v, position_count)?;
    let _vt = fields.next();
    let ni = match fields.next() {
        Some(n) if !n.is_empty() => Some(resolve_index(n, normal_count)?),
        _ => None,
    };
    Ok((vi, ni))
}

fn resolve_index(token: &str, count: usize) -> Result<usize, String> {
    let raw: i64 = token
        .parse()
        .map_err(|e| format!("bad index {token:?}: {e}"))?;
    let idx = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        count as i64 + raw
    } else {
        return Err("index 0 is not valid in OBJ".to_string());
    };
    if idx < 0 || idx as usize >= count {
        return Err(format!("index {raw} out of range ({count} defined)"));
    }
    Ok(idx as usize)
}
