//! STL triangle meshes, binary or ASCII.

use crate::error::AssetLoadError;
use crate::geometry::MeshData;
use glam::Vec3;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50; // normal + 3 vertices (12 f32) + u16 attribute count

/// Parse STL bytes into an unindexed triangle soup (three vertices per facet).
/// Normals are left empty; callers compute them after centering.
pub fn parse_stl(bytes: &[u8]) -> Result<MeshData, AssetLoadError> {
    let mesh = if is_binary(bytes) {
        parse_binary(bytes)?
    } else {
        parse_ascii(bytes)?
    };
    if mesh.is_empty() {
        return Err(AssetLoadError::Mesh("mesh contains no triangles".into()));
    }
    if mesh.positions.iter().any(|p| !p.is_finite()) {
        return Err(AssetLoadError::Mesh("mesh contains non-finite coordinates".into()));
    }
    Ok(mesh)
}

/// A file is binary when its size matches the facet count in the header, or
/// when it does not start with the `solid` keyword.
fn is_binary(bytes: &[u8]) -> bool {
    if let Some(expected) = facet_count(bytes).and_then(binary_len) {
        if expected == bytes.len() {
            return true;
        }
    }
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(0);
    !bytes[start..].starts_with(b"solid")
}

fn facet_count(bytes: &[u8]) -> Option<u32> {
    let raw = bytes.get(HEADER_LEN..HEADER_LEN + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Byte length of a binary STL with `count` facets; `None` when it cannot be addressed.
fn binary_len(count: u32) -> Option<usize> {
    usize::try_from(count)
        .ok()?
        .checked_mul(FACET_LEN)?
        .checked_add(HEADER_LEN + 4)
}

fn parse_binary(bytes: &[u8]) -> Result<MeshData, AssetLoadError> {
    let count = facet_count(bytes).ok_or_else(|| {
        AssetLoadError::Mesh(format!(
            "binary STL needs at least {} bytes, got {}",
            HEADER_LEN + 4,
            bytes.len()
        ))
    })?;
    let expected = binary_len(count).ok_or_else(|| {
        AssetLoadError::Mesh(format!("binary STL announces {count} facets, more than can be addressed"))
    })?;
    let count = count as usize;
    if bytes.len() < expected {
        return Err(AssetLoadError::Mesh(format!(
            "binary STL truncated: header announces {count} facets ({expected} bytes), got {} bytes",
            bytes.len()
        )));
    }

    let mut mesh = MeshData {
        positions: Vec::with_capacity(count * 3),
        indices: Vec::with_capacity(count * 3),
        ..Default::default()
    };
    let read_f32 = |at: usize| f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    for facet in 0..count {
        // skip the stored facet normal
        let base = HEADER_LEN + 4 + facet * FACET_LEN + 12;
        for v in 0..3 {
            let at = base + v * 12;
            mesh.positions
                .push(Vec3::new(read_f32(at), read_f32(at + 4), read_f32(at + 8)));
            mesh.indices.push((facet * 3 + v) as u32);
        }
    }
    Ok(mesh)
}

fn parse_ascii(bytes: &[u8]) -> Result<MeshData, AssetLoadError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| AssetLoadError::Mesh("ASCII STL is not valid UTF-8".into()))?;
    let mut mesh = MeshData::default();
    for (line_no, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("vertex") {
            continue;
        }
        let mut coord = [0.0f32; 3];
        for c in &mut coord {
            *c = tokens
                .next()
                .and_then(|t| t.parse::<f32>().ok())
                .ok_or_else(|| {
                    AssetLoadError::Mesh(format!("bad vertex on line {}", line_no + 1))
                })?;
        }
        mesh.indices.push(mesh.positions.len() as u32);
        mesh.positions.push(Vec3::from_array(coord));
    }
    if mesh.positions.len() % 3 != 0 {
        return Err(AssetLoadError::Mesh(format!(
            "ASCII STL has {} vertices, not a multiple of 3",
            mesh.positions.len()
        )));
    }
    Ok(mesh)
}
