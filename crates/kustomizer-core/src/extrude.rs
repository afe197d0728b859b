//! Planar outlines and their extrusion into prisms.
//!
//! Both glyph outlines and SVG shapes end up as a [`PlanarPath`]: a set of
//! closed, already flattened contours in a y-up plane. Extrusion fills the
//! outline with lyon, emits a front cap at `z = depth`, a back cap at `z = 0`
//! and one quad per contour edge for the walls.

use crate::geometry::MeshData;
use glam::{Vec2, Vec3};
use lyon_tessellation::math::point;
use lyon_tessellation::path::Path;
use lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};

const EPSILON: f32 = 1e-6;

#[derive(Clone, Debug, PartialEq)]
pub struct PlanarPath {
    pub contours: Vec<Vec<Vec2>>,
    pub fill_rule: FillRule,
}

impl Default for PlanarPath {
    fn default() -> Self {
        Self {
            contours: Vec::new(),
            fill_rule: FillRule::NonZero,
        }
    }
}

impl PlanarPath {
    pub fn new(fill_rule: FillRule) -> Self {
        Self {
            contours: Vec::new(),
            fill_rule,
        }
    }

    /// Add a contour, dropping a duplicated closing point and degenerate rings.
    pub fn push_contour(&mut self, mut points: Vec<Vec2>) {
        points.dedup_by(|a, b| a.distance_squared(*b) < EPSILON * EPSILON);
        if points.len() > 1 && points[0].distance_squared(points[points.len() - 1]) < EPSILON {
            points.pop();
        }
        if points.len() >= 3 {
            self.contours.push(points);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn is_finite(&self) -> bool {
        self.contours.iter().flatten().all(|p| p.is_finite())
    }

    pub fn bounds(&self) -> Option<(Vec2, Vec2)> {
        let mut it = self.contours.iter().flatten();
        let first = *it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))))
    }

    pub fn translate(&mut self, by: Vec2) {
        for p in self.contours.iter_mut().flatten() {
            *p += by;
        }
    }

    pub fn scale(&mut self, by: f32) {
        for p in self.contours.iter_mut().flatten() {
            *p *= by;
        }
    }

    pub fn extend(&mut self, other: PlanarPath) {
        self.contours.extend(other.contours);
    }

    fn to_lyon(&self) -> Path {
        let mut builder = Path::builder();
        for contour in &self.contours {
            builder.begin(point(contour[0].x, contour[0].y));
            for p in &contour[1..] {
                builder.line_to(point(p.x, p.y));
            }
            builder.close();
        }
        builder.build()
    }
}

/// Fill the outline into a flat triangle list (positions in the xy plane).
pub fn tessellate(path: &PlanarPath) -> Result<(Vec<Vec2>, Vec<u32>), String> {
    if !path.is_finite() {
        return Err("non-finite coordinate in outline".into());
    }
    let mut geometry: VertexBuffers<Vec2, u32> = VertexBuffers::new();
    let mut tessellator = FillTessellator::new();
    tessellator
        .tessellate_path(
            &path.to_lyon(),
            &FillOptions::default().with_fill_rule(path.fill_rule),
            &mut BuffersBuilder::new(&mut geometry, |v: FillVertex| {
                Vec2::new(v.position().x, v.position().y)
            }),
        )
        .map_err(|e| format!("tessellation failed: {e:?}"))?;
    let mut indices = geometry.indices;
    // Make every triangle counter-clockwise seen from +z.
    for tri in indices.chunks_exact_mut(3) {
        let (a, b, c) = (
            geometry.vertices[tri[0] as usize],
            geometry.vertices[tri[1] as usize],
            geometry.vertices[tri[2] as usize],
        );
        if (b - a).perp_dot(c - a) < 0.0 {
            tri.swap(1, 2);
        }
    }
    Ok((geometry.vertices, indices))
}

/// Extrude `path` along +z by `depth`. A zero depth yields a single face.
pub fn extrude(path: &PlanarPath, depth: f32) -> Result<MeshData, String> {
    let (cap, cap_indices) = tessellate(path)?;
    let mut mesh = MeshData::default();
    if cap_indices.is_empty() {
        return Ok(mesh);
    }
    let (lo, hi) = path.bounds().unwrap_or((Vec2::ZERO, Vec2::ONE));
    let extent = (hi - lo).max(Vec2::splat(EPSILON));
    let cap_uv = |p: Vec2| (p - lo) / extent;

    // Front cap
    for p in &cap {
        mesh.positions.push(p.extend(depth));
        mesh.normals.push(Vec3::Z);
        mesh.uvs.push(cap_uv(*p));
    }
    mesh.indices.extend_from_slice(&cap_indices);
    if depth <= 0.0 {
        return Ok(mesh);
    }

    // Back cap, reversed winding
    let back = mesh.positions.len() as u32;
    for p in &cap {
        mesh.positions.push(p.extend(0.0));
        mesh.normals.push(Vec3::NEG_Z);
        mesh.uvs.push(cap_uv(*p));
    }
    for tri in cap_indices.chunks_exact(3) {
        mesh.indices
            .extend_from_slice(&[back + tri[0], back + tri[2], back + tri[1]]);
    }

    // Walls
    for contour in &path.contours {
        let n = contour.len();
        let mut run = 0.0f32;
        for i in 0..n {
            let a = contour[i];
            let b = contour[(i + 1) % n];
            let edge = b - a;
            let len = edge.length();
            if len < EPSILON {
                continue;
            }
            let normal = Vec3::new(edge.y / len, -edge.x / len, 0.0);
            let base = mesh.positions.len() as u32;
            mesh.positions.extend_from_slice(&[
                a.extend(0.0),
                b.extend(0.0),
                b.extend(depth),
                a.extend(depth),
            ]);
            mesh.normals.extend_from_slice(&[normal; 4]);
            mesh.uvs.extend_from_slice(&[
                Vec2::new(run, 0.0),
                Vec2::new(run + len, 0.0),
                Vec2::new(run + len, depth),
                Vec2::new(run, depth),
            ]);
            run += len;
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }
    Ok(mesh)
}
