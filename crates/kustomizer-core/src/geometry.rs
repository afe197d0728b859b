//! CPU-side triangle meshes shared by loaders, extrusion and the renderer.

use glam::{Vec2, Vec3};

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = *it.next()?;
        let (min, max) = it.fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }
}

/// Indexed triangle list. `normals` and `uvs` are either empty or one per position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }

    pub fn translate(&mut self, by: Vec3) {
        for p in &mut self.positions {
            *p += by;
        }
    }

    /// Move the mesh so its bounding-box center sits at the origin.
    /// Returns the applied translation.
    pub fn center_on_origin(&mut self) -> Vec3 {
        let Some(bb) = self.bounding_box() else {
            return Vec3::ZERO;
        };
        let shift = -bb.center();
        self.translate(shift);
        shift
    }

    /// Area-weighted vertex normals. Unshared vertices end up with their face normal.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (pa, pb, pc) = (self.positions[a], self.positions[b], self.positions[c]);
            let face = (pb - pa).cross(pc - pa);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        for n in &mut normals {
            *n = n.normalize_or_zero();
        }
        self.normals = normals;
    }

    /// Box-projected texture coordinates: each vertex is projected on the plane
    /// facing its dominant normal axis, in world units scaled by `1 / tile_size`.
    pub fn generate_box_uvs(&mut self, tile_size: f32) {
        if self.normals.len() != self.positions.len() {
            self.compute_vertex_normals();
        }
        let inv = if tile_size > 0.0 { 1.0 / tile_size } else { 1.0 };
        self.uvs = self
            .positions
            .iter()
            .zip(&self.normals)
            .map(|(p, n)| {
                let a = n.abs();
                let uv = if a.x >= a.y && a.x >= a.z {
                    Vec2::new(p.z, p.y)
                } else if a.y >= a.z {
                    Vec2::new(p.x, p.z)
                } else {
                    Vec2::new(p.x, p.y)
                };
                uv * inv
            })
            .collect();
    }

    /// Append `other`, re-basing its indices.
    pub fn merge(&mut self, other: &MeshData) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Interleave into GPU vertices; missing attributes become zero.
    pub fn vertices(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, p)| Vertex {
                position: p.to_array(),
                normal: self.normals.get(i).copied().unwrap_or(Vec3::Z).to_array(),
                uv: self.uvs.get(i).copied().unwrap_or(Vec2::ZERO).to_array(),
            })
            .collect()
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;
}
