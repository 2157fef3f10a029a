//! CPU-side mesh representations.
//!
//! [`MeshSource`] is the indexed table read from mesh text; [`ObjectVertexData`]
//! is its de-indexed, GPU-facing form where every triangle corner is its own
//! vertex.

use glam::{Vec2, Vec3};

/// One triangle corner: 0-based indices into the source arrays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Corner {
    pub position: usize,
    pub uv: usize,
    pub normal: usize,
}

impl Corner {
    pub fn new(position: usize, uv: usize, normal: usize) -> Self {
        Self {
            position,
            uv,
            normal,
        }
    }
}

pub type Triangle = [Corner; 3];

/// Parsed mesh text before de-indexing.
///
/// Only the parser builds this, and it guarantees that every corner index is
/// in range for its array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshSource {
    pub(crate) positions: Vec<[f32; 3]>,
    pub(crate) normals: Vec<[f32; 3]>,
    pub(crate) texcoords: Vec<[f32; 2]>,
    pub(crate) triangles: Vec<Triangle>,
}

impl MeshSource {
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// Texture coordinates, V already flipped.
    pub fn texcoords(&self) -> &[[f32; 2]] {
        &self.texcoords
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Flatten into one vertex per triangle corner with an identity index list.
    /// Shared vertices are duplicated, never welded.
    pub fn to_vertex_data(&self) -> ObjectVertexData {
        let corner_count = self.triangles.len() * 3;
        let mut positions = Vec::with_capacity(corner_count);
        let mut normals = Vec::with_capacity(corner_count);
        let mut uvs = Vec::with_capacity(corner_count);

        for corner in self.triangles.iter().flatten() {
            positions.push(self.positions[corner.position]);
            normals.push(self.normals[corner.normal]);
            uvs.push(self.texcoords[corner.uv]);
        }

        ObjectVertexData {
            positions,
            normals,
            uvs,
            tangent_frames: None,
            indices: (0..corner_count as u32).collect(),
        }
    }
}

/// Per-corner tangent space, constant across each triangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TangentFrames {
    pub tangents: Vec<[f32; 3]>,
    pub bitangents: Vec<[f32; 3]>,
}

/// De-indexed mesh ready for interleaving.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectVertexData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub tangent_frames: Option<TangentFrames>,
    pub indices: Vec<u32>,
}

impl ObjectVertexData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns `true` if the attribute streams agree in length and the mesh
    /// has at least one whole triangle.
    pub fn is_valid(&self) -> bool {
        let n = self.positions.len();
        let frames_ok = self.tangent_frames.as_ref().is_none_or(|frames| {
            frames.tangents.len() == n && frames.bitangents.len() == n
        });
        n > 0
            && self.normals.len() == n
            && self.uvs.len() == n
            && self.indices.len() % 3 == 0
            && frames_ok
    }

    /// Fill [`ObjectVertexData::tangent_frames`] with flat per-triangle
    /// tangent and bitangent vectors derived from positions and uvs.
    ///
    /// Triangles whose uv mapping has (near) zero area get zero vectors.
    pub fn compute_tangent_frames(&mut self) {
        let n = self.positions.len();
        let mut tangents = vec![[0.0; 3]; n];
        let mut bitangents = vec![[0.0; 3]; n];

        for base in (0..n - n % 3).step_by(3) {
            let p0 = Vec3::from(self.positions[base]);
            let p1 = Vec3::from(self.positions[base + 1]);
            let p2 = Vec3::from(self.positions[base + 2]);
            let uv0 = Vec2::from(self.uvs[base]);
            let uv1 = Vec2::from(self.uvs[base + 1]);
            let uv2 = Vec2::from(self.uvs[base + 2]);

            let (tangent, bitangent) =
                triangle_tangent_frame(p1 - p0, p2 - p0, uv1 - uv0, uv2 - uv0);
            for corner in base..base + 3 {
                tangents[corner] = tangent.to_array();
                bitangents[corner] = bitangent.to_array();
            }
        }

        self.tangent_frames = Some(TangentFrames {
            tangents,
            bitangents,
        });
    }

    pub fn with_tangent_frames(mut self) -> Self {
        self.compute_tangent_frames();
        self
    }
}

const MIN_UV_AREA: f32 = 1e-8;

fn triangle_tangent_frame(e1: Vec3, e2: Vec3, d1: Vec2, d2: Vec2) -> (Vec3, Vec3) {
    let det = d1.x * d2.y - d2.x * d1.y;
    if det.abs() < MIN_UV_AREA {
        return (Vec3::ZERO, Vec3::ZERO);
    }
    let r = det.recip();
    let tangent = (e1 * d2.y - e2 * d1.y) * r;
    let bitangent = (e2 * d1.x - e1 * d2.x) * r;
    (tangent.normalize_or_zero(), bitangent.normalize_or_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> ObjectVertexData {
        ObjectVertexData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            tangent_frames: None,
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn de_indexing_duplicates_shared_vertices() {
        let corner = |i| Corner::new(i, 0, 0);
        let source = MeshSource {
            positions: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]],
            texcoords: vec![[0.5, 0.5]],
            triangles: vec![
                [corner(0), corner(1), corner(2)],
                [corner(2), corner(1), corner(3)],
            ],
        };
        let data = source.to_vertex_data();
        assert_eq!(data.vertex_count(), 6);
        assert_eq!(data.indices, [0, 1, 2, 3, 4, 5]);
        assert_eq!(data.positions[3], data.positions[2]);
        assert_eq!(data.positions[4], data.positions[1]);
        assert!(data.is_valid());
    }

    #[test]
    fn tangent_frame_follows_uv_axes() {
        let data = unit_triangle().with_tangent_frames();
        let frames = data.tangent_frames.as_ref().expect("frames");
        assert!(data.is_valid());
        for corner in 0..3 {
            assert_eq!(frames.tangents[corner], [1.0, 0.0, 0.0]);
            assert_eq!(frames.bitangents[corner], [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn degenerate_uvs_give_zero_frame() {
        let mut data = unit_triangle();
        data.uvs = vec![[0.5, 0.5]; 3];
        data.compute_tangent_frames();
        let frames = data.tangent_frames.expect("frames");
        assert!(frames.tangents.iter().all(|t| *t == [0.0; 3]));
        assert!(frames.bitangents.iter().all(|b| *b == [0.0; 3]));
    }

    #[test]
    fn mismatched_streams_are_invalid() {
        let mut data = unit_triangle();
        data.normals.pop();
        assert!(!data.is_valid());
        assert!(!ObjectVertexData::default().is_valid());
    }
}
