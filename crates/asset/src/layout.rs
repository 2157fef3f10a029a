//! Interleaved vertex layout: which attributes a vertex carries, their byte
//! offsets, and the stride between vertices.
//!
//! Attributes always appear in the canonical order position, normal, uv,
//! tangent, bitangent. Each component is one `f32`.

use crate::{
    error::{AssetError, AssetResult},
    mesh::ObjectVertexData,
};

/// Size of one vertex component in bytes.
pub const COMPONENT_SIZE: u32 = std::mem::size_of::<f32>() as u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Normal,
    Uv,
    Tangent,
    Bitangent,
}

impl VertexAttribute {
    /// Shader input location this attribute is bound to.
    pub const fn location(self) -> u32 {
        match self {
            VertexAttribute::Position => 0,
            VertexAttribute::Normal => 1,
            VertexAttribute::Uv => 2,
            VertexAttribute::Tangent => 3,
            VertexAttribute::Bitangent => 4,
        }
    }

    pub const fn components(self) -> u32 {
        match self {
            VertexAttribute::Uv => 2,
            _ => 3,
        }
    }

    /// Name of the vertex shader input expected for this attribute.
    pub const fn shader_name(self) -> &'static str {
        match self {
            VertexAttribute::Position => "in_position",
            VertexAttribute::Normal => "in_normal",
            VertexAttribute::Uv => "in_uv",
            VertexAttribute::Tangent => "in_tangent",
            VertexAttribute::Bitangent => "in_bitangent",
        }
    }

    pub const fn byte_size(self) -> u32 {
        self.components() * COMPONENT_SIZE
    }
}

/// The attribute combinations a mesh can be uploaded with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AttributeSet {
    /// Position, normal, uv.
    #[default]
    Basic,
    /// Position, normal, uv, tangent, bitangent.
    WithTangentFrame,
}

impl AttributeSet {
    pub const fn attributes(self) -> &'static [VertexAttribute] {
        use VertexAttribute::*;
        match self {
            AttributeSet::Basic => &[Position, Normal, Uv],
            AttributeSet::WithTangentFrame => &[Position, Normal, Uv, Tangent, Bitangent],
        }
    }

    pub const fn has_tangent_frame(self) -> bool {
        matches!(self, AttributeSet::WithTangentFrame)
    }
}

/// Placement of one attribute inside an interleaved vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeLayout {
    pub attribute: VertexAttribute,
    pub location: u32,
    pub components: u32,
    pub offset: u32,
}

/// Stride and per-attribute offsets for an [`AttributeSet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    pub set: AttributeSet,
    pub stride: u32,
    pub attributes: Vec<AttributeLayout>,
}

impl VertexLayout {
    pub fn new(set: AttributeSet) -> Self {
        let mut offset = 0;
        let attributes = set
            .attributes()
            .iter()
            .map(|&attribute| {
                let slot = AttributeLayout {
                    attribute,
                    location: attribute.location(),
                    components: attribute.components(),
                    offset,
                };
                offset += attribute.byte_size();
                slot
            })
            .collect();
        Self {
            set,
            stride: offset,
            attributes,
        }
    }

    pub fn offset_of(&self, attribute: VertexAttribute) -> Option<u32> {
        self.attributes
            .iter()
            .find(|slot| slot.attribute == attribute)
            .map(|slot| slot.offset)
    }

    pub fn floats_per_vertex(&self) -> usize {
        (self.stride / COMPONENT_SIZE) as usize
    }
}

/// One buffer holding every vertex of a mesh, attributes side by side.
#[derive(Clone, Debug, PartialEq)]
pub struct InterleavedVertices {
    pub layout: VertexLayout,
    pub data: Vec<f32>,
}

impl InterleavedVertices {
    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.layout.floats_per_vertex().max(1)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

/// Interleave the streams of `data` according to `layout`. `data` is only read.
pub fn interleave(
    data: &ObjectVertexData,
    layout: &VertexLayout,
) -> AssetResult<InterleavedVertices> {
    if !data.is_valid() {
        return Err(AssetError::Layout(
            "vertex streams are empty or differ in length".into(),
        ));
    }
    let frames = match (&data.tangent_frames, layout.set.has_tangent_frame()) {
        (Some(frames), true) => Some(frames),
        (None, true) => {
            return Err(AssetError::Layout(
                "layout needs tangent frames but the mesh has none".into(),
            ));
        }
        (_, false) => None,
    };

    let mut out = Vec::with_capacity(data.vertex_count() * layout.floats_per_vertex());
    for i in 0..data.vertex_count() {
        out.extend_from_slice(&data.positions[i]);
        out.extend_from_slice(&data.normals[i]);
        out.extend_from_slice(&data.uvs[i]);
        if let Some(frames) = frames {
            out.extend_from_slice(&frames.tangents[i]);
            out.extend_from_slice(&frames.bitangents[i]);
        }
    }

    Ok(InterleavedVertices {
        layout: layout.clone(),
        data: out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obj::load_obj_from_str;

    const QUAD: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
                        vt 0 0\nvt 1 0\nvt 0 1\nvt 1 1\nvn 0 0 1\n\
                        f 1/1/1 2/2/1 3/3/1\nf 3/3/1 2/2/1 4/4/1\n";

    #[test]
    fn basic_stride_and_offsets() {
        let layout = VertexLayout::new(AttributeSet::Basic);
        assert_eq!(layout.stride, 32);
        assert_eq!(layout.offset_of(VertexAttribute::Position), Some(0));
        assert_eq!(layout.offset_of(VertexAttribute::Normal), Some(12));
        assert_eq!(layout.offset_of(VertexAttribute::Uv), Some(24));
        assert_eq!(layout.offset_of(VertexAttribute::Tangent), None);
    }

    #[test]
    fn tangent_frame_stride_and_offsets() {
        let layout = VertexLayout::new(AttributeSet::WithTangentFrame);
        assert_eq!(layout.stride, 56);
        assert_eq!(layout.offset_of(VertexAttribute::Tangent), Some(32));
        assert_eq!(layout.offset_of(VertexAttribute::Bitangent), Some(44));
        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.location).collect();
        assert_eq!(locations, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn interleaves_in_canonical_order() {
        let data = load_obj_from_str(QUAD).expect("quad");
        let layout = VertexLayout::new(AttributeSet::Basic);
        let vertices = interleave(&data, &layout).expect("interleave");

        assert_eq!(vertices.vertex_count(), 6);
        assert_eq!(vertices.as_bytes().len(), 6 * 32);
        // Second corner of the first triangle: v2, normal 1, vt2 with V flipped.
        assert_eq!(&vertices.data[8..16], &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn tangent_layout_requires_frames() {
        let data = load_obj_from_str(QUAD).expect("quad");
        let layout = VertexLayout::new(AttributeSet::WithTangentFrame);
        let err = interleave(&data, &layout).expect_err("no frames");
        assert!(
            matches!(&err, AssetError::Layout(reason) if reason.contains("tangent frames")),
            "{err:?}"
        );

        let with_frames = data.clone().with_tangent_frames();
        let vertices = interleave(&with_frames, &layout).expect("interleave");
        assert_eq!(vertices.data.len(), 6 * 14);
        assert_eq!(data.tangent_frames, None);
    }
}
