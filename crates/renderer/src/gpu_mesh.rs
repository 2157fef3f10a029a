//! Upload of de-indexed meshes as one interleaved vertex buffer, an index
//! buffer and the attribute layout binding them.

use asset::{
    AssetError, AssetResult,
    layout::{AttributeSet, VertexLayout, interleave},
    mesh::ObjectVertexData,
};

use crate::device::{BufferId, BufferKind, GraphicsDevice, VertexArrayId};

/// Device handles of one uploaded mesh. Owned by exactly one asset.
#[derive(Debug, PartialEq, Eq)]
pub struct GpuMesh {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub vertex_array: VertexArrayId,
    pub index_count: u32,
    pub layout: VertexLayout,
}

impl GpuMesh {
    /// Delete every handle. Consumes the mesh so it can't be released twice.
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.delete_vertex_array(self.vertex_array);
        device.delete_buffer(self.vertex_buffer);
        device.delete_buffer(self.index_buffer);
    }
}

/// Interleave `data` for `attributes` and upload it.
///
/// Handles created before a failing step are deleted before the error is
/// returned. `data` is never modified.
pub fn build_gpu_mesh(
    device: &mut dyn GraphicsDevice,
    label: &str,
    data: &ObjectVertexData,
    attributes: AttributeSet,
) -> AssetResult<GpuMesh> {
    let layout = VertexLayout::new(attributes);
    let vertices = interleave(data, &layout)?;
    let index_count = index_count(data.indices.len())?;

    let vertex_buffer = device.create_buffer(BufferKind::Vertex, label, vertices.as_bytes())?;
    let index_buffer = match device.create_buffer(
        BufferKind::Index,
        label,
        bytemuck::cast_slice(&data.indices),
    ) {
        Ok(buffer) => buffer,
        Err(e) => {
            device.delete_buffer(vertex_buffer);
            return Err(e.into());
        }
    };
    let vertex_array = match device.create_vertex_array(vertex_buffer, index_buffer, &layout) {
        Ok(vertex_array) => vertex_array,
        Err(e) => {
            device.delete_buffer(index_buffer);
            device.delete_buffer(vertex_buffer);
            return Err(e.into());
        }
    };

    log::debug!(
        "Uploaded mesh '{}': {} vertices, stride {} bytes",
        label,
        vertices.vertex_count(),
        layout.stride
    );

    Ok(GpuMesh {
        vertex_buffer,
        index_buffer,
        vertex_array,
        index_count,
        layout,
    })
}

fn index_count(len: usize) -> AssetResult<u32> {
    u32::try_from(len).map_err(|_| {
        AssetError::Layout(format!("{len} indices exceed the 32-bit index range"))
    })
}
