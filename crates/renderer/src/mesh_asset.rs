use std::path::{Path, PathBuf};

use asset::{
    AssetResult, diagnostics::DiagnosticSink, layout::AttributeSet, obj::read_mesh_source,
};

use crate::{
    device::GraphicsDevice,
    gpu_mesh::{GpuMesh, build_gpu_mesh},
    lifecycle::{Asset, AssetState},
};

/// A mesh file uploaded with a fixed attribute set.
#[derive(Debug)]
pub struct MeshAsset {
    name: String,
    path: PathBuf,
    attributes: AttributeSet,
    state: AssetState<GpuMesh>,
}

impl MeshAsset {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        attributes: AttributeSet,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            attributes,
            state: AssetState::Unloaded,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn attributes(&self) -> AttributeSet {
        self.attributes
    }

    pub fn gpu(&self) -> Option<&GpuMesh> {
        self.state.loaded()
    }
}

impl Asset for MeshAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    fn load_reporting(
        &mut self,
        device: &mut dyn GraphicsDevice,
        sink: &mut dyn DiagnosticSink,
    ) -> AssetResult<()> {
        let (name, path, attributes) = (&self.name, &self.path, self.attributes);
        let loaded = self.state.load_with(|| {
            let mut data = read_mesh_source(path, sink)?.to_vertex_data();
            if attributes.has_tangent_frame() {
                data.compute_tangent_frames();
            }
            build_gpu_mesh(device, name, &data, attributes)
        })?;
        if let (true, Some(mesh)) = (loaded, self.state.loaded()) {
            log::info!(
                "Loaded mesh '{}' from {} ({} indices)",
                self.name,
                self.path.display(),
                mesh.index_count
            );
        }
        Ok(())
    }

    fn unload(&mut self, device: &mut dyn GraphicsDevice) {
        if self.state.unload_with(|mesh| mesh.release(device)) {
            log::info!("Unloaded mesh '{}'", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use asset::{AssetError, diagnostics::Diagnostic};

    use super::*;
    use crate::headless::HeadlessDevice;

    const QUAD: &str = "# two triangles\n\
                        v -1 -1 0\nv 1 -1 0\nv 1 1 0\nv -1 1 0\n\
                        vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nvn 0 0 1\n\
                        f 1/1/1 2/2/1 3/3/1\nf 1/1/1 3/3/1 4/4/1\n";

    fn write_mesh(dir: &tempfile::TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("quad.obj");
        fs::write(&path, text).expect("write mesh");
        path
    }

    #[test]
    fn load_twice_allocates_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut device = HeadlessDevice::new();
        let mut mesh = MeshAsset::new("quad", write_mesh(&dir, QUAD), AttributeSet::Basic);

        mesh.load(&mut device).expect("load");
        let first = mesh.gpu().map(|m| (m.vertex_buffer, m.index_buffer, m.vertex_array));
        mesh.load(&mut device).expect("reload");
        let second = mesh.gpu().map(|m| (m.vertex_buffer, m.index_buffer, m.vertex_array));

        assert_eq!(first, second);
        assert_eq!(device.stats().created.buffers, 2);
        assert_eq!(device.stats().created.vertex_arrays, 1);
        assert_eq!(mesh.gpu().map(|m| m.index_count), Some(6));
    }

    #[test]
    fn unload_twice_releases_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut device = HeadlessDevice::new();
        let mut mesh = MeshAsset::new("quad", write_mesh(&dir, QUAD), AttributeSet::Basic);
        mesh.load(&mut device).expect("load");

        mesh.unload(&mut device);
        mesh.unload(&mut device);
        assert!(!mesh.is_loaded());
        let stats = device.stats();
        assert_eq!(stats.deleted.buffers, 2);
        assert_eq!(stats.deleted.vertex_arrays, 1);
        assert_eq!(stats.stale_deletes, 0);
        assert_eq!(device.live_handles(), 0);
    }

    #[test]
    fn tangent_layout_gets_tangent_frames() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut device = HeadlessDevice::new();
        let path = write_mesh(&dir, QUAD);
        let mut mesh = MeshAsset::new("leaf", path, AttributeSet::WithTangentFrame);
        mesh.load(&mut device).expect("load");
        let gpu = mesh.gpu().expect("loaded");
        assert_eq!(gpu.layout.stride, 56);
        let vb = device.buffer(gpu.vertex_buffer).expect("vb");
        let floats: &[f32] = bytemuck::cast_slice(&vb.contents);
        // First vertex tangent follows +u, which runs along +x.
        assert_eq!(&floats[8..11], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn skipped_lines_reach_the_given_sink() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut device = HeadlessDevice::new();
        let path = write_mesh(&dir, &format!("mtllib tree.mtl\n{QUAD}usemtl bark\n"));
        let mut mesh = MeshAsset::new("quad", path, AttributeSet::Basic);

        let mut sink: Vec<Diagnostic> = Vec::new();
        mesh.load_reporting(&mut device, &mut sink).expect("load");
        assert!(mesh.is_loaded());
        let messages: Vec<&str> = sink.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(messages[0].contains("'mtllib' on line 1"), "{messages:?}");
        assert!(messages[1].contains("'usemtl'"), "{messages:?}");
        assert!(sink.iter().all(|d| d.level == log::Level::Warn));

        // Already loaded: nothing is parsed or reported again.
        mesh.load_reporting(&mut device, &mut sink).expect("reload");
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn malformed_face_leaves_asset_unloaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut device = HeadlessDevice::new();
        let path = write_mesh(&dir, "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 1/1/1\n");
        let mut mesh = MeshAsset::new("broken", path, AttributeSet::Basic);
        let err = mesh.load(&mut device).expect_err("two corners");
        assert!(matches!(err, AssetError::Format { line: Some(4), .. }), "{err:?}");
        assert!(!mesh.is_loaded());
        assert_eq!(device.live_handles(), 0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut device = HeadlessDevice::new();
        let mut mesh = MeshAsset::new("gone", dir.path().join("gone.obj"), AttributeSet::Basic);
        assert!(matches!(mesh.load(&mut device), Err(AssetError::Io { .. })));
    }
}
