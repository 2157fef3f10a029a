//! In-memory graphics device.
//!
//! Hands out ids, keeps a record per live handle, and counts every create and
//! delete so lifecycle behavior can be checked without a GPU. Its "compiler"
//! is naga's WGSL front end, so sources are parsed and validated the way
//! wgpu does it.

use std::collections::HashMap;

use asset::{ShaderStage, layout::VertexLayout};

use crate::{
    device::{
        BufferId, BufferKind, DeviceError, DeviceResult, GraphicsDevice, ProgramId, ShaderId,
        TextureDesc, TextureFilter, TextureId, UniformLocation, VertexArrayId,
    },
    reflect::{self, ShaderInterface},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferRecord {
    pub kind: BufferKind,
    pub label: String,
    pub contents: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexArrayRecord {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub layout: VertexLayout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureRecord {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub filter: TextureFilter,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderRecord {
    pub stage: ShaderStage,
    pub label: String,
    pub interface: ShaderInterface,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramRecord {
    pub vertex: ShaderId,
    pub fragment: ShaderId,
    pub attributes: Vec<(u32, String)>,
    pub resources: Vec<(String, UniformLocation)>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub buffers: u32,
    pub vertex_arrays: u32,
    pub textures: u32,
    pub shaders: u32,
    pub programs: u32,
}

impl ResourceCounts {
    pub fn total(&self) -> u32 {
        self.buffers + self.vertex_arrays + self.textures + self.shaders + self.programs
    }
}

/// Lifetime statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub created: ResourceCounts,
    pub deleted: ResourceCounts,
    /// Deletes of handles that were not live (double free or foreign id).
    pub stale_deletes: u32,
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: u32,
    buffers: HashMap<BufferId, BufferRecord>,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayRecord>,
    textures: HashMap<TextureId, TextureRecord>,
    shaders: HashMap<ShaderId, ShaderRecord>,
    programs: HashMap<ProgramId, ProgramRecord>,
    stats: DeviceStats,
    /// Allocations still allowed to succeed, and the reason the one after fails.
    allocation_failure: Option<(u32, String)>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    /// Number of handles currently alive, all kinds together.
    pub fn live_handles(&self) -> usize {
        self.buffers.len()
            + self.vertex_arrays.len()
            + self.textures.len()
            + self.shaders.len()
            + self.programs.len()
    }

    /// Make the next buffer, vertex array or texture allocation fail.
    pub fn fail_next_allocation(&mut self, reason: impl Into<String>) {
        self.fail_allocation_after(0, reason);
    }

    /// Let `successes` allocations through, then fail the next one.
    pub fn fail_allocation_after(&mut self, successes: u32, reason: impl Into<String>) {
        self.allocation_failure = Some((successes, reason.into()));
    }

    pub fn buffer(&self, id: BufferId) -> Option<&BufferRecord> {
        self.buffers.get(&id)
    }

    pub fn vertex_array(&self, id: VertexArrayId) -> Option<&VertexArrayRecord> {
        self.vertex_arrays.get(&id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureRecord> {
        self.textures.get(&id)
    }

    pub fn shader(&self, id: ShaderId) -> Option<&ShaderRecord> {
        self.shaders.get(&id)
    }

    pub fn program(&self, id: ProgramId) -> Option<&ProgramRecord> {
        self.programs.get(&id)
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn check_allocation(&mut self) -> DeviceResult<()> {
        match self.allocation_failure.take() {
            Some((0, reason)) => Err(DeviceError::Allocation(reason)),
            Some((successes, reason)) => {
                self.allocation_failure = Some((successes - 1, reason));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn shader_of_stage(&self, id: ShaderId, stage: ShaderStage) -> DeviceResult<&ShaderRecord> {
        match self.shaders.get(&id) {
            Some(record) if record.stage == stage => Ok(record),
            Some(record) => Err(DeviceError::Link(format!(
                "{id} is a {} shader, expected {stage}",
                record.stage
            ))),
            None => Err(DeviceError::UnknownHandle {
                kind: ShaderId::KIND,
                id: id.0,
            }),
        }
    }

    fn stale_delete(&mut self, what: impl std::fmt::Display) {
        log::warn!("headless device: delete of unknown {what}");
        self.stats.stale_deletes += 1;
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_buffer(
        &mut self,
        kind: BufferKind,
        label: &str,
        contents: &[u8],
    ) -> DeviceResult<BufferId> {
        self.check_allocation()?;
        let id = BufferId(self.allocate_id());
        self.buffers.insert(
            id,
            BufferRecord {
                kind,
                label: label.to_owned(),
                contents: contents.to_vec(),
            },
        );
        self.stats.created.buffers += 1;
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        match self.buffers.remove(&buffer) {
            Some(_) => self.stats.deleted.buffers += 1,
            None => self.stale_delete(buffer),
        }
    }

    fn create_vertex_array(
        &mut self,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        layout: &VertexLayout,
    ) -> DeviceResult<VertexArrayId> {
        let expected = [
            (vertex_buffer, BufferKind::Vertex),
            (index_buffer, BufferKind::Index),
        ];
        for (buffer, kind) in expected {
            match self.buffers.get(&buffer) {
                Some(record) if record.kind == kind => {}
                Some(_) => {
                    return Err(DeviceError::Backend(format!(
                        "{buffer} is not a {kind:?} buffer"
                    )));
                }
                None => {
                    return Err(DeviceError::UnknownHandle {
                        kind: BufferId::KIND,
                        id: buffer.0,
                    });
                }
            }
        }
        self.check_allocation()?;
        let id = VertexArrayId(self.allocate_id());
        self.vertex_arrays.insert(
            id,
            VertexArrayRecord {
                vertex_buffer,
                index_buffer,
                layout: layout.clone(),
            },
        );
        self.stats.created.vertex_arrays += 1;
        Ok(id)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        match self.vertex_arrays.remove(&vertex_array) {
            Some(_) => self.stats.deleted.vertex_arrays += 1,
            None => self.stale_delete(vertex_array),
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> DeviceResult<TextureId> {
        if desc.levels.is_empty() || desc.width == 0 || desc.height == 0 {
            return Err(DeviceError::Allocation(format!(
                "texture '{}' has no pixel data",
                desc.label
            )));
        }
        self.check_allocation()?;
        let id = TextureId(self.allocate_id());
        self.textures.insert(
            id,
            TextureRecord {
                label: desc.label.to_owned(),
                width: desc.width,
                height: desc.height,
                mip_levels: desc.levels.len() as u32,
                filter: desc.filter,
            },
        );
        self.stats.created.textures += 1;
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        match self.textures.remove(&texture) {
            Some(_) => self.stats.deleted.textures += 1,
            None => self.stale_delete(texture),
        }
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> DeviceResult<ShaderId> {
        let interface = reflect::compile(stage, source)
            .map_err(|diagnostic| DeviceError::Compile(format!("{label}: {diagnostic}")))?;

        let id = ShaderId(self.allocate_id());
        self.shaders.insert(
            id,
            ShaderRecord {
                stage,
                label: label.to_owned(),
                interface,
            },
        );
        self.stats.created.shaders += 1;
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        match self.shaders.remove(&shader) {
            Some(_) => self.stats.deleted.shaders += 1,
            None => self.stale_delete(shader),
        }
    }

    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
        attributes: &[(u32, &str)],
    ) -> DeviceResult<ProgramId> {
        let vs = self.shader_of_stage(vertex, ShaderStage::Vertex)?;
        let fs = self.shader_of_stage(fragment, ShaderStage::Fragment)?;
        reflect::check_attribute_bindings(&vs.interface, attributes)
            .map_err(DeviceError::Link)?;
        let resources = reflect::merge_resources(&vs.interface, &fs.interface);

        let id = ProgramId(self.allocate_id());
        self.programs.insert(
            id,
            ProgramRecord {
                vertex,
                fragment,
                attributes: attributes
                    .iter()
                    .map(|&(location, name)| (location, name.to_owned()))
                    .collect(),
                resources,
            },
        );
        self.stats.created.programs += 1;
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        match self.programs.remove(&program) {
            Some(_) => self.stats.deleted.programs += 1,
            None => self.stale_delete(program),
        }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(&program)?
            .resources
            .iter()
            .find(|(resource, _)| resource == name)
            .map(|&(_, location)| location)
    }
}

#[cfg(test)]
mod tests {
    use asset::layout::AttributeSet;

    use super::*;

    const VS: &str = r#"
@group(0) @binding(0) var<uniform> modelview_projection_matrix: mat4x4<f32>;

@vertex
fn vs_main(@location(0) in_position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return modelview_projection_matrix * vec4<f32>(in_position, 1.0);
}
"#;
    const FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;

    fn link(device: &mut HeadlessDevice, vertex: &str) -> ProgramId {
        let vs = device.compile_shader(ShaderStage::Vertex, "vs", vertex).expect("vs");
        let fs = device.compile_shader(ShaderStage::Fragment, "fs", FS).expect("fs");
        device.link_program(vs, fs, &[(0, "in_position")]).expect("link")
    }

    #[test]
    fn ids_are_unique_across_kinds() {
        let mut device = HeadlessDevice::new();
        let a = device.create_buffer(BufferKind::Vertex, "vb", &[0; 4]).expect("vb");
        let b = device.create_buffer(BufferKind::Index, "ib", &[0; 4]).expect("ib");
        let vao = device
            .create_vertex_array(a, b, &VertexLayout::new(AttributeSet::Basic))
            .expect("vao");
        assert_ne!(a, b);
        assert_ne!(vao.0, a.0);
        assert_ne!(vao.0, b.0);
        assert_eq!(device.live_handles(), 3);
    }

    #[test]
    fn deleting_twice_is_counted_as_stale() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer(BufferKind::Vertex, "vb", &[1, 2, 3]).expect("vb");
        device.delete_buffer(buffer);
        device.delete_buffer(buffer);
        let stats = device.stats();
        assert_eq!(stats.created.buffers, 1);
        assert_eq!(stats.deleted.buffers, 1);
        assert_eq!(stats.stale_deletes, 1);
    }

    #[test]
    fn injected_allocation_failure_fires_once() {
        let mut device = HeadlessDevice::new();
        device.fail_next_allocation("out of memory");
        assert_eq!(
            device.create_buffer(BufferKind::Vertex, "vb", &[]),
            Err(DeviceError::Allocation("out of memory".into()))
        );
        assert!(device.create_buffer(BufferKind::Vertex, "vb", &[]).is_ok());
    }

    #[test]
    fn delayed_allocation_failure_skips_earlier_allocations() {
        let mut device = HeadlessDevice::new();
        device.fail_allocation_after(1, "device lost");
        assert!(device.create_buffer(BufferKind::Vertex, "vb", &[]).is_ok());
        assert!(device.create_buffer(BufferKind::Index, "ib", &[]).is_err());
        assert!(device.create_buffer(BufferKind::Index, "ib", &[]).is_ok());
    }

    #[test]
    fn vertex_array_checks_buffer_kinds() {
        let mut device = HeadlessDevice::new();
        let a = device.create_buffer(BufferKind::Vertex, "vb", &[]).expect("vb");
        let layout = VertexLayout::new(AttributeSet::Basic);
        assert!(device.create_vertex_array(a, a, &layout).is_err());
        assert!(matches!(
            device.create_vertex_array(a, BufferId(999), &layout),
            Err(DeviceError::UnknownHandle { .. })
        ));
    }

    #[test]
    fn compile_reports_line_of_syntax_error() {
        let mut device = HeadlessDevice::new();
        let broken = r#"@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0;
}
"#;
        match device.compile_shader(ShaderStage::Fragment, "Leaf_FS", broken) {
            Err(DeviceError::Compile(diagnostic)) => {
                assert!(diagnostic.starts_with("Leaf_FS: line 3: "), "{diagnostic}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(device.live_handles(), 0);
    }

    #[test]
    fn compile_requires_stage_entry_point() {
        let mut device = HeadlessDevice::new();
        assert!(matches!(
            device.compile_shader(ShaderStage::Vertex, "fs_as_vs", FS),
            Err(DeviceError::Compile(_))
        ));
    }

    #[test]
    fn compile_rejects_type_errors() {
        let mut device = HeadlessDevice::new();
        let mistyped = "@fragment\nfn fs_main() -> @location(0) vec4<f32> {\n    return 1.0;\n}\n";
        assert!(matches!(
            device.compile_shader(ShaderStage::Fragment, "fs", mistyped),
            Err(DeviceError::Compile(_))
        ));
        assert_eq!(device.stats().created.shaders, 0);
    }

    #[test]
    fn link_resolves_uniforms_from_both_stages() {
        let mut device = HeadlessDevice::new();
        let program = link(&mut device, VS);
        assert_eq!(
            device.uniform_location(program, "modelview_projection_matrix"),
            Some(UniformLocation { group: 0, binding: 0 })
        );
        assert_eq!(device.uniform_location(program, "crossfade_ratio"), None);
    }

    #[test]
    fn uniform_lookup_ignores_attribute_order() {
        let mut device = HeadlessDevice::new();
        let binding_first = VS.replace("@group(0) @binding(0)", "@binding(0) @group(0)");
        let program = link(&mut device, &binding_first);
        assert_eq!(
            device.uniform_location(program, "modelview_projection_matrix"),
            Some(UniformLocation { group: 0, binding: 0 })
        );
    }

    #[test]
    fn uniform_lookup_finds_struct_members() {
        let mut device = HeadlessDevice::new();
        let vertex = r#"
struct Transforms {
    modelview_projection_matrix: mat4x4<f32>,
};
@group(0) @binding(1) var<uniform> transforms: Transforms;

@vertex
fn vs_main(@location(0) in_position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return transforms.modelview_projection_matrix * vec4<f32>(in_position, 1.0);
}
"#;
        let program = link(&mut device, vertex);
        assert_eq!(
            device.uniform_location(program, "modelview_projection_matrix"),
            Some(UniformLocation { group: 0, binding: 1 })
        );
    }

    #[test]
    fn link_rejects_swapped_stages_and_bad_bindings() {
        let mut device = HeadlessDevice::new();
        let vs = device.compile_shader(ShaderStage::Vertex, "vs", VS).expect("vs");
        let fs = device.compile_shader(ShaderStage::Fragment, "fs", FS).expect("fs");
        assert!(matches!(device.link_program(fs, vs, &[]), Err(DeviceError::Link(_))));
        assert!(matches!(
            device.link_program(vs, fs, &[(1, "in_position")]),
            Err(DeviceError::Link(_))
        ));
        assert_eq!(device.stats().created.programs, 0);
    }
}
