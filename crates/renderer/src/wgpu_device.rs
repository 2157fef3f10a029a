//! [`GraphicsDevice`] on top of a real wgpu device.
//!
//! No surface is created; assets only need a device and a queue. A "program"
//! is the pair of validated shader modules plus their reflected interface,
//! ready for a render pipeline to be built from.

use std::{borrow::Cow, collections::HashMap};

use asset::{
    ShaderStage,
    layout::{VertexAttribute, VertexLayout},
};
use wgpu::{
    Adapter, Backends, BufferUsages, CompilationMessageType, Device, DeviceDescriptor,
    ErrorFilter, Extent3d, Features, FilterMode, ImageCopyTexture, ImageDataLayout, Instance,
    InstanceDescriptor, Limits, Origin3d, PowerPreference, Queue, RequestAdapterOptions,
    SamplerDescriptor, ShaderModuleDescriptor, TextureAspect, TextureDescriptor,
    TextureDimension, TextureFormat, TextureUsages, VertexFormat, util::DeviceExt,
};

use crate::{
    device::{
        BufferId, BufferKind, DeviceError, DeviceResult, GraphicsDevice, ProgramId, ShaderId,
        TextureDesc, TextureFilter, TextureId, UniformLocation, VertexArrayId,
    },
    reflect::{self, ShaderInterface},
};

const TEXTURE_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

/// Device limits the shipped shaders need. The leaf pass is the widest: five
/// vertex attributes, a displacement texture sampled in the vertex stage and
/// two material textures in the fragment stage.
const REQUIRED_LIMITS: [(&str, fn(&Limits) -> u32, u32); 6] = [
    ("vertex attributes", |l| l.max_vertex_attributes, 5),
    ("bind groups", |l| l.max_bind_groups, 2),
    ("sampled textures per stage", |l| l.max_sampled_textures_per_shader_stage, 2),
    ("samplers per stage", |l| l.max_samplers_per_shader_stage, 1),
    ("uniform buffers per stage", |l| l.max_uniform_buffers_per_shader_stage, 2),
    ("uniform buffer binding size", |l| l.max_uniform_buffer_binding_size, 64),
];

/// Check `limits` against what the asset shaders need, naming the first
/// limit that falls short.
pub fn check_capabilities(limits: &Limits) -> Result<(), String> {
    for (what, get, required) in REQUIRED_LIMITS {
        let available = get(limits);
        if available < required {
            return Err(format!("device supports {available} {what}, {required} required"));
        }
    }
    Ok(())
}

struct GpuBuffer {
    kind: BufferKind,
    buffer: wgpu::Buffer,
}

/// Vertex buffer layout, owned so it can outlive the asset-side layout.
pub struct GpuVertexArray {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub array_stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl GpuVertexArray {
    pub fn buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

struct GpuShader {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
    interface: ShaderInterface,
}

struct GpuProgram {
    vertex: ShaderId,
    fragment: ShaderId,
    resources: Vec<(String, UniformLocation)>,
}

pub struct WgpuDevice {
    adapter: Adapter,
    device: Device,
    queue: Queue,
    next_id: u32,
    buffers: HashMap<BufferId, GpuBuffer>,
    vertex_arrays: HashMap<VertexArrayId, GpuVertexArray>,
    textures: HashMap<TextureId, GpuTexture>,
    shaders: HashMap<ShaderId, GpuShader>,
    programs: HashMap<ProgramId, GpuProgram>,
}

impl WgpuDevice {
    /// Open the first adapter on `backends`, without a presentation surface.
    pub fn new_headless(backends: Backends) -> DeviceResult<Self> {
        pollster::block_on(Self::request(backends))
    }

    async fn request(backends: Backends) -> DeviceResult<Self> {
        let instance = Instance::new(InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| DeviceError::Backend(format!("no adapter for {backends:?}")))?;

        let info = adapter.get_info();
        if let Err(reason) = check_capabilities(&adapter.limits()) {
            log::error!("wgpu adapter {} is not capable: {reason}", info.name);
            return Err(DeviceError::Backend(format!("{}: {reason}", info.name)));
        }

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("DerBaum Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        log::info!("wgpu device: {} ({:?})", info.name, info.backend);

        Ok(Self {
            adapter,
            device,
            queue,
            next_id: 0,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
        })
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(&id).map(|b| &b.buffer)
    }

    pub fn vertex_array(&self, id: VertexArrayId) -> Option<&GpuVertexArray> {
        self.vertex_arrays.get(&id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(&id)
    }

    /// Vertex and fragment modules of a linked program.
    pub fn program_modules(
        &self,
        id: ProgramId,
    ) -> Option<(&wgpu::ShaderModule, &wgpu::ShaderModule)> {
        let program = self.programs.get(&id)?;
        let vs = self.shaders.get(&program.vertex)?;
        let fs = self.shaders.get(&program.fragment)?;
        Some((&vs.module, &fs.module))
    }

    pub fn live_handles(&self) -> usize {
        self.buffers.len()
            + self.vertex_arrays.len()
            + self.textures.len()
            + self.shaders.len()
            + self.programs.len()
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Run `f` inside out-of-memory and validation error scopes.
    fn scoped<T>(&self, f: impl FnOnce(&Device) -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(ErrorFilter::OutOfMemory);
        self.device.push_error_scope(ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        (value, validation.or(out_of_memory))
    }
}

fn allocation_error(err: wgpu::Error) -> DeviceError {
    match err {
        wgpu::Error::OutOfMemory { .. } => DeviceError::Allocation("out of device memory".into()),
        other => DeviceError::Allocation(other.to_string()),
    }
}

fn vertex_format(attribute: VertexAttribute) -> VertexFormat {
    match attribute.components() {
        2 => VertexFormat::Float32x2,
        _ => VertexFormat::Float32x3,
    }
}

fn filter_mode(filter: TextureFilter) -> FilterMode {
    match filter {
        TextureFilter::Nearest => FilterMode::Nearest,
        TextureFilter::Linear => FilterMode::Linear,
    }
}

impl GraphicsDevice for WgpuDevice {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn create_buffer(
        &mut self,
        kind: BufferKind,
        label: &str,
        contents: &[u8],
    ) -> DeviceResult<BufferId> {
        let usage = match kind {
            BufferKind::Vertex => BufferUsages::VERTEX | BufferUsages::COPY_DST,
            BufferKind::Index => BufferUsages::INDEX | BufferUsages::COPY_DST,
        };
        let (buffer, error) = self.scoped(|device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
        });
        if let Some(err) = error {
            buffer.destroy();
            return Err(allocation_error(err));
        }
        let id = BufferId(self.allocate_id());
        self.buffers.insert(id, GpuBuffer { kind, buffer });
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        match self.buffers.remove(&buffer) {
            Some(gpu) => gpu.buffer.destroy(),
            None => log::warn!("wgpu device: delete of unknown {buffer}"),
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
                Some(gpu) if gpu.kind == kind => {}
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
        let attributes = layout
            .attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: vertex_format(a.attribute),
                offset: u64::from(a.offset),
                shader_location: a.location,
            })
            .collect();
        let id = VertexArrayId(self.allocate_id());
        self.vertex_arrays.insert(
            id,
            GpuVertexArray {
                vertex_buffer,
                index_buffer,
                array_stride: u64::from(layout.stride),
                attributes,
            },
        );
        Ok(id)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if self.vertex_arrays.remove(&vertex_array).is_none() {
            log::warn!("wgpu device: delete of unknown {vertex_array}");
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> DeviceResult<TextureId> {
        if desc.levels.is_empty() || desc.width == 0 || desc.height == 0 {
            return Err(DeviceError::Allocation(format!(
                "texture '{}' has no pixel data",
                desc.label
            )));
        }
        let size = Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let (texture, error) = self.scoped(|device| {
            device.create_texture(&TextureDescriptor {
                label: Some(desc.label),
                size,
                mip_level_count: desc.levels.len() as u32,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format: TEXTURE_FORMAT,
                usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
                view_formats: &[],
            })
        });
        if let Some(err) = error {
            texture.destroy();
            return Err(allocation_error(err));
        }

        for (mip_level, level) in desc.levels.iter().enumerate() {
            self.queue.write_texture(
                ImageCopyTexture {
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: Origin3d::ZERO,
                    aspect: TextureAspect::All,
                },
                &level.data,
                ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level.width),
                    rows_per_image: Some(level.height),
                },
                Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let filter = filter_mode(desc.filter);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&SamplerDescriptor {
            label: Some(desc.label),
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: filter,
            ..Default::default()
        });

        let id = TextureId(self.allocate_id());
        self.textures.insert(id, GpuTexture { texture, view, sampler });
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        match self.textures.remove(&texture) {
            Some(gpu) => gpu.texture.destroy(),
            None => log::warn!("wgpu device: delete of unknown {texture}"),
        }
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> DeviceResult<ShaderId> {
        // Front-end diagnostics carry line numbers; wgpu's own are reported
        // only if the backend still rejects the module.
        let interface = reflect::compile(stage, source)
            .map_err(|diagnostic| DeviceError::Compile(format!("{label}: {diagnostic}")))?;

        let (module, error) = self.scoped(|device| {
            device.create_shader_module(ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
            })
        });
        if let Some(err) = error {
            let info = pollster::block_on(module.get_compilation_info());
            let located: Vec<String> = info
                .messages
                .iter()
                .filter(|m| m.message_type == CompilationMessageType::Error)
                .map(|m| match &m.location {
                    Some(at) => format!("{label}: line {}: {}", at.line_number, m.message),
                    None => format!("{label}: {}", m.message),
                })
                .collect();
            return Err(DeviceError::Compile(if located.is_empty() {
                format!("{label}: {err}")
            } else {
                located.join("\n")
            }));
        }
        let id = ShaderId(self.allocate_id());
        self.shaders.insert(
            id,
            GpuShader {
                stage,
                module,
                interface,
            },
        );
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if self.shaders.remove(&shader).is_none() {
            log::warn!("wgpu device: delete of unknown {shader}");
        }
    }

    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
        attributes: &[(u32, &str)],
    ) -> DeviceResult<ProgramId> {
        let stage_of = |id: ShaderId, stage: ShaderStage| match self.shaders.get(&id) {
            Some(shader) if shader.stage == stage => Ok(shader),
            Some(shader) => Err(DeviceError::Link(format!(
                "{id} is a {} shader, expected {stage}",
                shader.stage
            ))),
            None => Err(DeviceError::UnknownHandle {
                kind: ShaderId::KIND,
                id: id.0,
            }),
        };
        let vs = stage_of(vertex, ShaderStage::Vertex)?;
        let fs = stage_of(fragment, ShaderStage::Fragment)?;
        reflect::check_attribute_bindings(&vs.interface, attributes)
            .map_err(DeviceError::Link)?;
        let resources = reflect::merge_resources(&vs.interface, &fs.interface);

        let id = ProgramId(self.allocate_id());
        self.programs.insert(
            id,
            GpuProgram {
                vertex,
                fragment,
                resources,
            },
        );
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            log::warn!("wgpu device: delete of unknown {program}");
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
