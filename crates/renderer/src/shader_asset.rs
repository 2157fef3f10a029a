//! Vertex/fragment program assets.

use std::{collections::HashMap, path::PathBuf};

use asset::{
    AssetResult, ShaderStage, diagnostics::DiagnosticSink, layout::AttributeSet,
    shader::ShaderSource,
};
use log::Level;

use crate::{
    device::{GraphicsDevice, ProgramId, ShaderId, UniformLocation},
    lifecycle::{Asset, AssetState},
};

/// Uniform every program variant is expected to use.
pub const MODELVIEW_PROJECTION: &str = "modelview_projection_matrix";

/// What a shader variant needs: its sources, the vertex attributes it reads
/// and the uniforms to resolve after linking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderManifest {
    pub name: String,
    pub vertex_path: PathBuf,
    pub fragment_path: PathBuf,
    pub attributes: AttributeSet,
    pub uniforms: Vec<String>,
}

impl ShaderManifest {
    pub fn new(
        name: impl Into<String>,
        vertex_path: impl Into<PathBuf>,
        fragment_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            vertex_path: vertex_path.into(),
            fragment_path: fragment_path.into(),
            attributes: AttributeSet::Basic,
            uniforms: vec![MODELVIEW_PROJECTION.to_owned()],
        }
    }

    pub fn with_attributes(mut self, attributes: AttributeSet) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_uniform(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.uniforms.contains(&name) {
            self.uniforms.push(name);
        }
        self
    }

    /// `(location, input name)` pairs bound before linking.
    pub fn attribute_bindings(&self) -> Vec<(u32, &'static str)> {
        self.attributes
            .attributes()
            .iter()
            .map(|a| (a.location(), a.shader_name()))
            .collect()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct LoadedShader {
    pub vertex: ShaderId,
    pub fragment: ShaderId,
    pub program: ProgramId,
    /// `None` marks a uniform the program doesn't declare.
    pub uniforms: HashMap<String, Option<UniformLocation>>,
}

impl LoadedShader {
    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied().flatten()
    }
}

#[derive(Debug)]
pub struct ShaderAsset {
    manifest: ShaderManifest,
    state: AssetState<LoadedShader>,
}

impl ShaderAsset {
    pub fn new(manifest: ShaderManifest) -> Self {
        Self {
            manifest,
            state: AssetState::Unloaded,
        }
    }

    pub fn manifest(&self) -> &ShaderManifest {
        &self.manifest
    }

    pub fn gpu(&self) -> Option<&LoadedShader> {
        self.state.loaded()
    }
}

/// Compile, link and resolve uniforms. Anything created before a failing
/// step is deleted again.
fn build_program(
    device: &mut dyn GraphicsDevice,
    manifest: &ShaderManifest,
    sink: &mut dyn DiagnosticSink,
) -> AssetResult<LoadedShader> {
    let source = ShaderSource::read(&manifest.vertex_path, &manifest.fragment_path)?;
    let label = |stage| match stage {
        ShaderStage::Vertex => format!("{}_VS", manifest.name),
        ShaderStage::Fragment => format!("{}_FS", manifest.name),
    };

    let vertex = device
        .compile_shader(ShaderStage::Vertex, &label(ShaderStage::Vertex), &source.vertex)
        .map_err(|e| e.into_asset_error(ShaderStage::Vertex))?;
    let fragment = match device.compile_shader(
        ShaderStage::Fragment,
        &label(ShaderStage::Fragment),
        &source.fragment,
    ) {
        Ok(fragment) => fragment,
        Err(e) => {
            device.delete_shader(vertex);
            return Err(e.into_asset_error(ShaderStage::Fragment));
        }
    };
    let program = match device.link_program(vertex, fragment, &manifest.attribute_bindings()) {
        Ok(program) => program,
        Err(e) => {
            device.delete_shader(fragment);
            device.delete_shader(vertex);
            return Err(e.into());
        }
    };

    let uniforms = manifest
        .uniforms
        .iter()
        .map(|name| {
            let location = device.uniform_location(program, name);
            if location.is_none() {
                sink.report(
                    Level::Debug,
                    &format!("shader '{}' has no uniform '{}'", manifest.name, name),
                );
            }
            (name.clone(), location)
        })
        .collect();

    Ok(LoadedShader {
        vertex,
        fragment,
        program,
        uniforms,
    })
}

impl Asset for ShaderAsset {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    fn load_reporting(
        &mut self,
        device: &mut dyn GraphicsDevice,
        sink: &mut dyn DiagnosticSink,
    ) -> AssetResult<()> {
        let manifest = &self.manifest;
        if self.state.load_with(|| build_program(device, manifest, sink))? {
            log::info!(
                "Linked shader '{}' ({} + {})",
                manifest.name,
                manifest.vertex_path.display(),
                manifest.fragment_path.display()
            );
        }
        Ok(())
    }

    fn unload(&mut self, device: &mut dyn GraphicsDevice) {
        let released = self.state.unload_with(|loaded| {
            device.delete_program(loaded.program);
            device.delete_shader(loaded.vertex);
            device.delete_shader(loaded.fragment);
        });
        if released {
            log::info!("Unloaded shader '{}'", self.manifest.name);
        }
    }
}
