//! WGSL front end and interface reflection.
//!
//! Sources go through naga's WGSL parser and validator, the same front end
//! wgpu runs. The reflected interface answers the questions the asset layer
//! asks: which location a named vertex input sits at, and which group/binding
//! a named resource occupies. Members of a uniform struct resolve to the
//! binding of the struct.

use std::error::Error;

use asset::ShaderStage;
use naga::{
    AddressSpace, Binding, Module, TypeInner,
    valid::{Capabilities, ValidationFlags, Validator},
};

use crate::device::UniformLocation;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderInterface {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub inputs: Vec<(String, u32)>,
    pub resources: Vec<(String, UniformLocation)>,
}

impl ShaderInterface {
    pub fn input_location(&self, name: &str) -> Option<u32> {
        self.inputs
            .iter()
            .find(|(input, _)| input == name)
            .map(|&(_, location)| location)
    }

    pub fn resource(&self, name: &str) -> Option<UniformLocation> {
        self.resources
            .iter()
            .find(|(resource, _)| resource == name)
            .map(|&(_, location)| location)
    }
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

/// Parse and validate `source`, then reflect the entry point for `stage`.
///
/// The error is the front end's diagnostic, prefixed with its 1-based line
/// when the front end reports a location.
pub fn compile(stage: ShaderStage, source: &str) -> Result<ShaderInterface, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| {
        match err.location(source) {
            Some(at) => format!("line {}: {}", at.line_number, err.message()),
            None => err.message().to_owned(),
        }
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| {
            let message = error_chain(err.as_inner());
            match err.location(source) {
                Some(at) => format!("line {}: {message}", at.line_number),
                None => message,
            }
        })?;

    reflect(&module, stage)
}

/// `err: cause: cause`, so nested validation failures keep their reason.
fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn reflect(module: &Module, stage: ShaderStage) -> Result<ShaderInterface, String> {
    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga_stage(stage))
        .ok_or_else(|| format!("no @{stage} entry point found"))?;

    let mut inputs = Vec::new();
    for argument in &entry_point.function.arguments {
        match (&argument.binding, &argument.name) {
            (Some(Binding::Location { location, .. }), Some(name)) => {
                inputs.push((name.clone(), *location));
            }
            (None, _) => {
                // Inputs gathered in a struct carry their bindings on the members.
                if let TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                    for member in members {
                        if let (Some(Binding::Location { location, .. }), Some(name)) =
                            (&member.binding, &member.name)
                        {
                            inputs.push((name.clone(), *location));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let mut resources = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let (Some(binding), Some(name)) = (&var.binding, &var.name) else {
            continue;
        };
        let location = UniformLocation {
            group: binding.group,
            binding: binding.binding,
        };
        resources.push((name.clone(), location));
        if var.space == AddressSpace::Uniform {
            if let TypeInner::Struct { members, .. } = &module.types[var.ty].inner {
                for member in members {
                    if let Some(member_name) = &member.name {
                        resources.push((member_name.clone(), location));
                    }
                }
            }
        }
    }

    Ok(ShaderInterface {
        stage,
        entry_point: entry_point.name.clone(),
        inputs,
        resources,
    })
}

/// Verify that every conventional vertex input the shader declares sits at
/// the location it is bound to. Inputs the shader doesn't declare are fine.
pub fn check_attribute_bindings(
    vertex: &ShaderInterface,
    bindings: &[(u32, &str)],
) -> Result<(), String> {
    for &(location, name) in bindings {
        match vertex.input_location(name) {
            Some(declared) if declared != location => {
                return Err(format!(
                    "attribute '{name}' is declared at location {declared} but bound to {location}"
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Resources of both stages; a name declared twice keeps its first location.
pub fn merge_resources(
    vertex: &ShaderInterface,
    fragment: &ShaderInterface,
) -> Vec<(String, UniformLocation)> {
    let mut merged = vertex.resources.clone();
    for (name, location) in &fragment.resources {
        if !merged.iter().any(|(existing, _)| existing == name) {
            merged.push((name.clone(), *location));
        }
    }
    merged
}
