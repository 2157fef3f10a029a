//! The tree scene's asset set.

use std::path::Path;

use asset::layout::AttributeSet;
use renderer::{
    AssetRegistry,
    mesh_asset::MeshAsset,
    shader_asset::{ShaderAsset, ShaderManifest},
    texture_asset::TextureAsset,
};

const TEXTURES: [&str; 4] = ["empty_normal", "brown", "leaf_texture", "leaf_texture_disp"];

fn shader(root: &Path, name: &str, vertex: &str, fragment: &str) -> ShaderManifest {
    ShaderManifest::new(
        name,
        root.join("shader").join(format!("{vertex}_VS.wgsl")),
        root.join("shader").join(format!("{fragment}_FS.wgsl")),
    )
}

/// Textures, the trunk and leaf meshes, and every shader variant drawn with
/// them, resolved against the asset root.
pub fn tree_scene(root: &Path) -> AssetRegistry {
    let mut registry = AssetRegistry::new();

    for name in TEXTURES {
        registry.register(TextureAsset::new(
            name,
            root.join("textures").join(format!("{name}.png")),
        ));
    }

    registry.register(MeshAsset::new(
        "tree",
        root.join("meshes/tree.obj"),
        AttributeSet::Basic,
    ));
    registry.register(MeshAsset::new(
        "leaf",
        root.join("meshes/leaf.obj"),
        AttributeSet::WithTangentFrame,
    ));

    registry.register(ShaderAsset::new(shader(root, "basic", "Leaf", "Leaf")));
    registry.register(ShaderAsset::new(shader(root, "blinn", "Blinn", "Blinn")));
    registry.register(ShaderAsset::new(
        shader(root, "leaf", "Leaf", "Leaf")
            .with_attributes(AttributeSet::WithTangentFrame)
            .with_uniform("displacement_sampler")
            .with_uniform("displacement_scalar"),
    ));
    registry.register(ShaderAsset::new(
        shader(root, "crossfade", "Blinn", "Crossfade").with_uniform("crossfade_ratio"),
    ));

    registry
}
