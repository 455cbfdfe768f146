//! Asset references consumed by the batching pipeline
//!
//! Shaders, materials and meshes live in an external asset layer. The pipeline
//! only needs stable identifiers for them plus two answers: which shader a
//! material uses, and which material to fall back to when an object's material
//! or shader cannot be resolved.

mod material_library;

pub use material_library::MaterialLibrary;

/// Stable identifier of a shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderRef(pub u32);

/// Stable identifier of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialRef(pub u32);

/// Stable identifier of a mesh source (a loaded model holding one or more submeshes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshSourceRef(pub u32);

/// One drawable mesh: a submesh within a mesh source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshRef {
    /// Model the submesh belongs to
    pub source: MeshSourceRef,
    /// Submesh index within the source
    pub submesh: u16,
}

impl MeshRef {
    /// Create a reference to a submesh of `source`
    pub fn new(source: MeshSourceRef, submesh: u16) -> Self {
        Self { source, submesh }
    }
    
    /// Reference to the first (or only) submesh of `source`
    pub fn whole(source: MeshSourceRef) -> Self {
        Self::new(source, 0)
    }
}

/// Resolution of material references, provided by the asset layer
pub trait AssetResolver {
    /// Shader used by `material`, or `None` if the material or its shader is unresolved
    fn shader_of(&self, material: MaterialRef) -> Option<ShaderRef>;
    
    /// Material substituted when an object's material or shader is unresolved
    fn default_material(&self) -> MaterialRef;
}
