//! In-memory material registry implementing [`AssetResolver`]

use std::collections::HashMap;

use super::{AssetResolver, MaterialRef, ShaderRef};

/// Registry entry for one material
#[derive(Debug, Clone)]
struct MaterialEntry {
    name: String,
    shader: Option<ShaderRef>,
}

/// Central registry of shaders and materials
///
/// Id 0 of each kind is reserved for the built-in default shader and default
/// material, which every library starts with.
pub struct MaterialLibrary {
    /// Registered shader names by id
    shaders: HashMap<ShaderRef, String>,
    /// Registered materials by id
    materials: HashMap<MaterialRef, MaterialEntry>,
    /// Material used as fallback
    default_material: MaterialRef,
    next_shader_id: u32,
    next_material_id: u32,
}

impl MaterialLibrary {
    /// Built-in default shader
    pub const DEFAULT_SHADER: ShaderRef = ShaderRef(0);
    /// Built-in default material, drawn with [`Self::DEFAULT_SHADER`]
    pub const DEFAULT_MATERIAL: MaterialRef = MaterialRef(0);
    
    /// Create a library containing only the defaults
    pub fn new() -> Self {
        let mut shaders = HashMap::new();
        shaders.insert(Self::DEFAULT_SHADER, "default".to_string());
        
        let mut materials = HashMap::new();
        materials.insert(
            Self::DEFAULT_MATERIAL,
            MaterialEntry { name: "default".to_string(), shader: Some(Self::DEFAULT_SHADER) },
        );
        
        Self {
            shaders,
            materials,
            default_material: Self::DEFAULT_MATERIAL,
            next_shader_id: 1,
            next_material_id: 1,
        }
    }
    
    /// Register a shader and return its id
    pub fn register_shader(&mut self, name: impl Into<String>) -> ShaderRef {
        let id = ShaderRef(self.next_shader_id);
        self.next_shader_id += 1;
        
        let name = name.into();
        log::debug!("Registered shader {:?} '{}'", id, name);
        self.shaders.insert(id, name);
        id
    }
    
    /// Register a material drawn with `shader`
    ///
    /// `shader` may be `None` (or an unregistered id) for materials whose
    /// shader failed to load; such materials resolve to the default at batch time.
    pub fn register_material(&mut self, name: impl Into<String>, shader: Option<ShaderRef>) -> MaterialRef {
        let id = MaterialRef(self.next_material_id);
        self.next_material_id += 1;
        
        let name = name.into();
        log::debug!("Registered material {:?} '{}' using {:?}", id, name, shader);
        self.materials.insert(id, MaterialEntry { name, shader });
        id
    }
    
    /// Replace the fallback material
    pub fn set_default_material(&mut self, material: MaterialRef) {
        self.default_material = material;
    }
    
    /// Name a material was registered under
    pub fn material_name(&self, material: MaterialRef) -> Option<&str> {
        self.materials.get(&material).map(|entry| entry.name.as_str())
    }
    
    /// Name a shader was registered under
    pub fn shader_name(&self, shader: ShaderRef) -> Option<&str> {
        self.shaders.get(&shader).map(String::as_str)
    }
    
    /// Number of registered materials, defaults included
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

impl Default for MaterialLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetResolver for MaterialLibrary {
    fn shader_of(&self, material: MaterialRef) -> Option<ShaderRef> {
        let shader = self.materials.get(&material)?.shader?;
        self.shaders.contains_key(&shader).then_some(shader)
    }
    
    fn default_material(&self) -> MaterialRef {
        self.default_material
    }
}
