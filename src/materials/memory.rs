// src/materials/memory.rs
//! Pure in-memory [`MaterialPropertyStore`].
//!
//! Used by the test-suite and by hosts that want to dry-run a handler set
//! without a rendering context. Properties do not depend on the assigned
//! shader: swapping shaders keeps every float and color as-is, which matches
//! how the host keeps same-named properties across a shader change.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::{Color, MaterialId, MaterialPropertyStore, ShaderId};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct MaterialEntry {
    name: String,
    shader: ShaderId,
    floats: HashMap<String, f32>,
    colors: HashMap<String, Color>,
}

/// Bit-exact view of one material, for comparing store states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialBits {
    pub shader: ShaderId,
    pub floats: BTreeMap<String, u32>,
    pub colors: BTreeMap<String, [u32; 4]>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryMaterialStore {
    materials: HashMap<MaterialId, MaterialEntry>,
    shaders: Vec<String>,
    next_material: u64,
    writes: u64,
    failing: HashSet<MaterialId>,
}

impl InMemoryMaterialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shader name, returning the existing id when already known.
    pub fn add_shader(&mut self, name: &str) -> ShaderId {
        if let Some(id) = self.find_shader(name) {
            return id;
        }
        self.shaders.push(name.to_owned());
        ShaderId(self.shaders.len() as u64 - 1)
    }

    pub fn add_material(&mut self, name: &str, shader: &str) -> MaterialId {
        let shader = self.add_shader(shader);
        let id = MaterialId(self.next_material);
        self.next_material += 1;
        self.materials.insert(
            id,
            MaterialEntry {
                name: name.to_owned(),
                shader,
                floats: HashMap::new(),
                colors: HashMap::new(),
            },
        );
        id
    }

    /// Declares a float property with its initial value.
    pub fn define_float(&mut self, material: MaterialId, property: &str, value: f32) -> Result<()> {
        self.entry_mut(material)?
            .floats
            .insert(property.to_owned(), value);
        Ok(())
    }

    /// Declares a color property with its initial value.
    pub fn define_color(&mut self, material: MaterialId, property: &str, value: Color) -> Result<()> {
        self.entry_mut(material)?
            .colors
            .insert(property.to_owned(), value);
        Ok(())
    }

    /// Simulates the host destroying a material.
    pub fn remove_material(&mut self, material: MaterialId) -> bool {
        self.materials.remove(&material).is_some()
    }

    /// Makes every subsequent write to `material` fail.
    pub fn fail_writes(&mut self, material: MaterialId) {
        self.failing.insert(material);
    }

    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    /// Number of successful property or shader writes so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn bits(&self, material: MaterialId) -> Option<MaterialBits> {
        self.materials.get(&material).map(|entry| MaterialBits {
            shader: entry.shader,
            floats: entry
                .floats
                .iter()
                .map(|(k, v)| (k.clone(), v.to_bits()))
                .collect(),
            colors: entry
                .colors
                .iter()
                .map(|(k, v)| (k.clone(), v.to_bits()))
                .collect(),
        })
    }

    /// Bit-exact view of every material in the store.
    pub fn all_bits(&self) -> BTreeMap<MaterialId, MaterialBits> {
        self.materials
            .keys()
            .filter_map(|id| self.bits(*id).map(|bits| (*id, bits)))
            .collect()
    }

    fn entry(&self, material: MaterialId) -> Result<&MaterialEntry> {
        self.materials
            .get(&material)
            .ok_or(Error::MissingMaterial(material))
    }

    fn entry_mut(&mut self, material: MaterialId) -> Result<&mut MaterialEntry> {
        self.materials
            .get_mut(&material)
            .ok_or(Error::MissingMaterial(material))
    }

    fn writable(&mut self, material: MaterialId) -> Result<&mut MaterialEntry> {
        if self.failing.contains(&material) {
            return Err(Error::format(format_args!(
                "write to material {material:?} rejected"
            )));
        }
        self.entry_mut(material)
    }
}

impl MaterialPropertyStore for InMemoryMaterialStore {
    fn material_name(&self, material: MaterialId) -> Result<&str> {
        Ok(self.entry(material)?.name.as_str())
    }

    fn has_property(&self, material: MaterialId, property: &str) -> bool {
        self.materials.get(&material).map_or(false, |entry| {
            entry.floats.contains_key(property) || entry.colors.contains_key(property)
        })
    }

    fn get_float(&self, material: MaterialId, property: &str) -> Result<f32> {
        self.entry(material)?
            .floats
            .get(property)
            .copied()
            .ok_or_else(|| Error::missing_property(material, property))
    }

    fn set_float(&mut self, material: MaterialId, property: &str, value: f32) -> Result<()> {
        let slot = self
            .writable(material)?
            .floats
            .get_mut(property)
            .ok_or_else(|| Error::missing_property(material, property))?;
        *slot = value;
        self.writes += 1;
        Ok(())
    }

    fn get_color(&self, material: MaterialId, property: &str) -> Result<Color> {
        self.entry(material)?
            .colors
            .get(property)
            .copied()
            .ok_or_else(|| Error::missing_property(material, property))
    }

    fn set_color(&mut self, material: MaterialId, property: &str, value: Color) -> Result<()> {
        let slot = self
            .writable(material)?
            .colors
            .get_mut(property)
            .ok_or_else(|| Error::missing_property(material, property))?;
        *slot = value;
        self.writes += 1;
        Ok(())
    }

    fn shader(&self, material: MaterialId) -> Result<ShaderId> {
        Ok(self.entry(material)?.shader)
    }

    fn set_shader(&mut self, material: MaterialId, shader: ShaderId) -> Result<()> {
        if shader.0 as usize >= self.shaders.len() {
            return Err(Error::MissingShader(format!("#{}", shader.0)));
        }
        self.writable(material)?.shader = shader;
        self.writes += 1;
        Ok(())
    }

    fn shader_name(&self, shader: ShaderId) -> Result<&str> {
        self.shaders
            .get(shader.0 as usize)
            .map(String::as_str)
            .ok_or_else(|| Error::MissingShader(format!("#{}", shader.0)))
    }

    fn find_shader(&self, name: &str) -> Option<ShaderId> {
        self.shaders
            .iter()
            .position(|s| s == name)
            .map(|i| ShaderId(i as u64))
    }
}
