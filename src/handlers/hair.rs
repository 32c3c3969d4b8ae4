// src/handlers/hair.rs
//! Hair: strand-rendered hair shares one material and is hidden by zeroing
//! its strand width; everything else goes through per-mesh alpha.

use super::{Handler, MeshMaterials, Readiness};
use crate::materials::{HiddenValues, MaterialId, MaterialPropertyStore, STRAND_WIDTH};
use crate::scene::WornItem;
use crate::{Error, Result};

/// Hair technologies rendered as GPU strands from a single shared material.
pub const STRAND_TECHNOLOGIES: [&str; 3] = ["SimV2Hair", "HairSimControl", "GpuHairStrands"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HairStrategy {
    /// Shared material, `_StandWidth` forced to zero.
    StrandWidth,
    /// Per-mesh `_AlphaAdjust` and tint alpha.
    MeshAlpha,
}

impl HairStrategy {
    pub fn classify(technology: &str) -> Self {
        if STRAND_TECHNOLOGIES.iter().any(|t| technology.contains(t)) {
            HairStrategy::StrandWidth
        } else {
            HairStrategy::MeshAlpha
        }
    }
}

/// Picks the handler variant for a hair item.
pub fn hair_handler(item: &WornItem) -> Box<dyn Handler> {
    match HairStrategy::classify(&item.technology) {
        HairStrategy::StrandWidth => Box::new(SimHairHandler::new(item)),
        HairStrategy::MeshAlpha => Box::new(HairMaterialHandler::new(item)),
    }
}

// ---------- Strand width ----------

#[derive(Debug, Clone)]
pub struct SimHairHandler {
    label: String,
    material: Option<MaterialId>,
    original_width: Option<f32>,
}

impl SimHairHandler {
    pub fn new(item: &WornItem) -> Self {
        Self {
            label: format!("hair `{}`", item.name),
            material: item.materials.as_ref().and_then(|m| m.first().copied()),
            original_width: None,
        }
    }
}

impl Handler for SimHairHandler {
    fn name(&self) -> &str {
        &self.label
    }

    fn prepare(&mut self, store: &mut dyn MaterialPropertyStore) -> Result<Readiness> {
        self.original_width = None;
        let Some(material) = self.material else {
            return Ok(Readiness::not_ready(format!("{} is not yet loaded", self.label)));
        };
        if !store.has_property(material, STRAND_WIDTH) {
            return Err(Error::missing_property(material, STRAND_WIDTH));
        }
        self.original_width = Some(store.get_float(material, STRAND_WIDTH)?);
        Ok(Readiness::Ready)
    }

    fn before_render(&self, store: &mut dyn MaterialPropertyStore) -> Result<()> {
        match (self.material, self.original_width) {
            (Some(material), Some(_)) => store.set_float(material, STRAND_WIDTH, 0.0),
            _ => Ok(()),
        }
    }

    fn after_render(&self, store: &mut dyn MaterialPropertyStore) -> Result<()> {
        match (self.material, self.original_width) {
            (Some(material), Some(width)) => store.set_float(material, STRAND_WIDTH, width),
            _ => Ok(()),
        }
    }

    fn dispose(&mut self, _store: &mut dyn MaterialPropertyStore) -> Result<()> {
        self.original_width = None;
        Ok(())
    }

    fn managed_count(&self) -> usize {
        usize::from(self.original_width.is_some())
    }
}

// ---------- Mesh alpha ----------

#[derive(Debug, Clone)]
pub struct HairMaterialHandler {
    label: String,
    materials: Option<Vec<MaterialId>>,
    meshes: MeshMaterials,
}

impl HairMaterialHandler {
    pub fn new(item: &WornItem) -> Self {
        Self {
            label: format!("hair `{}`", item.name),
            materials: item.materials.clone(),
            meshes: MeshMaterials::default(),
        }
    }
}

impl Handler for HairMaterialHandler {
    fn name(&self) -> &str {
        &self.label
    }

    fn prepare(&mut self, store: &mut dyn MaterialPropertyStore) -> Result<Readiness> {
        let Some(materials) = self.materials.as_deref() else {
            return Ok(Readiness::not_ready(format!("{} is not yet loaded", self.label)));
        };
        self.meshes.capture(&*store, materials, &HiddenValues::HAIR_MESH)?;
        if self.meshes.is_empty() {
            return Ok(Readiness::not_ready(format!("{} has no material to hide", self.label)));
        }
        Ok(Readiness::Ready)
    }

    fn before_render(&self, store: &mut dyn MaterialPropertyStore) -> Result<()> {
        self.meshes.hide(store, &HiddenValues::HAIR_MESH)
    }

    fn after_render(&self, store: &mut dyn MaterialPropertyStore) -> Result<()> {
        self.meshes.restore(store)
    }

    fn dispose(&mut self, _store: &mut dyn MaterialPropertyStore) -> Result<()> {
        self.meshes.clear();
        Ok(())
    }

    fn managed_count(&self) -> usize {
        self.meshes.len()
    }
}
