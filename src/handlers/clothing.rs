// src/handlers/clothing.rs
//! Head-region clothing: per-mesh alpha, tint alpha and specular.

use super::{Handler, MeshMaterials, Readiness};
use crate::materials::{HiddenValues, MaterialId, MaterialPropertyStore};
use crate::scene::WornItem;
use crate::Result;

/// Head-region clothing (hats, glasses, masks), hidden per mesh material.
#[derive(Debug, Clone)]
pub struct ClothingHandler {
    label: String,
    materials: Option<Vec<MaterialId>>,
    meshes: MeshMaterials,
}

impl ClothingHandler {
    pub fn new(item: &WornItem) -> Self {
        Self {
            label: format!("clothing `{}`", item.name),
            materials: item.materials.clone(),
            meshes: MeshMaterials::default(),
        }
    }
}

impl Handler for ClothingHandler {
    fn name(&self) -> &str {
        &self.label
    }

    fn prepare(&mut self, store: &mut dyn MaterialPropertyStore) -> Result<Readiness> {
        let Some(materials) = self.materials.as_deref() else {
            return Ok(Readiness::not_ready(format!("{} is not yet loaded", self.label)));
        };
        self.meshes.capture(&*store, materials, &HiddenValues::CLOTHING)?;
        if self.meshes.is_empty() {
            return Ok(Readiness::not_ready(format!("{} has no material to hide", self.label)));
        }
        Ok(Readiness::Ready)
    }

    fn before_render(&self, store: &mut dyn MaterialPropertyStore) -> Result<()> {
        self.meshes.hide(store, &HiddenValues::CLOTHING)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{Color, InMemoryMaterialStore, ALPHA_ADJUST, COLOR, SPEC_COLOR};
    use crate::scene::ItemId;

    fn hat(store: &mut InMemoryMaterialStore) -> (WornItem, MaterialId, MaterialId) {
        let brim = store.add_material("Brim", "Custom/Subsurface/AlphaMaskComputeBuff");
        store.define_float(brim, ALPHA_ADJUST, 0.1).unwrap();
        store.define_color(brim, COLOR, Color::new(1.0, 1.0, 1.0, 1.0)).unwrap();
        store.define_color(brim, SPEC_COLOR, Color::new(0.3, 0.3, 0.3, 1.0)).unwrap();
        // a decal material without any hideable property
        let decal = store.add_material("Decal", "Unlit/Texture");
        let item = WornItem::new(ItemId(5), "Fedora")
            .with_tags(["hat"])
            .with_materials(vec![brim, decal]);
        (item, brim, decal)
    }

    #[test]
    fn test_captures_only_hideable_materials() {
        let mut store = InMemoryMaterialStore::new();
        let (item, _, _) = hat(&mut store);
        let mut handler = ClothingHandler::new(&item);
        assert!(handler.prepare(&mut store).unwrap().is_ready());
        assert_eq!(handler.managed_count(), 1);
    }

    #[test]
    fn test_round_trip_restores_every_property() {
        let mut store = InMemoryMaterialStore::new();
        let (item, brim, _) = hat(&mut store);
        let before = store.all_bits();

        let mut handler = ClothingHandler::new(&item);
        handler.prepare(&mut store).unwrap();
        handler.before_render(&mut store).unwrap();
        assert_eq!(store.get_color(brim, SPEC_COLOR).unwrap(), Color::TRANSPARENT_BLACK);
        assert_eq!(store.get_float(brim, ALPHA_ADJUST).unwrap(), -1.0);

        handler.after_render(&mut store).unwrap();
        assert_eq!(store.all_bits(), before);
    }

    #[test]
    fn test_unloaded_clothing_is_not_ready() {
        let mut store = InMemoryMaterialStore::new();
        let item = WornItem::new(ItemId(5), "Fedora").with_tags(["hat"]);
        let mut handler = ClothingHandler::new(&item);
        assert_eq!(
            handler.prepare(&mut store).unwrap(),
            Readiness::not_ready("clothing `Fedora` is not yet loaded")
        );
    }
}
