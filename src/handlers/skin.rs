// src/handlers/skin.rs
//! Face skin: swaps head materials onto alpha-capable shaders, then hides them
//! through `_AlphaAdjust`.

use super::{Handler, Readiness};
use crate::error::Context;
use crate::materials::{
    transparent_replacement, HiddenValues, MaterialId, MaterialPropertyStore, MaterialSnapshot,
    ShaderId, ALPHA_ADJUST,
};
use crate::scene::Skin;
use crate::{Error, Result};

/// Skin materials considered part of the head. Matched by name prefix, so
/// body materials (torso, limbs, genitals) are never touched.
pub const HEAD_MATERIAL_PREFIXES: [&str; 17] = [
    "defaultMat",
    "Cornea",
    "Ears",
    "Eyelashes",
    "Eyes",
    "Face",
    "Gums",
    "Head",
    "InnerMouth",
    "Irises",
    "Lacrimals",
    "Lips",
    "Pupils",
    "Sclera",
    "Tear",
    "Teeth",
    "Tongue",
];

pub fn is_head_material(name: &str) -> bool {
    HEAD_MATERIAL_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

#[derive(Debug, Clone, Default)]
pub struct SkinHandler {
    materials: Option<Vec<MaterialId>>,
    snapshots: Vec<MaterialSnapshot>,
}

impl SkinHandler {
    /// `skin` is `None` while the character's skin is still loading.
    pub fn new(skin: Option<&Skin>) -> Self {
        Self {
            materials: skin.map(|s| s.materials.clone()),
            snapshots: Vec::new(),
        }
    }

    pub fn snapshots(&self) -> &[MaterialSnapshot] {
        &self.snapshots
    }

    fn replacement_for(store: &dyn MaterialPropertyStore, original: ShaderId) -> Result<ShaderId> {
        let name = store.shader_name(original)?;
        let target =
            transparent_replacement(name).ok_or_else(|| Error::UnsupportedShader(name.to_owned()))?;
        store
            .find_shader(target)
            .ok_or_else(|| Error::MissingShader(target.to_owned()))
    }

    fn swap_and_capture(&mut self, store: &mut dyn MaterialPropertyStore, material: MaterialId) -> Result<()> {
        let original = store.shader(material)?;
        let replacement = Self::replacement_for(&*store, original)?;
        if replacement != original {
            store.set_shader(material, replacement)?;
        }

        let captured = MaterialSnapshot::capture_with_shader(&*store, material, original).and_then(|s| {
            if s.alpha_adjust().is_some() {
                Ok(s)
            } else {
                Err(Error::missing_property(material, ALPHA_ADJUST))
            }
        });

        match captured {
            Ok(snapshot) => {
                self.snapshots.push(snapshot);
                Ok(())
            }
            Err(e) => {
                // Not tracked by a snapshot yet, so dispose would miss it.
                if replacement != original {
                    if let Err(restore) = store.set_shader(material, original) {
                        log::warn!("could not put back shader of {material:?}: {restore}");
                    }
                }
                Err(e)
            }
        }
    }
}

impl Handler for SkinHandler {
    fn name(&self) -> &str {
        "skin"
    }

    fn prepare(&mut self, store: &mut dyn MaterialPropertyStore) -> Result<Readiness> {
        self.dispose(store)?;

        let Some(materials) = self.materials.clone() else {
            return Ok(Readiness::not_ready("skin is not yet loaded"));
        };

        for material in materials {
            if !is_head_material(store.material_name(material)?) {
                continue;
            }
            self.swap_and_capture(store, material)
                .with_context(|| format!("preparing skin material {material:?}"))?;
        }

        if self.snapshots.is_empty() {
            return Ok(Readiness::not_ready("skin has no head materials loaded"));
        }
        Ok(Readiness::Ready)
    }

    fn before_render(&self, store: &mut dyn MaterialPropertyStore) -> Result<()> {
        let mut first_err = None;
        for snapshot in &self.snapshots {
            if let Err(e) = snapshot.hide(store, &HiddenValues::SKIN) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn after_render(&self, store: &mut dyn MaterialPropertyStore) -> Result<()> {
        let mut first_err = None;
        for snapshot in &self.snapshots {
            if let Err(e) = snapshot.restore(store) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn dispose(&mut self, store: &mut dyn MaterialPropertyStore) -> Result<()> {
        let mut first_err = None;
        for snapshot in self.snapshots.drain(..) {
            if let Err(e) = snapshot.restore_shader(store) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn managed_count(&self) -> usize {
        self.snapshots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::InMemoryMaterialStore;

    const OPAQUE: &str = "Custom/Subsurface/GlossNMCullComputeBuff";
    const TRANSPARENT: &str = "Custom/Subsurface/TransparentGlossNMSeparateAlphaComputeBuff";

    fn skin_store(names: &[&str]) -> (InMemoryMaterialStore, Skin) {
        let mut store = InMemoryMaterialStore::new();
        store.add_shader(TRANSPARENT);
        let materials = names
            .iter()
            .map(|name| {
                let m = store.add_material(name, OPAQUE);
                store.define_float(m, ALPHA_ADJUST, 0.0).unwrap();
                m
            })
            .collect();
        (store, Skin { materials })
    }

    #[test]
    fn test_sixteen_of_seventeen_head_materials() {
        let mut names: Vec<&str> = HEAD_MATERIAL_PREFIXES
            .iter()
            .copied()
            .filter(|n| *n != "Tear")
            .collect();
        names.extend(["Torso", "Arms", "Legs"]);
        let (mut store, skin) = skin_store(&names);

        let mut handler = SkinHandler::new(Some(&skin));
        assert_eq!(handler.prepare(&mut store).unwrap(), Readiness::Ready);
        assert_eq!(handler.snapshots().len(), 16);
        assert_eq!(handler.managed_count(), 16);
    }

    #[test]
    fn test_prepare_swaps_and_dispose_restores_shaders() {
        let (mut store, skin) = skin_store(&["Face", "Torso"]);
        let opaque = store.find_shader(OPAQUE).unwrap();
        let transparent = store.find_shader(TRANSPARENT).unwrap();
        let (face, torso) = (skin.materials[0], skin.materials[1]);

        let mut handler = SkinHandler::new(Some(&skin));
        handler.prepare(&mut store).unwrap();
        assert_eq!(store.shader(face).unwrap(), transparent);
        assert_eq!(store.shader(torso).unwrap(), opaque);

        handler.dispose(&mut store).unwrap();
        assert_eq!(store.shader(face).unwrap(), opaque);
        assert_eq!(handler.managed_count(), 0);
    }

    #[test]
    fn test_hide_and_restore_alpha() {
        let (mut store, skin) = skin_store(&["Lips"]);
        let lips = skin.materials[0];
        let mut handler = SkinHandler::new(Some(&skin));
        handler.prepare(&mut store).unwrap();

        handler.before_render(&mut store).unwrap();
        assert_eq!(store.get_float(lips, ALPHA_ADJUST).unwrap(), -1.0);
        handler.after_render(&mut store).unwrap();
        assert_eq!(store.get_float(lips, ALPHA_ADJUST).unwrap(), 0.0);
    }

    #[test]
    fn test_unloaded_skin_is_not_ready() {
        let mut store = InMemoryMaterialStore::new();
        let mut handler = SkinHandler::new(None);
        assert_eq!(
            handler.prepare(&mut store).unwrap(),
            Readiness::not_ready("skin is not yet loaded")
        );
    }

    #[test]
    fn test_no_head_materials_is_not_ready() {
        let (mut store, skin) = skin_store(&["Torso"]);
        let mut handler = SkinHandler::new(Some(&skin));
        assert!(!handler.prepare(&mut store).unwrap().is_ready());
    }

    #[test]
    fn test_unknown_shader_fails_and_leaves_nothing_swapped() {
        let (mut store, mut skin) = skin_store(&["Face"]);
        let odd = store.add_material("Head", "Standard");
        store.define_float(odd, ALPHA_ADJUST, 0.0).unwrap();
        skin.materials.push(odd);
        let opaque = store.find_shader(OPAQUE).unwrap();

        let mut handler = SkinHandler::new(Some(&skin));
        let err = handler.prepare(&mut store).unwrap_err();
        assert!(err.is_shader());

        handler.dispose(&mut store).unwrap();
        assert_eq!(store.shader(skin.materials[0]).unwrap(), opaque);
    }

    #[test]
    fn test_missing_alpha_property_reverts_swap() {
        let mut store = InMemoryMaterialStore::new();
        store.add_shader(TRANSPARENT);
        let face = store.add_material("Face", OPAQUE);
        let opaque = store.find_shader(OPAQUE).unwrap();
        let skin = Skin { materials: vec![face] };

        let mut handler = SkinHandler::new(Some(&skin));
        assert!(handler.prepare(&mut store).unwrap_err().is_missing_property());
        assert_eq!(store.shader(face).unwrap(), opaque);
    }
}
