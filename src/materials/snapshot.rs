// src/materials/snapshot.rs
//! Captured pre-hide state of a single material.

use super::{Color, MaterialId, MaterialPropertyStore, ShaderId, ALPHA_ADJUST, COLOR, SPEC_COLOR};
use crate::Result;

/// Values written while a material is hidden. `None` leaves the property alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HiddenValues {
    pub alpha_adjust: Option<f32>,
    pub color_alpha: Option<f32>,
    pub spec_color: Option<Color>,
}

impl HiddenValues {
    /// Skin: the transparent replacement shader discards at `_AlphaAdjust = -1`.
    pub const SKIN: HiddenValues = HiddenValues {
        alpha_adjust: Some(-1.0),
        color_alpha: None,
        spec_color: None,
    };

    /// Hair meshes: alpha offset plus a fully transparent tint.
    pub const HAIR_MESH: HiddenValues = HiddenValues {
        alpha_adjust: Some(-1.0),
        color_alpha: Some(0.0),
        spec_color: None,
    };

    /// Clothing also drops its specular highlight, which otherwise survives zero alpha.
    pub const CLOTHING: HiddenValues = HiddenValues {
        alpha_adjust: Some(-1.0),
        color_alpha: Some(0.0),
        spec_color: Some(Color::TRANSPARENT_BLACK),
    };
}

/// Immutable record of a material's visibility-relevant properties.
///
/// A property the material does not expose is captured as `None` and never
/// touched afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSnapshot {
    material: MaterialId,
    shader: ShaderId,
    alpha_adjust: Option<f32>,
    color: Option<Color>,
    spec_color: Option<Color>,
}

impl MaterialSnapshot {
    pub fn capture(store: &dyn MaterialPropertyStore, material: MaterialId) -> Result<Self> {
        let shader = store.shader(material)?;
        Self::capture_with_shader(store, material, shader)
    }

    /// Captures properties as they are now, but records `original_shader`
    /// as the shader to put back. Used after a shader swap.
    pub fn capture_with_shader(
        store: &dyn MaterialPropertyStore,
        material: MaterialId,
        original_shader: ShaderId,
    ) -> Result<Self> {
        let alpha_adjust = if store.has_property(material, ALPHA_ADJUST) {
            Some(store.get_float(material, ALPHA_ADJUST)?)
        } else {
            None
        };
        let color = if store.has_property(material, COLOR) {
            Some(store.get_color(material, COLOR)?)
        } else {
            None
        };
        let spec_color = if store.has_property(material, SPEC_COLOR) {
            Some(store.get_color(material, SPEC_COLOR)?)
        } else {
            None
        };

        Ok(Self {
            material,
            shader: original_shader,
            alpha_adjust,
            color,
            spec_color,
        })
    }

    #[inline]
    pub fn material(&self) -> MaterialId {
        self.material
    }

    #[inline]
    pub fn shader(&self) -> ShaderId {
        self.shader
    }

    #[inline]
    pub fn alpha_adjust(&self) -> Option<f32> {
        self.alpha_adjust
    }

    #[inline]
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    #[inline]
    pub fn spec_color(&self) -> Option<Color> {
        self.spec_color
    }

    /// True when `hidden` would change at least one property of this material.
    pub fn can_hide(&self, hidden: &HiddenValues) -> bool {
        (self.alpha_adjust.is_some() && hidden.alpha_adjust.is_some())
            || (self.color.is_some() && hidden.color_alpha.is_some())
            || (self.spec_color.is_some() && hidden.spec_color.is_some())
    }

    /// Writes the hidden values for every supported property.
    ///
    /// Keeps going after a failed write and returns the first error.
    pub fn hide(&self, store: &mut dyn MaterialPropertyStore, hidden: &HiddenValues) -> Result<()> {
        let mut first_err = None;

        if let (Some(_), Some(alpha)) = (self.alpha_adjust, hidden.alpha_adjust) {
            keep_first(&mut first_err, store.set_float(self.material, ALPHA_ADJUST, alpha));
        }
        if let (Some(color), Some(alpha)) = (self.color, hidden.color_alpha) {
            keep_first(
                &mut first_err,
                store.set_color(self.material, COLOR, color.with_alpha(alpha)),
            );
        }
        if let (Some(_), Some(spec)) = (self.spec_color, hidden.spec_color) {
            keep_first(&mut first_err, store.set_color(self.material, SPEC_COLOR, spec));
        }

        first_err.map_or(Ok(()), Err)
    }

    /// Writes back every captured property value (not the shader).
    ///
    /// Safe to call repeatedly and without a preceding [`hide`](Self::hide).
    pub fn restore(&self, store: &mut dyn MaterialPropertyStore) -> Result<()> {
        let mut first_err = None;

        if let Some(alpha) = self.alpha_adjust {
            keep_first(&mut first_err, store.set_float(self.material, ALPHA_ADJUST, alpha));
        }
        if let Some(color) = self.color {
            keep_first(&mut first_err, store.set_color(self.material, COLOR, color));
        }
        if let Some(spec) = self.spec_color {
            keep_first(&mut first_err, store.set_color(self.material, SPEC_COLOR, spec));
        }

        first_err.map_or(Ok(()), Err)
    }

    /// Puts the captured shader back.
    pub fn restore_shader(&self, store: &mut dyn MaterialPropertyStore) -> Result<()> {
        if store.shader(self.material)? != self.shader {
            store.set_shader(self.material, self.shader)?;
        }
        Ok(())
    }
}

fn keep_first(first: &mut Option<crate::Error>, result: Result<()>) {
    if let Err(e) = result {
        first.get_or_insert(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::InMemoryMaterialStore;

    fn clothing_material(store: &mut InMemoryMaterialStore) -> MaterialId {
        let m = store.add_material("Hat", "Custom/Subsurface/AlphaMaskComputeBuff");
        store.define_float(m, ALPHA_ADJUST, 0.25).unwrap();
        store.define_color(m, COLOR, Color::new(0.8, 0.1, 0.3, 0.9)).unwrap();
        store
            .define_color(m, SPEC_COLOR, Color::new(0.5, 0.5, 0.5, 1.0))
            .unwrap();
        m
    }

    #[test]
    fn test_hide_then_restore_is_bit_identical() {
        let mut store = InMemoryMaterialStore::new();
        let m = clothing_material(&mut store);
        let before = store.bits(m).unwrap();

        let snap = MaterialSnapshot::capture(&store, m).unwrap();
        snap.hide(&mut store, &HiddenValues::CLOTHING).unwrap();
        assert_eq!(store.get_float(m, ALPHA_ADJUST).unwrap(), -1.0);
        assert_eq!(store.get_color(m, COLOR).unwrap().a, 0.0);
        assert_eq!(store.get_color(m, COLOR).unwrap().r, 0.8);
        assert_eq!(store.get_color(m, SPEC_COLOR).unwrap(), Color::TRANSPARENT_BLACK);

        snap.restore(&mut store).unwrap();
        assert_eq!(store.bits(m).unwrap(), before);
    }

    #[test]
    fn test_restore_twice_is_stable() {
        let mut store = InMemoryMaterialStore::new();
        let m = clothing_material(&mut store);
        let snap = MaterialSnapshot::capture(&store, m).unwrap();

        snap.hide(&mut store, &HiddenValues::CLOTHING).unwrap();
        snap.restore(&mut store).unwrap();
        let once = store.bits(m).unwrap();
        snap.restore(&mut store).unwrap();
        assert_eq!(store.bits(m).unwrap(), once);
    }

    #[test]
    fn test_unsupported_properties_are_left_alone() {
        let mut store = InMemoryMaterialStore::new();
        let m = store.add_material("Eyelashes", "Custom/Discard");
        store.define_float(m, ALPHA_ADJUST, 0.0).unwrap();

        let snap = MaterialSnapshot::capture(&store, m).unwrap();
        assert_eq!(snap.color(), None);
        assert_eq!(snap.spec_color(), None);
        assert!(snap.can_hide(&HiddenValues::SKIN));

        snap.hide(&mut store, &HiddenValues::CLOTHING).unwrap();
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn test_failed_write_still_restores_the_rest() {
        let mut store = InMemoryMaterialStore::new();
        let m = clothing_material(&mut store);
        let snap = MaterialSnapshot::capture(&store, m).unwrap();
        snap.hide(&mut store, &HiddenValues::CLOTHING).unwrap();

        store.fail_writes(m);
        assert!(snap.restore(&mut store).is_err());
        store.clear_failures();
        snap.restore(&mut store).unwrap();
        assert_eq!(store.get_float(m, ALPHA_ADJUST).unwrap(), 0.25);
    }

    #[test]
    fn test_restore_shader_after_swap() {
        let mut store = InMemoryMaterialStore::new();
        let m = store.add_material("Face", "Custom/Subsurface/CullComputeBuff");
        let original = store.shader(m).unwrap();
        let transparent = store.add_shader("Custom/Subsurface/TransparentSeparateAlphaComputeBuff");

        store.set_shader(m, transparent).unwrap();
        let snap = MaterialSnapshot::capture_with_shader(&store, m, original).unwrap();
        snap.restore_shader(&mut store).unwrap();
        assert_eq!(store.shader(m).unwrap(), original);
    }
}
