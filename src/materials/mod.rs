// src/materials/mod.rs
//! Material access for the hiding handlers.
//!
//! Materials are owned by the host renderer. Handlers only ever hold a
//! [`MaterialId`] and read or write shader properties through an injected
//! [`MaterialPropertyStore`], which keeps every handler testable against
//! [`memory::InMemoryMaterialStore`].

pub mod memory;
pub mod snapshot;

pub use memory::InMemoryMaterialStore;
pub use snapshot::{HiddenValues, MaterialSnapshot};

use crate::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// Section 1: Shader property keys
// ═══════════════════════════════════════════════════════════════════════════════

/// Alpha offset understood by the skin and clothing shaders; `-1.0` discards.
pub const ALPHA_ADJUST: &str = "_AlphaAdjust";

/// Main tint color; its alpha channel drives transparency.
pub const COLOR: &str = "_Color";

/// Specular tint.
pub const SPEC_COLOR: &str = "_SpecColor";

/// Strand width of simulated hair. The key is spelled this way by the hair shader.
pub const STRAND_WIDTH: &str = "_StandWidth";

// ═══════════════════════════════════════════════════════════════════════════════
// Section 2: Handle types
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u64);

/// Linear RGBA color as exposed by the host's material API.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT_BLACK: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Exact bit pattern, for comparisons that must not treat `-0.0 == 0.0`.
    #[inline]
    pub fn to_bits(self) -> [u32; 4] {
        [self.r.to_bits(), self.g.to_bits(), self.b.to_bits(), self.a.to_bits()]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Section 3: Store capability
// ═══════════════════════════════════════════════════════════════════════════════

/// Read/write access to host materials and shaders.
///
/// Getters and setters fail with [`crate::Error::MissingMaterial`] or
/// [`crate::Error::MissingProperty`]; use [`has_property`](Self::has_property)
/// first when a property is optional.
pub trait MaterialPropertyStore {
    fn material_name(&self, material: MaterialId) -> Result<&str>;

    fn has_property(&self, material: MaterialId, property: &str) -> bool;

    fn get_float(&self, material: MaterialId, property: &str) -> Result<f32>;
    fn set_float(&mut self, material: MaterialId, property: &str, value: f32) -> Result<()>;

    fn get_color(&self, material: MaterialId, property: &str) -> Result<Color>;
    fn set_color(&mut self, material: MaterialId, property: &str, value: Color) -> Result<()>;

    fn shader(&self, material: MaterialId) -> Result<ShaderId>;
    fn set_shader(&mut self, material: MaterialId, shader: ShaderId) -> Result<()>;

    fn shader_name(&self, shader: ShaderId) -> Result<&str>;
    fn find_shader(&self, name: &str) -> Option<ShaderId>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Section 4: Transparent shader replacements
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque skin shaders and the alpha-capable shader that replaces each of them.
/// Shaders that already honour `_AlphaAdjust` map to themselves.
pub const TRANSPARENT_SHADER_REPLACEMENTS: [(&str, &str); 9] = [
    (
        "Custom/Subsurface/GlossCullComputeBuff",
        "Custom/Subsurface/TransparentGlossSeparateAlphaComputeBuff",
    ),
    (
        "Custom/Subsurface/GlossNMCullComputeBuff",
        "Custom/Subsurface/TransparentGlossNMSeparateAlphaComputeBuff",
    ),
    (
        "Custom/Subsurface/GlossNMDetailCullComputeBuff",
        "Custom/Subsurface/TransparentGlossNMDetailNoCullSeparateAlphaComputeBuff",
    ),
    (
        "Custom/Subsurface/CullComputeBuff",
        "Custom/Subsurface/TransparentSeparateAlphaComputeBuff",
    ),
    (
        "Custom/Subsurface/GlossNMTessMappedFixedComputeBuff",
        "Custom/Subsurface/TransparentGlossNMSeparateAlphaComputeBuff",
    ),
    (
        "Custom/Subsurface/AlphaMaskComputeBuff",
        "Custom/Subsurface/AlphaMaskComputeBuff",
    ),
    (
        "Custom/Subsurface/TransparentGlossNMNoCullSeparateAlphaComputeBuff",
        "Custom/Subsurface/TransparentGlossNMNoCullSeparateAlphaComputeBuff",
    ),
    (
        "Custom/Subsurface/TransparentSeparateAlphaComputeBuff",
        "Custom/Subsurface/TransparentSeparateAlphaComputeBuff",
    ),
    ("Custom/Discard", "Custom/Discard"),
];

/// Name of the alpha-capable replacement for `shader`, if one is known.
pub fn transparent_replacement(shader: &str) -> Option<&'static str> {
    TRANSPARENT_SHADER_REPLACEMENTS
        .iter()
        .find(|(opaque, _)| *opaque == shader)
        .map(|(_, transparent)| *transparent)
}
