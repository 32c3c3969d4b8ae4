// src/scene.rs
//! What the possessed character currently shows: skin, worn hair, worn clothing.
//!
//! The host answers these queries from its own scene graph; [`InMemoryScene`]
//! is a plain-data implementation for tests and tooling.

use crate::materials::MaterialId;

/// Head/face-region tags that make a clothing item a hiding candidate.
pub const HEAD_CLOTHING_TAGS: [&str; 6] = ["head", "face", "hat", "glasses", "mask", "ears"];

/// Tags that keep a tagged hair item in the hiding set.
pub const HEAD_HAIR_TAGS: [&str; 2] = ["head", "face"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CharacterId(pub u64);

/// Host identity of a worn item. Feeds the structural hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemId(pub u64);

/// Skin of the selected character, once its renderer is attached.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Skin {
    pub materials: Vec<MaterialId>,
}

/// A hair or clothing item on the selected character.
#[derive(Clone, Debug, PartialEq)]
pub struct WornItem {
    pub id: ItemId,
    pub name: String,
    pub active: bool,
    pub tags: Vec<String>,
    /// Rendering technology name reported by the host (e.g. `SimV2Hair`).
    pub technology: String,
    /// `None` until the item's mesh renderer is attached.
    pub materials: Option<Vec<MaterialId>>,
}

impl WornItem {
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active: true,
            tags: Vec::new(),
            technology: String::new(),
            materials: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = technology.into();
        self
    }

    pub fn with_materials(mut self, materials: Vec<MaterialId>) -> Self {
        self.materials = Some(materials);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Case-insensitive tag check.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Untagged hair is assumed to sit on the head.
    pub fn is_head_hair(&self) -> bool {
        self.tags.is_empty() || HEAD_HAIR_TAGS.iter().any(|t| self.has_tag(t))
    }

    /// Unlike hair, untagged clothing is never hidden.
    pub fn is_head_clothing(&self) -> bool {
        HEAD_CLOTHING_TAGS.iter().any(|t| self.has_tag(t))
    }
}

/// Scene-query capability supplied by the host.
pub trait SceneQuery {
    fn selected_character(&self) -> Option<CharacterId>;

    /// `None` while the skin is still loading.
    fn skin(&self) -> Option<&Skin>;

    fn hair_items(&self) -> &[WornItem];
    fn clothing_items(&self) -> &[WornItem];

    /// Shows or hides the possessor avatar's own mesh.
    fn set_possessor_visible(&mut self, visible: bool);
}

#[derive(Clone, Debug, PartialEq)]
pub struct InMemoryScene {
    pub character: Option<CharacterId>,
    pub skin: Option<Skin>,
    pub hair: Vec<WornItem>,
    pub clothing: Vec<WornItem>,
    pub possessor_visible: bool,
}

impl Default for InMemoryScene {
    fn default() -> Self {
        Self {
            character: None,
            skin: None,
            hair: Vec::new(),
            clothing: Vec::new(),
            possessor_visible: true,
        }
    }
}

impl InMemoryScene {
    pub fn new(character: CharacterId) -> Self {
        Self {
            character: Some(character),
            ..Self::default()
        }
    }

    /// Looks an item up among hair and clothing.
    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut WornItem> {
        self.hair
            .iter_mut()
            .chain(self.clothing.iter_mut())
            .find(|item| item.id == id)
    }
}

impl SceneQuery for InMemoryScene {
    fn selected_character(&self) -> Option<CharacterId> {
        self.character
    }

    fn skin(&self) -> Option<&Skin> {
        self.skin.as_ref()
    }

    fn hair_items(&self) -> &[WornItem] {
        &self.hair
    }

    fn clothing_items(&self) -> &[WornItem] {
        &self.clothing
    }

    fn set_possessor_visible(&mut self, visible: bool) {
        self.possessor_visible = visible;
    }
}
