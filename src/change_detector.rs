// src/change_detector.rs
//! Cheap detection of "what is worn changed".
//!
//! Each active item contributes `xxh3(identity)`; contributions are XOR-folded,
//! so the hash is order independent and O(n) without tracking add/remove
//! events. A collision only delays a rebuild until the next composition change.

use xxhash_rust::xxh3::xxh3_64;

use crate::scene::{CharacterId, ItemId, SceneQuery, WornItem};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StructuralHash(u64);

impl StructuralHash {
    pub const EMPTY: StructuralHash = StructuralHash(0);

    /// Hash over the items whose `active` flag is set.
    pub fn of<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a WornItem>,
    {
        StructuralHash(
            items
                .into_iter()
                .filter(|item| item.active)
                .fold(0, |acc, item| acc ^ identity_hash(item.id)),
        )
    }

    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

#[inline]
fn identity_hash(id: ItemId) -> u64 {
    xxh3_64(&id.0.to_le_bytes())
}

/// Character plus worn-set hashes at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentFingerprint {
    pub character: Option<CharacterId>,
    pub hair: StructuralHash,
    pub clothing: StructuralHash,
}

impl ContentFingerprint {
    pub fn capture(scene: &dyn SceneQuery) -> Self {
        Self {
            character: scene.selected_character(),
            hair: StructuralHash::of(scene.hair_items()),
            clothing: StructuralHash::of(scene.clothing_items()),
        }
    }
}

/// Remembers the fingerprint the current handler set was built from.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChangeDetector {
    recorded: Option<ContentFingerprint>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, fingerprint: ContentFingerprint) {
        self.recorded = Some(fingerprint);
    }

    pub fn recorded(&self) -> Option<ContentFingerprint> {
        self.recorded
    }

    pub fn reset(&mut self) {
        self.recorded = None;
    }

    /// True when nothing is recorded or the scene no longer matches.
    pub fn has_changed(&self, scene: &dyn SceneQuery) -> bool {
        self.recorded != Some(ContentFingerprint::capture(scene))
    }
}
