// src/registry.rs
//! Live handler set for the possessed character.
//!
//! Registration is all-or-nothing: the set is either complete for the current
//! scene or empty. A batch that fails to prepare is disposed before returning,
//! so no material stays swapped or hidden.

use crate::change_detector::{ChangeDetector, ContentFingerprint};
use crate::config::HideSettings;
use crate::handlers::{hair_handler, ClothingHandler, Handler, Readiness, SkinHandler};
use crate::materials::MaterialPropertyStore;
use crate::scene::SceneQuery;
use crate::Result;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn Handler>>,
    dirty: bool,
    retries: u32,
    detector: ChangeDetector,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn handlers(&self) -> &[Box<dyn Handler>] {
        &self.handlers
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// A previous registration failed and must be retried.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Consecutive failed registrations since the last success.
    #[inline]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn recorded(&self) -> Option<ContentFingerprint> {
        self.detector.recorded()
    }

    /// Character or worn composition differs from what the set was built for.
    pub fn needs_rebuild(&self, scene: &dyn SceneQuery) -> bool {
        self.detector.has_changed(scene)
    }

    /// Tears down the current set and builds a new one from `scene`.
    ///
    /// `Ok(NotReady)` and `Err` both leave the registry empty and dirty with
    /// the retry counter bumped.
    pub fn register_handlers(
        &mut self,
        scene: &dyn SceneQuery,
        store: &mut dyn MaterialPropertyStore,
        settings: &HideSettings,
    ) -> Result<Readiness> {
        self.clear_handlers(store);
        let fingerprint = ContentFingerprint::capture(scene);
        let mut batch = build_handlers(scene, settings);

        let mut outcome = Ok(Readiness::Ready);
        for handler in batch.iter_mut() {
            match handler.prepare(store) {
                Ok(Readiness::Ready) => {}
                Ok(not_ready) => {
                    outcome = Ok(not_ready);
                    break;
                }
                Err(e) => {
                    outcome = Err(e.context(format!("preparing {}", handler.name())));
                    break;
                }
            }
        }

        match outcome {
            Ok(Readiness::Ready) => {
                log::debug!(
                    "registered {} hide handlers ({} materials)",
                    batch.len(),
                    batch.iter().map(|h| h.managed_count()).sum::<usize>()
                );
                self.handlers = batch;
                self.detector.record(fingerprint);
                self.dirty = false;
                self.retries = 0;
                Ok(Readiness::Ready)
            }
            failed => {
                dispose_all(&mut batch, store);
                self.detector.reset();
                self.dirty = true;
                self.retries = self.retries.saturating_add(1);
                failed
            }
        }
    }

    /// Disposes every handler. Safe to call when already empty.
    pub fn clear_handlers(&mut self, store: &mut dyn MaterialPropertyStore) {
        dispose_all(&mut self.handlers, store);
        self.handlers.clear();
        self.detector.reset();
    }

    /// Clears handlers and forgets dirty state and retries.
    pub fn reset(&mut self, store: &mut dyn MaterialPropertyStore) {
        self.clear_handlers(store);
        self.dirty = false;
        self.retries = 0;
    }
}

fn build_handlers(scene: &dyn SceneQuery, settings: &HideSettings) -> Vec<Box<dyn Handler>> {
    let mut handlers: Vec<Box<dyn Handler>> = Vec::new();

    if settings.hide_face {
        handlers.push(Box::new(SkinHandler::new(scene.skin())));
    }
    if settings.hide_hair {
        handlers.extend(
            scene
                .hair_items()
                .iter()
                .filter(|item| item.active && item.is_head_hair())
                .map(hair_handler),
        );
    }
    if settings.hide_clothing {
        handlers.extend(
            scene
                .clothing_items()
                .iter()
                .filter(|item| item.active && item.is_head_clothing())
                .map(|item| Box::new(ClothingHandler::new(item)) as Box<dyn Handler>),
        );
    }

    handlers
}

fn dispose_all(handlers: &mut [Box<dyn Handler>], store: &mut dyn MaterialPropertyStore) {
    for handler in handlers.iter_mut() {
        if let Err(e) = handler.dispose(store) {
            log::error!("failed to dispose {}: {e}", handler.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{Color, InMemoryMaterialStore, ALPHA_ADJUST, COLOR};
    use crate::scene::{CharacterId, InMemoryScene, ItemId, Skin, WornItem};

    const OPAQUE: &str = "Custom/Subsurface/CullComputeBuff";
    const TRANSPARENT: &str = "Custom/Subsurface/TransparentSeparateAlphaComputeBuff";

    fn fixture() -> (InMemoryScene, InMemoryMaterialStore) {
        let mut store = InMemoryMaterialStore::new();
        store.add_shader(TRANSPARENT);
        let face = store.add_material("Face", OPAQUE);
        store.define_float(face, ALPHA_ADJUST, 0.0).unwrap();

        let hair = store.add_material("Hair", "Custom/Hair/Mesh");
        store.define_float(hair, ALPHA_ADJUST, 0.0).unwrap();
        store.define_color(hair, COLOR, Color::new(0.1, 0.1, 0.1, 1.0)).unwrap();

        let mut scene = InMemoryScene::new(CharacterId(1));
        scene.skin = Some(Skin { materials: vec![face] });
        scene.hair.push(WornItem::new(ItemId(1), "Bob").with_materials(vec![hair]));
        (scene, store)
    }

    #[test]
    fn test_register_builds_face_and_hair() {
        let (scene, mut store) = fixture();
        let mut registry = HandlerRegistry::new();
        let outcome = registry
            .register_handlers(&scene, &mut store, &HideSettings::default())
            .unwrap();
        assert!(outcome.is_ready());
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_dirty());
        assert!(!registry.needs_rebuild(&scene));
    }

    #[test]
    fn test_settings_filter_categories() {
        let (scene, mut store) = fixture();
        let mut registry = HandlerRegistry::new();
        let settings = HideSettings {
            hide_face: false,
            ..HideSettings::default()
        };
        registry.register_handlers(&scene, &mut store, &settings).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.handlers()[0].name(), "hair `Bob`");
    }

    #[test]
    fn test_one_unready_item_discards_the_batch() {
        let (mut scene, mut store) = fixture();
        let before = store.all_bits();
        scene.hair.push(WornItem::new(ItemId(2), "Loading"));

        let mut registry = HandlerRegistry::new();
        let outcome = registry
            .register_handlers(&scene, &mut store, &HideSettings::default())
            .unwrap();
        assert_eq!(outcome, Readiness::not_ready("hair `Loading` is not yet loaded"));
        assert_eq!(registry.len(), 0);
        assert!(registry.is_dirty());
        assert_eq!(registry.retries(), 1);
        assert_eq!(store.all_bits(), before);
    }

    #[test]
    fn test_success_clears_retries() {
        let (mut scene, mut store) = fixture();
        let skin = scene.skin.take();
        let mut registry = HandlerRegistry::new();
        let settings = HideSettings::default();
        registry.register_handlers(&scene, &mut store, &settings).unwrap();
        registry.register_handlers(&scene, &mut store, &settings).unwrap();
        assert_eq!(registry.retries(), 2);

        scene.skin = skin;
        assert!(registry.register_handlers(&scene, &mut store, &settings).unwrap().is_ready());
        assert_eq!(registry.retries(), 0);
        assert!(!registry.is_dirty());
    }

    #[test]
    fn test_clear_twice_is_harmless() {
        let (scene, mut store) = fixture();
        let mut registry = HandlerRegistry::new();
        registry
            .register_handlers(&scene, &mut store, &HideSettings::default())
            .unwrap();
        registry.clear_handlers(&mut store);
        registry.clear_handlers(&mut store);
        assert!(registry.is_empty());
        assert!(registry.needs_rebuild(&scene));
    }
}
