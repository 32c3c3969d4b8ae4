// src/hide_geometry.rs
//! The geometry-hiding module as the host sees it.
//!
//! State machine:
//!
//! ```text
//! Disabled ──enable──▶ Enabling ──▶ Active ──disable──▶ Disabling ──▶ Disabled
//! ```
//!
//! - **Enabling** subscribes the render hooks and hides the possessor mesh,
//!   then attempts a first registration.
//! - **Active** answers render hooks and, once per frame in [`HideGeometry::update`],
//!   retries a dirty registry or rebuilds after a composition change.
//! - **Disabling** unsubscribes, disposes every handler and shows the
//!   possessor mesh again.
//!
//! Failures never leave this module: they end up in the log and, when the
//! module has to give up, in [`HideGeometry::take_diagnostics`].

use crate::clock::{Clock, RetryBudget, SystemClock};
use crate::config::{HideGeometryConfig, HideSettings};
use crate::handlers::{Handler, Readiness};
use crate::materials::MaterialPropertyStore;
use crate::registry::HandlerRegistry;
use crate::render_hook::{CameraId, RenderEvent, RenderEventSource, RenderHookCoordinator};
use crate::scene::SceneQuery;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleState {
    Disabled,
    Enabling,
    Active,
    Disabling,
}

/// Host capabilities needed to enable, update or disable the module.
pub struct Host<'a> {
    pub scene: &'a mut dyn SceneQuery,
    pub store: &'a mut dyn MaterialPropertyStore,
    pub events: &'a mut dyn RenderEventSource,
}

impl<'a> Host<'a> {
    pub fn new(
        scene: &'a mut dyn SceneQuery,
        store: &'a mut dyn MaterialPropertyStore,
        events: &'a mut dyn RenderEventSource,
    ) -> Self {
        Self { scene, store, events }
    }
}

/// Read-only summary for a settings screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HideGeometryStatus {
    pub state: ModuleState,
    pub handlers: usize,
    pub retries: u32,
    pub dirty: bool,
    /// Registration attempts since construction, successful or not.
    pub registrations: u64,
    pub render_faulted: bool,
    pub suppressed_render_faults: u64,
}

pub struct HideGeometry {
    config: HideGeometryConfig,
    settings: HideSettings,
    state: ModuleState,
    registry: HandlerRegistry,
    coordinator: RenderHookCoordinator,
    budget: RetryBudget,
    clock: Box<dyn Clock>,
    warned_not_ready: bool,
    registrations: u64,
    diagnostics: Vec<String>,
}

impl HideGeometry {
    pub fn new(
        config: HideGeometryConfig,
        settings: HideSettings,
        classifier: impl Fn(CameraId) -> bool + 'static,
    ) -> Self {
        Self {
            budget: RetryBudget::new(&config),
            config,
            settings,
            state: ModuleState::Disabled,
            registry: HandlerRegistry::new(),
            coordinator: RenderHookCoordinator::new(classifier),
            clock: Box::new(SystemClock::new()),
            warned_not_ready: false,
            registrations: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // ================ QUERIES ================
    #[inline] pub fn state(&self) -> ModuleState { self.state }
    #[inline] pub fn is_active(&self) -> bool { self.state == ModuleState::Active }
    #[inline] pub fn settings(&self) -> HideSettings { self.settings }
    #[inline] pub fn config(&self) -> &HideGeometryConfig { &self.config }
    #[inline] pub fn handlers(&self) -> &[Box<dyn Handler>] { self.registry.handlers() }
    #[inline] pub fn diagnostics(&self) -> &[String] { &self.diagnostics }

    pub fn status(&self) -> HideGeometryStatus {
        HideGeometryStatus {
            state: self.state,
            handlers: self.registry.len(),
            retries: self.registry.retries(),
            dirty: self.registry.is_dirty(),
            registrations: self.registrations,
            render_faulted: self.coordinator.has_failed(),
            suppressed_render_faults: self.coordinator.suppressed_faults(),
        }
    }

    /// Drains user-facing messages emitted when the module disabled itself.
    pub fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn set_camera_classifier(&mut self, classifier: impl Fn(CameraId) -> bool + 'static) {
        self.coordinator.set_classifier(classifier);
    }

    // ================ LIFECYCLE ================

    pub fn enable(&mut self, host: &mut Host<'_>) {
        if self.state != ModuleState::Disabled {
            return;
        }
        self.state = ModuleState::Enabling;
        log::info!("enabling geometry hiding ({:?})", self.settings);

        self.coordinator.reset_fault_gate();
        self.coordinator.attach(&mut *host.events);
        host.scene.set_possessor_visible(false);
        self.budget.reset();
        self.warned_not_ready = false;

        self.state = ModuleState::Active;
        self.try_register(host);
    }

    pub fn disable(&mut self, host: &mut Host<'_>) {
        if !matches!(self.state, ModuleState::Active | ModuleState::Enabling) {
            return;
        }
        self.state = ModuleState::Disabling;

        self.coordinator
            .restore_pending(self.registry.handlers(), &mut *host.store);
        self.coordinator.detach(&mut *host.events);
        self.registry.reset(&mut *host.store);
        host.scene.set_possessor_visible(true);
        self.budget.reset();

        self.state = ModuleState::Disabled;
        log::info!("geometry hiding disabled");
    }

    /// Call once per frame, independently of the render hooks.
    pub fn update(&mut self, host: &mut Host<'_>) {
        if self.state != ModuleState::Active {
            return;
        }
        // no POV pass spans a frame boundary
        self.coordinator
            .restore_pending(self.registry.handlers(), &mut *host.store);

        if self.registry.is_dirty() {
            self.try_register(host);
        } else if self.registry.needs_rebuild(&*host.scene) {
            log::debug!("possessed content changed, rebuilding hide handlers");
            self.try_register(host);
        }
    }

    /// Applies new toggles; an active module is torn down and rebuilt.
    pub fn apply_settings(&mut self, settings: HideSettings, host: &mut Host<'_>) {
        if settings == self.settings {
            return;
        }
        self.settings = settings;
        if self.state == ModuleState::Active {
            self.disable(host);
            self.enable(host);
        }
    }

    // ================ RENDER HOOKS ================

    pub fn on_pre_render(&mut self, camera: CameraId, store: &mut dyn MaterialPropertyStore) {
        if self.state == ModuleState::Active {
            self.coordinator
                .pre_render(camera, self.registry.handlers(), store);
        }
    }

    pub fn on_post_render(&mut self, camera: CameraId, store: &mut dyn MaterialPropertyStore) {
        if self.state == ModuleState::Active {
            self.coordinator
                .post_render(camera, self.registry.handlers(), store);
        }
    }

    pub fn on_render_event(&mut self, event: RenderEvent, store: &mut dyn MaterialPropertyStore) {
        match event {
            RenderEvent::PreRender(camera) => self.on_pre_render(camera, store),
            RenderEvent::PostRender(camera) => self.on_post_render(camera, store),
        }
    }

    // ================ INTERNALS ================

    fn try_register(&mut self, host: &mut Host<'_>) {
        let previous_retries = self.registry.retries();
        self.registrations += 1;
        self.coordinator
            .restore_pending(self.registry.handlers(), &mut *host.store);
        let outcome =
            self.registry
                .register_handlers(&*host.scene, &mut *host.store, &self.settings);

        match outcome {
            Ok(Readiness::Ready) => {
                if previous_retries > 0 {
                    log::info!("hide handlers registered after {previous_retries} retries");
                }
                self.budget.reset();
                self.warned_not_ready = false;
            }
            Ok(Readiness::NotReady(reason)) => {
                if !self.warned_not_ready {
                    log::warn!("cannot hide geometry yet: {reason}; retrying");
                    self.warned_not_ready = true;
                }
                let retries = self.registry.retries();
                if self.budget.exhausted(retries, self.clock.now()) {
                    self.give_up(
                        host,
                        format!(
                            "Geometry hiding was turned off because {reason} after {retries} attempts. \
                             Wait for the character to finish loading, then enable it again."
                        ),
                    );
                }
            }
            Err(e) => {
                self.give_up(host, format!("Geometry hiding was turned off: {e}"));
            }
        }
    }

    fn give_up(&mut self, host: &mut Host<'_>, message: String) {
        log::error!("{message}");
        self.diagnostics.push(message);
        self.disable(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::materials::{InMemoryMaterialStore, ALPHA_ADJUST};
    use crate::render_hook::{LocalEventSource, PovCameras};
    use crate::scene::{CharacterId, InMemoryScene, Skin};
    use std::time::Duration;

    const OPAQUE: &str = "Custom/Subsurface/CullComputeBuff";
    const TRANSPARENT: &str = "Custom/Subsurface/TransparentSeparateAlphaComputeBuff";
    const LEFT: CameraId = CameraId(1);

    struct Rig {
        scene: InMemoryScene,
        store: InMemoryMaterialStore,
        events: LocalEventSource,
    }

    impl Rig {
        fn new(skin_loaded: bool) -> Self {
            let mut store = InMemoryMaterialStore::new();
            store.add_shader(TRANSPARENT);
            let face = store.add_material("Face", OPAQUE);
            store.define_float(face, ALPHA_ADJUST, 0.0).unwrap();
            let mut scene = InMemoryScene::new(CharacterId(1));
            if skin_loaded {
                scene.skin = Some(Skin { materials: vec![face] });
            }
            Self { scene, store, events: LocalEventSource::new() }
        }

        fn host(&mut self) -> Host<'_> {
            Host::new(&mut self.scene, &mut self.store, &mut self.events)
        }
    }

    fn module(config: HideGeometryConfig) -> HideGeometry {
        let cams = PovCameras { hmd_left: Some(LEFT), ..PovCameras::default() };
        HideGeometry::new(config, HideSettings::default(), cams.classifier())
    }

    #[test]
    fn test_enable_disable_cycle() {
        let mut rig = Rig::new(true);
        let mut hide = module(HideGeometryConfig::default());

        hide.enable(&mut rig.host());
        assert_eq!(hide.state(), ModuleState::Active);
        assert_eq!(hide.handlers().len(), 1);
        assert!(!rig.scene.possessor_visible);
        assert_eq!(rig.events.subscriber_count(), 1);

        hide.disable(&mut rig.host());
        assert_eq!(hide.state(), ModuleState::Disabled);
        assert!(hide.handlers().is_empty());
        assert!(rig.scene.possessor_visible);
        assert_eq!(rig.events.subscriber_count(), 0);

        // idempotent
        hide.disable(&mut rig.host());
        assert_eq!(hide.state(), ModuleState::Disabled);
    }

    #[test]
    fn test_render_hooks_ignored_while_disabled() {
        let mut rig = Rig::new(true);
        let mut hide = module(HideGeometryConfig::default());
        hide.on_pre_render(LEFT, &mut rig.store);
        assert_eq!(rig.store.writes(), 0);
    }

    #[test]
    fn test_retry_window_on_manual_clock() {
        let mut rig = Rig::new(false);
        let clock = ManualClock::new();
        let cfg = HideGeometryConfig::default()
            .with_max_retries(u32::MAX)
            .with_retry_window(Some(Duration::from_secs(30)));
        let mut hide = module(cfg).with_clock(clock.clone());

        hide.enable(&mut rig.host());
        for _ in 0..10 {
            clock.advance(Duration::from_secs(2));
            hide.update(&mut rig.host());
        }
        assert!(hide.is_active());
        assert!(hide.status().dirty);

        clock.advance(Duration::from_secs(10));
        hide.update(&mut rig.host());
        assert_eq!(hide.state(), ModuleState::Disabled);
        let diagnostics = hide.take_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("skin is not yet loaded"));
    }

    #[test]
    fn test_late_skin_recovers() {
        let mut rig = Rig::new(false);
        let mut hide = module(HideGeometryConfig::default());
        hide.enable(&mut rig.host());
        assert_eq!(hide.status().retries, 1);

        let face = rig.store.all_bits().keys().copied().next().unwrap();
        rig.scene.skin = Some(Skin { materials: vec![face] });
        hide.update(&mut rig.host());
        let status = hide.status();
        assert_eq!(status.handlers, 1);
        assert_eq!(status.retries, 0);
        assert!(!status.dirty);
        assert!(hide.diagnostics().is_empty());
    }

    #[test]
    fn test_settings_change_rebuilds() {
        let mut rig = Rig::new(true);
        let mut hide = module(HideGeometryConfig::default());
        hide.enable(&mut rig.host());
        assert_eq!(hide.handlers().len(), 1);

        hide.apply_settings(HideSettings::NONE, &mut rig.host());
        assert!(hide.is_active());
        assert!(hide.handlers().is_empty());
        assert_eq!(rig.events.subscriber_count(), 1);
    }

    #[test]
    fn test_registration_fault_disables_immediately() {
        let mut rig = Rig::new(true);
        let odd = rig.store.add_material("Head", "Standard");
        rig.store.define_float(odd, ALPHA_ADJUST, 0.0).unwrap();
        rig.scene.skin.as_mut().unwrap().materials.push(odd);

        let mut hide = module(HideGeometryConfig::default());
        hide.enable(&mut rig.host());
        assert_eq!(hide.state(), ModuleState::Disabled);
        assert_eq!(hide.diagnostics().len(), 1);
        assert!(rig.scene.possessor_visible);
    }
}
