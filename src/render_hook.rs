// src/render_hook.rs
//! Per-camera pre/post render dispatch.
//!
//! Only the player's own cameras (HMD eyes and the monitor preview) see the
//! hidden state; mirrors and spectator cameras render the untouched materials.
//! Each handler call is guarded on its own so one broken handler cannot stop
//! the others from hiding or, more importantly, restoring.

use std::collections::HashSet;

use crate::handlers::Handler;
use crate::materials::MaterialPropertyStore;
use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CameraId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HookToken(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderEvent {
    PreRender(CameraId),
    PostRender(CameraId),
}

/// The host's per-camera render callbacks.
pub trait RenderEventSource {
    fn subscribe(&mut self) -> HookToken;
    fn unsubscribe(&mut self, token: HookToken);
}

/// Subscription table for hosts that fan events out themselves.
#[derive(Debug, Default)]
pub struct LocalEventSource {
    next: u64,
    live: HashSet<HookToken>,
}

impl LocalEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self, token: HookToken) -> bool {
        self.live.contains(&token)
    }

    pub fn subscriber_count(&self) -> usize {
        self.live.len()
    }
}

impl RenderEventSource for LocalEventSource {
    fn subscribe(&mut self) -> HookToken {
        let token = HookToken(self.next);
        self.next += 1;
        self.live.insert(token);
        token
    }

    fn unsubscribe(&mut self, token: HookToken) {
        self.live.remove(&token);
    }
}

/// The cameras that show the player's own point of view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PovCameras {
    pub hmd_left: Option<CameraId>,
    pub hmd_alternate: Option<CameraId>,
    pub monitor: Option<CameraId>,
}

impl PovCameras {
    pub fn contains(&self, camera: CameraId) -> bool {
        [self.hmd_left, self.hmd_alternate, self.monitor].contains(&Some(camera))
    }

    pub fn classifier(self) -> impl Fn(CameraId) -> bool + 'static {
        move |camera| self.contains(camera)
    }
}

type CameraClassifier = Box<dyn Fn(CameraId) -> bool>;

pub struct RenderHookCoordinator {
    classifier: CameraClassifier,
    token: Option<HookToken>,
    // relevant cameras between pre and post render, innermost last
    rendering: Vec<CameraId>,
    failed_once: bool,
    suppressed_faults: u64,
}

impl RenderHookCoordinator {
    pub fn new(classifier: impl Fn(CameraId) -> bool + 'static) -> Self {
        Self {
            classifier: Box::new(classifier),
            token: None,
            rendering: Vec::new(),
            failed_once: false,
            suppressed_faults: 0,
        }
    }

    pub fn set_classifier(&mut self, classifier: impl Fn(CameraId) -> bool + 'static) {
        self.classifier = Box::new(classifier);
    }

    #[inline]
    pub fn is_relevant_camera(&self, camera: CameraId) -> bool {
        (self.classifier)(camera)
    }

    pub fn attach(&mut self, events: &mut dyn RenderEventSource) {
        if self.token.is_none() {
            self.token = Some(events.subscribe());
        }
    }

    /// Unsubscribes. Call [`Self::restore_pending`] first if a pass may still
    /// be open, otherwise its hidden state is left behind.
    pub fn detach(&mut self, events: &mut dyn RenderEventSource) {
        if let Some(token) = self.token.take() {
            events.unsubscribe(token);
        }
        self.rendering.clear();
    }

    /// Closes every pass still open: restores once, then forgets the cameras.
    ///
    /// Must run before `handlers` are disposed or rebuilt, and once per frame
    /// to drop pre-renders whose post-render never came.
    pub fn restore_pending(
        &mut self,
        handlers: &[Box<dyn Handler>],
        store: &mut dyn MaterialPropertyStore,
    ) {
        if !self.is_hiding() {
            return;
        }
        log::debug!("closing {} unfinished POV render pass(es)", self.rendering.len());
        self.rendering.clear();
        self.restore_all(handlers, store);
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.token.is_some()
    }

    /// True while at least one POV camera is between pre and post render.
    #[inline]
    pub fn is_hiding(&self) -> bool {
        !self.rendering.is_empty()
    }

    /// Re-arms the log gate at the start of an enable cycle.
    pub fn reset_fault_gate(&mut self) {
        self.failed_once = false;
        self.suppressed_faults = 0;
    }

    #[inline]
    pub fn has_failed(&self) -> bool {
        self.failed_once
    }

    /// Faults swallowed after the first logged one.
    #[inline]
    pub fn suppressed_faults(&self) -> u64 {
        self.suppressed_faults
    }

    pub fn handle(
        &mut self,
        event: RenderEvent,
        handlers: &[Box<dyn Handler>],
        store: &mut dyn MaterialPropertyStore,
    ) {
        match event {
            RenderEvent::PreRender(camera) => self.pre_render(camera, handlers, store),
            RenderEvent::PostRender(camera) => self.post_render(camera, handlers, store),
        }
    }

    pub fn pre_render(
        &mut self,
        camera: CameraId,
        handlers: &[Box<dyn Handler>],
        store: &mut dyn MaterialPropertyStore,
    ) {
        if !self.is_attached() || !self.is_relevant_camera(camera) {
            return;
        }
        self.rendering.push(camera);
        self.hide_all(handlers, store);
    }

    pub fn post_render(
        &mut self,
        camera: CameraId,
        handlers: &[Box<dyn Handler>],
        store: &mut dyn MaterialPropertyStore,
    ) {
        if !self.is_attached() {
            return;
        }
        // classification was decided at pre-render
        let Some(pos) = self.rendering.iter().rposition(|c| *c == camera) else {
            return;
        };
        self.rendering.remove(pos);
        self.restore_all(handlers, store);

        // an outer POV camera is still drawing
        if self.is_hiding() {
            self.hide_all(handlers, store);
        }
    }

    fn hide_all(&mut self, handlers: &[Box<dyn Handler>], store: &mut dyn MaterialPropertyStore) {
        for handler in handlers {
            if let Err(e) = handler.before_render(store) {
                self.report(handler.name(), "hide", &e);
            }
        }
    }

    fn restore_all(&mut self, handlers: &[Box<dyn Handler>], store: &mut dyn MaterialPropertyStore) {
        for handler in handlers {
            if let Err(e) = handler.after_render(store) {
                self.report(handler.name(), "restore", &e);
            }
        }
    }

    fn report(&mut self, handler: &str, phase: &str, err: &Error) {
        if self.failed_once {
            self.suppressed_faults += 1;
            return;
        }
        self.failed_once = true;
        log::error!(
            "failed to {phase} {handler}: {err}; further render faults are suppressed until re-enabled"
        );
    }
}
