// src/lib.rs
//! Hides a possessed character's own head geometry from the player's POV.
//!
//! When the player embodies a character, its face, head hair and head-region
//! clothing sit right in front of the VR cameras. This crate keeps a set of
//! per-content handlers that make those materials invisible for exactly the
//! duration of each POV camera's render pass, and visible again for every
//! other camera (mirrors included).
//!
//! The host engine is reached only through traits:
//!
//! - [`materials::MaterialPropertyStore`]: shader property reads and writes;
//! - [`scene::SceneQuery`]: selected character, skin, worn items;
//! - [`render_hook::RenderEventSource`]: per-camera render callbacks;
//! - [`clock::Clock`]: time for the retry window.
//!
//! [`HideGeometry`] is the entry point: `enable`, `update` once per frame,
//! forward render events, `disable`.

pub mod change_detector;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hide_geometry;
pub mod materials;
pub mod registry;
pub mod render_hook;
pub mod scene;

pub use change_detector::{ChangeDetector, ContentFingerprint, StructuralHash};
pub use clock::{Clock, ManualClock, RetryBudget, SystemClock};
pub use config::{HideGeometryConfig, HideSettings, TICKS_PER_SECOND};
pub use error::{Context, Error, Result};
pub use handlers::{Handler, Readiness};
pub use hide_geometry::{HideGeometry, HideGeometryStatus, Host, ModuleState};
pub use materials::{Color, InMemoryMaterialStore, MaterialId, MaterialPropertyStore, MaterialSnapshot, ShaderId};
pub use registry::HandlerRegistry;
pub use render_hook::{
    CameraId, HookToken, LocalEventSource, PovCameras, RenderEvent, RenderEventSource,
    RenderHookCoordinator,
};
pub use scene::{CharacterId, InMemoryScene, ItemId, SceneQuery, Skin, WornItem};
