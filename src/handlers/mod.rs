// src/handlers/mod.rs
//! Per-content hiding strategies.
//!
//! Every handler follows the same lifecycle:
//!
//! 1. `prepare` once, locating materials and capturing originals;
//! 2. `before_render` / `after_render` in strict pairs, once per POV camera;
//! 3. `dispose` when the handler set is torn down.

pub mod clothing;
pub mod hair;
pub mod skin;

pub use clothing::ClothingHandler;
pub use hair::{hair_handler, HairMaterialHandler, HairStrategy, SimHairHandler};
pub use skin::{is_head_material, SkinHandler, HEAD_MATERIAL_PREFIXES};

use crate::materials::{HiddenValues, MaterialId, MaterialPropertyStore, MaterialSnapshot};
use crate::Result;

/// Outcome of a successful `prepare` call. Faults are reported as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// Content is still loading; the reason names the missing precondition.
    NotReady(String),
}

impl Readiness {
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Readiness::NotReady(reason.into())
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

pub trait Handler {
    /// Short label used in log lines.
    fn name(&self) -> &str;

    fn prepare(&mut self, store: &mut dyn MaterialPropertyStore) -> Result<Readiness>;

    fn before_render(&self, store: &mut dyn MaterialPropertyStore) -> Result<()>;

    fn after_render(&self, store: &mut dyn MaterialPropertyStore) -> Result<()>;

    /// Undoes whatever `prepare` changed. Called exactly once, also after a
    /// failed or partial `prepare`.
    fn dispose(&mut self, store: &mut dyn MaterialPropertyStore) -> Result<()>;

    /// Number of materials (or shared material properties) under management.
    fn managed_count(&self) -> usize;
}

/// Generic per-mesh strategy shared by hair meshes and clothing: every
/// material that supports one of the hidden properties gets a snapshot.
#[derive(Debug, Clone, Default)]
pub(crate) struct MeshMaterials {
    snapshots: Vec<MaterialSnapshot>,
}

impl MeshMaterials {
    pub(crate) fn capture(
        &mut self,
        store: &dyn MaterialPropertyStore,
        materials: &[MaterialId],
        hidden: &HiddenValues,
    ) -> Result<()> {
        self.snapshots.clear();
        for &material in materials {
            let snapshot = MaterialSnapshot::capture(store, material)?;
            if snapshot.can_hide(hidden) {
                self.snapshots.push(snapshot);
            }
        }
        Ok(())
    }

    pub(crate) fn hide(&self, store: &mut dyn MaterialPropertyStore, hidden: &HiddenValues) -> Result<()> {
        let mut first_err = None;
        for snapshot in &self.snapshots {
            if let Err(e) = snapshot.hide(store, hidden) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub(crate) fn restore(&self, store: &mut dyn MaterialPropertyStore) -> Result<()> {
        let mut first_err = None;
        for snapshot in &self.snapshots {
            if let Err(e) = snapshot.restore(store) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub(crate) fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
