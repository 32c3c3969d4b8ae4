// src/config.rs
//! Tunables and user toggles.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Nominal host update rate used to size the retry budget.
pub const TICKS_PER_SECOND: u32 = 90;

// ---------- Config ----------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HideGeometryConfig {
    /// Failed registration attempts tolerated before the module gives up.
    pub max_retries: u32,
    /// Wall-clock bound on one failure episode, measured on the injected clock.
    pub retry_window: Option<Duration>,
}

impl Default for HideGeometryConfig {
    fn default() -> Self {
        Self {
            max_retries: TICKS_PER_SECOND * 20, // ~20s at 90Hz
            retry_window: Some(Duration::from_secs(40)),
        }
    }
}

impl HideGeometryConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_retry_window(mut self, window: Option<Duration>) -> Self {
        self.retry_window = window;
        self
    }
}

// ---------- Settings ----------

/// Per-category toggles, persisted by the host as a flat JSON object.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct HideSettings {
    #[serde(rename = "HideFace")]
    pub hide_face: bool,
    #[serde(rename = "HideHair")]
    pub hide_hair: bool,
    #[serde(rename = "HideClothing")]
    pub hide_clothing: bool,
}

impl Default for HideSettings {
    fn default() -> Self {
        Self {
            hide_face: true,
            hide_hair: true,
            hide_clothing: true,
        }
    }
}

impl HideSettings {
    pub const NONE: HideSettings = HideSettings {
        hide_face: false,
        hide_hair: false,
        hide_clothing: false,
    };

    pub fn any(&self) -> bool {
        self.hide_face || self.hide_hair || self.hide_clothing
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Missing keys keep their defaults; unknown keys are ignored.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }
}
