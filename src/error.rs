// src/error.rs
//! Error handling for the whole crate.
//!
//! - **Cheap**: enum discriminant matches, allocations only on error paths.
//! - **Contextual**: `context()` chaining, `is_*` helpers, `Result` alias.
//!
//! "Not ready yet" is deliberately *not* an error: handlers report it through
//! [`crate::handlers::Readiness`]. Everything here is an unexpected fault.

use std::fmt;
use thiserror::Error;

use crate::materials::MaterialId;

/// Main error type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The store has no material under this id (host released it).
    #[error("material {0:?} does not exist")]
    MissingMaterial(MaterialId),

    /// A shader property the handler relies on is absent from the material.
    #[error("material {material:?} has no property `{property}`")]
    MissingProperty {
        material: MaterialId,
        property: String,
    },

    /// Shader lookup by name failed.
    #[error("shader `{0}` is not available")]
    MissingShader(String),

    /// Skin material uses a shader with no alpha-capable replacement.
    #[error("shader `{0}` has no transparent replacement")]
    UnsupportedShader(String),

    /// Settings (de)serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Simple custom message.
    #[error("{0}")]
    Custom(String),

    /// Context chaining.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    #[inline]
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Self::Custom(msg.into())
    }

    #[inline]
    pub fn format(args: fmt::Arguments) -> Self {
        Self::Custom(fmt::format(args))
    }

    #[inline]
    pub fn missing_property<S: Into<String>>(material: MaterialId, property: S) -> Self {
        Self::MissingProperty {
            material,
            property: property.into(),
        }
    }

    /// Add context to any error (chainable).
    #[inline]
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    #[inline]
    pub fn is_missing_material(&self) -> bool {
        matches!(self.root(), Error::MissingMaterial(_))
    }

    #[inline]
    pub fn is_missing_property(&self) -> bool {
        matches!(self.root(), Error::MissingProperty { .. })
    }

    #[inline]
    pub fn is_shader(&self) -> bool {
        matches!(
            self.root(),
            Error::MissingShader(_) | Error::UnsupportedShader(_)
        )
    }

    /// Innermost error below any `WithContext` layers.
    pub fn root(&self) -> &Error {
        let mut current = self;
        while let Error::WithContext { source, .. } = current {
            current = source.as_ref();
        }
        current
    }
}

/// Extension for attaching context to `Result`s, like `anyhow::Context`.
pub trait Context<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T>;
    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T> Context<T> for Result<T> {
    #[inline]
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    #[inline]
    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|e| e.context(f()))
    }
}

/// Convenient `Result` alias; use `crate::Result<T>` everywhere.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain_keeps_root() {
        let err = Error::missing_property(MaterialId(3), "_AlphaAdjust")
            .context("preparing skin")
            .context("registering handlers");

        assert!(err.is_missing_property());
        assert!(!err.is_shader());
        assert_eq!(
            err.to_string(),
            "registering handlers: preparing skin: material MaterialId(3) has no property `_AlphaAdjust`"
        );
    }

    #[test]
    fn test_result_context_extension() {
        let res: Result<()> = Err(Error::MissingShader("Custom/Discard".into()));
        let err = res.with_context(|| "swapping shader").unwrap_err();
        assert!(err.is_shader());
    }
}
