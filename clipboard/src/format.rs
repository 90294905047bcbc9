//! Logical clipboard formats and the custom format registry.

use std::collections::HashSet;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use crate::{ClipboardError, ClipboardResult};

/// Native tag for UTF-8 plain text.
pub const TEXT_TAG: &str = "text/plain;charset=utf-8";
/// Native tag for PNG encoded images.
pub const IMAGE_TAG: &str = "image/png";

/// The kind of content stored on the clipboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Format {
    /// UTF-8 encoded plain text.
    Text,
    /// PNG encoded image.
    Image,
    /// A platform format identified by an opaque id.
    ///
    /// Must be registered with [`Clipboard::register`](crate::Clipboard::register)
    /// before it can be read or written.
    Custom(String),
}

impl Format {
    /// Create a custom format from an opaque platform id.
    pub fn custom(id: impl Into<String>) -> Self {
        Self::Custom(id.into())
    }

    /// The platform-native type tag this format maps to.
    #[must_use]
    pub fn native_tag(&self) -> &str {
        match self {
            Self::Text => TEXT_TAG,
            Self::Image => IMAGE_TAG,
            Self::Custom(id) => id,
        }
    }

    /// Whether this is one of the built-in formats.
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        matches!(self, Self::Text | Self::Image)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::Custom(id) => write!(f, "custom({id})"),
        }
    }
}

/// Set of custom format ids accepted by a clipboard.
///
/// Membership is the only thing recorded. Built-in formats are always
/// accepted and never stored.
#[derive(Debug, Default)]
pub struct FormatRegistry {
    custom: RwLock<HashSet<String>>,
}

impl FormatRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `id` may name a custom format.
    ///
    /// # Errors
    /// Returns [`ClipboardError::Unsupported`] for an empty id or one that
    /// collides with a built-in tag.
    pub fn validate(id: &str) -> ClipboardResult<()> {
        if id.trim().is_empty() {
            return Err(ClipboardError::unsupported("empty format id"));
        }
        if id == TEXT_TAG || id == IMAGE_TAG {
            return Err(ClipboardError::unsupported(format!(
                "{id} is a built-in format"
            )));
        }
        Ok(())
    }

    /// Add `id` to the registry. Returns `false` if it was already present.
    ///
    /// # Errors
    /// Returns [`ClipboardError::Unsupported`] if the id is not valid.
    pub fn insert(&self, id: &str) -> ClipboardResult<bool> {
        Self::validate(id)?;
        let mut custom = self.custom.write().unwrap_or_else(PoisonError::into_inner);
        Ok(custom.insert(id.to_owned()))
    }

    /// Whether `id` has been registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.custom
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Number of registered custom formats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.custom
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no custom format has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ensure `format` may be passed to the backend.
    ///
    /// # Errors
    /// Returns [`ClipboardError::Unsupported`] for an unregistered custom format.
    pub fn check(&self, format: &Format) -> ClipboardResult<()> {
        match format {
            Format::Text | Format::Image => Ok(()),
            Format::Custom(id) if self.contains(id) => Ok(()),
            Format::Custom(id) => Err(ClipboardError::unsupported(format!(
                "format {id} is not registered"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_formats_map_to_native_tags() {
        assert_eq!(Format::Text.native_tag(), TEXT_TAG);
        assert_eq!(Format::Image.native_tag(), IMAGE_TAG);
        assert_eq!(Format::custom("application/pdf").native_tag(), "application/pdf");
        assert!(Format::Text.is_builtin());
        assert!(!Format::custom("x").is_builtin());
    }

    #[test]
    fn builtins_pass_without_registration() {
        let registry = FormatRegistry::new();
        assert!(registry.check(&Format::Text).is_ok());
        assert!(registry.check(&Format::Image).is_ok());
        assert!(registry.is_empty());
    }

    #[test]
    fn unregistered_custom_format_is_unsupported() {
        let registry = FormatRegistry::new();
        let err = registry.check(&Format::custom("application/pdf")).unwrap_err();
        assert!(matches!(err, ClipboardError::Unsupported(_)));
    }

    #[test]
    fn insert_reports_first_registration_only() {
        let registry = FormatRegistry::new();
        assert_eq!(registry.insert("application/pdf"), Ok(true));
        assert_eq!(registry.insert("application/pdf"), Ok(false));
        assert!(registry.contains("application/pdf"));
        assert_eq!(registry.len(), 1);
        assert!(registry.check(&Format::custom("application/pdf")).is_ok());
    }

    #[test]
    fn rejects_empty_and_builtin_ids() {
        let registry = FormatRegistry::new();
        assert!(registry.insert("").is_err());
        assert!(registry.insert("   ").is_err());
        assert!(registry.insert(TEXT_TAG).is_err());
        assert!(registry.insert(IMAGE_TAG).is_err());
        assert!(registry.is_empty());
    }
}
