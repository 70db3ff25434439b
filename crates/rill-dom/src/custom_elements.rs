//! Custom Elements
//!
//! Registry of defined custom element names. The sanitizer asks it whether a
//! hyphenated tag belongs to the host application.

use std::collections::HashSet;

/// Names the HTML standard reserves even though they contain a hyphen
const RESERVED_NAMES: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// Custom element definition errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomElementError {
    #[error("invalid custom element name: {0}")]
    InvalidName(String),

    #[error("custom element already defined: {0}")]
    AlreadyDefined(String),
}

/// Custom elements registry
#[derive(Debug, Default, Clone)]
pub struct CustomElementRegistry {
    definitions: HashSet<String>,
}

impl CustomElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a custom element
    pub fn define(&mut self, name: &str) -> Result<(), CustomElementError> {
        if !Self::is_valid_name(name) {
            return Err(CustomElementError::InvalidName(name.to_string()));
        }
        if !self.definitions.insert(name.to_string()) {
            return Err(CustomElementError::AlreadyDefined(name.to_string()));
        }
        tracing::debug!("Defined custom element <{}>", name);
        Ok(())
    }

    /// Check whether a tag name has been defined
    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Valid custom element name: starts with a lower-case ASCII letter,
    /// contains a hyphen, has no upper-case ASCII, and is not reserved.
    pub fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        if !first.is_ascii_lowercase() {
            return false;
        }
        if !name.contains('-') || RESERVED_NAMES.contains(&name) {
            return false;
        }
        name.chars().all(|c| {
            c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || matches!(c, '-' | '.' | '_')
                || !c.is_ascii()
        })
    }
}
