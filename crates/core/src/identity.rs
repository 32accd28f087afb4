//! Stable item identities and the extractor that derives them from element
//! attributes.
//!
//! The identity is the only deduplication key between runs: an element whose
//! attribute yields `item123` today must yield `item123` on every later run.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable per-item key, e.g. `item123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemIdentity(String);

impl ItemIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Why an element did not yield an identity. Never fatal to a run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The element has no (or a blank) identity attribute.
    #[error("element has no '{attribute}' attribute")]
    Missing { attribute: String },

    /// The attribute does not follow the item naming convention.
    #[error("'{value}' does not match identity pattern {pattern}")]
    Malformed { value: String, pattern: String },
}

/// Derives [`ItemIdentity`] values from a single element attribute.
#[derive(Debug, Clone)]
pub struct IdentityExtractor {
    attribute: String,
    pattern: Regex,
}

impl IdentityExtractor {
    /// Creates an extractor reading `attribute` and requiring values to match
    /// `pattern`.
    pub fn new(attribute: impl Into<String>, pattern: &str) -> Result<Self, regex_lite::Error> {
        Ok(Self {
            attribute: attribute.into(),
            pattern: Regex::new(pattern)?,
        })
    }

    /// Name of the attribute this extractor reads.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Extracts the identity from a raw attribute value.
    pub fn extract(&self, raw: Option<&str>) -> Result<ItemIdentity, IdentityError> {
        let value = raw.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| {
            IdentityError::Missing {
                attribute: self.attribute.clone(),
            }
        })?;

        if !self.pattern.is_match(value) {
            return Err(IdentityError::Malformed {
                value: value.to_string(),
                pattern: self.pattern.as_str().to_string(),
            });
        }

        Ok(ItemIdentity::new(value))
    }
}
