//! Version identifier domain type

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Longest identifier accepted, matching the image-tag limit of common engines
pub const MAX_VERSION_LEN: usize = 128;

/// Reasons a string cannot be used as a version identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("version identifier is empty")]
    Empty,

    #[error("version identifier is longer than {MAX_VERSION_LEN} characters")]
    TooLong,

    #[error("version identifier '{value}' contains invalid character {ch:?}")]
    InvalidChar { value: String, ch: char },

    #[error("version identifier '{0}' must not start with '.' or '-'")]
    InvalidStart(String),
}

/// Token naming one runtime version (e.g. `4.5.6` or `iojs-1.2.0`)
///
/// Only constructible through validation, so every value is safe both as a
/// single filesystem path component and as an image tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionId(String);

impl VersionId {
    /// Validates and wraps a version string
    pub fn parse(value: impl Into<String>) -> Result<Self, VersionError> {
        let value = value.into();

        if value.is_empty() {
            return Err(VersionError::Empty);
        }
        if value.len() > MAX_VERSION_LEN {
            return Err(VersionError::TooLong);
        }
        if let Some(ch) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(VersionError::InvalidChar { value, ch });
        }
        if value.starts_with('.') || value.starts_with('-') {
            return Err(VersionError::InvalidStart(value));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Image tag for this version, e.g. `project-4.5.6`
    pub fn image_tag(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.0)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for VersionId {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionId {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<VersionId> for String {
    fn from(version: VersionId) -> Self {
        version.0
    }
}
