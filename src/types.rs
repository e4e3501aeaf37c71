//! Validated newtypes shared across configuration, registry and sessions

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Validation errors for configuration newtypes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("hostname cannot be empty or whitespace")]
    EmptyHostName,

    #[error("instance name cannot be empty or whitespace")]
    EmptyInstanceName,
}

/// A validated hostname that cannot be empty or whitespace-only
///
/// # Examples
/// ```
/// use resp_proxy::types::HostName;
///
/// let host = HostName::new("redis.internal".to_string()).unwrap();
/// assert_eq!(host.as_str(), "redis.internal");
///
/// assert!(HostName::new("  ".to_string()).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HostName(String);

impl HostName {
    pub fn new(host: String) -> Result<Self, ValidationError> {
        if host.trim().is_empty() {
            return Err(ValidationError::EmptyHostName);
        }
        Ok(Self(host))
    }

    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of a backend instance, always stored lowercased
///
/// Instance names are matched case-insensitively everywhere: in the
/// configuration, in the registry and in `PING <instance>` selections.
/// Folding happens once at construction so lookups are plain hash hits.
///
/// # Examples
/// ```
/// use resp_proxy::types::InstanceName;
///
/// let name = InstanceName::new("Cache").unwrap();
/// assert_eq!(name.as_str(), "cache");
/// assert_eq!(name, InstanceName::new("CACHE").unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct InstanceName(String);

impl InstanceName {
    pub fn new(name: impl AsRef<str>) -> Result<Self, ValidationError> {
        let name = name.as_ref();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyInstanceName);
        }
        Ok(Self(name.to_lowercase()))
    }

    /// Fold a client-supplied selection without validating it
    ///
    /// Sessions bind to whatever the client asked for, even an empty name,
    /// and only learn at lookup time whether it exists.
    #[must_use]
    pub fn from_selection(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for InstanceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

macro_rules! string_newtype_impls {
    ($name:ident) => {
        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

string_newtype_impls!(HostName);
string_newtype_impls!(InstanceName);
