//! Raw hook-body error type.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The failure a hook body reports, before the engine classifies it.
///
/// `name` is the discriminator the error dictionary is keyed by (for
/// example `"ECONNRESET"`). Errors without a name always classify as the
/// dictionary's `DEFAULT` kind.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{}", self.describe())]
pub struct RawError {
    /// Discriminator used to look up the error kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl RawError {
    /// An error carrying a discriminator.
    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            message: message.into(),
        }
    }

    /// An error without a discriminator.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            name: None,
            message: message.into(),
        }
    }

    /// Discriminator, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn describe(&self) -> String {
        match &self.name {
            Some(name) => format!("{name}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

impl From<io::Error> for RawError {
    /// Connection-style I/O failures keep their errno-style names so the
    /// default dictionary treats them as transient.
    fn from(err: io::Error) -> Self {
        let name = match err.kind() {
            io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
            io::ErrorKind::ConnectionReset => Some("ECONNRESET"),
            io::ErrorKind::BrokenPipe => Some("EPIPE"),
            io::ErrorKind::ConnectionAborted => Some("ECONNABORTED"),
            io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
            io::ErrorKind::NotFound => Some("ENOENT"),
            io::ErrorKind::PermissionDenied => Some("EACCES"),
            _ => None,
        };
        Self {
            name: name.map(str::to_owned),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RawError {
    fn from(err: serde_json::Error) -> Self {
        Self::message(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_connection_reset_keeps_errno_name() {
        let err = io::Error::new(io::ErrorKind::ConnectionReset, "peer hung up");
        let raw = RawError::from(err);
        assert_eq!(raw.name(), Some("ECONNRESET"));
        assert_eq!(raw.message, "peer hung up");
    }

    #[test]
    fn io_error_without_errno_mapping_is_unnamed() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "garbage");
        assert_eq!(RawError::from(err).name(), None);
    }

    #[test]
    fn display_prefixes_the_discriminator() {
        assert_eq!(RawError::named("EPIPE", "closed").to_string(), "EPIPE: closed");
        assert_eq!(RawError::message("plain").to_string(), "plain");
    }

    #[test]
    fn deserializes_without_a_name() {
        let raw: RawError = serde_json::from_str(r#"{ "message": "boom" }"#).unwrap();
        assert_eq!(raw, RawError::message("boom"));
    }
}
