use std::{fmt, io, path::StripPrefixError};

use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use serde_yaml::Error as YamlError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum LamadError {
    #[error("Malformed feature file '{path}': {reason}")]
    MalformedFeatureFile { path: String, reason: String },
    #[error("Duplicate node id '{id}' produced by '{first_path}' and '{second_path}'")]
    DuplicateNodeId {
        id: String,
        first_path: String,
        second_path: String,
    },
    #[error("Codec error: {0}")]
    Codec(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl LamadError {
    pub fn malformed_feature(path: impl Into<String>, reason: impl Into<String>) -> Self {
        LamadError::MalformedFeatureFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// The source path the failure is attributed to, when there is one.
    pub fn source_path(&self) -> Option<&str> {
        match self {
            LamadError::MalformedFeatureFile { path, .. } => Some(path),
            LamadError::DuplicateNodeId { second_path, .. } => Some(second_path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LamadError>;

impl From<StripPrefixError> for LamadError {
    fn from(src: StripPrefixError) -> LamadError {
        LamadError::NotFound(format!("Strip prefix failed for path. Error: {src}"))
    }
}

impl From<toml::de::Error> for LamadError {
    fn from(src: toml::de::Error) -> LamadError {
        LamadError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for LamadError {
    fn from(src: toml::ser::Error) -> LamadError {
        LamadError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for LamadError {
    fn from(src: JsonError) -> LamadError {
        LamadError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<YamlError> for LamadError {
    fn from(src: YamlError) -> LamadError {
        LamadError::Serialization(format!("YAML front matter error: {src}"))
    }
}

impl From<io::Error> for LamadError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => LamadError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => LamadError::PermissionDenied,
            _ => LamadError::Io(format!("IOError: {}: {x}", x.kind())),
        }
    }
}

impl From<walkdir::Error> for LamadError {
    fn from(x: walkdir::Error) -> Self {
        match x.into_io_error() {
            Some(io_error) => LamadError::from(io_error),
            None => LamadError::Io("directory walk hit a filesystem loop".to_string()),
        }
    }
}

impl From<fmt::Error> for LamadError {
    fn from(x: fmt::Error) -> Self {
        LamadError::Codec(format!("{x}"))
    }
}

impl From<RegexError> for LamadError {
    fn from(x: RegexError) -> Self {
        LamadError::Serialization(format!("Regex parse failed: {x}"))
    }
}
