//! Error types shared by factories and readers.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::spec::AudioSpec;

/// Coarse classification of an [`AudError`].
///
/// Callers outside the graph (players, device code) decide what to do with a
/// failure based on its kind: abort, substitute silence, or report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A factory was built with invalid parameters.
    Construction,
    /// A backing resource (file) could not be opened.
    ResourceUnavailable,
    /// The resource is in an unsupported or corrupt format.
    Decode,
    /// A spec or request makes no sense (zero rate, misaligned buffer, ...).
    Configuration,
}

/// Errors produced while building or pulling an audio graph
#[derive(Error, Debug)]
pub enum AudError {
    #[error("invalid factory parameters: {0}")]
    Construction(String),

    #[error("cannot open {}: {source}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot decode audio: {0}")]
    Decode(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("stream specs differ: {first} vs {second}")]
    SpecMismatch { first: AudioSpec, second: AudioSpec },
}

impl AudError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AudError::Construction(_) => ErrorKind::Construction,
            AudError::ResourceUnavailable { .. } => ErrorKind::ResourceUnavailable,
            AudError::Decode(_) => ErrorKind::Decode,
            AudError::Configuration(_) | AudError::SpecMismatch { .. } => ErrorKind::Configuration,
        }
    }
}

/// Result type for graph operations
pub type AudResult<T> = Result<T, AudError>;
