//! Error types for metadata fetching and materialization.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when fetching metadata from a provider.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The requested metadata was not found.
    #[error("metadata not found")]
    NotFound,

    /// HTTP error with status code.
    #[error("http {status} from {url}")]
    Http { status: u16, url: String },

    /// Response was not valid UTF-8.
    #[error("invalid utf-8")]
    Utf8,

    /// JSON deserialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response exceeds maximum allowed size.
    #[error("response too large: {0} bytes exceeds limit of {1} bytes")]
    TooLarge(usize, usize),
}

/// Errors from resolving a user or updating their authorized keys.
#[derive(Debug, Error)]
pub enum KeysError {
    /// The user does not exist in the system user database.
    #[error("unable to lookup user \"{0}\": no such user")]
    UnknownUser(String),

    /// The `authorized_keys.d` store rejected an operation.
    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl KeysError {
    pub(crate) fn store(context: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Store {
            context,
            source: source.into(),
        }
    }
}

/// Top-level errors of a single invocation.
#[derive(Debug, Error)]
pub enum Error {
    /// No provider was given and none could be found on the kernel command line.
    #[error("invalid provider \"{0}\"")]
    InvalidProvider(String),

    /// The kernel command line could not be read.
    #[error("could not read cmdline {path}")]
    Cmdline {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The provider fetch failed.
    #[error("failed to fetch metadata")]
    Fetch(#[source] MetadataError),

    /// The attribute file could not be produced.
    #[error("failed to write metadata attributes")]
    Attributes(#[source] io::Error),

    /// SSH key installation failed.
    #[error("failed to write metadata keys")]
    Keys(#[source] KeysError),
}

impl Error {
    /// Process exit code for this error: 2 for configuration, 1 for runtime failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidProvider(_) | Error::Cmdline { .. } => 2,
            Error::Fetch(_) | Error::Attributes(_) | Error::Keys(_) => 1,
        }
    }
}
