//! Error taxonomy shared by every stage of a sync run.
//!
//! Remote calls made through the [`crate::contract`] traits fail with the boxed
//! [`ApiError`]; everything that reaches a caller of this crate is a [`SyncError`].

use std::path::PathBuf;
use std::time::Duration;

/// Boxed error returned by remote client and session implementations.
pub type ApiError = Box<dyn std::error::Error + Send + Sync>;

/// A remote emoji payload that does not have the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("expected emoji payload to be an object, got {0}")]
    NotAnObject(String),

    #[error("emoji payload is missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("emoji payload field `{field}` has the wrong type: {detail}")]
    WrongType { field: &'static str, detail: String },
}

/// Problems with the local emoji directory.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read emoji directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read emoji image {path:?}: {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("emoji name `{name}` is provided by both {first:?} and {second:?}")]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("emoji file {0:?} has no usable name")]
    InvalidName(PathBuf),

    #[error("emoji image {path:?} is {size} bytes, over the {limit} byte limit")]
    TooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("connection failed before becoming ready: {0}")]
    ConnectionStartup(ApiError),

    #[error("connection did not shut down within {0:?}")]
    ConnectionTimeout(Duration),

    #[error("connection failed while shutting down: {0}")]
    ConnectionShutdown(ApiError),

    #[error("remote call `{call}` failed: {source}")]
    RemoteCall {
        call: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn remote(call: &'static str, source: ApiError) -> Self {
        SyncError::RemoteCall { call, source }
    }
}
