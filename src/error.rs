//! Crate-wide error types.
#![allow(dead_code)]

use thiserror::Error;

/// Errors raised while building or querying the [`crate::catalog::Catalog`].
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate command set id: {0}")]
    DuplicateSetId(String),

    #[error("duplicate command set prefix: {0}")]
    DuplicatePrefix(String),

    #[error("duplicate category id: {0}")]
    DuplicateCategoryId(String),

    #[error("access list not found: {0}")]
    NotFound(String),

    #[error("access list '{0}' is still referenced by a command set and cannot be removed")]
    ReferentialIntegrity(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Errors from outbound connection management.
#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("connection {0} is not registered")]
    UnknownConnection(String),

    #[error("connection {0} is not open")]
    NotOpen(String),

    #[error("timed out waiting for a response from {0}")]
    Timeout(String),
}

/// Errors while loading or saving the YAML configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to render config for saving: {0}")]
    Render(#[from] serde_json::Error),
}

/// Errors from the (out-of-scope, trait-only) persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation failed: {0}")]
    Backend(String),
}
