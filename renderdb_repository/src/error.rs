// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for the geometry repository.

use thiserror::Error;

use crate::object::ObjectId;

/// Repository and backing store errors.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The object handed to `add` cannot be stored (e.g. inverted or non-finite bounds).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A filter option was rejected before any spatial work began.
    #[error("argument {position} is not a valid option: {reason}")]
    InvalidOption {
        /// Zero-based position of the offending option.
        position: usize,
        /// Why it was rejected.
        reason: String,
    },

    /// Metadata could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQL backing store failure.
    #[error("store error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Other backing store failure.
    #[error("store error: {0}")]
    Store(String),

    /// Fewer objects were hydrated than identifiers requested.
    #[error("expected {expected} rows, but got {actual}")]
    NotFound {
        /// Number of identifiers requested.
        expected: usize,
        /// Number of objects actually delivered.
        actual: usize,
    },

    /// The backing store handed out an identifier the spatial index already holds.
    #[error("identifier {0} is already indexed")]
    DuplicateId(ObjectId),
}

/// Coarse classification of a [`RepositoryError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`RepositoryError::InvalidInput`].
    InvalidInput,
    /// See [`RepositoryError::InvalidOption`].
    InvalidOption,
    /// See [`RepositoryError::Serialization`].
    Serialization,
    /// Any failure of the backing store, including identifier clashes.
    Store,
    /// See [`RepositoryError::NotFound`].
    NotFound,
}

impl RepositoryError {
    /// Which class of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InvalidOption { .. } => ErrorKind::InvalidOption,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Sqlx(_) | Self::Store(_) | Self::DuplicateId(_) => ErrorKind::Store,
            Self::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    pub(crate) fn invalid_option(position: usize, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            position,
            reason: reason.into(),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
