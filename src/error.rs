//! Error taxonomy for the portfolio engine.
//!
//! Every rejected operation carries the offending key(s) so that callers can
//! render an actionable message.

use std::fmt;

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Category of a [`PortfolioError`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    InvalidReference,
    AlreadySelected,
    Integrity,
    Database,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            Self::InvalidReference => write!(f, "INVALID_REFERENCE"),
            Self::AlreadySelected => write!(f, "ALREADY_SELECTED"),
            Self::Integrity => write!(f, "INTEGRITY"),
            Self::Database => write!(f, "DATABASE"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PortfolioError {
    /// A portfolio, project, application or branch key does not resolve.
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// Rejected before any write took place.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The reference would couple a tree with itself, directly or through
    /// existing references.
    #[error("portfolio '{source_key}' cannot reference '{target_key}': {reason}")]
    InvalidReference {
        source_key: String,
        target_key: String,
        reason: String,
    },

    /// The project is already manually selected somewhere in the hierarchy.
    /// `holder` is unknown only when a concurrent writer won the race.
    #[error(
        "project '{project_key}' is already selected in portfolio '{}'",
        .holder.as_deref().unwrap_or("<concurrent selection>")
    )]
    AlreadySelected {
        project_key: String,
        holder: Option<String>,
    },

    /// Persisted hierarchy breaks root identity or acyclicity.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PortfolioError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn invalid_reference(
        source_key: impl Into<String>,
        target_key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidReference {
            source_key: source_key.into(),
            target_key: target_key.into(),
            reason: reason.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidReference { .. } => ErrorKind::InvalidReference,
            Self::AlreadySelected { .. } => ErrorKind::AlreadySelected,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Database(_) => ErrorKind::Database,
        }
    }

    /// Whether the underlying database rejected a write on a unique index.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(err) => {
                matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PortfolioError>;
