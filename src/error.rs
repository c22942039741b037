// error.rs - Error types for fixture resolution and lifecycle
//
// Two families of failure exist:
// - configuration defects (bad declarations, cycles, missing tables or data files)
// - collaborator failures (factory, I/O, JSON, database) which are carried
//   through untouched
//
// Nothing in this crate retries or swallows an error; every failure aborts the
// current operation and surfaces here.

use std::fmt;
use thiserror::Error;

/// Broad classification of a [`FixtureError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed declaration, circular dependency, missing table or data source.
    Config,
    /// Failure raised by a factory, data source or storage backend,
    /// including a factory that cannot build the requested identifier.
    Collaborator,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Config => write!(f, "ConfigError"),
            ErrorKind::Collaborator => write!(f, "CollaboratorError"),
        }
    }
}

/// Errors produced while resolving, loading or unloading fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("invalid fixture declaration '{name}': {reason}")]
    InvalidDeclaration { name: String, reason: String },

    #[error("a circular dependency is detected for fixture '{fixture}'")]
    CircularDependency { fixture: String },

    #[error("no fixture is registered for '{fixture}'")]
    UnknownFixture { fixture: String },

    #[error("fixture '{fixture}' has no configurable field '{field}'")]
    UnknownField { fixture: String, field: String },

    #[error("invalid value for field '{field}' of fixture '{fixture}': {reason}")]
    InvalidField {
        fixture: String,
        field: String,
        reason: String,
    },

    #[error("fixture '{fixture}' has no table configured")]
    MissingTable { fixture: String },

    #[error("table does not exist: {table}")]
    TableNotFound { table: String },

    #[error("fixture data file does not exist: {reference}")]
    MissingDataFile { reference: String },

    #[error("invalid fixture data in '{reference}': {reason}")]
    InvalidData { reference: String, reason: String },

    /// A collaborator failure, passed through with its original type intact.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

/// Result alias used across the crate.
pub type FixtureResult<T> = Result<T, FixtureError>;

impl FixtureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FixtureError::Collaborator(_) | FixtureError::UnknownFixture { .. } => ErrorKind::Collaborator,
            _ => ErrorKind::Config,
        }
    }

    pub fn is_config(&self) -> bool {
        self.kind() == ErrorKind::Config
    }

    /// Wrap an arbitrary collaborator error without altering it.
    pub fn collaborator<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FixtureError::Collaborator(anyhow::Error::new(error))
    }

    pub(crate) fn invalid_declaration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        FixtureError::InvalidDeclaration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_field(
        fixture: impl fmt::Display,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        FixtureError::InvalidField {
            fixture: fixture.to_string(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for FixtureError {
    fn from(error: std::io::Error) -> Self {
        FixtureError::collaborator(error)
    }
}

impl From<serde_json::Error> for FixtureError {
    fn from(error: serde_json::Error) -> Self {
        FixtureError::collaborator(error)
    }
}

#[cfg(feature = "db-tools")]
impl From<postgres::Error> for FixtureError {
    fn from(error: postgres::Error) -> Self {
        FixtureError::collaborator(error)
    }
}
