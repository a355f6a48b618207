//! Error types for libhub-db.

use libhub_utils::error::FileSystemError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("library `{0}` already exists")]
    #[diagnostic(code(libhub_db::library_exists))]
    LibraryExists(String),

    #[error("release `{name}@{version}` already exists")]
    #[diagnostic(code(libhub_db::release_exists))]
    ReleaseExists { name: String, version: String },

    #[error("library `{0}` not found")]
    #[diagnostic(
        code(libhub_db::library_not_found),
        help("Check the library name against the catalog")
    )]
    LibraryNotFound(String),

    #[error("release `{name}@{version}` not found")]
    #[diagnostic(code(libhub_db::release_not_found))]
    ReleaseNotFound { name: String, version: String },

    #[error("invalid dependency: `{0}`")]
    #[diagnostic(
        code(libhub_db::invalid_dependency),
        help("Dependencies must be a comma separated list of `NAME` or `NAME (CONSTRAINT)`")
    )]
    InvalidDependency(String),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(libhub_db::io))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    #[diagnostic(
        code(libhub_db::json),
        help("The catalog file may be corrupted or in an invalid format")
    )]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] FileSystemError),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            DbError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
