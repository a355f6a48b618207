//! Error types for libhub-core.

use std::path::PathBuf;

use libhub_config::error::ConfigError;
use libhub_db::DbError;
use libhub_registry::RegistryError;
use libhub_utils::error::{FileSystemError, HashError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystemError(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    HashError(#[from] HashError),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(libhub_core::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} failed: {message}")]
    #[diagnostic(
        code(libhub_core::git),
        help("Check that git is installed and the repository is reachable")
    )]
    Git { command: String, message: String },

    #[error("checkout of tag `{tag}` failed: {message}")]
    #[diagnostic(code(libhub_core::checkout))]
    Checkout { tag: String, message: String },

    #[error("invalid library metadata: {0}")]
    #[diagnostic(code(libhub_core::metadata))]
    Metadata(String),

    #[error("{0}")]
    #[diagnostic(code(libhub_core::validation))]
    Validation(String),

    #[error("{0}")]
    #[diagnostic(code(libhub_core::unchanged))]
    Unchanged(String),

    #[error("{tool} failed: {message}")]
    #[diagnostic(code(libhub_core::scan))]
    Scan {
        tool: String,
        message: String,
        report: String,
    },

    #[error("Symlink not allowed: {} -> {}", path.display(), target.display())]
    #[diagnostic(
        code(libhub_core::symlink),
        help("Release archives cannot contain symbolic links")
    )]
    Symlink { path: PathBuf, target: PathBuf },

    #[error("Database file not found at {}. Check the libraries_db configuration value.", path.display())]
    #[diagnostic(code(libhub_core::catalog_missing))]
    CatalogMissing { path: PathBuf },

    #[error("archiving into zip: {0}")]
    #[diagnostic(code(libhub_core::zip))]
    Zip(#[from] zip::result::ZipError),

    #[error("walking source tree: {0}")]
    #[diagnostic(code(libhub_core::walk))]
    Walk(#[from] walkdir::Error),

    #[error("invalid repository URL `{url}`: {source}")]
    #[diagnostic(code(libhub_core::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;

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
            CoreError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
