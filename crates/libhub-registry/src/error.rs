//! Error types for the registry crate.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(code(libhub_registry::io))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: invalid registry entry `{content}`", path.display())]
    #[diagnostic(
        code(libhub_registry::parse),
        help("Each entry must have the form URL|type1,type2|LibraryName")
    )]
    Parse {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("Following URL are unknown or unsupported git repos: {}", urls.join(", "))]
    #[diagnostic(
        code(libhub_registry::unsupported_urls),
        help("Repository URLs must start with https:// and end with .git")
    )]
    UnsupportedUrls { urls: Vec<String> },

    #[error("Invalid URL `{url}`: {source}")]
    #[diagnostic(code(libhub_registry::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{0}")]
    #[diagnostic(code(libhub_registry::validation))]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

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
            RegistryError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
