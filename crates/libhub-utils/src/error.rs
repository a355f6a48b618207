use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum HashError {
    #[error("Failed to read file `{}`: {source}", path.display())]
    #[diagnostic(
        code(libhub_utils::hash_read),
        help("Check that the file exists and is readable")
    )]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Diagnostic, Debug)]
pub enum FileSystemError {
    #[error("Failed to {action} file `{}`: {source}", path.display())]
    #[diagnostic(
        code(libhub_utils::file),
        help("Check file permissions and disk space")
    )]
    File {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to {action} directory `{}`: {source}", path.display())]
    #[diagnostic(
        code(libhub_utils::directory),
        help("Check directory permissions and disk space")
    )]
    Directory {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("`{}` is not a directory", path.display())]
    #[diagnostic(code(libhub_utils::not_a_directory))]
    NotADirectory { path: PathBuf },

    #[error("`{}` does not exist", path.display())]
    #[diagnostic(code(libhub_utils::not_found))]
    NotFound { path: PathBuf },

    #[error("Failed to walk `{}`: {source}", path.display())]
    #[diagnostic(code(libhub_utils::walk))]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type HashResult<T> = std::result::Result<T, HashError>;
