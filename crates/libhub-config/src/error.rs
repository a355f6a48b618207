use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(libhub_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file `{}` not found", path.display())]
    #[diagnostic(
        code(libhub_config::not_found),
        help("Create the file or pass another one with --config-file")
    )]
    NotFound { path: PathBuf },

    #[error("Invalid configuration: `{key}` must not be empty")]
    #[diagnostic(code(libhub_config::empty_value))]
    EmptyValue { key: &'static str },

    #[error("Invalid configuration: `workers` must be at least 1")]
    #[diagnostic(code(libhub_config::invalid_workers))]
    InvalidWorkers,

    #[error("Failed to read configuration file `{}`: {source}", path.display())]
    #[diagnostic(code(libhub_config::io))]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
