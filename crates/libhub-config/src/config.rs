use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    thread,
};

use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_LINT_PATH: &str = "arduino-lint";

/// Application's configuration
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Prefix prepended to the archive path to build a release download URL.
    pub base_download_url: String,

    /// Root folder where release archives are written.
    pub libraries_folder: PathBuf,

    /// Path of the catalog JSON document.
    pub libraries_db: PathBuf,

    /// Path of the public index JSON document.
    pub libraries_index: PathBuf,

    /// Root folder for local repository clones.
    pub git_clones_folder: PathBuf,

    /// Root folder for per-repository log files.
    /// Default: none, logs only go to stdout
    pub logs_folder: Option<PathBuf>,

    /// Skip the security scan of release sources.
    /// Default: false
    #[serde(default)]
    pub skip_security_scan: bool,

    /// Lint tool executable.
    /// Default: arduino-lint
    pub lint_path: Option<PathBuf>,

    /// Number of repositories synchronized in parallel.
    /// Default: number of available cores
    pub workers: Option<usize>,
}

impl Config {
    /// Loads and resolves the configuration stored at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading configuration from {}", path.display());

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => {
                return Err(ConfigError::IoError {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.resolve()?;
        Ok(config)
    }

    pub fn resolve(&mut self) -> Result<()> {
        let required: [(&'static str, bool); 5] = [
            ("base_download_url", self.base_download_url.is_empty()),
            ("libraries_folder", self.libraries_folder.as_os_str().is_empty()),
            ("libraries_db", self.libraries_db.as_os_str().is_empty()),
            ("libraries_index", self.libraries_index.as_os_str().is_empty()),
            (
                "git_clones_folder",
                self.git_clones_folder.as_os_str().is_empty(),
            ),
        ];
        if let Some((key, _)) = required.iter().find(|(_, empty)| *empty) {
            return Err(ConfigError::EmptyValue { key: *key });
        }

        if self.workers == Some(0) {
            return Err(ConfigError::InvalidWorkers);
        }
        self.workers.get_or_insert_with(|| {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        });
        self.lint_path
            .get_or_insert_with(|| PathBuf::from(DEFAULT_LINT_PATH));

        Ok(())
    }

    pub fn workers(&self) -> usize {
        self.workers.unwrap_or(1)
    }

    pub fn lint_path(&self) -> &Path {
        self.lint_path
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_LINT_PATH))
    }
}
