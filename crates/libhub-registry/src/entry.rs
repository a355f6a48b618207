use url::Url;

use crate::error::{RegistryError, Result};

/// One entry of the registry file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoEntry {
    pub url: String,
    pub types: Vec<String>,
    pub library_name: String,
}

impl RepoEntry {
    /// Parses a `URL|type1,type2|LibraryName` line.
    ///
    /// Returns `None` when the line has fewer than three pipe-delimited fields.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split('|');
        let url = fields.next()?;
        let types = fields.next()?;
        let library_name = fields.next()?;

        Some(Self {
            url: url.to_string(),
            types: types.split(',').map(String::from).collect(),
            library_name: library_name.to_string(),
        })
    }

    /// Returns the repository URL as a relative folder path. See [`repo_folder`].
    pub fn as_folder(&self) -> Result<String> {
        repo_folder(&self.url)
    }

    pub fn has_type(&self, kind: &str) -> bool {
        self.types.iter().any(|t| t == kind)
    }
}

/// Maps a repository URL to a relative folder path, without scheme or `.git` suffix.
///
/// `https://github.com/example/lib.git` becomes `github.com/example/lib`.
pub fn repo_folder(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|err| {
        RegistryError::InvalidUrl {
            url: url.to_string(),
            source: err,
        }
    })?;

    let path = parsed.path().replace(".git", "");
    let path = path.trim_matches('/');
    let host = parsed.host_str().unwrap_or_default();

    Ok(match (host.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => host.to_string(),
        (false, false) => format!("{host}/{path}"),
    })
}

/// Checks that a repository URL uses `https://` and points to a `.git` repository.
pub fn repo_url_valid(url: &str) -> bool {
    url.starts_with("https://") && url.ends_with(".git")
}
