use std::{collections::HashSet, fs, path::Path};

use tracing::debug;

use crate::{
    entry::{repo_url_valid, RepoEntry},
    error::{ErrorContext, RegistryError, Result},
};

/// Filtered registry entries along with the URLs that were rejected.
#[derive(Debug, Default)]
pub struct RepoListing {
    pub repos: Vec<RepoEntry>,
    pub rejected: Vec<String>,
}

impl RepoListing {
    /// Returns the aggregate error listing every rejected URL, if any.
    pub fn rejection(&self) -> Option<RegistryError> {
        if self.rejected.is_empty() {
            return None;
        }
        Some(RegistryError::UnsupportedUrls {
            urls: self.rejected.clone(),
        })
    }
}

/// Loads the unfiltered list of registry entries from `path`.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn load_repo_list_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<RepoEntry>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading registry file {}", path.display()))?;

    let mut repos = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let entry = RepoEntry::parse_line(line).ok_or_else(|| {
            RegistryError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                content: line.to_string(),
            }
        })?;
        repos.push(entry);
    }

    debug!("loaded {} registry entries from {}", repos.len(), path.display());
    Ok(repos)
}

/// Loads the registry entries from `path`, keeping only supported URLs and dropping duplicates.
///
/// Entries whose URL is not `https://...git` are left out of the returned list and reported in
/// [`RepoListing::rejected`]. Duplicate URLs keep their first occurrence.
pub fn list_repos<P: AsRef<Path>>(path: P) -> Result<RepoListing> {
    let repos = load_repo_list_from_file(path)?;

    let (valid, rejected): (Vec<_>, Vec<_>) =
        repos.into_iter().partition(|repo| repo_url_valid(&repo.url));

    let mut seen = HashSet::new();
    let repos = valid
        .into_iter()
        .filter(|repo| seen.insert(repo.url.clone()))
        .collect();

    Ok(RepoListing {
        repos,
        rejected: rejected.into_iter().map(|repo| repo.url).collect(),
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write_registry(content: &str) -> (TempDir, std::path::PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("repos.txt");
        fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_load_skips_comments_and_blank_lines() {
        let (_tmp, path) = write_registry(
            "# comment\n\nhttps://github.com/a/one.git|Contributed|One\n   \nhttps://github.com/a/two.git|Arduino,Retired|Two\n",
        );
        let repos = load_repo_list_from_file(&path).unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].library_name, "One");
        assert_eq!(repos[1].types, vec!["Arduino", "Retired"]);
    }

    #[test]
    fn test_load_malformed_line() {
        let (_tmp, path) =
            write_registry("https://github.com/a/one.git|Contributed|One\nbroken|line\n");
        let err = load_repo_list_from_file(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_repo_list_from_file("/no/such/registry.txt").unwrap_err();
        assert!(matches!(err, RegistryError::IoError { .. }));
    }

    #[test]
    fn test_list_repos_rejects_unsupported_urls() {
        let (_tmp, path) = write_registry(
            "https://github.com/a/one.git|Contributed|One\n\
             http://github.com/a/two.git|Contributed|Two\n\
             https://github.com/a/three|Contributed|Three\n\
             https://github.com/a/four.git|Contributed|Four\n",
        );
        let listing = list_repos(&path).unwrap();
        let names: Vec<_> = listing
            .repos
            .iter()
            .map(|r| r.library_name.as_str())
            .collect();
        assert_eq!(names, vec!["One", "Four"]);
        assert_eq!(
            listing.rejected,
            vec!["http://github.com/a/two.git", "https://github.com/a/three"]
        );

        match listing.rejection() {
            Some(RegistryError::UnsupportedUrls { urls }) => assert_eq!(urls.len(), 2),
            other => panic!("unexpected rejection: {other:?}"),
        }
    }

    #[test]
    fn test_list_repos_dedups_keeping_first() {
        let (_tmp, path) = write_registry(
            "https://github.com/a/one.git|Contributed|First\n\
             https://github.com/a/two.git|Contributed|Two\n\
             https://github.com/a/one.git|Arduino|Second\n",
        );
        let listing = list_repos(&path).unwrap();
        let names: Vec<_> = listing
            .repos
            .iter()
            .map(|r| r.library_name.as_str())
            .collect();
        assert_eq!(names, vec!["First", "Two"]);
        assert!(listing.rejection().is_none());
    }
}
