use std::{collections::HashSet, fs, path::Path};

use crate::{
    error::{ErrorContext, RegistryError, Result},
    loader::{list_repos, load_repo_list_from_file},
};

pub const VALID_TYPES: [&str; 5] = ["Arduino", "Contributed", "Partner", "Recommended", "Retired"];

/// Validates the format and correctness of a registry file.
pub fn check_registry<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    let metadata = fs::metadata(path)
        .with_context(|| format!("loading registry data file {}", path.display()))?;
    if metadata.is_dir() {
        return Err(RegistryError::Validation(format!(
            "registry data file argument {} is a folder, not a file",
            path.display()
        )));
    }

    let raw = load_repo_list_from_file(path)?;
    let listing = list_repos(path)?;
    if let Some(err) = listing.rejection() {
        return Err(err);
    }
    if raw != listing.repos {
        return Err(RegistryError::Validation(
            "registry data file contains duplicate URLs".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for entry in &raw {
        if entry.types.iter().all(|t| t.is_empty()) {
            return Err(RegistryError::Validation(format!(
                "type not specified for library '{}'",
                entry.library_name
            )));
        }
        if let Some(invalid) = entry
            .types
            .iter()
            .find(|t| !VALID_TYPES.contains(&t.as_str()))
        {
            return Err(RegistryError::Validation(format!(
                "invalid type '{}' used by library '{}'",
                invalid, entry.library_name
            )));
        }
        if !names.insert(entry.library_name.as_str()) {
            return Err(RegistryError::Validation(format!(
                "registry data file contains duplicates of name '{}'",
                entry.library_name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn check(content: &str) -> Result<()> {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("registry.txt");
        fs::write(&path, content).unwrap();
        check_registry(&path)
    }

    fn validation_message(result: Result<()>) -> String {
        match result {
            Err(RegistryError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_registry() {
        check(
            "https://github.com/a/one.git|Arduino,Retired|One\n\
             https://github.com/a/two.git|Contributed|Two\n",
        )
        .unwrap();
    }

    #[test]
    fn test_folder_is_rejected() {
        let tmp = tempdir().unwrap();
        let msg = validation_message(check_registry(tmp.path()));
        assert!(msg.contains("is a folder, not a file"));
    }

    #[test]
    fn test_missing_file() {
        let result = check_registry("/does/not/exist.txt");
        assert!(matches!(result, Err(RegistryError::IoError { .. })));
    }

    #[test]
    fn test_unsupported_url() {
        let result = check("http://github.com/a/one.git|Arduino|One\n");
        assert!(matches!(
            result,
            Err(RegistryError::UnsupportedUrls { .. })
        ));
    }

    #[test]
    fn test_duplicate_url() {
        let msg = validation_message(check(
            "https://github.com/a/one.git|Arduino|One\n\
             https://github.com/a/one.git|Arduino|Two\n",
        ));
        assert_eq!(msg, "registry data file contains duplicate URLs");
    }

    #[test]
    fn test_missing_type() {
        let msg = validation_message(check("https://github.com/a/one.git||One\n"));
        assert_eq!(msg, "type not specified for library 'One'");
    }

    #[test]
    fn test_invalid_type() {
        let msg = validation_message(check("https://github.com/a/one.git|Arduino,Foo|One\n"));
        assert_eq!(msg, "invalid type 'Foo' used by library 'One'");
    }

    #[test]
    fn test_duplicate_name() {
        let msg = validation_message(check(
            "https://github.com/a/one.git|Arduino|Same\n\
             https://github.com/a/two.git|Arduino|Same\n",
        ));
        assert_eq!(msg, "registry data file contains duplicates of name 'Same'");
    }
}
