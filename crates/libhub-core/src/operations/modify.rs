use std::fs;

use libhub_config::config::Config;
use libhub_db::{Catalog, Library};
use libhub_registry::repo_url_valid;
use libhub_utils::fs::ensure_dir_exists;
use tracing::{info, warn};

use super::{backup_and_delete_git_clone, run_catalog_transaction};
use crate::{
    archive::Archive,
    backup::Backup,
    error::{CoreError, ErrorContext, Result},
};

/// Changes requested for one library. At least one field must be set.
#[derive(Debug, Clone, Default)]
pub struct ModifyRequest {
    pub library: String,
    pub repo_url: Option<String>,
    pub types: Option<Vec<String>>,
}

/// Splits a comma separated type list, dropping blanks.
pub fn parse_types(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

pub fn modify_library(config: &Config, request: &ModifyRequest) -> Result<()> {
    if request.repo_url.is_none() && request.types.is_none() {
        return Err(CoreError::Validation(
            "No modification flags provided so nothing happened. See 'libhub modify --help'"
                .to_string(),
        ));
    }
    if let Some(url) = &request.repo_url {
        if !repo_url_valid(url) {
            return Err(CoreError::Validation(format!(
                "Library URL {url} does not have a valid format"
            )));
        }
    }

    run_catalog_transaction(config, |catalog, backup| {
        let library = catalog.find_library(&request.library)?;

        if let Some(url) = &request.repo_url {
            modify_repo_url(config, catalog, backup, &library, url)?;
        }
        if let Some(types) = &request.types {
            modify_types(catalog, &library.name, types)?;
        }
        Ok(())
    })
}

/// Points the library to a new repository and moves its archives to match.
fn modify_repo_url(
    config: &Config,
    catalog: &Catalog,
    backup: &mut Backup,
    library: &Library,
    new_url: &str,
) -> Result<()> {
    if library.repository == new_url {
        return Err(CoreError::Unchanged(format!(
            "Library {} already has URL {}",
            library.name, new_url
        )));
    }

    info!(
        "Changing URL of library {} from {} to {}",
        library.name, library.repository, new_url
    );

    backup_and_delete_git_clone(config, backup, &library.repository)?;

    for release in catalog.find_releases_of_library(&library.name) {
        let version = release.version.as_str();
        let old = Archive::locate(&library.repository, &library.name, version, config)?;
        let new = Archive::locate(new_url, &library.name, version, config)?;

        if old.path.exists() {
            if let Some(parent) = new.path.parent() {
                ensure_dir_exists(parent)?;
            }
            backup.backup(&old.path)?;
            fs::rename(&old.path, &new.path).with_context(|| {
                format!(
                    "moving {} to {}",
                    old.path.display(),
                    new.path.display()
                )
            })?;
        } else {
            warn!(
                "Archive {} does not exist, not moving it",
                old.path.display()
            );
        }

        catalog.update_release(&library.name, version, |release| {
            release.url = new.url.clone();
        })?;
    }

    catalog.update_library(&library.name, |library| {
        library.repository = new_url.to_string();
    })?;
    Ok(())
}

fn same_types(current: &[String], wanted: &[String]) -> bool {
    current.len() == wanted.len() && current.iter().all(|t| wanted.contains(t))
}

/// Replaces the type list of every release of the library.
fn modify_types(catalog: &Catalog, name: &str, types: &[String]) -> Result<()> {
    let releases = catalog.find_releases_of_library(name);
    if releases
        .iter()
        .all(|release| same_types(&release.types, types))
    {
        return Err(CoreError::Unchanged(format!(
            "Library {} already has types {}",
            name,
            types.join(", ")
        )));
    }

    info!("Changing types of library {} to {}", name, types.join(", "));
    for release in &releases {
        catalog.update_release(name, release.version.as_str(), |release| {
            release.types = types.to_vec();
        })?;
    }
    Ok(())
}
