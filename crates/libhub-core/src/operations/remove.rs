use libhub_config::config::Config;
use libhub_db::Catalog;
use tracing::info;

use super::{backup_and_delete_archive, backup_and_delete_git_clone, run_catalog_transaction};
use crate::{
    backup::Backup,
    error::{CoreError, Result},
};

/// Removes libraries (`NAME`) or single releases (`NAME@VERSION`) with their archives.
pub fn remove_libraries<S: AsRef<str>>(config: &Config, references: &[S]) -> Result<()> {
    run_catalog_transaction(config, |catalog, backup| {
        for reference in references {
            remove_reference(config, catalog, backup, reference.as_ref())?;
        }
        Ok(())
    })
}

fn remove_reference(
    config: &Config,
    catalog: &Catalog,
    backup: &mut Backup,
    reference: &str,
) -> Result<()> {
    let (name, version) = match reference.split_once('@') {
        Some((name, "")) => {
            return Err(CoreError::Validation(format!(
                "Missing version for library name {name}. For full removal, omit the '@'"
            )));
        }
        Some((name, version)) => (name, Some(version)),
        None => (reference, None),
    };

    let library = catalog.find_library(name)?;

    match version {
        None => {
            info!("Removing {name}");
            for release in catalog.find_releases_of_library(name) {
                backup_and_delete_archive(config, backup, &library.repository, &release)?;
            }
            catalog.remove_library(name)?;
            backup_and_delete_git_clone(config, backup, &library.repository)?;
        }
        Some(version) => {
            info!("Removing {name}@{version}");
            let release = catalog.find_release(name, version)?;
            backup_and_delete_archive(config, backup, &library.repository, &release)?;
            catalog.remove_release_by_name_version(name, version)?;
        }
    }

    Ok(())
}
