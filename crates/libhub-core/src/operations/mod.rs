//! Maintenance commands that edit the catalog and the files it points to.
//!
//! Each command runs as a transaction: every file is backed up before it changes, and a failure
//! anywhere puts all of them back.

use std::path::Path;

use libhub_config::config::Config;
use libhub_db::{Catalog, Release};
use libhub_registry::repo_folder;
use libhub_utils::fs::safe_remove;
use tracing::{debug, error, info, warn};

use crate::{
    archive::Archive,
    backup::Backup,
    error::{CoreError, Result},
};

pub mod modify;
pub mod remove;

pub use modify::{modify_library, parse_types, ModifyRequest};
pub use remove::remove_libraries;

/// Loads the catalog, hands it to `action` and commits it.
///
/// The catalog file and everything `action` backs up are restored when any step fails, and the
/// snapshots are discarded on success.
pub fn run_catalog_transaction<F>(config: &Config, action: F) -> Result<()>
where
    F: FnOnce(&Catalog, &mut Backup) -> Result<()>,
{
    let db_path = &config.libraries_db;
    if !db_path.exists() {
        return Err(CoreError::CatalogMissing {
            path: db_path.clone(),
        });
    }

    let mut backup = Backup::new();
    match apply(db_path, &mut backup, action) {
        Ok(()) => {
            backup.clean()?;
            info!("Success!");
            Ok(())
        }
        Err(err) => {
            match backup.restore() {
                Ok(()) => info!("Original files were restored."),
                Err(restore_err) => error!("Unable to restore original files: {restore_err}"),
            }
            Err(err)
        }
    }
}

fn apply<F>(db_path: &Path, backup: &mut Backup, action: F) -> Result<()>
where
    F: FnOnce(&Catalog, &mut Backup) -> Result<()>,
{
    backup.backup(db_path)?;
    let catalog = Catalog::load(db_path)?;
    action(&catalog, backup)?;
    catalog.commit()?;
    Ok(())
}

/// Backs up then deletes the local clone of `repo_url`, if there is one.
pub fn backup_and_delete_git_clone(
    config: &Config,
    backup: &mut Backup,
    repo_url: &str,
) -> Result<()> {
    let clone_path = config.git_clones_folder.join(repo_folder(repo_url)?);
    if !clone_path.exists() {
        debug!("no clone at {}", clone_path.display());
        return Ok(());
    }

    backup.backup(&clone_path)?;
    safe_remove(&clone_path)?;
    Ok(())
}

/// Backs up then deletes the archive of `release`, skipping archives that are already gone.
pub fn backup_and_delete_archive(
    config: &Config,
    backup: &mut Backup,
    repo_url: &str,
    release: &Release,
) -> Result<()> {
    let archive = Archive::locate(
        repo_url,
        &release.library_name,
        release.version.as_str(),
        config,
    )?;
    if !archive.path.exists() {
        warn!(
            "Archive {} of {}@{} does not exist, skipping",
            archive.path.display(),
            release.library_name,
            release.version
        );
        return Ok(());
    }

    backup.backup(&archive.path)?;
    safe_remove(&archive.path)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::{fs, path::PathBuf};

    use libhub_db::{Library, Version};
    use tempfile::TempDir;

    use super::*;

    pub const SERVO_URL: &str = "https://github.com/arduino-libraries/Servo.git";
    pub const VERSIONS: [&str; 2] = ["1.0.0", "1.1.0"];

    /// A catalog holding `Servo` with two archived releases and a local clone.
    pub struct Fixture {
        pub dir: TempDir,
        pub config: Config,
    }

    impl Fixture {
        pub fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = Config::parse(&format!(
                r#"
                base_download_url = "https://downloads.example.com/"
                libraries_folder = "{0}/libraries"
                libraries_db = "{0}/db.json"
                libraries_index = "{0}/index.json"
                git_clones_folder = "{0}/gitclones"
                "#,
                dir.path().display()
            ))
            .unwrap();

            let catalog = Catalog::new(&config.libraries_db);
            catalog.add_library(Library::new("Servo", SERVO_URL)).unwrap();
            for version in VERSIONS {
                let archive = Archive::locate(SERVO_URL, "Servo", version, &config).unwrap();
                fs::create_dir_all(archive.path.parent().unwrap()).unwrap();
                fs::write(&archive.path, format!("zip {version}")).unwrap();

                let release = Release {
                    library_name: "Servo".to_string(),
                    version: Version::from(version),
                    types: vec!["Arduino".to_string()],
                    url: archive.url,
                    archive_file_name: archive.file_name,
                    size: 9,
                    checksum: "SHA-256:00".to_string(),
                    ..Default::default()
                };
                catalog.add_release(release, SERVO_URL).unwrap();
            }
            catalog.commit().unwrap();

            let clone = Fixture::clone_path_of(&config, SERVO_URL);
            fs::create_dir_all(&clone).unwrap();
            fs::write(clone.join("library.properties"), "name=Servo\n").unwrap();

            Self {
                dir,
                config,
            }
        }

        fn clone_path_of(config: &Config, url: &str) -> PathBuf {
            config.git_clones_folder.join(repo_folder(url).unwrap())
        }

        pub fn clone_path(&self, url: &str) -> PathBuf {
            Self::clone_path_of(&self.config, url)
        }

        pub fn archive(&self, url: &str, version: &str) -> Archive {
            Archive::locate(url, "Servo", version, &self.config).unwrap()
        }

        pub fn catalog(&self) -> Catalog {
            Catalog::load(&self.config.libraries_db).unwrap()
        }

        pub fn db_content(&self) -> String {
            fs::read_to_string(&self.config.libraries_db).unwrap()
        }
    }
}
