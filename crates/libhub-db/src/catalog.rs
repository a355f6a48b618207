//! Disk-persisted catalog of libraries and releases.
//!
//! Every operation goes through one catalog-wide lock. Mutations are expected to be followed by
//! [`Catalog::commit`], which rewrites the whole document atomically.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use libhub_utils::fs::ensure_dir_exists;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{
    error::{DbError, ErrorContext, Result},
    index::{IndexEntry, LibraryIndex},
    models::{Library, Release},
};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogDocument {
    #[serde(default, deserialize_with = "null_as_empty")]
    libraries: Vec<Library>,
    #[serde(default, deserialize_with = "null_as_empty")]
    releases: Vec<Release>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

impl CatalogDocument {
    fn find_library(&self, name: &str) -> Option<&Library> {
        self.libraries.iter().find(|lib| lib.name == name)
    }

    fn find_library_mut(&mut self, name: &str) -> Option<&mut Library> {
        self.libraries.iter_mut().find(|lib| lib.name == name)
    }

    fn find_release(&self, name: &str, version: &str) -> Option<&Release> {
        self.releases.iter().find(|rel| rel.is(name, version))
    }

    fn releases_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Release> + 'a {
        self.releases
            .iter()
            .filter(move |rel| rel.library_name == name)
    }

    fn add_library(&mut self, library: Library) -> Result<()> {
        if self.find_library(&library.name).is_some() {
            return Err(DbError::LibraryExists(library.name));
        }
        self.libraries.push(library);
        Ok(())
    }

    fn add_release(&mut self, release: Release, repo_url: &str) -> Result<()> {
        if self.find_library(&release.library_name).is_none() {
            return Err(DbError::LibraryNotFound(release.library_name));
        }
        if self
            .find_release(&release.library_name, release.version.as_str())
            .is_some()
        {
            return Err(DbError::ReleaseExists {
                name: release.library_name,
                version: release.version.to_string(),
            });
        }

        let name = release.library_name.clone();
        self.releases.push(release);

        let latest_category = self
            .releases_of(&name)
            .reduce(|latest, rel| {
                if latest.version.less(&rel.version) {
                    rel
                } else {
                    latest
                }
            })
            .map(|rel| rel.category.clone())
            .unwrap_or_default();

        if let Some(library) = self.find_library_mut(&name) {
            library.repository = repo_url.to_string();
            library.latest_category = latest_category;
        }

        Ok(())
    }
}

pub struct Catalog {
    path: PathBuf,
    state: Mutex<CatalogDocument>,
}

impl Catalog {
    /// Creates an empty catalog that will be persisted at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Mutex::new(CatalogDocument::default()),
        }
    }

    /// Loads the catalog document stored at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let document: CatalogDocument = serde_json::from_slice(&content)?;

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(document),
        })
    }

    /// Loads the catalog at `path`, starting with an empty one when it cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(catalog) => {
                info!("Loaded {} libraries from DB", catalog.library_count());
                catalog
            }
            Err(err) => {
                warn!("{err}");
                warn!("starting with an empty DB");
                Self::new(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, CatalogDocument> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn library_count(&self) -> usize {
        self.lock().libraries.len()
    }

    pub fn release_count(&self) -> usize {
        self.lock().releases.len()
    }

    pub fn add_library(&self, library: Library) -> Result<()> {
        self.lock().add_library(library)
    }

    /// Adds a release to an existing library.
    ///
    /// The library's repository is set to `repo_url` and its latest category is recomputed from
    /// the release with the greatest version.
    pub fn add_release(&self, release: Release, repo_url: &str) -> Result<()> {
        self.lock().add_release(release, repo_url)
    }

    /// Records a freshly packaged release and persists the catalog.
    ///
    /// The owning library is created when missing. Returns `false` without touching the catalog
    /// when the release is already present.
    pub fn record_release(&self, release: Release, repo_url: &str) -> Result<bool> {
        let mut state = self.lock();

        if state.find_library(&release.library_name).is_none() {
            state.add_library(Library::new(release.library_name.clone(), repo_url))?;
        }
        if state
            .find_release(&release.library_name, release.version.as_str())
            .is_some()
        {
            return Ok(false);
        }

        state.add_release(release, repo_url)?;
        self.save(&state)?;
        Ok(true)
    }

    pub fn has_library(&self, name: &str) -> bool {
        self.lock().find_library(name).is_some()
    }

    pub fn has_release_by_name_version(&self, name: &str, version: &str) -> bool {
        self.lock().find_release(name, version).is_some()
    }

    pub fn find_library(&self, name: &str) -> Result<Library> {
        self.lock()
            .find_library(name)
            .cloned()
            .ok_or_else(|| DbError::LibraryNotFound(name.to_string()))
    }

    pub fn find_release(&self, name: &str, version: &str) -> Result<Release> {
        self.lock()
            .find_release(name, version)
            .cloned()
            .ok_or_else(|| {
                DbError::ReleaseNotFound {
                    name: name.to_string(),
                    version: version.to_string(),
                }
            })
    }

    pub fn find_releases_of_library(&self, name: &str) -> Vec<Release> {
        self.lock().releases_of(name).cloned().collect()
    }

    /// Removes a library together with all of its releases.
    pub fn remove_library(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        let before = state.libraries.len();
        state.libraries.retain(|lib| lib.name != name);
        if state.libraries.len() == before {
            return Err(DbError::LibraryNotFound(name.to_string()));
        }
        state.releases.retain(|rel| rel.library_name != name);
        Ok(())
    }

    pub fn remove_release_by_name_version(&self, name: &str, version: &str) -> Result<()> {
        let mut state = self.lock();
        let position = state
            .releases
            .iter()
            .position(|rel| rel.is(name, version))
            .ok_or_else(|| {
                DbError::ReleaseNotFound {
                    name: name.to_string(),
                    version: version.to_string(),
                }
            })?;
        state.releases.remove(position);
        Ok(())
    }

    /// Removes every release of a library, keeping the library itself.
    pub fn remove_releases(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        if state.find_library(name).is_none() {
            return Err(DbError::LibraryNotFound(name.to_string()));
        }
        state.releases.retain(|rel| rel.library_name != name);
        Ok(())
    }

    pub fn update_library<F>(&self, name: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut Library),
    {
        let mut state = self.lock();
        let library = state
            .find_library_mut(name)
            .ok_or_else(|| DbError::LibraryNotFound(name.to_string()))?;
        update(library);
        Ok(())
    }

    pub fn update_release<F>(&self, name: &str, version: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut Release),
    {
        let mut state = self.lock();
        let release = state
            .releases
            .iter_mut()
            .find(|rel| rel.is(name, version))
            .ok_or_else(|| {
                DbError::ReleaseNotFound {
                    name: name.to_string(),
                    version: version.to_string(),
                }
            })?;
        update(release);
        Ok(())
    }

    /// Atomically rewrites the catalog document on disk.
    pub fn commit(&self) -> Result<()> {
        let state = self.lock();
        self.save(&state)
    }

    fn save(&self, state: &CatalogDocument) -> Result<()> {
        let content = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path, &content)?;
        debug!(
            "committed {} libraries and {} releases to {}",
            state.libraries.len(),
            state.releases.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Projects every packaged release into the public index.
    ///
    /// Releases with a zero size or an empty checksum are left out.
    pub fn output_library_index(&self) -> LibraryIndex {
        let state = self.lock();
        let document: &CatalogDocument = &state;
        let libraries = document
            .libraries
            .iter()
            .flat_map(|library| {
                document
                    .releases_of(&library.name)
                    .filter(|release| release.is_indexable())
                    .map(move |release| IndexEntry::project(library, release))
            })
            .collect();

        LibraryIndex {
            libraries,
        }
    }

    /// Writes the public index as pretty-printed JSON.
    pub fn write_index<P: AsRef<Path>>(&self, path: P) -> Result<LibraryIndex> {
        let index = self.output_library_index();
        let content = serde_json::to_vec_pretty(&index)?;
        write_atomic(path.as_ref(), &content)?;
        Ok(index)
    }
}

/// Writes `content` to a sibling temporary file and renames it over `path`.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir_exists(parent)?;

    let mut file = NamedTempFile::new_in(parent)
        .with_context(|| format!("creating temporary file in {}", parent.display()))?;
    file.write_all(content)
        .with_context(|| format!("writing {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .with_context(|| format!("setting permissions of {}", path.display()))?;
    }
    file.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replacing {}", path.display()))?;

    Ok(())
}
