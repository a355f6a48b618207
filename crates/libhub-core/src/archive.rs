//! Release archives.

use std::{
    fs::{self, File},
    io,
    path::{Component, Path, PathBuf},
};

use libhub_config::config::Config;
use libhub_utils::{
    fs::{ensure_dir_exists, safe_remove},
    hash::calculate_checksum,
};
use tracing::debug;
use url::Url;
use walkdir::{DirEntry, WalkDir};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::error::{CoreError, ErrorContext, Result};

/// Version-control folders never shipped in an archive.
const SCCS_FOLDERS: [&str; 6] = ["CVS", "RCS", ".git", ".svn", ".hg", ".bzr"];

/// Replaces every character that is not ASCII alphanumeric with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Location and content summary of the zip archive of one release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Archive {
    /// Name of the single top-level folder inside the archive.
    pub root_name: String,
    pub file_name: String,
    pub path: PathBuf,
    pub url: String,
    pub size: i64,
    pub checksum: String,
}

impl Archive {
    /// Computes where the archive of `name@version` from `repo_url` lives on disk and where it is
    /// published.
    ///
    /// Archives are grouped by the repository host and the folder containing the repository, so
    /// `https://github.com/owner/repo.git` maps to `github.com/owner`.
    pub fn locate(repo_url: &str, name: &str, version: &str, config: &Config) -> Result<Self> {
        let parsed = Url::parse(repo_url).map_err(|err| {
            CoreError::InvalidUrl {
                url: repo_url.to_string(),
                source: err,
            }
        })?;

        let parent = Path::new(parsed.path())
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let relative: Vec<&str> = [parsed.host_str().unwrap_or_default(), parent.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();

        let root_name = format!("{}-{}", sanitize_name(name), version);
        let file_name = format!("{root_name}.zip");

        let mut path = config.libraries_folder.clone();
        path.extend(&relative);
        path.push(&file_name);

        let mut url = config.base_download_url.clone();
        for part in &relative {
            url.push_str(part);
            url.push('/');
        }
        url.push_str(&file_name);

        Ok(Self {
            root_name,
            file_name,
            path,
            url,
            size: 0,
            checksum: String::new(),
        })
    }

    /// Zips `source` into the archive path and records the archive size and checksum.
    ///
    /// A partially written archive is removed on failure.
    pub fn create<P: AsRef<Path>>(&mut self, source: P) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir_exists(parent)?;
        }

        if let Err(err) = zip_directory(source.as_ref(), &self.root_name, &self.path) {
            let _ = safe_remove(&self.path);
            return Err(err);
        }

        let size = fs::metadata(&self.path)
            .with_context(|| format!("reading size of {}", self.path.display()))?
            .len();
        self.size = i64::try_from(size).unwrap_or(i64::MAX);
        self.checksum = calculate_checksum(&self.path)?;

        debug!(
            "created {} ({} bytes, {})",
            self.path.display(),
            self.size,
            self.checksum
        );
        Ok(())
    }
}

fn is_excluded(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SCCS_FOLDERS.contains(&name.as_ref())
}

fn zip_entry_name(root_name: &str, relative: &Path) -> String {
    let mut name = root_name.to_string();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            name.push('/');
            name.push_str(&part.to_string_lossy());
        }
    }
    name
}

/// Writes every file below `source` into `zip_file`, nested under a `root_name` folder.
///
/// Hidden entries and version-control folders are left out. Symbolic links are rejected.
pub fn zip_directory(source: &Path, root_name: &str, zip_file: &Path) -> Result<()> {
    let file = File::create(zip_file)
        .with_context(|| format!("creating archive {}", zip_file.display()))?;
    let mut writer = ZipWriter::new(file);

    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    let dir_options = SimpleFileOptions::default().unix_permissions(0o755);

    writer.add_directory(format!("{root_name}/"), dir_options)?;

    let walker = WalkDir::new(source)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry));

    for entry in walker {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(source).unwrap_or(path);
        let name = zip_entry_name(root_name, relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let target = fs::read_link(path)
                .with_context(|| format!("reading link {}", path.display()))?;
            return Err(CoreError::Symlink {
                path: relative.to_path_buf(),
                target,
            });
        } else if file_type.is_dir() {
            writer.add_directory(format!("{name}/"), dir_options)?;
        } else {
            writer.start_file(name, file_options)?;
            let mut input =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            io::copy(&mut input, &mut writer)
                .with_context(|| format!("archiving {}", path.display()))?;
        }
    }

    writer.finish()?;
    Ok(())
}
