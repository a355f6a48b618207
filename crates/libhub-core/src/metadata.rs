//! `library.properties` parsing.

use std::{fs, path::Path};

use libhub_db::{
    dependency::{extract_dependencies_list, extract_string_list},
    Release, Version,
};

use crate::error::{CoreError, Result};

pub const METADATA_FILE: &str = "library.properties";

pub const VALID_CATEGORIES: [&str; 10] = [
    "Display",
    "Communication",
    "Signal Input/Output",
    "Sensors",
    "Device Control",
    "Timing",
    "Data Storage",
    "Data Processing",
    "Other",
    "Uncategorized",
];

const FALLBACK_CATEGORY: &str = "Uncategorized";

/// Library metadata as declared in the release sources.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LibraryMetadata {
    pub name: String,
    pub version: String,
    pub author: String,
    pub maintainer: String,
    pub sentence: String,
    pub paragraph: String,
    pub license: String,
    pub url: String,
    pub architectures: String,
    pub category: String,
    pub includes: String,
    pub depends: String,
}

impl LibraryMetadata {
    /// Parses the content of a `library.properties` file.
    ///
    /// Keys inside a `[section]` are ignored. The version and category are normalized.
    pub fn parse(content: &str) -> Result<Self> {
        let mut metadata = Self::default();
        let mut in_default_section = true;

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                in_default_section = line[1..line.len() - 1].trim().is_empty();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(CoreError::Metadata(format!(
                    "invalid line {}: {}",
                    idx + 1,
                    line
                )));
            };
            if !in_default_section {
                continue;
            }

            let value = value.trim().to_string();
            match key.trim() {
                "name" => metadata.name = value,
                "version" => metadata.version = value,
                "author" => metadata.author = value,
                "maintainer" => metadata.maintainer = value,
                "sentence" => metadata.sentence = value,
                "paragraph" => metadata.paragraph = value,
                "license" => metadata.license = value,
                "url" => metadata.url = value,
                "architectures" => metadata.architectures = value,
                "category" => metadata.category = value,
                "includes" => metadata.includes = value,
                "depends" => metadata.depends = value,
                _ => {}
            }
        }

        if metadata.name.is_empty() {
            return Err(CoreError::Metadata("missing required field `name`".into()));
        }
        if metadata.version.is_empty() {
            return Err(CoreError::Metadata(
                "missing required field `version`".into(),
            ));
        }

        metadata.version = normalize_version(&metadata.version);
        metadata.category = normalize_category(&metadata.category);
        Ok(metadata)
    }

    /// Reads and parses the `library.properties` file at the root of `folder`.
    pub fn from_folder<P: AsRef<Path>>(folder: P) -> Result<Self> {
        let path = folder.as_ref().join(METADATA_FILE);
        let content = fs::read_to_string(&path).map_err(|err| {
            CoreError::Metadata(format!("can't read {METADATA_FILE}: {err}"))
        })?;
        Self::parse(&content)
    }

    /// Builds a catalog release from the metadata. Archive fields are left empty.
    pub fn to_release(&self, types: &[String]) -> Result<Release> {
        Ok(Release {
            library_name: self.name.clone(),
            version: Version::new(self.version.clone()),
            author: self.author.clone(),
            maintainer: self.maintainer.clone(),
            license: self.license.clone(),
            sentence: self.sentence.clone(),
            paragraph: self.paragraph.clone(),
            website: self.url.clone(),
            category: self.category.clone(),
            architectures: extract_string_list(&self.architectures),
            types: types.to_vec(),
            includes: extract_string_list(&self.includes),
            dependencies: extract_dependencies_list(&self.depends)?,
            ..Default::default()
        })
    }
}

/// Pads the numeric core of a version to three components.
///
/// `1.2` becomes `1.2.0` and `1-beta` becomes `1.0.0-beta`. Versions that are not valid semver
/// once padded are returned unchanged.
pub fn normalize_version(version: &str) -> String {
    let version = version.trim();
    let split = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(split);

    let parts: Vec<&str> = core.split('.').collect();
    let numeric = parts
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    if !numeric || parts.len() > 3 {
        return version.to_string();
    }

    let mut padded = parts;
    padded.resize(3, "0");
    let candidate = format!("{}{}", padded.join("."), suffix);

    match semver::Version::parse(&candidate) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => version.to_string(),
    }
}

pub fn normalize_category(category: &str) -> String {
    if VALID_CATEGORIES.contains(&category) {
        category.to_string()
    } else {
        FALLBACK_CATEGORY.to_string()
    }
}
