//! Catalog records.
//!
//! Field names follow the catalog document's PascalCase layout. Arrays that
//! were written as `null` are read back as empty.

use serde::{Deserialize, Deserializer, Serialize};

use crate::version::Version;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let value: Option<T> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub support_level: String,
    /// Category of the release with the greatest version.
    #[serde(default)]
    pub latest_category: String,
}

impl Library {
    pub fn new<N: Into<String>, R: Into<String>>(name: N, repository: R) -> Self {
        Self {
            name: name.into(),
            repository: repository.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Release {
    pub library_name: String,
    pub version: Version,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub maintainer: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub sentence: String,
    #[serde(default)]
    pub paragraph: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub architectures: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub types: Vec<String>,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(default)]
    pub archive_file_name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub checksum: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub includes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub log: String,
}

impl Release {
    /// Whether the release identifies as `name@version`.
    pub fn is(&self, name: &str, version: &str) -> bool {
        self.library_name == name && self.version == *version
    }

    /// A release only enters the public index once it has been packaged.
    pub fn is_indexable(&self) -> bool {
        self.size > 0 && !self.checksum.is_empty()
    }
}
