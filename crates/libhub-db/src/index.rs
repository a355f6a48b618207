//! Public library index projection.

use serde::Serialize;

use crate::{
    models::{Library, Release},
    version::Version,
};

#[derive(Debug, Default, Serialize)]
pub struct LibraryIndex {
    pub libraries: Vec<IndexEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub name: String,
    pub version: Version,
    pub author: String,
    pub maintainer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub license: String,
    pub sentence: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub paragraph: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub website: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
    pub architectures: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provides_includes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<IndexDependency>,
    pub url: String,
    pub archive_file_name: String,
    pub size: i64,
    pub checksum: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub support_level: String,
}

#[derive(Debug, Serialize)]
pub struct IndexDependency {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl IndexEntry {
    /// Projects a release into the index, taking the category, support level and repository
    /// from its library.
    pub fn project(library: &Library, release: &Release) -> Self {
        Self {
            name: release.library_name.clone(),
            version: release.version.clone(),
            author: release.author.clone(),
            maintainer: release.maintainer.clone(),
            license: release.license.clone(),
            sentence: release.sentence.clone(),
            paragraph: release.paragraph.clone(),
            website: release.website.clone(),
            category: library.latest_category.clone(),
            architectures: release.architectures.clone(),
            types: release.types.clone(),
            repository: library.repository.clone(),
            provides_includes: release.includes.clone(),
            dependencies: release
                .dependencies
                .iter()
                .map(|dep| {
                    IndexDependency {
                        name: dep.name.clone(),
                        version: dep.version.clone(),
                    }
                })
                .collect(),
            url: release.url.clone(),
            archive_file_name: release.archive_file_name.clone(),
            size: release.size,
            checksum: release.checksum.clone(),
            support_level: library.support_level.clone(),
        }
    }
}
