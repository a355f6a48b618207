//! Registry file handling for libhub.
//!
//! The registry file lists the source repositories to synchronize, one
//! `URL|type1,type2|LibraryName` entry per line. This crate parses it into
//! [`RepoEntry`] values, filters and deduplicates them, and validates the
//! file for the `check-registry` command.

pub mod check;
pub mod entry;
pub mod error;
pub mod loader;

pub use check::check_registry;
pub use entry::{repo_folder, repo_url_valid, RepoEntry};
pub use error::{ErrorContext, RegistryError, Result};
pub use loader::{list_repos, load_repo_list_from_file, RepoListing};
