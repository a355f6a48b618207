pub mod catalog;
pub mod dependency;
pub mod error;
pub mod index;
pub mod models;
pub mod version;

pub use catalog::Catalog;
pub use error::{DbError, Result};
pub use models::{Dependency, Library, Release};
pub use version::Version;
