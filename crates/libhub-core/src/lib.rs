pub mod archive;
pub mod backup;
pub mod error;
pub mod git;
pub mod inspect;
pub mod logging;
pub mod metadata;
pub mod operations;
pub mod pool;
pub mod sync;

pub use error::{CoreError, ErrorContext, Result};
