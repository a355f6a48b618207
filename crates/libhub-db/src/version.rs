use std::fmt;

use serde::{Deserialize, Serialize};

/// A release version.
///
/// Versions are opaque strings ordered lexicographically, so `"1.0.10"` sorts before `"1.0.2"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new<S: Into<String>>(version: S) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn less(&self, other: &Version) -> bool {
        self < other
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
