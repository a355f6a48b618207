use std::sync::LazyLock;

use regex::Regex;

use crate::{
    error::{DbError, Result},
    models::Dependency,
};

static DEPENDENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9](?:[a-zA-Z0-9._\- ]*[a-zA-Z0-9])?) *(?: \(([^()]*)\))?$")
        .expect("unable to compile dependency regex")
});

/// Extracts the dependency list from the `depends` metadata field.
///
/// Each comma separated token is either `NAME` or `NAME (CONSTRAINT)`. An empty input yields an
/// empty list, while an empty token between commas is an error.
pub fn extract_dependencies_list(depends: &str) -> Result<Vec<Dependency>> {
    let depends = depends.trim();
    if depends.is_empty() {
        return Ok(Vec::new());
    }

    depends
        .split(',')
        .map(|token| {
            let token = token.trim();
            let captures = DEPENDENCY_RE
                .captures(token)
                .ok_or_else(|| DbError::InvalidDependency(token.to_string()))?;

            Ok(Dependency {
                name: captures[1].to_string(),
                version: captures
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Splits a comma separated list, trimming items and dropping empty ones.
pub fn extract_string_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
