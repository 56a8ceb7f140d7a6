//! Schema version of the record model.

/// Current schema version (major.minor.patch).
pub const SCHEMA_VERSION: &str = "1.0.0";

pub(crate) fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn component(version: &str, index: usize) -> Option<u32> {
    version.split('.').nth(index).and_then(|s| s.parse().ok())
}

pub fn major_version() -> u32 {
    component(SCHEMA_VERSION, 0).unwrap_or(1)
}

pub fn minor_version() -> u32 {
    component(SCHEMA_VERSION, 1).unwrap_or(0)
}

pub fn patch_version() -> u32 {
    component(SCHEMA_VERSION, 2).unwrap_or(0)
}

/// Whether a record's declared schema version can be processed.
///
/// Any well-formed `major.minor.patch` with the current major version is
/// supported.
pub fn is_supported(version: &str) -> bool {
    let parts: Vec<_> = version.split('.').collect();
    parts.len() == 3
        && parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
        && component(version, 0) == Some(major_version())
}
