#![forbid(unsafe_code)]

//! Deterministic, filesystem-safe names for downloaded movies.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::resolver::MediaDescriptor;

/// German diacritics and their ASCII digraphs.
const TRANSLITERATIONS: [(char, &str); 7] = [
    ('ü', "ue"),
    ('Ü', "UE"),
    ('ä', "ae"),
    ('Ä', "AE"),
    ('ö', "oe"),
    ('Ö', "OE"),
    ('ß', "sz"),
];

/// Where the artifacts of one movie live: `<root>/<file_name>/<file_name>.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputIdentity {
    pub file_name: String,
    pub path: PathBuf,
}

impl OutputIdentity {
    pub fn new(output_root: &Path, descriptor: &MediaDescriptor) -> Self {
        let file_name = normalize(&descriptor.title, descriptor.publish_timestamp);
        let path = output_root.join(&file_name);
        Self { file_name, path }
    }

    /// Path of an artifact with the given extension, e.g. `json`.
    pub fn artifact(&self, extension: &str) -> PathBuf {
        self.path.join(format!("{}.{extension}", self.file_name))
    }
}

/// Builds `YYYY-MM-DD_Title` from a title and a UTC epoch timestamp.
///
/// Timestamps outside chrono's range render as the epoch date; the resolver
/// rejects those before they get here.
pub fn normalize(title: &str, timestamp: i64) -> String {
    let date = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_default();
    let raw = format!("{}_{}", date.format("%Y-%m-%d"), transliterate(title));
    sanitize_filename(&raw)
}

pub fn transliterate(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match TRANSLITERATIONS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

/// Drops everything outside `[A-Za-z0-9 -_.()]`, turns spaces into
/// underscores and never ends on a dot (Windows rejects such names).
pub fn sanitize_filename(value: &str) -> String {
    let mut name: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '(' | ')'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    if name.ends_with('.') {
        name.push('_');
    }
    name
}
