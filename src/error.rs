#![forbid(unsafe_code)]

//! Error taxonomy for a mirror run.
//!
//! Only [`FetchError`] on the catalog page is fatal. Everything else belongs to
//! a single catalog entry and ends up in the batch report.

use std::path::PathBuf;
use thiserror::Error;

/// An HTTP GET that did not produce a usable body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("GET {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("reading body of {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("body of {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}

/// Failures while turning a catalog entry into a media descriptor.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("no video identifier found on {url}")]
    IdentifierNotFound { url: String },

    #[error("platform metadata for {video_id} is missing or has a malformed `{field}`")]
    MetadataIncomplete {
        video_id: String,
        field: &'static str,
    },

    #[error("platform response for {video_id} is not valid JSON: {source}")]
    InvalidPayload {
        video_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Failures while writing the artifacts of one item.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("video retrieval failed: {0}")]
    MediaFetch(#[from] MediaFetchError),

    #[error("could not serialize sidecar: {0}")]
    Sidecar(#[from] serde_json::Error),
}

/// Failures reported by a [`crate::fetcher::MediaFetcher`].
#[derive(Debug, Error)]
pub enum MediaFetchError {
    #[error("could not launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status} for {url}")]
    Exit {
        program: String,
        status: String,
        url: String,
    },
}

/// Why a single catalog entry did not end up on disk.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("skip check failed at {}: {source}", .path.display())]
    SkipCheck {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker aborted: {0}")]
    Aborted(String),
}
