#![forbid(unsafe_code)]

//! Writes the artifacts of one movie: the video itself, the JSON sidecar and
//! the cover image.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::PersistenceError;
use crate::fetcher::{FetchRequest, MediaFetcher};
use crate::http::HttpClient;
use crate::naming::OutputIdentity;
use crate::resolver::{MediaDescriptor, ResolvedItem};

/// Shape of `<file_name>.json`.
#[derive(Serialize)]
struct SidecarRecord<'a> {
    #[serde(flatten)]
    descriptor: &'a MediaDescriptor,
    source_page: &'a str,
    platform: &'a Value,
}

/// Files actually produced besides the video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub sidecar: Option<PathBuf>,
    pub cover: Option<PathBuf>,
}

pub struct PersistenceWriter {
    fetcher: Arc<dyn MediaFetcher>,
    client: Arc<dyn HttpClient>,
    save_json: bool,
    download_cover: bool,
}

impl PersistenceWriter {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        client: Arc<dyn HttpClient>,
        save_json: bool,
        download_cover: bool,
    ) -> Self {
        Self {
            fetcher,
            client,
            save_json,
            download_cover,
        }
    }

    /// Video failures abort the item. A cover that cannot be fetched only
    /// produces a warning.
    pub fn write(
        &self,
        item: &ResolvedItem,
        identity: &OutputIdentity,
    ) -> Result<WrittenArtifacts, PersistenceError> {
        fs::create_dir_all(&identity.path).map_err(|source| filesystem(&identity.path, source))?;

        let request = FetchRequest::new(
            &item.descriptor.source_url,
            &identity.path,
            &identity.file_name,
        );
        self.fetcher.fetch(&request)?;

        let mut artifacts = WrittenArtifacts::default();
        if self.save_json {
            artifacts.sidecar = Some(self.write_sidecar(item, identity)?);
        }
        if self.download_cover {
            artifacts.cover = self.save_cover(&item.descriptor, identity);
        }
        Ok(artifacts)
    }

    fn write_sidecar(
        &self,
        item: &ResolvedItem,
        identity: &OutputIdentity,
    ) -> Result<PathBuf, PersistenceError> {
        let record = SidecarRecord {
            descriptor: &item.descriptor,
            source_page: item.entry.as_str(),
            platform: &item.platform,
        };
        let payload = serde_json::to_vec_pretty(&record)?;
        let path = identity.artifact("json");
        fs::write(&path, payload).map_err(|source| filesystem(&path, source))?;
        Ok(path)
    }

    fn save_cover(
        &self,
        descriptor: &MediaDescriptor,
        identity: &OutputIdentity,
    ) -> Option<PathBuf> {
        let Some(url) = descriptor.thumbnail_url.as_deref() else {
            warn!("Failed finding cover link for {}", identity.file_name);
            return None;
        };
        let bytes = match self.client.get_bytes(url) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Could not download cover for {}: {err}", identity.file_name);
                return None;
            }
        };
        let path = identity.artifact("jpg");
        if let Err(err) = fs::write(&path, bytes) {
            warn!("Could not write cover {}: {err}", path.display());
            return None;
        }
        info!("Saved cover for '{}'", identity.file_name);
        Some(path)
    }
}

/// True when `path/file_name.*` already exists, i.e. a previous run left
/// something behind for this movie.
pub fn artifacts_exist(identity: &OutputIdentity) -> io::Result<bool> {
    let entries = match fs::read_dir(&identity.path) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    let prefix = format!("{}.", identity.file_name);
    for entry in entries {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn filesystem(path: &Path, source: io::Error) -> PersistenceError {
    PersistenceError::Filesystem {
        path: path.to_path_buf(),
        source,
    }
}
