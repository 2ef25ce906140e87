//! In-memory stand-ins for the network and the video fetcher.

use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::error::{FetchError, MediaFetchError};
use crate::fetcher::{FetchRequest, MediaFetcher};
use crate::http::HttpClient;

/// Serves canned bodies by exact URL and records every request. Unknown URLs
/// answer with a 404.
#[derive(Default)]
pub struct FakeHttp {
    pages: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    /// Every request blocks for `delay`, which makes overlapping calls visible
    /// through [`FakeHttp::peak_in_flight`].
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn serve(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

impl HttpClient for FakeHttp {
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.serve(url)
            .map(|body| String::from_utf8_lossy(&body).into_owned())
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.serve(url)
    }
}

/// Pretends to be yt-dlp: writes a small `.mp4` at the requested template.
#[derive(Default)]
pub struct RecordingFetcher {
    calls: Mutex<Vec<FetchRequest>>,
    fail: bool,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl MediaFetcher for RecordingFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<(), MediaFetchError> {
        self.calls.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(MediaFetchError::Exit {
                program: "fake".into(),
                status: "exit status: 1".into(),
                url: request.source_url.clone(),
            });
        }
        let target = request.output_template.replace("%(ext)s", "mp4");
        fs::write(target, b"video").map_err(|source| MediaFetchError::Spawn {
            program: "fake".into(),
            source,
        })
    }
}

/// Builds a platform API response in the shape the resolver expects.
pub fn platform_json(title: &str, pubdate: i64, file: &str, thumb: Option<&str>) -> String {
    let mut item = serde_json::json!({
        "pubdate": pubdate,
        "sources": [{ "file": file, "type": "application/vnd.apple.mpegurl" }],
    });
    if let Some(thumb) = thumb {
        item["thumb_alt"] = serde_json::Value::String(thumb.to_string());
    }
    serde_json::json!({ "title": title, "playlist": [item] }).to_string()
}

/// Minimal item detail page carrying a platform identifier.
pub fn detail_page(video_id: &str) -> String {
    format!(
        r#"<html><body><div class="player list--video" data-id="{video_id}"></div></body></html>"#
    )
}
