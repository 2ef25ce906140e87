#![forbid(unsafe_code)]

//! Two-stage lookup: item page → platform video id → platform media record.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::CatalogEntry;
use crate::error::ResolutionError;
use crate::http::HttpClient;

static VIDEO_CONTAINER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.list--video, div.playlist-type").expect("valid video container selector")
});

/// Everything needed to name and download one movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub video_id: String,
    pub title: String,
    /// Epoch seconds, UTC.
    pub publish_timestamp: i64,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// A descriptor together with where it came from. `platform` is the raw API
/// record, kept for the sidecar.
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    pub entry: CatalogEntry,
    pub descriptor: MediaDescriptor,
    pub platform: Value,
}

pub struct ItemResolver {
    client: Arc<dyn HttpClient>,
    api_base: String,
}

impl ItemResolver {
    pub fn new(client: Arc<dyn HttpClient>, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    pub fn resolve(&self, entry: &CatalogEntry) -> Result<ResolvedItem, ResolutionError> {
        let page = self.client.get_text(entry.as_str())?;
        let video_id =
            extract_video_id(&page).ok_or_else(|| ResolutionError::IdentifierNotFound {
                url: entry.to_string(),
            })?;
        debug!(%entry, %video_id, "found platform video id");

        let body = self.client.get_text(&self.media_url(&video_id))?;
        let (descriptor, platform) = parse_media(&video_id, &body)?;
        Ok(ResolvedItem {
            entry: entry.clone(),
            descriptor,
            platform,
        })
    }

    fn media_url(&self, video_id: &str) -> String {
        format!("{}/v2/media/{video_id}", self.api_base)
    }
}

/// Returns the first non-empty `data-id` of a video container on an item page.
pub fn extract_video_id(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&VIDEO_CONTAINER)
        .filter_map(|node| node.value().attr("data-id"))
        .map(str::trim)
        .find(|id| !id.is_empty())
        .map(str::to_owned)
}

/// Validates a platform response and builds the descriptor from it.
///
/// Only `title` and `playlist[0]` are read; a malformed `thumb_alt` just means
/// there is no cover.
pub fn parse_media(
    video_id: &str,
    body: &str,
) -> Result<(MediaDescriptor, Value), ResolutionError> {
    let platform: Value =
        serde_json::from_str(body).map_err(|source| ResolutionError::InvalidPayload {
            video_id: video_id.to_string(),
            source,
        })?;
    let incomplete = |field: &'static str| ResolutionError::MetadataIncomplete {
        video_id: video_id.to_string(),
        field,
    };

    let title = non_empty_str(platform.get("title")).ok_or_else(|| incomplete("title"))?;
    let item = platform
        .pointer("/playlist/0")
        .filter(|item| item.is_object())
        .ok_or_else(|| incomplete("playlist"))?;
    let publish_timestamp = item
        .get("pubdate")
        .and_then(pubdate_seconds)
        .ok_or_else(|| incomplete("pubdate"))?;
    let source_url =
        non_empty_str(item.pointer("/sources/0/file")).ok_or_else(|| incomplete("sources"))?;
    let thumbnail_url = non_empty_str(item.get("thumb_alt"));

    let descriptor = MediaDescriptor {
        video_id: video_id.to_string(),
        title,
        publish_timestamp,
        source_url,
        thumbnail_url,
    };
    Ok((descriptor, platform))
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_owned)
}

/// `pubdate` arrives either as a number or as a numeric string. Values that
/// cannot be rendered as a calendar date are treated as malformed.
fn pubdate_seconds(value: &Value) -> Option<i64> {
    let seconds = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|_| seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::test_support::{FakeHttp, detail_page, platform_json};
    use serde_json::json;

    const API: &str = "https://cdn.example";
    const ITEM: &str = "https://portal.example/mediathek/sharknado";

    fn resolver(client: FakeHttp) -> ItemResolver {
        ItemResolver::new(Arc::new(client), API)
    }

    #[test]
    fn resolves_descriptor_through_both_stages() {
        let client = FakeHttp::new()
            .with_page(ITEM, detail_page("AbC123"))
            .with_page(
                "https://cdn.example/v2/media/AbC123",
                platform_json(
                    "Sharknado",
                    1_609_459_200,
                    "https://cdn/s.m3u8",
                    Some("https://cdn/t.jpg"),
                ),
            );
        let item = resolver(client).resolve(&CatalogEntry::new(ITEM)).unwrap();
        assert_eq!(
            item.descriptor,
            MediaDescriptor {
                video_id: "AbC123".into(),
                title: "Sharknado".into(),
                publish_timestamp: 1_609_459_200,
                source_url: "https://cdn/s.m3u8".into(),
                thumbnail_url: Some("https://cdn/t.jpg".into()),
            }
        );
        assert_eq!(item.entry.as_str(), ITEM);
        assert_eq!(item.platform["title"], "Sharknado");
    }

    #[test]
    fn extracts_id_from_either_container_class() {
        assert_eq!(
            extract_video_id(r#"<div class="playlist-type" data-id="p1"></div>"#).as_deref(),
            Some("p1")
        );
        assert_eq!(
            extract_video_id(
                r#"<div class="list--video"></div><div class="list--video" data-id=" v2 "></div>"#
            )
            .as_deref(),
            Some("v2")
        );
        assert_eq!(extract_video_id(r#"<span class="list--video" data-id="x"></span>"#), None);
    }

    #[test]
    fn missing_identifier_is_reported() {
        let client = FakeHttp::new().with_page(ITEM, "<html><body>gone</body></html>");
        let err = resolver(client).resolve(&CatalogEntry::new(ITEM)).unwrap_err();
        assert!(matches!(err, ResolutionError::IdentifierNotFound { url } if url == ITEM));
    }

    #[test]
    fn unreachable_api_is_a_fetch_error() {
        let client = FakeHttp::new().with_page(ITEM, detail_page("abc"));
        let err = resolver(client).resolve(&CatalogEntry::new(ITEM)).unwrap_err();
        assert!(matches!(err, ResolutionError::Fetch(FetchError::Status { status: 404, .. })));
    }

    #[test]
    fn pubdate_accepts_strings_and_numbers() {
        let body = json!({
            "title": "T",
            "playlist": [{ "pubdate": "1609459200", "sources": [{ "file": "f" }] }]
        })
        .to_string();
        let (descriptor, _) = parse_media("id", &body).unwrap();
        assert_eq!(descriptor.publish_timestamp, 1_609_459_200);
        assert_eq!(descriptor.thumbnail_url, None);
    }

    #[test]
    fn missing_sources_is_incomplete() {
        let body = json!({ "title": "T", "playlist": [{ "pubdate": 1 }] }).to_string();
        let err = parse_media("id", &body).unwrap_err();
        assert!(matches!(err, ResolutionError::MetadataIncomplete { field: "sources", .. }));
    }

    #[test]
    fn malformed_fields_are_incomplete() {
        let cases = [
            (json!({ "playlist": [{ "pubdate": 1, "sources": [{ "file": "f" }] }] }), "title"),
            (json!({ "title": "T", "playlist": [] }), "playlist"),
            (json!({ "title": "T", "playlist": "nope" }), "playlist"),
            (
                json!({
                    "title": "T",
                    "playlist": [{ "pubdate": "soon", "sources": [{ "file": "f" }] }],
                }),
                "pubdate",
            ),
            (
                json!({
                    "title": "T",
                    "playlist": [{ "pubdate": i64::MAX, "sources": [{ "file": "f" }] }],
                }),
                "pubdate",
            ),
            (json!({ "title": "T", "playlist": [{ "pubdate": 1, "sources": [{}] }] }), "sources"),
        ];
        for (body, expected) in cases {
            match parse_media("id", &body.to_string()) {
                Err(ResolutionError::MetadataIncomplete { field, .. }) => {
                    assert_eq!(field, expected, "body: {body}")
                }
                other => panic!("expected {expected} to be incomplete, got {other:?}"),
            }
        }
    }

    #[test]
    fn non_string_thumbnail_means_no_cover() {
        let body = json!({
            "title": "T",
            "playlist": [{ "pubdate": 1, "thumb_alt": 42, "sources": [{ "file": "f" }] }],
        });
        let (descriptor, _) = parse_media("id", &body.to_string()).unwrap();
        assert_eq!(descriptor.thumbnail_url, None);
        assert_eq!(descriptor.source_url, "f");
    }

    #[test]
    fn only_first_playlist_entry_is_read() {
        let body = json!({
            "title": "T",
            "playlist": [
                { "pubdate": 1, "sources": [{ "file": "f" }] },
                { "pubdate": "soon", "thumb_alt": [], "sources": "broken" },
            ],
        });
        let (descriptor, _) = parse_media("id", &body.to_string()).unwrap();
        assert_eq!(descriptor.publish_timestamp, 1);
    }

    #[test]
    fn non_string_source_file_is_reported_as_sources() {
        let body = json!({
            "title": "T",
            "playlist": [{ "pubdate": 1, "sources": [{ "file": 7 }] }],
        });
        match parse_media("id", &body.to_string()) {
            Err(ResolutionError::MetadataIncomplete { field, .. }) => assert_eq!(field, "sources"),
            other => panic!("expected sources to be incomplete, got {other:?}"),
        }
    }

    #[test]
    fn non_json_body_is_invalid_payload() {
        let err = parse_media("id", "<html>").unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidPayload { .. }));
    }
}
