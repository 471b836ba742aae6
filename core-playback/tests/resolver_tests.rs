//! Tests for queue resolution and stream negotiation against a mocked catalog.

mod support;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{CatalogClient, RawFormat, RelatedItemsQuery};
use core_playback::resolver::{extract_container_id, parse_queue};
use core_playback::{PlaybackError, QueueResolver, StreamNegotiator, TrackId};
use mockall::mock;
use mockall::predicate::eq;
use serde_json::{json, Value};
use std::sync::Arc;
use support::{panel_document, panel_entry};

mock! {
    pub Catalog {}

    #[async_trait]
    impl CatalogClient for Catalog {
        async fn fetch_stream_formats(&self, track_id: &str) -> BridgeResult<Vec<RawFormat>>;
        async fn fetch_related_items(&self, query: RelatedItemsQuery) -> BridgeResult<Value>;
    }
}

#[test]
fn test_container_id_comes_from_seed_entry() {
    let doc = panel_document(vec![
        panel_entry("other", "Other", "A", Some("RDwrong")),
        panel_entry("seed", "Seed", "B", Some("RDseed")),
    ]);
    assert_eq!(
        extract_container_id(&doc, &TrackId::from("seed")).as_deref(),
        Some("RDseed")
    );
    assert_eq!(extract_container_id(&doc, &TrackId::from("absent")), None);
}

#[test]
fn test_menu_pointing_elsewhere_is_ignored() {
    let mut entry = panel_entry("seed", "Seed", "B", None);
    entry["menu"] = json!({ "menuRenderer": { "items": [
        { "menuNavigationItemRenderer": { "navigationEndpoint": { "watchEndpoint": {
            "videoId": "someone-else", "playlistId": "RDother"
        }}}},
        { "menuServiceItemRenderer": { "text": "Share" } }
    ]}});
    let doc = panel_document(vec![entry]);
    assert_eq!(extract_container_id(&doc, &TrackId::from("seed")), None);
}

#[test]
fn test_parse_queue_maps_entries() {
    let mut wrapped = json!({
        "playlistPanelVideoWrapperRenderer": { "primaryRenderer": {
            "playlistPanelVideoRenderer": panel_entry("w", "Wrapped", "C", None)
        }}
    });
    let mut doc = panel_document(vec![
        panel_entry("a", "First", "A", None),
        json!({ "videoId": "no-title" }),
    ]);
    let contents = doc
        .pointer_mut("/contents/singleColumnMusicWatchNextResultsRenderer/tabbedRenderer/watchNextTabbedResultsRenderer/tabs/0/tabRenderer/content/musicQueueRenderer/content/playlistPanelRenderer/contents")
        .and_then(Value::as_array_mut)
        .unwrap();
    contents.push(wrapped.take());
    contents.push(json!({ "automixPreviewVideoRenderer": {} }));

    let tracks = parse_queue(&doc);
    assert_eq!(tracks.len(), 2);

    let first = &tracks[0];
    assert_eq!(first.id.as_str(), "a");
    assert_eq!(first.title, "First");
    assert_eq!(first.author, "A");
    assert_eq!(first.duration.as_deref(), Some("3:30"));
    assert_eq!(
        first.thumbnail_url.as_deref(),
        Some("https://i.example.com/a/large.jpg")
    );
    assert_eq!(first.channel_id.as_deref(), Some("UC-A"));
    assert_eq!(first.album_id, None);

    assert_eq!(tracks[1].id.as_str(), "w");
}

#[test]
fn test_document_without_panel_is_empty() {
    assert!(parse_queue(&json!({ "contents": {} })).is_empty());
    assert!(parse_queue(&json!([1, 2, 3])).is_empty());
}

#[tokio::test]
async fn test_resolve_runs_both_phases() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_fetch_related_items()
        .with(eq(RelatedItemsQuery::Track("seed".to_string())))
        .times(1)
        .returning(|_| {
            Ok(panel_document(vec![panel_entry(
                "seed",
                "Seed",
                "B",
                Some("RDseed"),
            )]))
        });
    catalog
        .expect_fetch_related_items()
        .with(eq(RelatedItemsQuery::Container("RDseed".to_string())))
        .times(1)
        .returning(|_| {
            Ok(panel_document(vec![
                panel_entry("seed", "Seed", "B", None),
                panel_entry("next", "Next", "B", None),
            ]))
        });

    let resolver = QueueResolver::new(Arc::new(catalog));
    let tracks = resolver.resolve(&TrackId::from("seed")).await.unwrap();
    let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["seed", "next"]);
}

#[tokio::test]
async fn test_resolve_without_container_fails() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_fetch_related_items()
        .times(1)
        .returning(|_| Ok(panel_document(vec![panel_entry("seed", "Seed", "B", None)])));

    let resolver = QueueResolver::new(Arc::new(catalog));
    let err = resolver.resolve(&TrackId::from("seed")).await.unwrap_err();
    assert!(matches!(err, PlaybackError::QueueIdNotFound(id) if id == "seed"));
}

#[tokio::test]
async fn test_resolve_empty_container_fails() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_fetch_related_items()
        .returning(|query| match query {
            RelatedItemsQuery::Track(_) => Ok(panel_document(vec![panel_entry(
                "seed",
                "Seed",
                "B",
                Some("RDseed"),
            )])),
            RelatedItemsQuery::Container(_) => Ok(panel_document(Vec::new())),
        });

    let resolver = QueueResolver::new(Arc::new(catalog));
    let err = resolver.resolve(&TrackId::from("seed")).await.unwrap_err();
    assert!(matches!(err, PlaybackError::EmptyQueue));
}

#[tokio::test]
async fn test_resolve_transport_failure() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_fetch_related_items()
        .returning(|_| Err(BridgeError::Network("connection reset".to_string())));

    let resolver = QueueResolver::new(Arc::new(catalog));
    let err = resolver.resolve(&TrackId::from("seed")).await.unwrap_err();
    assert!(matches!(err, PlaybackError::StreamFetchFailed(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_negotiator_selects_preferred_format() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_fetch_stream_formats()
        .with(eq("abc"))
        .times(1)
        .returning(|_| {
            Ok(vec![
                RawFormat {
                    itag: 140,
                    url: Some("https://cdn.example.com/140".to_string()),
                    mime_type: "audio/mp4; codecs=\"mp4a.40.2\"".to_string(),
                    bitrate: 130_000,
                    content_length: Some(3_400_000),
                    width: None,
                },
                RawFormat {
                    itag: 251,
                    url: Some("https://cdn.example.com/251".to_string()),
                    mime_type: "audio/webm; codecs=\"opus\"".to_string(),
                    bitrate: 150_000,
                    content_length: Some(3_100_000),
                    width: None,
                },
            ])
        });

    let negotiator = StreamNegotiator::new(Arc::new(catalog));
    let stream = negotiator.resolve(&TrackId::from("abc")).await.unwrap();
    assert_eq!(stream.itag, 251);
    assert_eq!(stream.content_length, 3_100_000);
}

#[tokio::test]
async fn test_negotiator_maps_transport_failure() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_fetch_stream_formats()
        .returning(|_| Err(BridgeError::Network("timeout".to_string())));

    let negotiator = StreamNegotiator::new(Arc::new(catalog));
    let err = negotiator.resolve(&TrackId::from("abc")).await.unwrap_err();
    assert!(matches!(err, PlaybackError::StreamFetchFailed(_)));
}
