//! # Queue Resolver
//!
//! Turns a seed track into an ordered "up next" list with two lookups against
//! the related-items endpoint:
//!
//! 1. Ask for items related to the seed track and read the container id off
//!    the seed's own panel entry (the navigation target in its menu).
//! 2. Ask for the container and map every panel entry to a [`Track`].
//!
//! Parsing is tolerant: entries without an id or title are skipped, every
//! other missing field simply stays empty.

use crate::document::{array_at, find_key, first_run_text, runs, str_at, u64_at};
use crate::error::{PlaybackError, Result};
use crate::models::{Track, TrackId};
use bridge_traits::{CatalogClient, RelatedItemsQuery};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const PANEL_KEY: &str = "playlistPanelRenderer";
const ENTRY_KEY: &str = "playlistPanelVideoRenderer";
const WRAPPED_ENTRY_POINTER: &str = "/playlistPanelVideoWrapperRenderer/primaryRenderer";
const PAGE_TYPE_POINTER: &str = "/navigationEndpoint/browseEndpoint/browseEndpointContextSupportedConfigs/browseEndpointContextMusicConfig/pageType";
const BROWSE_ID_POINTER: &str = "/navigationEndpoint/browseEndpoint/browseId";
const ARTIST_PAGE: &str = "MUSIC_PAGE_TYPE_ARTIST";
const ALBUM_PAGE: &str = "MUSIC_PAGE_TYPE_ALBUM";
const SEPARATOR: &str = "•";

/// Two-phase related-queue lookup.
#[derive(Clone)]
pub struct QueueResolver {
    catalog: Arc<dyn CatalogClient>,
}

impl QueueResolver {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }

    /// Resolve the queue that continues from `seed`.
    #[instrument(skip(self), fields(seed = %seed))]
    pub async fn resolve(&self, seed: &TrackId) -> Result<Vec<Track>> {
        let related = self
            .catalog
            .fetch_related_items(RelatedItemsQuery::Track(seed.to_string()))
            .await
            .map_err(PlaybackError::fetch_failed)?;

        let container_id = extract_container_id(&related, seed).ok_or_else(|| {
            warn!("Seed entry carries no container reference");
            PlaybackError::QueueIdNotFound(seed.to_string())
        })?;
        debug!(container_id = %container_id, "Resolved queue container");

        let container = self
            .catalog
            .fetch_related_items(RelatedItemsQuery::Container(container_id))
            .await
            .map_err(PlaybackError::fetch_failed)?;

        let tracks = parse_queue(&container);
        if tracks.is_empty() {
            return Err(PlaybackError::EmptyQueue);
        }

        info!(length = tracks.len(), "Queue resolved");
        Ok(tracks)
    }
}

/// Find the container id on the first panel entry for `seed`.
///
/// Only menu navigation actions that point back at the seed itself count.
pub fn extract_container_id(document: &Value, seed: &TrackId) -> Option<String> {
    let entry = panel_entries(document)
        .into_iter()
        .find(|entry| str_at(entry, "/videoId") == Some(seed.as_str()))?;

    array_at(entry, "/menu/menuRenderer/items")?
        .iter()
        .filter_map(|item| {
            item.pointer("/menuNavigationItemRenderer/navigationEndpoint/watchEndpoint")
        })
        .find(|watch| str_at(watch, "/videoId") == Some(seed.as_str()))
        .and_then(|watch| str_at(watch, "/playlistId"))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Map every panel entry in `document` to a track, in document order.
pub fn parse_queue(document: &Value) -> Vec<Track> {
    panel_entries(document)
        .into_iter()
        .filter_map(parse_entry)
        .collect()
}

fn panel_entries(document: &Value) -> Vec<&Value> {
    let Some(contents) = find_key(document, PANEL_KEY).and_then(|panel| array_at(panel, "/contents"))
    else {
        return Vec::new();
    };

    contents
        .iter()
        .filter_map(|item| {
            item.get(ENTRY_KEY).or_else(|| {
                item.pointer(WRAPPED_ENTRY_POINTER)
                    .and_then(|primary| primary.get(ENTRY_KEY))
            })
        })
        .collect()
}

fn parse_entry(entry: &Value) -> Option<Track> {
    let id = str_at(entry, "/videoId").filter(|id| !id.is_empty())?;
    let title = first_run_text(entry, "/title").filter(|title| !title.is_empty())?;

    let byline = runs(entry, "/longBylineText/runs");
    let mut track = Track::new(id, title, author_from_runs(byline));
    track.thumbnail_url = best_thumbnail(entry);
    track.duration = first_run_text(entry, "/lengthText").map(str::to_string);
    track.channel_id = browse_id_of_first(byline, ARTIST_PAGE);
    track.album_id = browse_id_of_first(byline, ALBUM_PAGE);
    Some(track)
}

fn is_separator(run: &Value) -> bool {
    run.get("text")
        .and_then(Value::as_str)
        .is_some_and(|text| text.trim() == SEPARATOR)
}

fn page_type(run: &Value) -> Option<&str> {
    str_at(run, PAGE_TYPE_POINTER)
}

/// Artist runs joined with `", "`, stopping at the first separator.
fn author_from_runs(byline: &[Value]) -> String {
    let artists: Vec<&str> = byline
        .iter()
        .take_while(|run| !is_separator(run))
        .filter(|run| page_type(run) == Some(ARTIST_PAGE))
        .filter_map(|run| str_at(run, "/text"))
        .collect();

    if artists.is_empty() {
        return byline
            .first()
            .and_then(|run| str_at(run, "/text"))
            .unwrap_or_default()
            .to_string();
    }
    artists.join(", ")
}

fn browse_id_of_first(byline: &[Value], page: &str) -> Option<String> {
    byline
        .iter()
        .find(|run| page_type(run) == Some(page))
        .and_then(|run| str_at(run, BROWSE_ID_POINTER))
        .map(str::to_string)
}

fn best_thumbnail(entry: &Value) -> Option<String> {
    array_at(entry, "/thumbnail/thumbnails")?
        .iter()
        .filter_map(|thumb| {
            let url = str_at(thumb, "/url")?;
            let area = u64_at(thumb, "/width")
                .unwrap_or(0)
                .saturating_mul(u64_at(thumb, "/height").unwrap_or(0));
            Some((area, url))
        })
        .max_by_key(|(area, _)| *area)
        .map(|(_, url)| url.to_string())
}
