//! Hand-written collaborators shared by the integration tests.
//!
//! Each fake records what it was asked to do so tests can observe work done
//! by spawned tasks.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{
    CatalogClient, EnabledButtons, FileMetadata, FileSystemAccess, HttpClient, HttpRequest,
    HttpResponse, MediaControlSurface, NowPlaying, PlaybackAdapter, PlaybackRequest, RawFormat,
    RelatedItemsQuery, StreamingResponse, SurfaceStatus, TransferRecord, TransferRecordStore,
};
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::Semaphore;

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

pub fn stream_url(track_id: &str) -> String {
    format!("https://cdn.example.com/{}?sig=secret", track_id)
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Default)]
pub struct FakeCatalog {
    formats: Mutex<HashMap<String, Vec<RawFormat>>>,
    format_delays: Mutex<HashMap<String, Duration>>,
    related: Mutex<HashMap<String, Value>>,
    related_delay: Mutex<Option<Duration>>,
    pub format_calls: Mutex<Vec<String>>,
    pub related_calls: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an opus stream for each id.
    pub fn with_tracks(ids: &[&str]) -> Arc<Self> {
        let catalog = Self::new();
        for id in ids {
            catalog.add_stream(id);
        }
        catalog
    }

    pub fn add_stream(&self, id: &str) {
        self.formats.lock().unwrap().insert(
            id.to_string(),
            vec![RawFormat {
                itag: 251,
                url: Some(stream_url(id)),
                mime_type: "audio/webm; codecs=\"opus\"".to_string(),
                bitrate: 160_000,
                content_length: Some(3_000_000),
                width: None,
            }],
        );
    }

    pub fn delay_stream(&self, id: &str, delay: Duration) {
        self.format_delays
            .lock()
            .unwrap()
            .insert(id.to_string(), delay);
    }

    pub fn set_related(&self, query: RelatedItemsQuery, document: Value) {
        self.related
            .lock()
            .unwrap()
            .insert(query.to_string(), document);
    }

    pub fn delay_related(&self, delay: Duration) {
        *self.related_delay.lock().unwrap() = Some(delay);
    }

    pub fn format_calls(&self) -> Vec<String> {
        self.format_calls.lock().unwrap().clone()
    }

    pub fn related_call_count(&self) -> usize {
        self.related_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn fetch_stream_formats(&self, track_id: &str) -> Result<Vec<RawFormat>> {
        self.format_calls
            .lock()
            .unwrap()
            .push(track_id.to_string());
        let delay = self.format_delays.lock().unwrap().get(track_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let formats = self.formats.lock().unwrap().get(track_id).cloned();
        formats.ok_or_else(|| BridgeError::Network(format!("no route for {}", track_id)))
    }

    async fn fetch_related_items(&self, query: RelatedItemsQuery) -> Result<Value> {
        let key = query.to_string();
        self.related_calls.lock().unwrap().push(key.clone());
        let delay = *self.related_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let document = self.related.lock().unwrap().get(&key).cloned();
        document.ok_or_else(|| BridgeError::Network(format!("no document for {}", key)))
    }
}

/// A panel entry as the related-items endpoint returns it.
pub fn panel_entry(id: &str, title: &str, artist: &str, playlist_id: Option<&str>) -> Value {
    let mut entry = json!({
        "videoId": id,
        "title": { "runs": [ { "text": title } ] },
        "longBylineText": { "runs": [
            {
                "text": artist,
                "navigationEndpoint": { "browseEndpoint": {
                    "browseId": format!("UC-{}", artist),
                    "browseEndpointContextSupportedConfigs": {
                        "browseEndpointContextMusicConfig": { "pageType": "MUSIC_PAGE_TYPE_ARTIST" }
                    }
                }}
            },
            { "text": " • " },
            { "text": "2021" }
        ]},
        "lengthText": { "runs": [ { "text": "3:30" } ] },
        "thumbnail": { "thumbnails": [
            { "url": format!("https://i.example.com/{}/small.jpg", id), "width": 60, "height": 60 },
            { "url": format!("https://i.example.com/{}/large.jpg", id), "width": 544, "height": 544 }
        ]}
    });
    if let Some(playlist_id) = playlist_id {
        entry["menu"] = json!({ "menuRenderer": { "items": [
            { "menuNavigationItemRenderer": { "navigationEndpoint": { "watchEndpoint": {
                "videoId": id,
                "playlistId": playlist_id
            }}}}
        ]}});
    }
    entry
}

/// Wrap entries in the panel structure, buried under unrelated nodes.
pub fn panel_document(entries: Vec<Value>) -> Value {
    let contents: Vec<Value> = entries
        .into_iter()
        .map(|entry| json!({ "playlistPanelVideoRenderer": entry }))
        .collect();
    json!({
        "contents": { "singleColumnMusicWatchNextResultsRenderer": { "tabbedRenderer": {
            "watchNextTabbedResultsRenderer": { "tabs": [ { "tabRenderer": { "content": {
                "musicQueueRenderer": { "content": { "playlistPanelRenderer": {
                    "title": "Up next",
                    "contents": contents
                }}}
            }}}]}
        }}}
    })
}

/// Catalog that resolves `seed` into a queue of `ids` through container `RD-seed`.
pub fn catalog_with_queue(seed: &str, ids: &[&str]) -> Arc<FakeCatalog> {
    let catalog = FakeCatalog::with_tracks(ids);
    catalog.add_stream(seed);
    let container = format!("RD{}", seed);
    catalog.set_related(
        RelatedItemsQuery::Track(seed.to_string()),
        panel_document(vec![panel_entry(seed, "Seed", "Artist", Some(&container))]),
    );
    catalog.set_related(
        RelatedItemsQuery::Container(container),
        panel_document(
            ids.iter()
                .map(|id| panel_entry(id, &format!("Song {}", id), "Artist", None))
                .collect(),
        ),
    );
    catalog
}

// ============================================================================
// Player
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Load(String),
    Play,
    Pause,
    Seek(Duration),
    Stop,
    Release,
}

#[derive(Default)]
pub struct RecordingPlayer {
    calls: Mutex<Vec<PlayerCall>>,
}

impl RecordingPlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn loaded_urls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlayerCall::Load(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: PlayerCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl PlaybackAdapter for RecordingPlayer {
    async fn load(&self, request: PlaybackRequest) -> Result<()> {
        self.record(PlayerCall::Load(request.url))
    }

    async fn play(&self) -> Result<()> {
        self.record(PlayerCall::Play)
    }

    async fn pause(&self) -> Result<()> {
        self.record(PlayerCall::Pause)
    }

    async fn seek(&self, position: Duration) -> Result<()> {
        self.record(PlayerCall::Seek(position))
    }

    async fn stop(&self) -> Result<()> {
        self.record(PlayerCall::Stop)
    }

    async fn release(&self) -> Result<()> {
        self.record(PlayerCall::Release)
    }
}

// ============================================================================
// Media controls
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Metadata(NowPlaying),
    Status(SurfaceStatus),
    Timeline(Duration, Duration),
    Buttons(EnabledButtons),
    Clear,
}

#[derive(Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: SurfaceCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl MediaControlSurface for RecordingSurface {
    fn update_metadata(&self, now_playing: &NowPlaying) -> Result<()> {
        self.record(SurfaceCall::Metadata(now_playing.clone()))
    }

    fn set_playback_status(&self, status: SurfaceStatus) -> Result<()> {
        self.record(SurfaceCall::Status(status))
    }

    fn set_timeline(&self, position: Duration, duration: Duration) -> Result<()> {
        self.record(SurfaceCall::Timeline(position, duration))
    }

    fn set_enabled_buttons(&self, buttons: EnabledButtons) -> Result<()> {
        self.record(SurfaceCall::Buttons(buttons))
    }

    fn clear(&self) -> Result<()> {
        self.record(SurfaceCall::Clear)
    }
}

// ============================================================================
// HTTP
// ============================================================================

#[derive(Debug, Clone)]
pub enum Route {
    /// Serve the data, honouring `Range` with 206.
    Full(Vec<u8>),
    /// Serve the data from zero with 200 whatever the request asked for.
    IgnoreRange(Vec<u8>),
    /// Announce the full length but stop after `cut` bytes of the resource.
    Truncated { data: Vec<u8>, cut: usize },
    /// Reply with a bare status code.
    Status(u16),
    /// A small image body for thumbnail requests.
    Image(Vec<u8>),
}

#[derive(Default)]
pub struct FakeHttp {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<(String, Option<String>)>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, url: &str, route: Route) {
        self.routes.lock().unwrap().insert(url.to_string(), route);
    }

    /// Hold every streamed download until the returned gate gets permits.
    pub fn gated(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// `(url, Range header)` of every streamed request.
    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn range_start(request: &HttpRequest) -> Option<u64> {
    request
        .headers
        .get("Range")?
        .strip_prefix("bytes=")?
        .trim_end_matches('-')
        .parse()
        .ok()
}

fn streaming(status: u16, headers: Vec<(&str, String)>, body: Vec<u8>) -> StreamingResponse {
    StreamingResponse {
        status,
        headers: headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        body: Box::new(io::Cursor::new(body)),
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let route = self.routes.lock().unwrap().get(&request.url).cloned();
        match route {
            Some(Route::Image(data)) => Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from(data),
            }),
            Some(Route::Status(status)) => Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::new(),
            }),
            _ => Err(BridgeError::Network(format!("no route for {}", request.url))),
        }
    }

    async fn download_stream(&self, request: HttpRequest) -> Result<StreamingResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((request.url.clone(), request.headers.get("Range").cloned()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let route = self.routes.lock().unwrap().get(&request.url).cloned();
        let start = range_start(&request).unwrap_or(0) as usize;
        match route {
            Some(Route::Full(data)) if start > 0 => {
                let total = data.len();
                let body = data[start.min(total)..].to_vec();
                Ok(streaming(
                    206,
                    vec![
                        ("Content-Length", body.len().to_string()),
                        ("Content-Range", format!("bytes {}-{}/{}", start, total - 1, total)),
                    ],
                    body,
                ))
            }
            Some(Route::Full(data)) | Some(Route::IgnoreRange(data)) => Ok(streaming(
                200,
                vec![("Content-Length", data.len().to_string())],
                data,
            )),
            Some(Route::Truncated { data, cut }) => {
                let body = data[start.min(cut)..cut].to_vec();
                let status = if start > 0 { 206 } else { 200 };
                Ok(streaming(
                    status,
                    vec![("Content-Length", (data.len() - start).to_string())],
                    body,
                ))
            }
            Some(Route::Status(status)) => Ok(streaming(status, Vec::new(), Vec::new())),
            Some(Route::Image(_)) | None => {
                Err(BridgeError::Network(format!("no route for {}", request.url)))
            }
        }
    }
}

// ============================================================================
// File system
// ============================================================================

type Files = Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>;

pub struct MemoryFs {
    root: PathBuf,
    files: Files,
}

impl MemoryFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            root: PathBuf::from("/data"),
            files: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn put(&self, path: &Path, data: Vec<u8>) {
        self.files.lock().unwrap().insert(path.to_path_buf(), data);
    }
}

struct MemoryWriter {
    files: Files,
    path: PathBuf,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.files
            .lock()
            .unwrap()
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl FileSystemAccess for MemoryFs {
    async fn get_cache_directory(&self) -> Result<PathBuf> {
        Ok(self.root.join("cache"))
    }

    async fn get_data_directory(&self) -> Result<PathBuf> {
        Ok(self.root.clone())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let size = self
            .files
            .lock()
            .unwrap()
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| BridgeError::Io(io::Error::from(io::ErrorKind::NotFound)))?;
        Ok(FileMetadata {
            size,
            modified_at: None,
            is_directory: false,
        })
    }

    async fn create_dir_all(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        self.contents(path)
            .map(Bytes::from)
            .ok_or_else(|| BridgeError::Io(io::Error::from(io::ErrorKind::NotFound)))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        self.put(path, data.to_vec());
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    async fn open_resumable_write(
        &self,
        path: &Path,
        offset: u64,
    ) -> Result<Box<dyn AsyncWrite + Send + Unpin>> {
        {
            let mut files = self.files.lock().unwrap();
            let data = files.entry(path.to_path_buf()).or_default();
            if (data.len() as u64) < offset {
                return Err(BridgeError::OperationFailed(format!(
                    "{} is shorter than offset {}",
                    path.display(),
                    offset
                )));
            }
            data.truncate(offset as usize);
        }
        Ok(Box::new(MemoryWriter {
            files: self.files.clone(),
            path: path.to_path_buf(),
        }))
    }
}

// ============================================================================
// Persistence
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, TransferRecord>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, track_id: &str) -> Option<TransferRecord> {
        self.records.lock().unwrap().get(track_id).cloned()
    }

    pub fn insert(&self, record: TransferRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.track_id.clone(), record);
    }
}

#[async_trait]
impl TransferRecordStore for MemoryStore {
    async fn persist_transfer_record(&self, record: &TransferRecord) -> Result<()> {
        self.insert(record.clone());
        Ok(())
    }

    async fn query_transfer_record(&self, track_id: &str) -> Result<Option<TransferRecord>> {
        Ok(self.get(track_id))
    }

    async fn list_transfer_records(&self) -> Result<Vec<TransferRecord>> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }

    async fn delete_transfer_record(&self, track_id: &str) -> Result<()> {
        self.records.lock().unwrap().remove(track_id);
        Ok(())
    }
}
