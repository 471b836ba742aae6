//! # Stream Format Negotiation
//!
//! Picks exactly one playable encoding out of the candidates the catalog offers
//! for a track. Priority is strict and first match wins:
//!
//! 1. audio-only candidates with a URL (no `width`)
//! 2. itag 251 (Opus/WebM)
//! 3. itag 140 (AAC/MP4)
//! 4. highest bitrate, ties broken by the lower itag

use crate::error::{PlaybackError, Result};
use crate::models::{StreamDescriptor, TrackId};
use bridge_traits::{CatalogClient, RawFormat};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Opus in WebM.
pub const ITAG_OPUS: u32 = 251;
/// AAC in MP4.
pub const ITAG_AAC: u32 = 140;

const PREFERRED_ITAGS: [u32; 2] = [ITAG_OPUS, ITAG_AAC];

/// Select the stream to play from `formats`.
pub fn select_stream(track_id: &TrackId, formats: &[RawFormat]) -> Result<StreamDescriptor> {
    let playable: Vec<&RawFormat> = formats
        .iter()
        .filter(|format| format.is_audio_only() && format.url.is_some())
        .collect();

    let preferred = PREFERRED_ITAGS
        .iter()
        .find_map(|itag| playable.iter().find(|format| format.itag == *itag));

    let chosen = match preferred {
        Some(format) => *format,
        None => playable
            .iter()
            .copied()
            .max_by(|a, b| by_bitrate_then_lower_itag(a, b))
            .ok_or_else(|| PlaybackError::NoPlayableFormat(track_id.to_string()))?,
    };

    let url = chosen
        .url
        .clone()
        .ok_or_else(|| PlaybackError::NoPlayableFormat(track_id.to_string()))?;

    Ok(StreamDescriptor {
        url,
        mime_type: chosen.mime_type.clone(),
        content_length: chosen.content_length.unwrap_or(0),
        itag: chosen.itag,
    })
}

fn by_bitrate_then_lower_itag(a: &RawFormat, b: &RawFormat) -> Ordering {
    a.bitrate
        .cmp(&b.bitrate)
        .then_with(|| b.itag.cmp(&a.itag))
}

/// Fetches candidate formats through the catalog and negotiates one.
#[derive(Clone)]
pub struct StreamNegotiator {
    catalog: Arc<dyn CatalogClient>,
}

impl StreamNegotiator {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }

    /// Resolve a fresh stream descriptor for `track_id`.
    #[instrument(skip(self), fields(track_id = %track_id))]
    pub async fn resolve(&self, track_id: &TrackId) -> Result<StreamDescriptor> {
        let formats = self
            .catalog
            .fetch_stream_formats(track_id.as_str())
            .await
            .map_err(|e| {
                warn!(error = %e, "Format lookup failed");
                PlaybackError::fetch_failed(e)
            })?;

        let descriptor = select_stream(track_id, &formats)?;
        debug!(
            itag = descriptor.itag,
            mime = %descriptor.mime_type,
            candidates = formats.len(),
            "Negotiated stream format"
        );
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(itag: u32, bitrate: u64) -> RawFormat {
        RawFormat {
            itag,
            url: Some(format!("https://cdn.example.com/{}", itag)),
            mime_type: "audio/webm; codecs=\"opus\"".to_string(),
            bitrate,
            content_length: Some(1_000_000),
            width: None,
        }
    }

    fn video(itag: u32, bitrate: u64) -> RawFormat {
        RawFormat {
            width: Some(1920),
            ..audio(itag, bitrate)
        }
    }

    fn pick(formats: &[RawFormat]) -> Result<StreamDescriptor> {
        select_stream(&TrackId::from("track"), formats)
    }

    #[test]
    fn test_prefers_opus_over_aac() {
        let chosen = pick(&[audio(140, 128_000), audio(251, 96_000)]).unwrap();
        assert_eq!(chosen.itag, 251);
        assert_eq!(chosen.url, "https://cdn.example.com/251");
        assert_eq!(chosen.content_length, 1_000_000);
    }

    #[test]
    fn test_falls_back_to_aac() {
        let chosen = pick(&[audio(140, 128_000)]).unwrap();
        assert_eq!(chosen.itag, 140);
    }

    #[test]
    fn test_falls_back_to_highest_bitrate() {
        let chosen = pick(&[audio(999, 128_000), audio(998, 256_000)]).unwrap();
        assert_eq!(chosen.itag, 998);
    }

    #[test]
    fn test_bitrate_tie_is_order_independent() {
        let forward = pick(&[audio(600, 128_000), audio(599, 128_000)]).unwrap();
        let reverse = pick(&[audio(599, 128_000), audio(600, 128_000)]).unwrap();
        assert_eq!(forward.itag, 599);
        assert_eq!(reverse.itag, 599);
    }

    #[test]
    fn test_video_variants_are_discarded() {
        let chosen = pick(&[video(251, 900_000), audio(140, 128_000)]).unwrap();
        assert_eq!(chosen.itag, 140);

        let err = pick(&[video(22, 2_000_000), video(18, 500_000)]).unwrap_err();
        assert!(matches!(err, PlaybackError::NoPlayableFormat(id) if id == "track"));
    }

    #[test]
    fn test_empty_list_has_no_playable_format() {
        assert!(matches!(pick(&[]), Err(PlaybackError::NoPlayableFormat(_))));
    }

    #[test]
    fn test_candidates_without_url_are_skipped() {
        let mut ciphered = audio(251, 160_000);
        ciphered.url = None;
        let chosen = pick(&[ciphered, audio(140, 128_000)]).unwrap();
        assert_eq!(chosen.itag, 140);
    }

    #[test]
    fn test_missing_length_is_zero() {
        let mut format = audio(251, 160_000);
        format.content_length = None;
        assert_eq!(pick(&[format]).unwrap().content_length, 0);
    }
}
