use crate::lyrics::{SyncKind, TimedLine};
use time::OffsetDateTime;

/// Default random-selection bias for freshly uploaded songs.
pub const DEFAULT_FREQUENCY_WEIGHT: u8 = 3;

/// An uploaded song with its lyrics timeline.
///
/// Songs are value snapshots: update operations consume the snapshot
/// and return a new one with `updated_at` bumped, and the storage layer
/// persists whatever it is handed. A song stays invisible to listing
/// and embedding until `confirmed` is set.
#[derive(Debug, Clone)]
pub struct Song {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub artist: String,

    /// Opaque object-store reference for the audio file
    pub object_ref: String,
    pub byte_size: u64,
    pub format: String,

    pub raw_lyrics: Option<String>,
    pub timeline: Vec<TimedLine>,
    pub sync_kind: SyncKind,

    /// Random-selection bias, 1-5
    pub frequency_weight: u8,
    /// Fine-tune correction applied by players; positive shows lyrics later
    pub sync_offset_ms: i64,

    pub confirmed: bool,

    pub video_ref: Option<String>,
    pub video_byte_size: Option<u64>,

    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

impl Song {
    pub fn confirm_at(self, now: OffsetDateTime) -> Song {
        Song {
            confirmed: true,
            updated_at: Some(now),
            ..self
        }
    }

    pub fn with_settings(
        self,
        frequency_weight: u8,
        sync_offset_ms: i64,
        now: OffsetDateTime,
    ) -> Song {
        Song {
            frequency_weight,
            sync_offset_ms,
            updated_at: Some(now),
            ..self
        }
    }

    pub fn with_video(self, video_ref: String, video_byte_size: u64, now: OffsetDateTime) -> Song {
        Song {
            video_ref: Some(video_ref),
            video_byte_size: Some(video_byte_size),
            updated_at: Some(now),
            ..self
        }
    }

    pub fn without_video(self, now: OffsetDateTime) -> Song {
        Song {
            video_ref: None,
            video_byte_size: None,
            updated_at: Some(now),
            ..self
        }
    }
}

/// Fresh song id: 24 hex chars.
pub fn new_song_id() -> String {
    hex::encode(rand::random::<[u8; 12]>())
}

/// What `upload` hands back so the caller can drive confirm/reject.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub song_id: String,
    pub title: String,
    pub artist: String,
    pub lyrics_preview: String,
    pub sync_kind: SyncKind,
    pub line_count: usize,
}

/// Listing/embed projection of a confirmed song, with freshly signed
/// URLs in place of raw object references.
#[derive(Debug, Clone)]
pub struct SongView {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub audio_url: String,
    pub video_url: Option<String>,
    pub format: String,
    pub byte_size: u64,
    pub frequency_weight: u8,
    pub sync_offset_ms: i64,
    pub sync_kind: SyncKind,
    pub timeline: Vec<TimedLine>,
}
