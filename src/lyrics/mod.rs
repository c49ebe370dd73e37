//! Lyrics acquisition and classification
//!
//! This module provides:
//! - LRCLIB API client for fetching lyrics
//! - LRC timeline parser for synchronized lyrics
//! - The acquisition step that turns a remote lookup into a classified
//!   result the upload workflow can gate on

use serde::{Deserialize, Serialize};

pub mod lrclib;
pub mod parser;

pub use lrclib::LrclibClient;
pub use parser::TimedLine;

/// What kind of lyrics data a lookup produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncKind {
    /// Timestamped lyrics with a non-empty parsed timeline
    #[serde(rename = "SYNCED")]
    Synced,
    /// Plain text only, no usable timestamps
    #[serde(rename = "UNSYNCED")]
    Unsynced,
    /// Nothing usable at all
    #[serde(rename = "ABSENT")]
    Absent,
}

impl SyncKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "SYNCED",
            Self::Unsynced => "UNSYNCED",
            Self::Absent => "ABSENT",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "SYNCED" => Some(Self::Synced),
            "UNSYNCED" => Some(Self::Unsynced),
            "ABSENT" => Some(Self::Absent),
            _ => None,
        }
    }
}

/// Outcome of a lyrics lookup: raw text, parsed timeline, and the
/// classification the workflow gates on. `kind` is `Synced` exactly
/// when `timeline` is non-empty.
#[derive(Debug, Clone)]
pub struct FetchedLyrics {
    pub raw: Option<String>,
    pub timeline: Vec<TimedLine>,
    pub kind: SyncKind,
}

impl FetchedLyrics {
    pub fn absent() -> Self {
        Self {
            raw: None,
            timeline: Vec::new(),
            kind: SyncKind::Absent,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.kind == SyncKind::Synced
    }
}

/// Look up lyrics for a track and classify the result.
///
/// Never fails: transport errors, bad statuses and malformed bodies all
/// degrade to an absent result, since missing lyrics are an expected
/// outcome rather than an exceptional one. A provider response that
/// claims synced lyrics but parses to an empty timeline is also treated
/// as absent.
pub async fn acquire(client: &LrclibClient, artist: &str, title: &str) -> FetchedLyrics {
    let response = match client.get_lyrics(artist, title).await {
        Ok(Some(response)) => response,
        Ok(None) => {
            tracing::info!("no lyrics found for '{title}' by '{artist}'");
            return FetchedLyrics::absent();
        }
        Err(err) => {
            tracing::warn!("lyrics lookup failed for '{title}' by '{artist}': {err:#}");
            return FetchedLyrics::absent();
        }
    };

    if let Some(synced) = response.synced_lyrics.as_deref()
        && !synced.is_empty()
    {
        let timeline = parser::parse(synced);
        if timeline.is_empty() {
            tracing::info!("synced lyrics for '{title}' by '{artist}' parsed to nothing");
            return FetchedLyrics::absent();
        }
        tracing::info!(
            "found synced lyrics for '{title}' by '{artist}' ({} lines)",
            timeline.len()
        );
        return FetchedLyrics {
            raw: response.plain_lyrics.clone(),
            timeline,
            kind: SyncKind::Synced,
        };
    }

    if let Some(plain) = response.plain_lyrics.as_deref()
        && !plain.is_empty()
    {
        tracing::info!("found unsynced lyrics for '{title}' by '{artist}'");
        return FetchedLyrics {
            raw: Some(plain.to_string()),
            timeline: Vec::new(),
            kind: SyncKind::Unsynced,
        };
    }

    FetchedLyrics::absent()
}

/// First `max_lines` line texts, falling back to raw text.
pub fn preview(timeline: &[TimedLine], raw: Option<&str>, max_lines: usize) -> String {
    if !timeline.is_empty() {
        return timeline
            .iter()
            .take(max_lines)
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
    }

    if let Some(raw) = raw
        && !raw.is_empty()
    {
        return raw.lines().take(max_lines).collect::<Vec<_>>().join("\n");
    }

    "No lyrics available".to_string()
}
