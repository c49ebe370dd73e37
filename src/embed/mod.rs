//! Embed serving path
//!
//! Public, API-key-authenticated access to an owner's confirmed songs.
//! Every call burns one unit of the key's daily quota; the cheap
//! `check` operation exists so embedding players can poll for changes
//! without refetching the full listing.

use crate::error::LibraryError;
use crate::library::Library;
use crate::library::models::SongView;
use crate::objects::ObjectStore;
use crate::quota::{self, QuotaTracker};
use time::OffsetDateTime;

#[derive(Debug, Clone)]
pub struct EmbedCheck {
    pub has_changes: bool,
    pub last_update: Option<OffsetDateTime>,
}

#[derive(Debug)]
pub struct EmbedSongs {
    pub owner_id: String,
    pub songs: Vec<SongView>,
    pub total_songs: usize,
    pub last_update: Option<OffsetDateTime>,
}

/// Whether the key owner's songs changed since the caller last looked.
pub fn check<O: ObjectStore>(
    library: &Library<O>,
    tracker: &QuotaTracker,
    key: &str,
    now: OffsetDateTime,
) -> Result<EmbedCheck, LibraryError> {
    let record = gate(library, tracker, key, now)?;

    let last_update = library.latest_update(&record.owner_id)?;
    Ok(EmbedCheck {
        has_changes: last_update.is_some(),
        last_update,
    })
}

/// Full song listing for the embed player.
pub fn songs<O: ObjectStore>(
    library: &Library<O>,
    tracker: &QuotaTracker,
    key: &str,
    now: OffsetDateTime,
) -> Result<EmbedSongs, LibraryError> {
    let record = gate(library, tracker, key, now)?;

    let songs = library.list(&record.owner_id)?;
    let last_update = library.latest_update(&record.owner_id)?;
    tracing::debug!("embed songs returned for owner {} ({})", record.owner_id, songs.len());
    Ok(EmbedSongs {
        owner_id: record.owner_id,
        total_songs: songs.len(),
        songs,
        last_update,
    })
}

/// Authenticate, enforce the daily budget, count the request.
fn gate<O: ObjectStore>(
    library: &Library<O>,
    tracker: &QuotaTracker,
    key: &str,
    now: OffsetDateTime,
) -> Result<quota::ApiKey, LibraryError> {
    let record = quota::authenticate(library.storage(), key, now)?;
    if tracker.is_exceeded(library.storage(), key, now)? {
        return Err(LibraryError::RateLimitExceeded);
    }
    tracker.record(library.storage(), key, now)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Limits, LrclibConfig};
    use crate::library::models::{DEFAULT_FREQUENCY_WEIGHT, Song, new_song_id};
    use crate::library::testing::MemObjectStore;
    use crate::lyrics::{LrclibClient, SyncKind, TimedLine};
    use crate::storage::Storage;

    fn at(ts: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(ts).unwrap()
    }

    fn library(objects: &MemObjectStore) -> Library<&MemObjectStore> {
        // The embed path never talks to the lyrics source.
        let lrclib = LrclibClient::new(&LrclibConfig::default()).unwrap();
        Library::new(
            Storage::open_in_memory().unwrap(),
            objects,
            lrclib,
            Limits::default(),
        )
    }

    fn confirmed_song(owner: &str) -> Song {
        Song {
            id: new_song_id(),
            owner_id: owner.into(),
            title: "T".into(),
            artist: "A".into(),
            object_ref: format!("{owner}/x.mp3"),
            byte_size: 1,
            format: "mp3".into(),
            raw_lyrics: None,
            timeline: vec![TimedLine::new(0, "x")],
            sync_kind: SyncKind::Synced,
            frequency_weight: DEFAULT_FREQUENCY_WEIGHT,
            sync_offset_ms: 0,
            confirmed: true,
            video_ref: None,
            video_byte_size: None,
            created_at: at(1000),
            updated_at: None,
        }
    }

    #[test]
    fn unknown_key_is_refused() {
        let objects = MemObjectStore::default();
        let library = library(&objects);
        let tracker = QuotaTracker::new(10);

        assert!(matches!(
            check(&library, &tracker, "nope", at(0)),
            Err(LibraryError::InvalidApiKey)
        ));
    }

    #[test]
    fn check_reports_changes_and_counts_requests() {
        let objects = MemObjectStore::default();
        let library = library(&objects);
        let tracker = QuotaTracker::new(10);
        let key = quota::issue(library.storage(), "u1", at(0)).unwrap();

        let result = check(&library, &tracker, &key.key, at(10)).unwrap();
        assert!(!result.has_changes);
        assert!(result.last_update.is_none());

        library.storage().upsert_song(&confirmed_song("u1")).unwrap();
        let result = check(&library, &tracker, &key.key, at(20)).unwrap();
        assert!(result.has_changes);
        assert_eq!(result.last_update, Some(at(1000)));

        let stored = library.storage().get_api_key(&key.key).unwrap().unwrap();
        assert_eq!(stored.daily_count, 2);
        assert_eq!(stored.last_used, Some(at(20)));
    }

    #[test]
    fn songs_lists_only_the_key_owner() {
        let objects = MemObjectStore::default();
        let library = library(&objects);
        let tracker = QuotaTracker::new(10);
        let key = quota::issue(library.storage(), "u1", at(0)).unwrap();

        library.storage().upsert_song(&confirmed_song("u1")).unwrap();
        library.storage().upsert_song(&confirmed_song("u2")).unwrap();

        let result = songs(&library, &tracker, &key.key, at(10)).unwrap();
        assert_eq!(result.owner_id, "u1");
        assert_eq!(result.total_songs, 1);
        assert!(result.songs[0].audio_url.starts_with("mem://"));
    }

    #[test]
    fn exhausted_budget_is_refused_until_the_next_day() {
        let objects = MemObjectStore::default();
        let library = library(&objects);
        let tracker = QuotaTracker::new(2);
        let key = quota::issue(library.storage(), "u1", at(0)).unwrap();

        check(&library, &tracker, &key.key, at(10)).unwrap();
        check(&library, &tracker, &key.key, at(11)).unwrap();
        assert!(matches!(
            check(&library, &tracker, &key.key, at(12)),
            Err(LibraryError::RateLimitExceeded)
        ));

        // A new UTC day clears the budget.
        assert!(check(&library, &tracker, &key.key, at(86_400 + 10)).is_ok());
    }
}
