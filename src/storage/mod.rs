use crate::library::models::Song;
use crate::lyrics::{SyncKind, TimedLine};
use crate::quota::ApiKey;
use anyhow::Context;
use rusqlite::{Connection, Row, params};
use std::path::Path;
use time::OffsetDateTime;

/// Keyed record store for songs and API keys.
///
/// Single-record reads and writes only; callers get no transactions.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory db")?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                r#"
CREATE TABLE IF NOT EXISTS songs (
  id TEXT PRIMARY KEY,
  owner_id TEXT NOT NULL,
  title TEXT NOT NULL,
  artist TEXT NOT NULL,
  object_ref TEXT NOT NULL,
  byte_size INTEGER NOT NULL,
  format TEXT NOT NULL,
  raw_lyrics TEXT,
  timeline_json TEXT NOT NULL,
  sync_kind TEXT NOT NULL,
  frequency_weight INTEGER NOT NULL DEFAULT 3,
  sync_offset_ms INTEGER NOT NULL DEFAULT 0,
  confirmed INTEGER NOT NULL DEFAULT 0,
  video_ref TEXT,
  video_byte_size INTEGER,
  created_at INTEGER NOT NULL,
  updated_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_songs_owner ON songs(owner_id);

CREATE TABLE IF NOT EXISTS api_keys (
  key TEXT PRIMARY KEY,
  owner_id TEXT NOT NULL,
  created_at INTEGER NOT NULL,
  last_used INTEGER,
  daily_count INTEGER NOT NULL DEFAULT 0,
  reset_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_api_keys_owner ON api_keys(owner_id);
"#,
            )
            .context("init schema")?;
        Ok(())
    }

    pub fn upsert_song(&self, song: &Song) -> anyhow::Result<()> {
        let timeline_json =
            serde_json::to_string(&song.timeline).unwrap_or_else(|_| "[]".into());
        self.conn
            .execute(
                r#"
INSERT INTO songs(
  id, owner_id, title, artist, object_ref, byte_size, format,
  raw_lyrics, timeline_json, sync_kind, frequency_weight, sync_offset_ms,
  confirmed, video_ref, video_byte_size, created_at, updated_at
)
VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
ON CONFLICT(id) DO UPDATE SET
  owner_id=excluded.owner_id,
  title=excluded.title,
  artist=excluded.artist,
  object_ref=excluded.object_ref,
  byte_size=excluded.byte_size,
  format=excluded.format,
  raw_lyrics=excluded.raw_lyrics,
  timeline_json=excluded.timeline_json,
  sync_kind=excluded.sync_kind,
  frequency_weight=excluded.frequency_weight,
  sync_offset_ms=excluded.sync_offset_ms,
  confirmed=excluded.confirmed,
  video_ref=excluded.video_ref,
  video_byte_size=excluded.video_byte_size,
  created_at=excluded.created_at,
  updated_at=excluded.updated_at
"#,
                params![
                    song.id,
                    song.owner_id,
                    song.title,
                    song.artist,
                    song.object_ref,
                    song.byte_size as i64,
                    song.format,
                    song.raw_lyrics,
                    timeline_json,
                    song.sync_kind.as_str(),
                    song.frequency_weight,
                    song.sync_offset_ms,
                    song.confirmed as i32,
                    song.video_ref,
                    song.video_byte_size.map(|v| v as i64),
                    song.created_at.unix_timestamp(),
                    song.updated_at.map(|t| t.unix_timestamp()),
                ],
            )
            .context("upsert song")?;
        Ok(())
    }

    pub fn get_song(&self, id: &str, owner_id: &str) -> anyhow::Result<Option<Song>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM songs WHERE id=?1 AND owner_id=?2")
            .context("prepare get song")?;
        let mut rows = stmt
            .query_map(params![id, owner_id], song_from_row)
            .context("query song")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("read song row")?)),
            None => Ok(None),
        }
    }

    pub fn delete_song(&self, id: &str) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM songs WHERE id=?1", params![id])
            .context("delete song")?;
        Ok(())
    }

    pub fn count_confirmed(&self, owner_id: &str) -> anyhow::Result<u32> {
        let count: u32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM songs WHERE owner_id=?1 AND confirmed=1",
                params![owner_id],
                |row| row.get(0),
            )
            .context("count confirmed songs")?;
        Ok(count)
    }

    pub fn list_confirmed(&self, owner_id: &str) -> anyhow::Result<Vec<Song>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT * FROM songs WHERE owner_id=?1 AND confirmed=1 ORDER BY created_at, id",
            )
            .context("prepare list songs")?;
        let songs = stmt
            .query_map(params![owner_id], song_from_row)
            .context("query songs")?
            .filter_map(|r| r.ok())
            .collect();
        Ok(songs)
    }

    /// Newest update time across the owner's confirmed songs, falling
    /// back to creation time per song.
    pub fn latest_update(&self, owner_id: &str) -> anyhow::Result<Option<OffsetDateTime>> {
        let ts: Option<i64> = self
            .conn
            .query_row(
                "SELECT MAX(COALESCE(updated_at, created_at)) FROM songs \
                 WHERE owner_id=?1 AND confirmed=1",
                params![owner_id],
                |row| row.get(0),
            )
            .context("query latest update")?;
        Ok(ts.map(datetime_from_unix))
    }

    pub fn upsert_api_key(&self, api_key: &ApiKey) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO api_keys(key, owner_id, created_at, last_used, daily_count, reset_at)
VALUES(?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(key) DO UPDATE SET
  owner_id=excluded.owner_id,
  last_used=excluded.last_used,
  daily_count=excluded.daily_count,
  reset_at=excluded.reset_at
"#,
                params![
                    api_key.key,
                    api_key.owner_id,
                    api_key.created_at.unix_timestamp(),
                    api_key.last_used.map(|t| t.unix_timestamp()),
                    api_key.daily_count,
                    api_key.reset_at.map(|t| t.unix_timestamp()),
                ],
            )
            .context("upsert api key")?;
        Ok(())
    }

    pub fn get_api_key(&self, key: &str) -> anyhow::Result<Option<ApiKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM api_keys WHERE key=?1")
            .context("prepare get api key")?;
        let mut rows = stmt
            .query_map(params![key], api_key_from_row)
            .context("query api key")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("read api key row")?)),
            None => Ok(None),
        }
    }

    pub fn api_key_for_owner(&self, owner_id: &str) -> anyhow::Result<Option<ApiKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM api_keys WHERE owner_id=?1 ORDER BY created_at DESC LIMIT 1")
            .context("prepare api key by owner")?;
        let mut rows = stmt
            .query_map(params![owner_id], api_key_from_row)
            .context("query api key by owner")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("read api key row")?)),
            None => Ok(None),
        }
    }
}

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    let timeline_json: String = row.get("timeline_json")?;
    let timeline: Vec<TimedLine> = serde_json::from_str(&timeline_json).unwrap_or_default();
    let sync_kind: String = row.get("sync_kind")?;
    let byte_size: i64 = row.get("byte_size")?;
    let video_byte_size: Option<i64> = row.get("video_byte_size")?;
    let created_at: i64 = row.get("created_at")?;
    let updated_at: Option<i64> = row.get("updated_at")?;

    Ok(Song {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        title: row.get("title")?,
        artist: row.get("artist")?,
        object_ref: row.get("object_ref")?,
        byte_size: byte_size as u64,
        format: row.get("format")?,
        raw_lyrics: row.get("raw_lyrics")?,
        timeline,
        sync_kind: SyncKind::from_tag(&sync_kind).unwrap_or(SyncKind::Unsynced),
        frequency_weight: row.get("frequency_weight")?,
        sync_offset_ms: row.get("sync_offset_ms")?,
        confirmed: row.get::<_, i32>("confirmed")? != 0,
        video_ref: row.get("video_ref")?,
        video_byte_size: video_byte_size.map(|v| v as u64),
        created_at: datetime_from_unix(created_at),
        updated_at: updated_at.map(datetime_from_unix),
    })
}

fn api_key_from_row(row: &Row<'_>) -> rusqlite::Result<ApiKey> {
    let created_at: i64 = row.get("created_at")?;
    let last_used: Option<i64> = row.get("last_used")?;
    let reset_at: Option<i64> = row.get("reset_at")?;

    Ok(ApiKey {
        key: row.get("key")?,
        owner_id: row.get("owner_id")?,
        created_at: datetime_from_unix(created_at),
        last_used: last_used.map(datetime_from_unix),
        daily_count: row.get("daily_count")?,
        reset_at: reset_at.map(datetime_from_unix),
    })
}

fn datetime_from_unix(ts: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(ts).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::models::{DEFAULT_FREQUENCY_WEIGHT, new_song_id};

    fn sample_song(owner: &str, confirmed: bool) -> Song {
        Song {
            id: new_song_id(),
            owner_id: owner.into(),
            title: "Title".into(),
            artist: "Artist".into(),
            object_ref: format!("{owner}/obj.mp3"),
            byte_size: 123,
            format: "mp3".into(),
            raw_lyrics: Some("raw".into()),
            timeline: vec![TimedLine::new(960, "One"), TimedLine::new(4020, "Two")],
            sync_kind: SyncKind::Synced,
            frequency_weight: DEFAULT_FREQUENCY_WEIGHT,
            sync_offset_ms: 0,
            confirmed,
            video_ref: None,
            video_byte_size: None,
            created_at: datetime_from_unix(1_700_000_000),
            updated_at: None,
        }
    }

    #[test]
    fn song_round_trip() {
        let storage = Storage::open_in_memory().unwrap();
        let song = sample_song("u1", false);
        storage.upsert_song(&song).unwrap();

        let loaded = storage.get_song(&song.id, "u1").unwrap().unwrap();
        assert_eq!(loaded.title, "Title");
        assert_eq!(loaded.timeline, song.timeline);
        assert_eq!(loaded.sync_kind, SyncKind::Synced);
        assert!(!loaded.confirmed);
        assert_eq!(loaded.created_at, song.created_at);
    }

    #[test]
    fn get_song_checks_ownership() {
        let storage = Storage::open_in_memory().unwrap();
        let song = sample_song("u1", true);
        storage.upsert_song(&song).unwrap();

        assert!(storage.get_song(&song.id, "someone-else").unwrap().is_none());
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let storage = Storage::open_in_memory().unwrap();
        let song = sample_song("u1", false);
        storage.upsert_song(&song).unwrap();

        let updated = song.clone().confirm_at(datetime_from_unix(1_700_000_100));
        storage.upsert_song(&updated).unwrap();

        let loaded = storage.get_song(&song.id, "u1").unwrap().unwrap();
        assert!(loaded.confirmed);
        assert_eq!(loaded.updated_at, Some(datetime_from_unix(1_700_000_100)));
    }

    #[test]
    fn counting_and_listing_see_confirmed_only() {
        let storage = Storage::open_in_memory().unwrap();
        storage.upsert_song(&sample_song("u1", true)).unwrap();
        storage.upsert_song(&sample_song("u1", false)).unwrap();
        storage.upsert_song(&sample_song("u2", true)).unwrap();

        assert_eq!(storage.count_confirmed("u1").unwrap(), 1);
        assert_eq!(storage.list_confirmed("u1").unwrap().len(), 1);
    }

    #[test]
    fn latest_update_falls_back_to_created_at() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(storage.latest_update("u1").unwrap().is_none());

        storage.upsert_song(&sample_song("u1", true)).unwrap();
        assert_eq!(
            storage.latest_update("u1").unwrap(),
            Some(datetime_from_unix(1_700_000_000))
        );

        let mut newer = sample_song("u1", true);
        newer.updated_at = Some(datetime_from_unix(1_700_000_500));
        storage.upsert_song(&newer).unwrap();
        assert_eq!(
            storage.latest_update("u1").unwrap(),
            Some(datetime_from_unix(1_700_000_500))
        );
    }

    #[test]
    fn api_key_round_trip() {
        let storage = Storage::open_in_memory().unwrap();
        let api_key = ApiKey {
            key: "abcd".into(),
            owner_id: "u1".into(),
            created_at: datetime_from_unix(1_700_000_000),
            last_used: None,
            daily_count: 0,
            reset_at: None,
        };
        storage.upsert_api_key(&api_key).unwrap();

        let loaded = storage.get_api_key("abcd").unwrap().unwrap();
        assert_eq!(loaded.owner_id, "u1");
        assert_eq!(loaded.daily_count, 0);
        assert!(loaded.reset_at.is_none());

        assert!(storage.get_api_key("nope").unwrap().is_none());
        assert_eq!(
            storage.api_key_for_owner("u1").unwrap().unwrap().key,
            "abcd"
        );
    }
}
