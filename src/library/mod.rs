//! Song library
//!
//! The lyrics-gated upload workflow and the operations on stored songs.
//! An upload only ever reaches the object store after synced lyrics
//! have been found and parsed; the resulting record stays pending until
//! the caller confirms it, and a rejected upload removes both the
//! object and the record.

pub mod models;
pub mod validate;

use crate::config::Limits;
use crate::error::LibraryError;
use crate::lyrics::{self, LrclibClient, SyncKind};
use crate::objects::ObjectStore;
use crate::storage::Storage;
use models::{DEFAULT_FREQUENCY_WEIGHT, Song, SongView, UploadReceipt, new_song_id};
use std::time::Duration;
use time::OffsetDateTime;
use validate::UploadFile;

pub struct Library<O: ObjectStore> {
    storage: Storage,
    objects: O,
    lrclib: LrclibClient,
    limits: Limits,
}

impl<O: ObjectStore> Library<O> {
    pub fn new(storage: Storage, objects: O, lrclib: LrclibClient, limits: Limits) -> Self {
        Self {
            storage,
            objects,
            lrclib,
            limits,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Upload a new song.
    ///
    /// Ordered so that nothing durable is written until the cheap
    /// checks and the lyrics lookup have all passed: capacity, file
    /// validation, then synced-lyrics acquisition, and only then the
    /// object write and the pending record.
    pub async fn upload(
        &self,
        owner_id: &str,
        file: UploadFile,
        title: &str,
        artist: &str,
    ) -> Result<UploadReceipt, LibraryError> {
        let current = self.storage.count_confirmed(owner_id)?;
        if current >= self.limits.max_songs {
            return Err(LibraryError::SongLimitExceeded {
                limit: self.limits.max_songs,
            });
        }

        validate::validate_audio(&file, self.limits.max_audio_bytes)?;

        let fetched = lyrics::acquire(&self.lrclib, artist, title).await;
        if !fetched.is_synced() {
            tracing::info!("upload refused, no synced lyrics for '{title}' by '{artist}'");
            return Err(LibraryError::SyncedLyricsNotFound {
                artist: artist.to_string(),
                title: title.to_string(),
            });
        }

        let format = file.extension();
        let byte_size = file.bytes.len() as u64;
        let object_ref = self.objects.put(owner_id, &format, &file.bytes)?;

        let song = Song {
            id: new_song_id(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            object_ref,
            byte_size,
            format,
            raw_lyrics: fetched.raw,
            timeline: fetched.timeline,
            sync_kind: SyncKind::Synced,
            frequency_weight: DEFAULT_FREQUENCY_WEIGHT,
            sync_offset_ms: 0,
            confirmed: false,
            video_ref: None,
            video_byte_size: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        self.storage.upsert_song(&song)?;
        tracing::info!(
            "song stored pending confirmation: '{}' by '{}' for {} ({} lines)",
            song.title,
            song.artist,
            owner_id,
            song.timeline.len()
        );

        let lyrics_preview = lyrics::preview(
            &song.timeline,
            song.raw_lyrics.as_deref(),
            self.limits.preview_lines,
        );
        Ok(UploadReceipt {
            song_id: song.id,
            title: song.title,
            artist: song.artist,
            lyrics_preview,
            sync_kind: song.sync_kind,
            line_count: song.timeline.len(),
        })
    }

    /// Make a pending upload durable and visible.
    pub fn confirm(&self, owner_id: &str, song_id: &str) -> Result<(), LibraryError> {
        let song = self.get_owned(owner_id, song_id)?;
        let confirmed = song.confirm_at(OffsetDateTime::now_utc());
        self.storage.upsert_song(&confirmed)?;
        tracing::info!("lyrics confirmed for song {song_id}");
        Ok(())
    }

    /// Discard a pending upload: the backing object first, then the
    /// record. The object delete is best-effort and never blocks the
    /// record delete.
    pub fn reject(&self, owner_id: &str, song_id: &str) -> Result<(), LibraryError> {
        let song = self.get_owned(owner_id, song_id)?;
        if let Err(err) = self.objects.delete(&song.object_ref) {
            tracing::warn!("failed to delete object {}: {err:#}", song.object_ref);
        }
        self.storage.delete_song(song_id)?;
        tracing::info!("upload rejected and removed: {song_id}");
        Ok(())
    }

    /// Delete a confirmed song together with its objects.
    pub fn delete(&self, owner_id: &str, song_id: &str) -> Result<(), LibraryError> {
        let song = self.get_confirmed(owner_id, song_id)?;
        if let Err(err) = self.objects.delete(&song.object_ref) {
            tracing::warn!("failed to delete object {}: {err:#}", song.object_ref);
        }
        if let Some(video_ref) = &song.video_ref
            && let Err(err) = self.objects.delete(video_ref)
        {
            tracing::warn!("failed to delete video object {video_ref}: {err:#}");
        }
        self.storage.delete_song(song_id)?;
        tracing::info!("song deleted: {song_id} by owner {owner_id}");
        Ok(())
    }

    /// Adjust frequency weight (1-5) and sync offset.
    pub fn update_settings(
        &self,
        owner_id: &str,
        song_id: &str,
        frequency_weight: u8,
        sync_offset_ms: i64,
    ) -> Result<SongView, LibraryError> {
        if !(1..=5).contains(&frequency_weight) {
            return Err(LibraryError::InvalidFile(
                "frequency weight must be between 1 and 5".into(),
            ));
        }

        let song = self.get_confirmed(owner_id, song_id)?;
        let updated = song.with_settings(frequency_weight, sync_offset_ms, OffsetDateTime::now_utc());
        self.storage.upsert_song(&updated)?;
        tracing::info!(
            "song settings updated: {song_id} weight={frequency_weight} offset={sync_offset_ms}ms"
        );
        Ok(self.view(&updated))
    }

    /// Confirmed songs for an owner, with signed URLs.
    pub fn list(&self, owner_id: &str) -> Result<Vec<SongView>, LibraryError> {
        let songs = self.storage.list_confirmed(owner_id)?;
        Ok(songs.iter().map(|s| self.view(s)).collect())
    }

    /// Newest change time across the owner's confirmed songs.
    pub fn latest_update(&self, owner_id: &str) -> Result<Option<OffsetDateTime>, LibraryError> {
        Ok(self.storage.latest_update(owner_id)?)
    }

    pub fn song_count(&self, owner_id: &str) -> Result<u32, LibraryError> {
        Ok(self.storage.count_confirmed(owner_id)?)
    }

    /// Attach a background video to a confirmed song, replacing any
    /// previous one.
    pub fn attach_video(
        &self,
        owner_id: &str,
        song_id: &str,
        file: UploadFile,
    ) -> Result<SongView, LibraryError> {
        validate::validate_video(&file, self.limits.max_video_bytes)?;
        let song = self.get_confirmed(owner_id, song_id)?;

        if let Some(old_ref) = &song.video_ref
            && let Err(err) = self.objects.delete(old_ref)
        {
            tracing::warn!("failed to delete old video {old_ref}: {err:#}");
        }

        let video_byte_size = file.bytes.len() as u64;
        let video_ref = self.objects.put(owner_id, "mp4", &file.bytes)?;
        let updated = song.with_video(video_ref, video_byte_size, OffsetDateTime::now_utc());
        self.storage.upsert_song(&updated)?;
        tracing::info!("video attached to song {song_id}");
        Ok(self.view(&updated))
    }

    /// Detach and delete a song's background video.
    pub fn remove_video(&self, owner_id: &str, song_id: &str) -> Result<(), LibraryError> {
        let song = self.get_confirmed(owner_id, song_id)?;
        let Some(video_ref) = song.video_ref.clone() else {
            return Err(LibraryError::NotFound { what: "video" });
        };

        if let Err(err) = self.objects.delete(&video_ref) {
            tracing::warn!("failed to delete video object {video_ref}: {err:#}");
        }
        let updated = song.without_video(OffsetDateTime::now_utc());
        self.storage.upsert_song(&updated)?;
        tracing::info!("video removed from song {song_id}");
        Ok(())
    }

    fn get_owned(&self, owner_id: &str, song_id: &str) -> Result<Song, LibraryError> {
        self.storage
            .get_song(song_id, owner_id)?
            .ok_or(LibraryError::NotFound { what: "song" })
    }

    fn get_confirmed(&self, owner_id: &str, song_id: &str) -> Result<Song, LibraryError> {
        let song = self.get_owned(owner_id, song_id)?;
        if !song.confirmed {
            return Err(LibraryError::NotFound { what: "song" });
        }
        Ok(song)
    }

    fn view(&self, song: &Song) -> SongView {
        let ttl = Duration::from_secs(self.limits.signed_url_ttl_secs);
        SongView {
            id: song.id.clone(),
            title: song.title.clone(),
            artist: song.artist.clone(),
            audio_url: self.objects.signed_url(&song.object_ref, ttl),
            video_url: song
                .video_ref
                .as_ref()
                .map(|r| self.objects.signed_url(r, ttl)),
            format: song.format.clone(),
            byte_size: song.byte_size,
            frequency_weight: song.frequency_weight,
            sync_offset_ms: song.sync_offset_ms,
            sync_kind: song.sync_kind,
            timeline: song.timeline.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory object store double that counts calls.
    #[derive(Default)]
    pub struct MemObjectStore {
        pub objects: Mutex<HashMap<String, Vec<u8>>>,
        pub puts: AtomicUsize,
        pub deletes: AtomicUsize,
    }

    impl MemObjectStore {
        pub fn len(&self) -> usize {
            self.objects.lock().unwrap().len()
        }

        pub fn put_count(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
        }

        pub fn delete_count(&self) -> usize {
            self.deletes.load(Ordering::SeqCst)
        }
    }

    impl ObjectStore for &MemObjectStore {
        fn put(&self, owner_id: &str, ext: &str, bytes: &[u8]) -> anyhow::Result<String> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            let object_ref = format!("{}/{}.{}", owner_id, self.len(), ext);
            self.objects
                .lock()
                .unwrap()
                .insert(object_ref.clone(), bytes.to_vec());
            Ok(object_ref)
        }

        fn delete(&self, object_ref: &str) -> anyhow::Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.objects.lock().unwrap().remove(object_ref);
            Ok(())
        }

        fn signed_url(&self, object_ref: &str, _ttl: Duration) -> String {
            format!("mem://{object_ref}?signed")
        }
    }
}
