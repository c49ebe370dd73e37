use thiserror::Error;

/// Errors surfaced by the library core.
///
/// Transient lyrics-source failures never show up here: acquisition
/// absorbs them and reports an absent result instead.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The uploaded file (or a parameter range) failed validation.
    #[error("{0}")]
    InvalidFile(String),

    /// The owner already holds the maximum number of confirmed songs.
    #[error("song limit reached ({limit} songs per account)")]
    SongLimitExceeded { limit: u32 },

    /// No synced lyrics could be obtained for the requested track.
    #[error("no synced lyrics available for '{title}' by '{artist}'")]
    SyncedLyricsNotFound { artist: String, title: String },

    /// The API key has spent its daily request budget.
    #[error("daily request limit exceeded")]
    RateLimitExceeded,

    /// The API key is unknown.
    #[error("invalid API key")]
    InvalidApiKey,

    /// Unknown id, or the record belongs to someone else.
    #[error("{what} not found")]
    NotFound { what: &'static str },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
