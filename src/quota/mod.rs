//! API keys and the per-key daily request quota
//!
//! Each owner gets an API key for their embed player. Requests made
//! with a key count against a daily budget that resets at UTC
//! midnight. The reset is lazy: an exceeded-check on a new day treats
//! the counter as zero, but the stored record is only rewritten by the
//! next increment. Check-then-increment is not atomic; concurrent
//! requests may undercount, which is accepted.

use crate::error::LibraryError;
use crate::storage::Storage;
use sha1::{Digest, Sha1};
use time::OffsetDateTime;

/// Per-owner embed credential with its daily request counter.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub key: String,
    pub owner_id: String,
    pub created_at: OffsetDateTime,
    pub last_used: Option<OffsetDateTime>,
    pub daily_count: u32,
    pub reset_at: Option<OffsetDateTime>,
}

/// Generate a fresh key: 32 hex chars derived from random material and
/// the current time.
pub fn generate_key() -> String {
    let seed = rand::random::<[u8; 16]>();
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();

    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(nanos.to_be_bytes());
    hex::encode(hasher.finalize())[..32].to_string()
}

/// Create and persist a new API key for an owner.
pub fn issue(storage: &Storage, owner_id: &str, now: OffsetDateTime) -> anyhow::Result<ApiKey> {
    let api_key = ApiKey {
        key: generate_key(),
        owner_id: owner_id.to_string(),
        created_at: now,
        last_used: None,
        daily_count: 0,
        reset_at: None,
    };
    storage.upsert_api_key(&api_key)?;
    tracing::info!("API key created for owner {owner_id}");
    Ok(api_key)
}

/// Resolve a key to its record, stamping `last_used`.
pub fn authenticate(
    storage: &Storage,
    key: &str,
    now: OffsetDateTime,
) -> Result<ApiKey, LibraryError> {
    let Some(mut record) = storage.get_api_key(key)? else {
        return Err(LibraryError::InvalidApiKey);
    };
    record.last_used = Some(now);
    storage.upsert_api_key(&record)?;
    Ok(record)
}

/// Daily request counter with UTC-midnight reset.
pub struct QuotaTracker {
    daily_limit: u32,
}

impl QuotaTracker {
    pub fn new(daily_limit: u32) -> Self {
        Self { daily_limit }
    }

    /// Read-only check. A reset window that ended on an earlier UTC
    /// date counts as zero even though the stored counter is only
    /// rewritten by the next `record` call.
    pub fn is_exceeded(
        &self,
        storage: &Storage,
        key: &str,
        now: OffsetDateTime,
    ) -> Result<bool, LibraryError> {
        let Some(record) = storage.get_api_key(key)? else {
            return Err(LibraryError::InvalidApiKey);
        };

        match record.reset_at {
            Some(reset_at) if reset_at.date() >= now.date() => {
                Ok(record.daily_count >= self.daily_limit)
            }
            _ => Ok(false),
        }
    }

    /// Count one request, resetting the window first when a UTC day
    /// boundary has passed.
    pub fn record(
        &self,
        storage: &Storage,
        key: &str,
        now: OffsetDateTime,
    ) -> Result<(), LibraryError> {
        let Some(mut record) = storage.get_api_key(key)? else {
            return Err(LibraryError::InvalidApiKey);
        };

        if record.reset_at.is_none_or(|reset_at| reset_at.date() < now.date()) {
            if record.daily_count > 0 {
                tracing::debug!("daily quota reset for key of owner {}", record.owner_id);
            }
            record.daily_count = 0;
            record.reset_at = Some(now);
        }

        record.daily_count += 1;
        storage.upsert_api_key(&record)?;
        Ok(())
    }
}
