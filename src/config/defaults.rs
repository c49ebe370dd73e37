//! Default values for the service configuration.

pub const LRCLIB_BASE_URL: &str = "https://lrclib.net/api";
pub const LRCLIB_TIMEOUT_SECS: u64 = 10;

pub const MAX_SONGS: u32 = 10;
pub const MAX_AUDIO_BYTES: u64 = 100 * 1024 * 1024;
pub const MAX_VIDEO_BYTES: u64 = 50 * 1024 * 1024;
pub const PREVIEW_LINES: usize = 4;
pub const DAILY_REQUEST_LIMIT: u32 = 1000;

/// Signed URLs stay valid for a year, matching the hosted-storage
/// behavior this local store stands in for.
pub const SIGNED_URL_TTL_SECS: u64 = 365 * 24 * 60 * 60;
