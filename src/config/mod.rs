use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod defaults;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub paths: PathsConfig,
    pub lrclib: LrclibConfig,
    pub limits: Limits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where the sqlite database lives.
    pub data_dir: PathBuf,
    /// Root directory of the local object store.
    pub objects_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LrclibConfig {
    pub base_url: String,
    /// Upper bound on a single lyrics lookup, in seconds.
    pub timeout_secs: u64,
}

/// Tunable service limits. Everything the workflow gates on lives here
/// rather than in scattered constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Confirmed songs allowed per owner.
    pub max_songs: u32,
    pub max_audio_bytes: u64,
    pub max_video_bytes: u64,
    /// Lines included in the upload receipt's lyrics preview.
    pub preview_lines: usize,
    /// Embed requests allowed per API key per UTC day.
    pub daily_request_limit: u32,
    pub signed_url_ttl_secs: u64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let proj = ProjectDirs::from("dev", "refrain", "refrain");
        let data_dir = proj
            .as_ref()
            .map(|p| p.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("refrain"));
        let objects_dir = data_dir.join("objects");
        Self {
            data_dir,
            objects_dir,
        }
    }
}

impl Default for LrclibConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::LRCLIB_BASE_URL.to_string(),
            timeout_secs: defaults::LRCLIB_TIMEOUT_SECS,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_songs: defaults::MAX_SONGS,
            max_audio_bytes: defaults::MAX_AUDIO_BYTES,
            max_video_bytes: defaults::MAX_VIDEO_BYTES,
            preview_lines: defaults::PREVIEW_LINES,
            daily_request_limit: defaults::DAILY_REQUEST_LIMIT,
            signed_url_ttl_secs: defaults::SIGNED_URL_TTL_SECS,
        }
    }
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "refrain", "refrain").context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        let cfg = Config::default();
        save(&cfg, Some(&path))?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_service_limits() {
        let cfg = Config::default();
        assert_eq!(cfg.limits.max_songs, 10);
        assert_eq!(cfg.limits.max_audio_bytes, 100 * 1024 * 1024);
        assert_eq!(cfg.limits.max_video_bytes, 50 * 1024 * 1024);
        assert_eq!(cfg.limits.preview_lines, 4);
        assert_eq!(cfg.limits.daily_request_limit, 1000);
        assert_eq!(cfg.lrclib.base_url, "https://lrclib.net/api");
        assert_eq!(cfg.lrclib.timeout_secs, 10);
    }

    #[test]
    fn load_creates_and_round_trips_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let created = load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(created.limits.max_songs, 10);

        let mut cfg = created;
        cfg.limits.max_songs = 3;
        save(&cfg, Some(&path)).unwrap();

        let reloaded = load(Some(&path)).unwrap();
        assert_eq!(reloaded.limits.max_songs, 3);
    }

    #[test]
    fn partial_config_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[limits]\nmax_songs = 2\n").unwrap();

        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.limits.max_songs, 2);
        assert_eq!(cfg.limits.daily_request_limit, 1000);
    }
}
