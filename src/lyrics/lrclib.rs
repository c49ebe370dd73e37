//! LRCLIB API client
//!
//! LRCLIB is a free lyrics API that provides synchronized (LRC format)
//! lyrics. API Documentation: https://lrclib.net/docs

use crate::config::LrclibConfig;
use anyhow::Context;
use serde::Deserialize;

/// LRCLIB API response
#[derive(Debug, Deserialize, Clone)]
pub struct LrclibResponse {
    #[allow(dead_code)]
    id: Option<i64>,
    #[allow(dead_code)]
    #[serde(rename = "trackName")]
    track_name: Option<String>,
    #[allow(dead_code)]
    #[serde(rename = "artistName")]
    artist_name: Option<String>,
    #[serde(rename = "plainLyrics")]
    pub plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    pub synced_lyrics: Option<String>,
}

/// LRCLIB API client
#[derive(Debug, Clone)]
pub struct LrclibClient {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibClient {
    const USER_AGENT: &'static str = "refrain/0.1 (https://github.com/refrain)";

    pub fn new(cfg: &LrclibConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build reqwest client")?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get lyrics for a track, trying an exact match first and falling
    /// back to a fuzzy search.
    pub async fn get_lyrics(
        &self,
        artist: &str,
        title: &str,
    ) -> anyhow::Result<Option<LrclibResponse>> {
        if let Some(lyrics) = self.get_exact(artist, title).await? {
            return Ok(Some(lyrics));
        }

        self.search(artist, title).await
    }

    async fn get_exact(&self, artist: &str, title: &str) -> anyhow::Result<Option<LrclibResponse>> {
        let url = format!(
            "{}/get?artist_name={}&track_name={}",
            self.base_url,
            urlencoding::encode(artist),
            urlencoding::encode(title)
        );

        let response = self.client.get(&url).send().await?;

        if response.status().is_success() {
            let lyrics: LrclibResponse = response.json().await?;
            Ok(Some(lyrics))
        } else if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            anyhow::bail!("LRCLIB API error: {}", response.status());
        }
    }

    /// Search for lyrics, preferring results that carry synced lyrics.
    async fn search(&self, artist: &str, title: &str) -> anyhow::Result<Option<LrclibResponse>> {
        let query = format!("{} {}", title, artist);
        let url = format!("{}/search?q={}", self.base_url, urlencoding::encode(&query));

        let response = self.client.get(&url).send().await?;

        if response.status().is_success() {
            let results: Vec<LrclibResponse> = response.json().await?;

            let best = results
                .iter()
                .find(|r| r.synced_lyrics.as_deref().is_some_and(|s| !s.is_empty()))
                .or_else(|| results.first());

            Ok(best.cloned())
        } else if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            anyhow::bail!("LRCLIB search error: {}", response.status());
        }
    }
}
