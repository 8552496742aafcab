use anyhow::Result;
use reqwest::blocking::Client;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::FetchError;
use crate::http_client::http_client;
use crate::model::{MatchFilter, MatchRef, PlayerMatch};

const ERROR_BODY_EXCERPT: usize = 200;

/// Where the pipeline gets its match lists from.
pub trait MatchSource {
    /// Unfiltered match history with all eight primary fields.
    fn fetch_matches(&self) -> Result<Vec<PlayerMatch>>;

    /// Ids of the matches that satisfy `filter`.
    fn fetch_filtered(&self, filter: MatchFilter) -> Result<Vec<MatchRef>>;
}

/// Blocking client for `GET /players/{account_id}/matches`.
pub struct OpenDotaClient {
    http: Client,
    api_url: String,
    account_id: u64,
}

impl OpenDotaClient {
    pub fn new(cfg: &SyncConfig) -> Result<Self> {
        let http = http_client(cfg.timeout_secs)?.clone();
        Ok(Self::with_client(http, &cfg.api_url, cfg.account_id))
    }

    pub fn with_client(http: Client, api_url: &str, account_id: u64) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            account_id,
        }
    }

    /// GETs the match list and returns `(url, body)` for a 2xx answer.
    fn get_body(&self, filter: Option<MatchFilter>) -> Result<(String, String), FetchError> {
        let url = player_matches_url(&self.api_url, self.account_id, filter);
        debug!(%url, "fetching match list");

        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|source| FetchError::Http {
                url: url.clone(),
                source,
            })?;
        let status = resp.status();
        let body = resp.text().map_err(|source| FetchError::ResponseBody {
            url: url.clone(),
            source,
        })?;
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                url,
                status,
                body: body.chars().take(ERROR_BODY_EXCERPT).collect(),
            });
        }
        Ok((url, body))
    }
}

impl MatchSource for OpenDotaClient {
    fn fetch_matches(&self) -> Result<Vec<PlayerMatch>> {
        let (url, body) = self.get_body(None)?;
        let matches = parse_player_matches_json(&body)
            .map_err(|source| FetchError::Decode { url, source })?;
        Ok(matches)
    }

    fn fetch_filtered(&self, filter: MatchFilter) -> Result<Vec<MatchRef>> {
        let (url, body) = self.get_body(Some(filter))?;
        let refs =
            parse_match_refs_json(&body).map_err(|source| FetchError::Decode { url, source })?;
        Ok(refs)
    }
}

pub fn player_matches_url(api_url: &str, account_id: u64, filter: Option<MatchFilter>) -> String {
    let mut url = format!(
        "{}/players/{account_id}/matches",
        api_url.trim_end_matches('/')
    );
    if let Some(filter) = filter {
        let (key, value) = filter.query_pair();
        url.push('?');
        url.push_str(key);
        url.push('=');
        url.push_str(value);
    }
    url
}

pub fn parse_player_matches_json(raw: &str) -> serde_json::Result<Vec<PlayerMatch>> {
    serde_json::from_str(raw.trim())
}

pub fn parse_match_refs_json(raw: &str) -> serde_json::Result<Vec<MatchRef>> {
    serde_json::from_str(raw.trim())
}
