use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

pub const DEFAULT_APP_VIEW_URL: &str = "https://api.bsky.app";
pub const WEB_BASE_URL: &str = "https://bsky.app";

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("search request failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error("search response was not valid JSON")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub app_view_url: Option<String>,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

/// Author block of a search-result post. Every field except `did` and
/// `handle` is routinely absent upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub did: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar: String,
}

impl Author {
    /// Display name with the handle as fallback, the way the web client
    /// renders anonymous-looking accounts.
    pub fn name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.handle
        } else {
            &self.display_name
        }
    }
}

/// One post from `app.bsky.feed.searchPosts`, kept deliberately loose:
/// `embed` and `record` have no stable schema across client/link types,
/// so they stay raw JSON and are probed by path in `media::classify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub repost_count: i64,
    #[serde(default)]
    pub embed: Option<Value>,
    #[serde(default)]
    pub record: Option<Value>,
}

impl PostRecord {
    /// Last path segment of the AT URI, used in canonical web links and
    /// as the synthetic-thumbnail seed.
    pub fn local_id(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or("")
    }

    /// Post text, falling back to the raw record's `text` field when the
    /// top-level copy is absent.
    pub fn record_text(&self) -> &str {
        if !self.text.is_empty() {
            return &self.text;
        }
        self.record
            .as_ref()
            .and_then(|record| record.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn post_url(&self) -> String {
        format!(
            "{}/profile/{}/post/{}",
            WEB_BASE_URL,
            self.author.handle,
            self.local_id()
        )
    }

    pub fn profile_url(&self) -> String {
        format!("{}/profile/{}", WEB_BASE_URL, self.author.handle)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    posts: Vec<PostRecord>,
}

#[derive(Debug)]
pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("bsky client user agent required");
        }

        let base = config
            .app_view_url
            .unwrap_or_else(|| DEFAULT_APP_VIEW_URL.to_string());
        let base_url = Url::parse(&base).context("parse app view url")?;

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    /// Runs a free-text post search against the public AppView. Returns
    /// the posts in the order the server ranked them; that order is what
    /// "unsorted" restores in the results table.
    pub fn search_posts(&self, query: &str, limit: u32) -> Result<Vec<PostRecord>> {
        let mut url = self
            .base_url
            .join("/xrpc/app.bsky.feed.searchPosts")
            .context("build search url")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", &limit.clamp(1, MAX_LIMIT).to_string());

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .context("send search request")?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status).into());
        }

        let body: SearchResponse = response.json().map_err(ApiError::Decode)?;
        Ok(body.posts)
    }
}
