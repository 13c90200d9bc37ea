use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use url::Url;

pub type ItemId = i64;

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API base URL {0:?}")]
    InvalidBaseUrl(String),
    #[error("{method} {path} failed with status {status}")]
    Status {
        method: &'static str,
        path: String,
        status: reqwest::StatusCode,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "videoUrl")]
    pub video_url: String,
    #[serde(default, rename = "likeNum")]
    pub like_num: i64,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub nickname: String,
    #[serde(default, alias = "comment")]
    pub text: String,
}

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    challenge_id: ItemId,
    nickname: &'a str,
    comment: &'a str,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    password: &'a str,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("api client user agent required");
        }

        let trimmed = config.base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(&format!("{trimmed}/"))
            .map_err(|_| ApiError::InvalidBaseUrl(config.base_url.clone()))?;
        if base_url.cannot_be_a_base() {
            bail!(ApiError::InvalidBaseUrl(config.base_url));
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()
                .context("build API HTTP client")?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn challenges(&self) -> Result<Vec<FeedItem>> {
        let path = "api/challenges";
        let response = self
            .http
            .get(self.endpoint(path)?)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .context("request challenge feed")?;
        check_status(response, "GET", path)?
            .json()
            .context("decode challenge feed")
    }

    pub fn comments(&self, challenge_id: ItemId) -> Result<Vec<Comment>> {
        let path = format!("api/comments/{challenge_id}");
        let response = self
            .http
            .get(self.endpoint(&path)?)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .with_context(|| format!("request comments for challenge {challenge_id}"))?;
        check_status(response, "GET", &path)?
            .json()
            .with_context(|| format!("decode comments for challenge {challenge_id}"))
    }

    pub fn post_comment(
        &self,
        challenge_id: ItemId,
        nickname: &str,
        comment: &str,
    ) -> Result<Comment> {
        let path = "api/comments";
        let payload = NewComment {
            challenge_id,
            nickname,
            comment,
        };
        let response = self
            .http
            .post(self.endpoint(path)?)
            .header(USER_AGENT, &self.user_agent)
            .json(&payload)
            .send()
            .context("submit comment")?;
        check_status(response, "POST", path)?
            .json()
            .context("decode created comment")
    }

    pub fn delete_challenge(&self, video_id: ItemId, password: &str) -> Result<()> {
        let path = format!("api/challenges/{video_id}");
        let response = self
            .http
            .delete(self.endpoint(&path)?)
            .header(USER_AGENT, &self.user_agent)
            .json(&DeleteRequest { password })
            .send()
            .with_context(|| format!("request deletion of challenge {video_id}"))?;
        check_status(response, "DELETE", &path)?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("build URL for {path}"))
    }
}

fn check_status(response: Response, method: &'static str, path: &str) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        bail!(ApiError::Status {
            method,
            path: format!("/{path}"),
            status,
        });
    }
    Ok(response)
}
