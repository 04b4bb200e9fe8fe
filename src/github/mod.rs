//! GitHub REST：把验证报告贴到 PR / issue 评论
//!
//! Needs a token allowed to write issues (`repo` or `public_repo` for a
//! classic PAT, `issues: write` / `pull-requests: write` for a fine-grained
//! one).

pub mod comment;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use ureq::Agent;

use crate::utils::{Result, VerifyError};

pub use comment::{marker_for, wrap_body};

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("iiab-verify/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// `owner/name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl std::str::FromStr for RepoSlug {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self> {
        let valid = |p: &str| {
            !p.is_empty()
                && p.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        match s.trim().split_once('/') {
            Some((owner, name)) if valid(owner) && valid(name) => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(VerifyError::Config(format!(
                "repository must be 'owner/name', got '{}'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

pub struct GitHubClient {
    api_base: String,
    token: String,
    agent: Agent,
}

impl GitHubClient {
    pub fn new(api_base: &str, token: String) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(VerifyError::Config(
                "GitHub token missing: pass --token or set GITHUB_TOKEN".to_string(),
            ));
        }
        let config = Agent::config_builder()
            .timeout_global(Some(HTTP_TIMEOUT))
            .http_status_as_error(false)
            .build();
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            agent: Agent::new_with_config(config),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let resp = self
            .agent
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| VerifyError::GitHub(format!("GET {}: {}", url, e)))?;
        decode(resp, &url)
    }

    pub fn send<B: Serialize, T: DeserializeOwned>(&self, method: Method, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, ?method, "send");
        let req = match method {
            Method::Post => self.agent.post(&url),
            Method::Patch => self.agent.patch(&url),
        };
        let resp = req
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
            .send_json(body)
            .map_err(|e| VerifyError::GitHub(format!("{:?} {}: {}", method, url, e)))?;
        decode(resp, &url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Patch,
}

fn decode<T: DeserializeOwned>(mut resp: ureq::http::Response<ureq::Body>, url: &str) -> Result<T> {
    let status = resp.status().as_u16();
    if !(200..300).contains(&status) {
        let body = resp.body_mut().read_to_string().unwrap_or_default();
        return Err(VerifyError::GitHub(error_message(status, &body, url)));
    }
    resp.body_mut()
        .read_json::<T>()
        .map_err(|e| VerifyError::GitHub(format!("{}: bad response body: {}", url, e)))
}

/// Human-readable failure, with a scope hint for auth errors.
pub fn error_message(status: u16, body: &str, url: &str) -> String {
    let api_msg = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().chars().take(200).collect());

    let hint = match status {
        401 => " (token invalid or expired)",
        403 => " (token lacks permission: needs issues/pull-requests write)",
        404 => " (repository or issue not found, or token cannot see it)",
        422 => " (request rejected by validation)",
        _ => "",
    };
    format!("{} returned HTTP {}: {}{}", url, status, api_msg, hint)
}
