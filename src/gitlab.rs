//! GitLab API client.
//!
//! Fetches the accessible project list (following `x-next-page` pagination
//! headers) and per-project CI lint results. The client hands back raw JSON
//! trees — validation is the caller's concern.
//!
//! Authentication uses a private token read from the `GITLAB_TOKEN`
//! environment variable, sent as the `PRIVATE-TOKEN` header.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::GitlabProject;

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "GITLAB_TOKEN";

/// Produces the project list and raw lint-result documents for the crawler.
///
/// The crawler depends on this seam rather than on the concrete client, so
/// tests can drive it with canned data.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// All non-archived, non-mirrored projects the token can access.
    async fn projects(&self) -> Result<Vec<GitlabProject>>;

    /// The raw CI lint result for one project, jobs included.
    async fn ci_lint(&self, project_id: i64) -> Result<Value>;
}

/// HTTP-backed [`ProjectSource`].
pub struct GitlabClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    per_page: u32,
    min_access_level: u32,
}

impl GitlabClient {
    /// Build a client from configuration. Fails if `GITLAB_TOKEN` is unset.
    pub fn new(config: &Config) -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", TOKEN_ENV))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let mut endpoint = config.gitlab.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }

        Ok(Self {
            http,
            endpoint,
            token,
            per_page: config.gitlab.per_page,
            min_access_level: config.gitlab.min_access_level,
        })
    }

    /// GET a relative API path and parse the response body as JSON.
    ///
    /// Returns the parsed body and the `x-next-page` header, if any.
    async fn get_json(&self, path: &str) -> Result<(Value, Option<u32>)> {
        let url = format!("{}{}", self.endpoint, path);
        debug!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        let next_page = response
            .headers()
            .get("x-next-page")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("GitLab API error {status} for {url}: {body}");
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("invalid JSON from {url}"))?;

        Ok((body, next_page))
    }
}

#[async_trait]
impl ProjectSource for GitlabClient {
    async fn projects(&self) -> Result<Vec<GitlabProject>> {
        info!("discovering GitLab repositories");

        let base = format!(
            "projects?membership=true&per_page={}&min_access_level={}&archived=false",
            self.per_page, self.min_access_level
        );

        let mut all: Vec<GitlabProject> = Vec::new();
        let mut page: Option<u32> = None;

        loop {
            let path = match page {
                Some(p) => format!("{base}&page={p}"),
                None => base.clone(),
            };
            let (body, next_page) = self.get_json(&path).await?;

            let batch: Vec<GitlabProject> =
                serde_json::from_value(body).context("unexpected project list payload")?;
            all.extend(batch);

            match next_page {
                Some(p) => page = Some(p),
                None => break,
            }
        }

        info!("discovered {} project(s)", all.len());

        // Mirrors and archived repositories never carry a pipeline worth
        // archiving.
        all.retain(|p| !p.mirror && !p.archived);
        Ok(all)
    }

    async fn ci_lint(&self, project_id: i64) -> Result<Value> {
        debug!(project_id, "fetching CI lint result");
        let path = format!("projects/{project_id}/ci/lint?include_jobs=true");
        let (body, _) = self.get_json(&path).await?;
        debug!(project_id, "done fetching CI lint result");
        Ok(body)
    }
}
