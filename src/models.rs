//! Core data models used throughout the crawler.

use serde::Deserialize;

/// A repository entry from the GitLab projects API.
///
/// Only the fields the crawler consumes are deserialized; everything else in
/// the API payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct GitlabProject {
    pub id: i64,
    pub path_with_namespace: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub mirror: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub empty_repo: bool,
}

/// Summary of one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Projects discovered before glob filtering.
    pub discovered: usize,
    /// Projects remaining after glob filtering.
    pub matched: usize,
    /// Lint documents validated and upserted.
    pub upserted: usize,
    /// Projects skipped because their lint document failed validation.
    pub skipped_invalid: usize,
    /// Stored documents whose merged pipeline configuration failed
    /// validation against the pipeline schema.
    pub merged_invalid: usize,
    /// Projects whose lint fetch failed.
    pub fetch_errors: usize,
}
