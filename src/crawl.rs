//! Crawl orchestration.
//!
//! Coordinates the full run: project discovery → glob filtering → per-project
//! lint fetch → schema validation → upsert. Projects are processed
//! sequentially; a project whose lint document fails validation is logged
//! with its complete error list and skipped, without aborting the rest of
//! the crawl.

use anyhow::Result;
use globset::Glob;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::gitlab::{GitlabClient, ProjectSource};
use crate::models::{CrawlReport, GitlabProject};
use crate::pipeline_schema::{self, LINT_RESULT, PIPELINE};
use crate::store::{DocumentSink, SqliteStore};
use crate::validate::Validator;

/// Options for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Glob matched against `path_with_namespace`. Empty disables filtering.
    pub repo_glob: String,
    /// Discover and filter only; fetch and write nothing.
    pub dry_run: bool,
    /// Maximum number of projects to process.
    pub limit: Option<usize>,
}

/// Keep the projects whose `path_with_namespace` matches the glob.
pub fn filter_projects(
    projects: Vec<GitlabProject>,
    repo_glob: &str,
) -> Result<Vec<GitlabProject>> {
    if repo_glob.is_empty() {
        return Ok(projects);
    }

    let matcher = Glob::new(repo_glob)?.compile_matcher();
    Ok(projects
        .into_iter()
        .filter(|p| matcher.is_match(&p.path_with_namespace))
        .collect())
}

/// Run one crawl against a project source and a document sink.
pub async fn crawl(
    source: &dyn ProjectSource,
    sink: &dyn DocumentSink,
    options: &CrawlOptions,
) -> Result<CrawlReport> {
    let discovered = source.projects().await?;
    let mut report = CrawlReport {
        discovered: discovered.len(),
        ..Default::default()
    };

    let mut projects = filter_projects(discovered, &options.repo_glob)?;
    if let Some(limit) = options.limit {
        projects.truncate(limit);
    }
    report.matched = projects.len();

    if options.dry_run {
        return Ok(report);
    }

    let validator = Validator::new(pipeline_schema::registry());

    for project in &projects {
        info!(
            "crawling {} ({})",
            project.path_with_namespace, project.id
        );

        let lint = match source.ci_lint(project.id).await {
            Ok(lint) => lint,
            Err(e) => {
                warn!(
                    "lint fetch failed for {} ({}): {e:#}",
                    project.path_with_namespace, project.id
                );
                report.fetch_errors += 1;
                continue;
            }
        };

        let typed = match validator.validate_named(&lint, LINT_RESULT) {
            Ok(typed) => typed,
            Err(errors) => {
                warn!(
                    "lint result for {} failed validation with {} error(s), skipping",
                    project.path_with_namespace,
                    errors.len()
                );
                for error in &errors {
                    warn!("  {error}");
                }
                report.skipped_invalid += 1;
                continue;
            }
        };

        if !check_merged_pipeline(&validator, &typed, &project.path_with_namespace) {
            report.merged_invalid += 1;
        }

        let key = project.path_with_namespace.to_lowercase();
        sink.upsert(&key, &typed).await?;
        report.upserted += 1;

        info!(
            "finished crawling {} ({})",
            project.path_with_namespace, project.id
        );
    }

    Ok(report)
}

/// Validate the lint result's merged pipeline configuration against the
/// pipeline schema. Informational: the lint document is stored either way.
fn check_merged_pipeline(validator: &Validator<'_>, lint: &Value, project: &str) -> bool {
    let Some(merged) = lint.get("merged_yaml").and_then(|v| v.as_str()) else {
        return true;
    };

    let parsed: Value = match serde_yaml::from_str(merged) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("merged pipeline for {project} is not parseable YAML: {e}");
            return false;
        }
    };

    match validator.validate_named(&parsed, PIPELINE) {
        Ok(_) => {
            debug!("merged pipeline for {project} conforms to the pipeline schema");
            true
        }
        Err(errors) => {
            warn!(
                "merged pipeline for {project} has {} schema violation(s)",
                errors.len()
            );
            for error in &errors {
                warn!("  {error}");
            }
            false
        }
    }
}

/// CLI entry point — runs a crawl with the configured client and store.
pub async fn run_crawl(
    config: &Config,
    dry_run: bool,
    limit: Option<usize>,
    glob_override: Option<String>,
) -> Result<()> {
    let options = CrawlOptions {
        repo_glob: glob_override.unwrap_or_else(|| config.crawl.repo_glob.clone()),
        dry_run,
        limit,
    };

    let client = GitlabClient::new(config)?;
    let store = SqliteStore::connect(config).await?;

    let report = crawl(&client, &store, &options).await?;
    store.close().await;

    if dry_run {
        println!("crawl (dry-run)");
        println!("  discovered: {} project(s)", report.discovered);
        println!("  matched glob: {}", report.matched);
        return Ok(());
    }

    println!("crawl");
    println!("  discovered: {} project(s)", report.discovered);
    println!("  matched glob: {}", report.matched);
    println!("  upserted: {}", report.upserted);
    println!("  skipped (invalid lint): {}", report.skipped_invalid);
    println!("  merged pipeline violations: {}", report.merged_invalid);
    println!("  fetch errors: {}", report.fetch_errors);
    println!("ok");

    Ok(())
}

/// CLI entry point — lists the projects a crawl would visit.
pub async fn run_projects(config: &Config, glob_override: Option<String>) -> Result<()> {
    let repo_glob = glob_override.unwrap_or_else(|| config.crawl.repo_glob.clone());

    let client = GitlabClient::new(config)?;
    let discovered = client.projects().await?;
    let total = discovered.len();
    let matched = filter_projects(discovered, &repo_glob)?;

    println!("{:<10} PATH", "ID");
    for project in &matched {
        println!("{:<10} {}", project.id, project.path_with_namespace);
    }
    println!();
    println!("{} of {} project(s) match glob '{}'", matched.len(), total, repo_glob);

    Ok(())
}
