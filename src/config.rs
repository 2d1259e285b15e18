use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub gitlab: GitlabConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GitlabConfig {
    /// Base API endpoint, e.g. `https://gitlab.example.com/api/v4/`.
    pub endpoint: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_min_access_level")]
    pub min_access_level: u32,
}

fn default_per_page() -> u32 {
    100
}
fn default_min_access_level() -> u32 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlConfig {
    /// Glob matched against `path_with_namespace`. Empty disables filtering.
    #[serde(default = "default_repo_glob")]
    pub repo_glob: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            repo_glob: default_repo_glob(),
        }
    }
}

fn default_repo_glob() -> String {
    "*/**".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.gitlab.endpoint.is_empty() {
        anyhow::bail!("gitlab.endpoint must be set");
    }

    if !config.gitlab.endpoint.starts_with("http://")
        && !config.gitlab.endpoint.starts_with("https://")
    {
        anyhow::bail!(
            "gitlab.endpoint must be an http(s) URL, got '{}'",
            config.gitlab.endpoint
        );
    }

    if config.gitlab.per_page == 0 || config.gitlab.per_page > 100 {
        anyhow::bail!("gitlab.per_page must be in 1..=100");
    }

    // Fail on an unparseable glob at startup rather than mid-crawl.
    if !config.crawl.repo_glob.is_empty() {
        globset::Glob::new(&config.crawl.repo_glob)
            .with_context(|| format!("Invalid crawl.repo_glob '{}'", config.crawl.repo_glob))?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cih.toml");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn minimal_config_loads_with_defaults() {
        let (_tmp, path) = write_config(
            r#"[gitlab]
endpoint = "https://gitlab.example.com/api/v4/"

[db]
path = "./data/cih.sqlite"
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.gitlab.per_page, 100);
        assert_eq!(config.gitlab.min_access_level, 30);
        assert_eq!(config.crawl.repo_glob, "*/**");
    }

    #[test]
    fn non_http_endpoint_is_rejected() {
        let (_tmp, path) = write_config(
            r#"[gitlab]
endpoint = "gitlab.example.com"

[db]
path = "./data/cih.sqlite"
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn invalid_glob_is_rejected() {
        let (_tmp, path) = write_config(
            r#"[gitlab]
endpoint = "https://gitlab.example.com/api/v4/"

[db]
path = "./data/cih.sqlite"

[crawl]
repo_glob = "group/[invalid"
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn per_page_bounds_are_enforced() {
        let (_tmp, path) = write_config(
            r#"[gitlab]
endpoint = "https://gitlab.example.com/api/v4/"
per_page = 0

[db]
path = "./data/cih.sqlite"
"#,
        );
        assert!(load_config(&path).is_err());
    }
}
