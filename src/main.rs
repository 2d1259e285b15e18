//! # CI Harvest CLI (`cih`)
//!
//! The `cih` binary crawls a GitLab instance's repositories, validates each
//! repository's CI lint result against the pipeline schema, and archives the
//! typed documents in SQLite.
//!
//! ## Usage
//!
//! ```bash
//! cih --config ./config/cih.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cih init` | Create the SQLite database and run schema migrations |
//! | `cih projects` | List the projects a crawl would visit |
//! | `cih crawl` | Fetch, validate, and archive every matching project |
//! | `cih check <file>` | Validate a local pipeline file against the schema |
//! | `cih get <key>` | Print an archived lint document |
//!
//! The GitLab API token is read from the `GITLAB_TOKEN` environment
//! variable; it never appears in the config file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ci_harvest::{check, config, crawl, get, migrate};

/// CI Harvest — crawl GitLab CI lint results, validate them against a typed
/// pipeline schema, and archive them locally.
#[derive(Parser)]
#[command(
    name = "cih",
    about = "CI Harvest — a GitLab CI crawler with schema-validated archiving",
    version,
    long_about = "CI Harvest discovers the repositories a GitLab token can access, filters them \
    by a name glob, fetches each repository's CI lint result, validates it against a declarative \
    schema of the .gitlab-ci.yml format, and upserts the typed document into a local SQLite store."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cih.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `lint_results` table.
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// List the projects a crawl would visit.
    ///
    /// Discovers every accessible project and applies the configured name
    /// glob, without fetching lint results or writing anything.
    Projects {
        /// Override the configured repository glob.
        #[arg(long)]
        glob: Option<String>,
    },

    /// Crawl lint results into the document store.
    ///
    /// Fetches each matching project's CI lint result, validates it, and
    /// upserts the typed document keyed by the lowercased repository path.
    /// A project whose lint result fails validation is logged and skipped.
    Crawl {
        /// Discover and filter only — fetch and write nothing.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of projects to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Override the configured repository glob.
        #[arg(long)]
        glob: Option<String>,
    },

    /// Validate a local pipeline file against the schema.
    ///
    /// Accepts YAML (default) or JSON and prints every violation with its
    /// field path. Exits non-zero if the document is invalid.
    Check {
        /// Path to a `.gitlab-ci.yml` or JSON pipeline file.
        file: PathBuf,
    },

    /// Print an archived lint document by key.
    Get {
        /// Document key (lowercased `path_with_namespace`).
        key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // `check` validates local files and needs no configuration.
    if let Commands::Check { file } = &cli.command {
        return check::run_check(file);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Projects { glob } => {
            crawl::run_projects(&cfg, glob).await?;
        }
        Commands::Crawl {
            dry_run,
            limit,
            glob,
        } => {
            crawl::run_crawl(&cfg, dry_run, limit, glob).await?;
        }
        Commands::Check { .. } => unreachable!("handled above"),
        Commands::Get { key } => {
            get::run_get(&cfg, &key).await?;
        }
    }

    Ok(())
}
