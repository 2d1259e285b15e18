//! Local pipeline-file validation.
//!
//! Parses a `.gitlab-ci.yml` (or JSON) file and validates it against the
//! pipeline schema, printing every violation with its field path. This is
//! the direct CLI surface for the schema engine — no network, no database.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::pipeline_schema::{self, PIPELINE};
use crate::validate::{ValidationError, Validator};

/// Validate an already-parsed pipeline document against the root schema.
pub fn check_document(document: &Value) -> Result<Value, Vec<ValidationError>> {
    let validator = Validator::new(pipeline_schema::registry());
    validator.validate_named(document, PIPELINE)
}

/// Parse a pipeline file as JSON or YAML based on its extension.
pub fn parse_pipeline_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file: {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("{} is not valid JSON", path.display()))
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("{} is not valid YAML", path.display()))
    }
}

/// CLI entry point — validates the file and prints the outcome.
pub fn run_check(path: &Path) -> Result<()> {
    let document = parse_pipeline_file(path)?;

    match check_document(&document) {
        Ok(typed) => {
            let jobs = typed
                .as_object()
                .map(|map| map.keys().filter(|k| !is_reserved_key(k.as_str())).count())
                .unwrap_or(0);
            println!("{}: ok ({} job(s))", path.display(), jobs);
            Ok(())
        }
        Err(errors) => {
            eprintln!(
                "{}: {} validation error(s)",
                path.display(),
                errors.len()
            );
            for error in &errors {
                eprintln!("  {error}");
            }
            std::process::exit(1);
        }
    }
}

/// Top-level keys that configure the pipeline rather than naming a job.
fn is_reserved_key(key: &str) -> bool {
    matches!(
        key,
        "$schema"
            | "image"
            | "services"
            | "before_script"
            | "after_script"
            | "variables"
            | "cache"
            | "!reference"
            | "default"
            | "stages"
            | "include"
            | "pages"
            | "workflow"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_document_passes() {
        let doc = json!({
            "stages": ["build"],
            "test": { "script": "echo hi", "stage": "build" }
        });
        assert!(check_document(&doc).is_ok());
    }

    #[test]
    fn invalid_document_reports_errors() {
        let doc = json!({ "test": { "script": "echo hi", "when": "bogus" } });
        let errors = check_document(&doc).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn yaml_files_are_parsed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".gitlab-ci.yml");
        std::fs::write(&path, "build:\n  script: make\n").unwrap();
        let doc = parse_pipeline_file(&path).unwrap();
        assert_eq!(doc["build"]["script"], json!("make"));
    }

    #[test]
    fn json_files_are_parsed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pipeline.json");
        std::fs::write(&path, r#"{"build": {"script": "make"}}"#).unwrap();
        let doc = parse_pipeline_file(&path).unwrap();
        assert_eq!(doc["build"]["script"], json!("make"));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        assert!(parse_pipeline_file(Path::new("/no/such/file.yml")).is_err());
    }

    #[test]
    fn pages_is_not_counted_as_a_job_name() {
        assert!(is_reserved_key("pages"));
        assert!(!is_reserved_key("deploy"));
    }
}
