//! The pipeline-definition schema registry.
//!
//! Declares, once, every shape a `.gitlab-ci.yml` document may take: the
//! reserved top-level keys, the per-job definition bound to every other
//! top-level key, and the lint-result envelope returned by the CI lint API.
//!
//! This module is data, not logic — the interpretation lives in
//! [`crate::validate`]. Sub-schemas used from more than one place (the image
//! shape, the retry shape, the `when` enum, ...) are registered once under a
//! name and referenced with [`named`], so the places that share them cannot
//! drift apart.

use once_cell::sync::Lazy;

use crate::schema::{
    any, array_of, boolean, int_range, integer, literal, named, null, number, object, one_of, opt,
    pattern, record_of, req, string, string_enum, string_min, SchemaRegistry,
};

/// Root schema name: a whole pipeline-definition document.
pub const PIPELINE: &str = "pipeline";
/// A single job definition.
pub const JOB: &str = "job";
/// The envelope returned by `projects/{id}/ci/lint`.
pub const LINT_RESULT: &str = "lint-result";

static REGISTRY: Lazy<SchemaRegistry> = Lazy::new(build_registry);

/// The shared, immutable registry. Built on first use, never mutated.
pub fn registry() -> &'static SchemaRegistry {
    &REGISTRY
}

fn build_registry() -> SchemaRegistry {
    let mut r = SchemaRegistry::new();

    // ============ Shared scalar shapes ============

    r.define(
        "when",
        one_of(vec![
            literal("on_success"),
            literal("on_failure"),
            literal("always"),
            literal("manual"),
            literal("delayed"),
            literal("never"),
        ]),
    );

    r.define(
        "artifacts-when",
        one_of(vec![
            literal("on_success"),
            literal("on_failure"),
            literal("always"),
        ]),
    );

    r.define(
        "retry-when",
        one_of(vec![
            literal("always"),
            literal("unknown_failure"),
            literal("script_failure"),
            literal("api_failure"),
            literal("stuck_or_timeout_failure"),
            literal("runner_system_failure"),
            literal("runner_unsupported"),
            literal("stale_schedule"),
            literal("job_execution_timeout"),
            literal("archived_failure"),
            literal("unmet_prerequisites"),
            literal("scheduler_failure"),
            literal("data_integrity_failure"),
        ]),
    );

    r.define("string-or-list", one_of(vec![string(), array_of(string())]));

    // ============ Containers and execution ============

    r.define(
        "pull-policy",
        one_of(vec![
            string_enum(&["always", "never", "if-not-present"]),
            array_of(string_enum(&["always", "never", "if-not-present"])).min_items(1),
        ]),
    );

    r.define(
        "image",
        one_of(vec![
            string_min(1),
            object(vec![
                req("name", string_min(1)),
                opt("entrypoint", array_of(any()).min_items(1)),
                opt("pull_policy", named("pull-policy")),
            ])
            .strict(),
            array_of(string()),
        ]),
    );

    r.define(
        "service",
        one_of(vec![
            string_min(1),
            object(vec![
                req("name", string_min(1)),
                opt("entrypoint", array_of(string()).min_items(1)),
                opt("pull_policy", named("pull-policy")),
                opt("command", array_of(string()).min_items(1)),
                opt("alias", string_min(1)),
            ])
            .strict(),
        ]),
    );

    r.define("services", array_of(named("service")));

    // Script blocks accept nested groups of shell lines.
    r.define(
        "script-lines",
        array_of(one_of(vec![string(), array_of(string())])),
    );

    r.define(
        "script",
        one_of(vec![
            string_min(1),
            array_of(one_of(vec![string(), array_of(string())])).min_items(1),
        ]),
    );

    r.define("variables", record_of(any()));

    r.define("tags", array_of(one_of(vec![string_min(1), array_of(string())])));

    // ============ Failure handling ============

    r.define(
        "retry",
        one_of(vec![
            int_range(0, 2),
            object(vec![
                opt("max", int_range(0, 2)),
                opt(
                    "when",
                    one_of(vec![named("retry-when"), array_of(named("retry-when"))]),
                ),
            ])
            .strict(),
        ]),
    );

    r.define(
        "allow-failure",
        one_of(vec![
            boolean(),
            object(vec![req("exit_codes", integer())]).strict(),
            object(vec![req("exit_codes", array_of(integer()).min_items(1))]).strict(),
        ]),
    );

    // ============ Rules and ref filters ============

    r.define(
        "rule-changes",
        one_of(vec![
            object(vec![
                req("paths", array_of(string())),
                opt("compare_to", string()),
            ])
            .strict(),
            array_of(string()),
        ]),
    );

    r.define(
        "rule",
        object(vec![
            opt("if", string()),
            opt("changes", named("rule-changes")),
            opt("exists", array_of(string())),
            opt("variables", named("variables")),
            opt("when", named("when")),
            opt("start_in", string_min(1)),
            opt("allow_failure", named("allow-failure")),
        ])
        .strict(),
    );

    r.define(
        "rules",
        array_of(one_of(vec![
            named("rule"),
            string_min(1),
            array_of(string()),
        ])),
    );

    // `only` and `except` share one shape: null, a list of ref keywords or
    // branch/tag patterns, or a refined filter object. A ref entry accepts
    // any string: the documented keywords (branches, tags, schedules, ...)
    // are a subset of the branch-name patterns also allowed here.
    r.define(
        "ref-filter",
        one_of(vec![
            null(),
            array_of(string()),
            object(vec![
                opt("refs", array_of(string())),
                opt("kubernetes", literal("active")),
                opt("variables", array_of(string())),
                opt("changes", array_of(string())),
            ])
            .strict(),
        ]),
    );

    // ============ Includes ============

    r.define(
        "include-item",
        one_of(vec![
            // A bare string infers the method from its shape: `https://...`
            // is remote, `/templates/...` is local.
            pattern("^(https?://|/).+\\.ya?ml$"),
            object(vec![
                req("local", pattern("\\.ya?ml$")),
                opt("rules", named("rules")),
            ])
            .strict(),
            object(vec![
                req("project", pattern("\\S/\\S|\\$(\\S+)")),
                opt("ref", string()),
                req(
                    "file",
                    one_of(vec![
                        pattern("\\.ya?ml$"),
                        array_of(pattern("\\.ya?ml$")),
                    ]),
                ),
            ])
            .strict(),
            object(vec![req("template", pattern("\\.ya?ml$"))]).strict(),
            object(vec![req("remote", pattern("^https?://.+\\.ya?ml$"))]).strict(),
        ]),
    );

    r.define(
        "include",
        one_of(vec![named("include-item"), array_of(named("include-item"))]),
    );

    // ============ Secrets ============

    r.define(
        "secrets",
        record_of(object(vec![req(
            "vault",
            one_of(vec![
                string(),
                object(vec![
                    req(
                        "engine",
                        object(vec![req("name", string()), req("path", string())]),
                    ),
                    req("path", string()),
                    req("field", string()),
                ]),
            ]),
        )])),
    );

    // ============ Artifacts ============

    r.define(
        "reports",
        object(vec![
            opt(
                "junit",
                one_of(vec![string(), array_of(string()).min_items(1)]),
            ),
            opt(
                "coverage_report",
                object(vec![
                    opt("coverage_format", literal("cobertura")),
                    opt("path", string_min(1)),
                ]),
            ),
            opt("codequality", named("string-or-list")),
            opt("dotenv", named("string-or-list")),
            opt("lsif", named("string-or-list")),
            opt("sast", named("string-or-list")),
            opt("dependency_scanning", named("string-or-list")),
            opt("container_scanning", named("string-or-list")),
            opt("dast", named("string-or-list")),
            opt("license_management", named("string-or-list")),
            opt("license_scanning", named("string-or-list")),
            opt("performance", named("string-or-list")),
            opt("requirements", named("string-or-list")),
            opt("secret_detection", named("string-or-list")),
            opt("metrics", named("string-or-list")),
            opt("terraform", named("string-or-list")),
            opt("cyclonedx", named("string-or-list")),
        ])
        .strict(),
    );

    r.define(
        "artifacts",
        object(vec![
            opt("paths", array_of(string()).min_items(1)),
            opt("exclude", array_of(string()).min_items(1)),
            opt("expose_as", string()),
            opt("name", string()),
            opt("untracked", boolean()),
            opt("when", named("artifacts-when")),
            opt("expire_in", string()),
            opt("reports", named("reports")),
        ])
        .strict(),
    );

    // ============ Deployment ============

    r.define(
        "environment",
        one_of(vec![
            string(),
            object(vec![
                req("name", string_min(1)),
                opt("url", pattern("^(https?://.+|\\$[A-Za-z]+)")),
                opt("on_stop", string()),
                opt(
                    "action",
                    string_enum(&["start", "prepare", "stop", "verify", "access"]),
                ),
                opt("auto_stop_in", string()),
                opt(
                    "kubernetes",
                    object(vec![opt("namespace", string_min(1))]),
                ),
                opt(
                    "deployment_tier",
                    string_enum(&["production", "staging", "testing", "development", "other"]),
                ),
            ])
            .strict(),
        ]),
    );

    r.define(
        "release",
        object(vec![
            req("tag_name", string_min(1)),
            opt("tag_message", string()),
            req("description", string_min(1)),
            opt("name", string()),
            opt("ref", string()),
            opt("milestones", array_of(string())),
            opt(
                "released_at",
                pattern(
                    "^(?:[1-9]\\d{3}-(?:(?:0[1-9]|1[0-2])-(?:0[1-9]|1\\d|2[0-8])|(?:0[13-9]|1[0-2])-(?:29|30)|(?:0[13578]|1[02])-31)|(?:[1-9]\\d(?:0[48]|[2468][048]|[13579][26])|(?:[2468][048]|[13579][26])00)-02-29)T(?:[01]\\d|2[0-3]):[0-5]\\d:[0-5]\\d(?:Z|[+-][01]\\d:[0-5]\\d)$",
                ),
            ),
            opt(
                "assets",
                object(vec![req(
                    "links",
                    array_of(
                        object(vec![
                            req("name", string_min(1)),
                            req("url", string_min(1)),
                            opt("filepath", string()),
                            opt(
                                "link_type",
                                string_enum(&["runbook", "package", "image", "other"]),
                            ),
                        ])
                        .strict(),
                    )
                    .min_items(1),
                )])
                .strict(),
            ),
        ])
        .strict(),
    );

    // ============ Scheduling and fan-out ============

    r.define(
        "needs",
        array_of(one_of(vec![
            string(),
            object(vec![
                req("job", string()),
                opt("artifacts", boolean()),
                opt("optional", boolean()),
            ])
            .strict(),
            object(vec![
                req("pipeline", string()),
                req("job", string()),
                opt("artifacts", boolean()),
            ])
            .strict(),
            object(vec![
                req("job", string()),
                req("project", string()),
                req("ref", string()),
                opt("artifacts", boolean()),
            ])
            .strict(),
        ])),
    );

    r.define(
        "parallel",
        one_of(vec![
            int_range(2, 50),
            object(vec![req(
                "matrix",
                array_of(record_of(one_of(vec![
                    string(),
                    number(),
                    array_of(any()),
                ])))
                .max_items(50),
            )])
            .strict(),
        ]),
    );

    r.define(
        "trigger-forward",
        object(vec![
            opt("yaml_variables", boolean()),
            opt("pipeline_variables", boolean()),
        ])
        .strict(),
    );

    r.define(
        "trigger-include",
        one_of(vec![
            pattern("\\.ya?ml$"),
            array_of(one_of(vec![
                object(vec![opt("local", pattern("\\.ya?ml$"))]).strict(),
                object(vec![opt("template", pattern("\\.ya?ml$"))]).strict(),
                object(vec![
                    req("artifact", pattern("\\.ya?ml$")),
                    req("job", string()),
                ])
                .strict(),
                object(vec![
                    req("project", pattern("\\S/\\S")),
                    opt("ref", string_min(1)),
                    req("file", pattern("\\.ya?ml$")),
                ])
                .strict(),
            ]))
            .max_items(3),
        ]),
    );

    r.define(
        "trigger",
        one_of(vec![
            // Cross-project pipeline.
            object(vec![
                req("project", pattern("\\S/\\S")),
                opt("branch", string()),
                opt("strategy", literal("depend")),
                opt("forward", named("trigger-forward")),
            ])
            .strict(),
            // Child pipeline from included configuration.
            object(vec![
                opt("include", named("trigger-include")),
                opt("strategy", literal("depend")),
                opt("forward", named("trigger-forward")),
            ])
            .strict(),
            pattern("\\S/\\S"),
        ]),
    );

    r.define(
        "inherit",
        object(vec![
            opt(
                "default",
                one_of(vec![
                    boolean(),
                    array_of(string_enum(&[
                        "after_script",
                        "artifacts",
                        "before_script",
                        "cache",
                        "image",
                        "interruptible",
                        "retry",
                        "services",
                        "tags",
                        "timeout",
                    ])),
                ]),
            ),
            opt(
                "variables",
                one_of(vec![boolean(), array_of(string())]),
            ),
        ])
        .strict(),
    );

    // ============ The job definition ============

    r.define(
        JOB,
        object(vec![
            opt("image", named("image")),
            opt("services", named("services")),
            opt("before_script", named("script-lines")),
            opt("after_script", named("script-lines")),
            opt("rules", named("rules")),
            opt("variables", named("variables")),
            opt("cache", any()),
            opt("secrets", named("secrets")),
            opt("script", named("script")),
            opt("stage", one_of(vec![string_min(1), array_of(string())])),
            opt("only", named("ref-filter")),
            opt("extends", one_of(vec![string(), array_of(string()).min_items(1)])),
            opt("needs", named("needs")),
            opt("except", named("ref-filter")),
            opt("tags", named("tags")),
            opt("allow_failure", named("allow-failure")),
            opt("timeout", string_min(1)),
            opt("when", named("when")),
            opt("start_in", string_min(1)),
            opt("dependencies", array_of(string())),
            opt("artifacts", named("artifacts")),
            opt("environment", named("environment")),
            opt("release", named("release")),
            opt("coverage", pattern("^/.+/$")),
            opt("retry", named("retry")),
            opt("parallel", named("parallel")),
            opt("interruptible", boolean()),
            opt("resource_group", string()),
            opt("trigger", named("trigger")),
            opt("inherit", named("inherit")),
        ])
        .strict(),
    );

    // ============ Top-level document ============

    r.define(
        "default",
        object(vec![
            opt("after_script", named("script-lines")),
            opt("artifacts", named("artifacts")),
            opt("before_script", named("script-lines")),
            opt("cache", any()),
            opt("image", named("image")),
            opt("interruptible", boolean()),
            opt("retry", named("retry")),
            opt("services", named("services")),
            opt("tags", named("tags")),
            opt("timeout", string_min(1)),
            opt("!reference", array_of(string_min(1))),
        ])
        .strict(),
    );

    r.define(
        "workflow",
        object(vec![opt(
            "rules",
            array_of(one_of(vec![record_of(any()), array_of(string())])),
        )]),
    );

    // Every key that is not one of the reserved globals is a job named by
    // that key.
    r.define(
        PIPELINE,
        object(vec![
            opt("$schema", pattern("^https?://\\S+$")),
            opt("image", named("image")),
            opt("services", named("services")),
            opt("before_script", named("script-lines")),
            opt("after_script", named("script-lines")),
            opt("variables", named("variables")),
            opt("cache", any()),
            opt("!reference", array_of(string_min(1))),
            opt("default", named("default")),
            opt("stages", array_of(string()).min_items(1)),
            opt("include", named("include")),
            opt("pages", named(JOB)),
            opt("workflow", named("workflow")),
        ])
        .catchall(named(JOB)),
    );

    // ============ Lint-result envelope ============

    // The per-job entries of a lint result carry a resolved name and stage;
    // the rest of the body is preserved as returned by the API.
    r.define(
        "lint-job",
        object(vec![req("name", string()), req("stage", string())]),
    );

    r.define(
        "include-context",
        object(vec![
            req("context_project", one_of(vec![string(), null()])),
            req("context_sha", one_of(vec![string(), null()])),
            req("type", string()),
            req("location", string()),
            req("blob", one_of(vec![string(), null()])),
            req("raw", string()),
            req(
                "extra",
                object(vec![opt("project", string()), opt("ref", string())]),
            ),
        ]),
    );

    r.define(
        LINT_RESULT,
        object(vec![
            req("valid", boolean()),
            req("errors", array_of(string())),
            req("warnings", array_of(string())),
            req("merged_yaml", one_of(vec![string(), null()])),
            req(
                "includes",
                one_of(vec![array_of(named("include-context")), null()]),
            ),
            req("jobs", array_of(named("lint-job"))),
        ]),
    );

    r
}
