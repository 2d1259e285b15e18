//! Document validation against a schema tree.
//!
//! [`Validator::validate`] walks a parsed document alongside a
//! [`SchemaNode`](crate::schema::SchemaNode) and produces either a typed,
//! normalized copy of the document or the complete list of violations, each
//! tagged with the field path from the document root to the offending node.
//!
//! Malformed input never causes a panic: every data problem comes back as a
//! [`ValidationError`]. The validator panics only on schema-registry misuse
//! (an unknown [`Ref`](crate::schema::SchemaNode::Ref) name, or a reference
//! cycle that never consumes input), which is a defect in the schema
//! declaration rather than in the document.
//!
//! Union resolution: every alternative of a `OneOf` node is evaluated
//! independently against the same value, with no short-circuit and no shared
//! accumulator. Exactly one success binds that alternative's typed value.
//! Zero successes aggregate every alternative's failures into a single
//! [`ErrorKind::NoMatchingAlternative`]. Two or more successes are an
//! [`ErrorKind::AmbiguousAlternative`]: overlapping alternatives are treated
//! as a schema-author mistake, not resolved by declaration order.

use serde_json::{Map, Value};
use std::fmt;

use crate::schema::{
    Constraint, ExtraPolicy, FieldSpec, Presence, ScalarKind, SchemaNode, SchemaRegistry,
};

// ---------------------------------------------------------------------------
// Field paths
// ---------------------------------------------------------------------------

/// One step of a field path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// The sequence of keys and indices locating a value within a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend the path with an object key.
    pub fn key(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(name.to_string()));
        Self(segments)
    }

    /// Extend the path with an array index.
    pub fn index(&self, idx: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(idx));
        Self(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    /// JSON-Pointer-style rendering: `/test/script/0`. The root renders as
    /// `(root)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(root)");
        }
        for segment in &self.0 {
            match segment {
                Segment::Key(k) => write!(f, "/{k}")?,
                Segment::Index(i) => write!(f, "/{i}")?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// What went wrong at one location in the document.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// The value's runtime kind does not match the expected kind.
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// The value has the right kind but fails a declared constraint.
    ConstraintViolation { message: String },
    /// A required object field is absent.
    MissingRequiredField { field: &'static str },
    /// An object with reject-unknown-keys saw an undeclared key.
    UnknownField { field: String },
    /// A union value matched none of its alternatives; carries each
    /// alternative's own failures.
    NoMatchingAlternative {
        alternatives: Vec<Vec<ValidationError>>,
    },
    /// A union value matched more than one alternative; carries which ones.
    AmbiguousAlternative { matched: Vec<usize> },
}

/// A single violation, tagged with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: FieldPath,
    pub kind: ErrorKind,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.path)?;
        match &self.kind {
            ErrorKind::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            ErrorKind::ConstraintViolation { message } => write!(f, "{message}"),
            ErrorKind::MissingRequiredField { field } => {
                write!(f, "required field `{field}` is missing")
            }
            ErrorKind::UnknownField { field } => write!(f, "unknown field `{field}`"),
            ErrorKind::NoMatchingAlternative { alternatives } => {
                write!(f, "matched none of {} alternatives", alternatives.len())?;
                for (idx, errors) in alternatives.iter().enumerate() {
                    if let Some(first) = errors.first() {
                        write!(f, "; [{idx}] {first}")?;
                    }
                }
                Ok(())
            }
            ErrorKind::AmbiguousAlternative { matched } => {
                let listed: Vec<String> = matched.iter().map(|i| i.to_string()).collect();
                write!(f, "ambiguously matched alternatives {}", listed.join(", "))
            }
        }
    }
}

/// Outcome of a validation call: the typed value, or every violation found.
pub type Validated = Result<Value, Vec<ValidationError>>;

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Walks `(document, schema)` pairs against an immutable registry.
///
/// Stateless between calls; a single validator may be shared freely across
/// threads since neither it nor the registry is mutated during traversal.
pub struct Validator<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Validate `document` against `schema`, returning the typed value or
    /// the complete, ordered error list.
    pub fn validate(&self, document: &Value, schema: &SchemaNode) -> Validated {
        self.walk(document, schema, &FieldPath::root(), 0)
    }

    /// Validate against a schema registered under `name`. Panics if the name
    /// is unknown — the registry is program data, not user input.
    pub fn validate_named(&self, document: &Value, name: &str) -> Validated {
        let schema = self
            .registry
            .get(name)
            .unwrap_or_else(|| panic!("unknown schema reference {name:?}"));
        self.validate(document, schema)
    }

    /// Recursive traversal. `ref_guard` counts schema indirections taken
    /// without consuming any input; it resets whenever the walk descends
    /// into a child value, so only a degenerate reference cycle can grow it
    /// past the registry size.
    fn walk(&self, value: &Value, schema: &SchemaNode, path: &FieldPath, ref_guard: usize) -> Validated {
        match schema {
            SchemaNode::Any => Ok(value.clone()),
            SchemaNode::Scalar { kind, constraints } => {
                self.check_scalar(value, *kind, constraints, path)
            }
            SchemaNode::Literal(expected) => {
                if value == expected {
                    Ok(value.clone())
                } else {
                    Err(vec![ValidationError {
                        path: path.clone(),
                        kind: ErrorKind::ConstraintViolation {
                            message: format!("expected literal {expected}"),
                        },
                    }])
                }
            }
            SchemaNode::Object { fields, extra } => self.check_object(value, fields, extra, path),
            SchemaNode::Array {
                element,
                min_items,
                max_items,
            } => self.check_array(value, element, *min_items, *max_items, path),
            SchemaNode::OneOf(alternatives) => {
                self.resolve_union(value, alternatives, path, ref_guard)
            }
            SchemaNode::Record(value_schema) => self.check_record(value, value_schema, path),
            SchemaNode::Ref(name) => {
                let resolved = self
                    .registry
                    .get(name)
                    .unwrap_or_else(|| panic!("unknown schema reference {name:?}"));
                let guard = ref_guard + 1;
                if guard > self.registry.len().max(8) {
                    panic!("schema reference cycle with no base case at {name:?}");
                }
                self.walk(value, resolved, path, guard)
            }
        }
    }

    fn check_scalar(
        &self,
        value: &Value,
        kind: ScalarKind,
        constraints: &[Constraint],
        path: &FieldPath,
    ) -> Validated {
        let kind_matches = match kind {
            ScalarKind::String => value.is_string(),
            ScalarKind::Number => value.is_number(),
            ScalarKind::Boolean => value.is_boolean(),
            ScalarKind::Null => value.is_null(),
        };
        if !kind_matches {
            return Err(vec![ValidationError {
                path: path.clone(),
                kind: ErrorKind::TypeMismatch {
                    expected: kind.name(),
                    found: json_kind(value),
                },
            }]);
        }

        // Constraints apply in declared order; the first failure wins.
        for constraint in constraints {
            if let Some(message) = constraint_failure(value, constraint) {
                return Err(vec![ValidationError {
                    path: path.clone(),
                    kind: ErrorKind::ConstraintViolation { message },
                }]);
            }
        }

        Ok(value.clone())
    }

    fn check_object(
        &self,
        value: &Value,
        fields: &[FieldSpec],
        extra: &ExtraPolicy,
        path: &FieldPath,
    ) -> Validated {
        let map = match value.as_object() {
            Some(map) => map,
            None => {
                return Err(vec![ValidationError {
                    path: path.clone(),
                    kind: ErrorKind::TypeMismatch {
                        expected: "object",
                        found: json_kind(value),
                    },
                }])
            }
        };

        let mut errors = Vec::new();
        let mut out = Map::new();

        for field in fields {
            match map.get(field.name) {
                Some(child) => match self.walk(child, &field.schema, &path.key(field.name), 0) {
                    Ok(typed) => {
                        out.insert(field.name.to_string(), typed);
                    }
                    Err(mut child_errors) => errors.append(&mut child_errors),
                },
                None => {
                    if field.presence == Presence::Required {
                        errors.push(ValidationError {
                            path: path.key(field.name),
                            kind: ErrorKind::MissingRequiredField { field: field.name },
                        });
                    }
                }
            }
        }

        for (key, child) in map {
            if fields.iter().any(|f| f.name == key.as_str()) {
                continue;
            }
            match extra {
                ExtraPolicy::Reject => errors.push(ValidationError {
                    path: path.key(key),
                    kind: ErrorKind::UnknownField { field: key.clone() },
                }),
                ExtraPolicy::Passthrough => {
                    out.insert(key.clone(), child.clone());
                }
                ExtraPolicy::Catchall(value_schema) => {
                    match self.walk(child, value_schema, &path.key(key), 0) {
                        Ok(typed) => {
                            out.insert(key.clone(), typed);
                        }
                        Err(mut child_errors) => errors.append(&mut child_errors),
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(out))
        } else {
            Err(errors)
        }
    }

    fn check_array(
        &self,
        value: &Value,
        element: &SchemaNode,
        min_items: Option<usize>,
        max_items: Option<usize>,
        path: &FieldPath,
    ) -> Validated {
        let items = match value.as_array() {
            Some(items) => items,
            None => {
                return Err(vec![ValidationError {
                    path: path.clone(),
                    kind: ErrorKind::TypeMismatch {
                        expected: "array",
                        found: json_kind(value),
                    },
                }])
            }
        };

        let mut errors = Vec::new();

        // A count violation is one error at the array itself, never
        // per-element.
        if let Some(min) = min_items {
            if items.len() < min {
                errors.push(ValidationError {
                    path: path.clone(),
                    kind: ErrorKind::ConstraintViolation {
                        message: format!("array has {} items, minimum is {min}", items.len()),
                    },
                });
            }
        }
        if let Some(max) = max_items {
            if items.len() > max {
                errors.push(ValidationError {
                    path: path.clone(),
                    kind: ErrorKind::ConstraintViolation {
                        message: format!("array has {} items, maximum is {max}", items.len()),
                    },
                });
            }
        }

        let mut out = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            match self.walk(item, element, &path.index(idx), 0) {
                Ok(typed) => out.push(typed),
                Err(mut child_errors) => errors.append(&mut child_errors),
            }
        }

        if errors.is_empty() {
            Ok(Value::Array(out))
        } else {
            Err(errors)
        }
    }

    fn check_record(&self, value: &Value, value_schema: &SchemaNode, path: &FieldPath) -> Validated {
        let map = match value.as_object() {
            Some(map) => map,
            None => {
                return Err(vec![ValidationError {
                    path: path.clone(),
                    kind: ErrorKind::TypeMismatch {
                        expected: "object",
                        found: json_kind(value),
                    },
                }])
            }
        };

        let mut errors = Vec::new();
        let mut out = Map::new();
        for (key, child) in map {
            match self.walk(child, value_schema, &path.key(key), 0) {
                Ok(typed) => {
                    out.insert(key.clone(), typed);
                }
                Err(mut child_errors) => errors.append(&mut child_errors),
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(out))
        } else {
            Err(errors)
        }
    }

    /// Evaluate every alternative independently and demand exactly one
    /// success.
    fn resolve_union(
        &self,
        value: &Value,
        alternatives: &[SchemaNode],
        path: &FieldPath,
        ref_guard: usize,
    ) -> Validated {
        let outcomes: Vec<Validated> = alternatives
            .iter()
            .map(|alt| self.walk(value, alt, path, ref_guard))
            .collect();

        let mut matched = Vec::new();
        let mut failures = Vec::new();
        let mut winner = None;
        for (idx, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(typed) => {
                    matched.push(idx);
                    winner = Some(typed);
                }
                Err(errors) => failures.push(errors),
            }
        }

        match matched.len() {
            1 => Ok(winner.expect("matched alternative has a value")),
            0 => Err(vec![ValidationError {
                path: path.clone(),
                kind: ErrorKind::NoMatchingAlternative {
                    alternatives: failures,
                },
            }]),
            _ => Err(vec![ValidationError {
                path: path.clone(),
                kind: ErrorKind::AmbiguousAlternative { matched },
            }]),
        }
    }
}

/// The runtime kind of a JSON value, for diagnostics.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check one constraint, returning a message on failure.
fn constraint_failure(value: &Value, constraint: &Constraint) -> Option<String> {
    match constraint {
        Constraint::MinLength(min) => {
            let len = value.as_str().map(|s| s.chars().count()).unwrap_or(0);
            (len < *min).then(|| format!("string has {len} characters, minimum is {min}"))
        }
        Constraint::Pattern(re) => {
            let s = value.as_str().unwrap_or_default();
            (!re.is_match(s)).then(|| format!("string does not match pattern {}", re.as_str()))
        }
        Constraint::Integer => {
            let is_int = value
                .as_f64()
                .map(|n| n.fract() == 0.0)
                .unwrap_or(false);
            (!is_int).then(|| "expected an integer".to_string())
        }
        Constraint::Minimum(min) => {
            let n = value.as_f64().unwrap_or(f64::NEG_INFINITY);
            (n < *min).then(|| format!("value {n} is below minimum {min}"))
        }
        Constraint::Maximum(max) => {
            let n = value.as_f64().unwrap_or(f64::INFINITY);
            (n > *max).then(|| format!("value {n} is above maximum {max}"))
        }
        Constraint::Enum(values) => {
            let s = value.as_str().unwrap_or_default();
            (!values.contains(&s)).then(|| format!("expected one of: {}", values.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;
    use serde_json::json;

    fn empty_registry() -> SchemaRegistry {
        SchemaRegistry::new()
    }

    fn errors_of(result: Validated) -> Vec<ValidationError> {
        result.expect_err("expected validation to fail")
    }

    #[test]
    fn scalar_type_mismatch() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let errors = errors_of(validator.validate(&json!(42), &string()));
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].kind,
            ErrorKind::TypeMismatch {
                expected: "string",
                found: "number"
            }
        );
    }

    #[test]
    fn min_length_constraint() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        assert!(validator.validate(&json!("x"), &string_min(1)).is_ok());
        let errors = errors_of(validator.validate(&json!(""), &string_min(1)));
        assert!(matches!(
            errors[0].kind,
            ErrorKind::ConstraintViolation { .. }
        ));
    }

    #[test]
    fn pattern_constraint() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = pattern("^https?://.+\\.ya?ml$");
        assert!(validator.validate(&json!("https://x/y.yml"), &schema).is_ok());
        assert!(validator.validate(&json!("not-a-url"), &schema).is_err());
    }

    #[test]
    fn enum_constraint() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = string_enum(&["always", "never", "if-not-present"]);
        assert!(validator.validate(&json!("never"), &schema).is_ok());
        let errors = errors_of(validator.validate(&json!("sometimes"), &schema));
        let rendered = errors[0].to_string();
        assert!(rendered.contains("always, never, if-not-present"), "{rendered}");
    }

    #[test]
    fn integer_range_constraint() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = int_range(0, 2);
        assert!(validator.validate(&json!(2), &schema).is_ok());
        // A float with no fraction is still an integer.
        assert!(validator.validate(&json!(1.0), &schema).is_ok());
        assert!(validator.validate(&json!(3), &schema).is_err());
        assert!(validator.validate(&json!(1.5), &schema).is_err());
    }

    #[test]
    fn literal_match() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        assert!(validator.validate(&json!("always"), &literal("always")).is_ok());
        assert!(validator.validate(&json!("never"), &literal("always")).is_err());
    }

    #[test]
    fn missing_required_field() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = object(vec![req("name", string())]).strict();
        let errors = errors_of(validator.validate(&json!({}), &schema));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::MissingRequiredField { field: "name" });
        assert_eq!(errors[0].path.to_string(), "/name");
    }

    #[test]
    fn strict_object_rejects_unknown_keys() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = object(vec![opt("name", string())]).strict();
        let errors = errors_of(validator.validate(&json!({"name": "a", "extra": 1}), &schema));
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].kind,
            ErrorKind::UnknownField {
                field: "extra".to_string()
            }
        );
        assert_eq!(errors[0].path.to_string(), "/extra");
    }

    #[test]
    fn passthrough_object_preserves_unknown_keys() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = object(vec![opt("name", string())]);
        let typed = validator
            .validate(&json!({"name": "a", "extra": [1, 2]}), &schema)
            .unwrap();
        assert_eq!(typed["extra"], json!([1, 2]));
    }

    #[test]
    fn catchall_object_types_unknown_keys() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = object(vec![opt("stages", array_of(string()))]).catchall(boolean());
        let typed = validator
            .validate(&json!({"stages": ["a"], "flag": true}), &schema)
            .unwrap();
        assert_eq!(typed["flag"], json!(true));

        let errors = errors_of(validator.validate(&json!({"flag": "yes"}), &schema));
        assert_eq!(errors[0].path.to_string(), "/flag");
    }

    #[test]
    fn array_count_violation_is_one_error_at_the_array() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = object(vec![opt("entrypoint", array_of(any()).min_items(1))]).strict();
        let errors = errors_of(validator.validate(&json!({"entrypoint": []}), &schema));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.to_string(), "/entrypoint");
        assert!(matches!(
            errors[0].kind,
            ErrorKind::ConstraintViolation { .. }
        ));
    }

    #[test]
    fn array_element_errors_carry_indices() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = array_of(string());
        let errors = errors_of(validator.validate(&json!(["ok", 3, "ok", null]), &schema));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path.to_string(), "/1");
        assert_eq!(errors[1].path.to_string(), "/3");
    }

    #[test]
    fn sibling_errors_accumulate() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = object(vec![req("a", string()), req("b", boolean())]).strict();
        let errors = errors_of(validator.validate(&json!({"a": 1, "b": "no"}), &schema));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn union_unique_match_binds_that_alternative() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = one_of(vec![string(), array_of(string())]);
        assert_eq!(
            validator.validate(&json!("echo hi"), &schema).unwrap(),
            json!("echo hi")
        );
        assert_eq!(
            validator.validate(&json!(["echo hi"]), &schema).unwrap(),
            json!(["echo hi"])
        );
    }

    #[test]
    fn union_no_match_bundles_every_alternative_failure() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = one_of(vec![string(), array_of(string())]);
        let errors = errors_of(validator.validate(&json!(42), &schema));
        assert_eq!(errors.len(), 1);
        match &errors[0].kind {
            ErrorKind::NoMatchingAlternative { alternatives } => {
                assert_eq!(alternatives.len(), 2);
            }
            other => panic!("expected NoMatchingAlternative, got {other:?}"),
        }
    }

    #[test]
    fn union_overlapping_match_is_ambiguous() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        // A plain string matches both the generic and the pattern-constrained
        // alternative.
        let schema = one_of(vec![string(), pattern("^a")]);
        let errors = errors_of(validator.validate(&json!("abc"), &schema));
        assert_eq!(
            errors[0].kind,
            ErrorKind::AmbiguousAlternative { matched: vec![0, 1] }
        );
        // A value matching only the generic alternative is fine.
        assert!(validator.validate(&json!("zzz"), &schema).is_ok());
    }

    #[test]
    fn union_alternatives_do_not_share_state() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        // Both alternatives fail on different inner fields; each failure
        // list stays attached to its own alternative.
        let schema = one_of(vec![
            object(vec![req("local", string())]).strict(),
            object(vec![req("remote", string())]).strict(),
        ]);
        let errors = errors_of(validator.validate(&json!({"template": "x"}), &schema));
        match &errors[0].kind {
            ErrorKind::NoMatchingAlternative { alternatives } => {
                assert_eq!(alternatives.len(), 2);
                // Each alternative reports its own missing field plus the
                // unknown key.
                assert!(alternatives[0]
                    .iter()
                    .any(|e| e.kind == ErrorKind::MissingRequiredField { field: "local" }));
                assert!(alternatives[1]
                    .iter()
                    .any(|e| e.kind == ErrorKind::MissingRequiredField { field: "remote" }));
            }
            other => panic!("expected NoMatchingAlternative, got {other:?}"),
        }
    }

    #[test]
    fn record_values_are_validated_per_key() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = record_of(string());
        let errors = errors_of(validator.validate(&json!({"A": "1", "B": 2}), &schema));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.to_string(), "/B");
    }

    #[test]
    fn null_alternative_accepts_null() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = one_of(vec![string(), null()]);
        assert!(validator.validate(&json!(null), &schema).is_ok());
        assert!(validator.validate(&json!("x"), &schema).is_ok());
        assert!(validator.validate(&json!(1), &schema).is_err());
    }

    #[test]
    fn refs_resolve_through_the_registry() {
        let mut registry = SchemaRegistry::new();
        registry.define("when", one_of(vec![literal("always"), literal("never")]));
        registry.define(
            "rule",
            object(vec![opt("when", named("when"))]).strict(),
        );
        let validator = Validator::new(&registry);
        assert!(validator
            .validate_named(&json!({"when": "always"}), "rule")
            .is_ok());
        assert!(validator
            .validate_named(&json!({"when": "bogus"}), "rule")
            .is_err());
    }

    #[test]
    #[should_panic(expected = "unknown schema reference")]
    fn unknown_ref_is_fatal() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let _ = validator.validate(&json!("x"), &named("missing"));
    }

    #[test]
    #[should_panic(expected = "schema reference cycle")]
    fn unterminated_ref_cycle_is_fatal() {
        let mut registry = SchemaRegistry::new();
        registry.define("a", named("b"));
        registry.define("b", named("a"));
        let validator = Validator::new(&registry);
        let _ = validator.validate_named(&json!("x"), "a");
    }

    #[test]
    fn recursive_shape_through_a_container_terminates() {
        // A tree of nested lists: each level consumes input, so the
        // self-reference is fine.
        let mut registry = SchemaRegistry::new();
        registry.define("tree", one_of(vec![string(), array_of(named("tree"))]));
        let validator = Validator::new(&registry);
        assert!(validator
            .validate_named(&json!([["a", ["b"]], "c"]), "tree")
            .is_ok());
        assert!(validator.validate_named(&json!([[1]]), "tree").is_err());
    }

    #[test]
    fn validation_is_deterministic() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = object(vec![req("a", string()), req("b", int_range(0, 2))]).strict();
        let doc = json!({"a": 1, "b": 9, "c": true});
        let first = validator.validate(&doc, &schema);
        let second = validator.validate(&doc, &schema);
        assert_eq!(first, second);
    }

    #[test]
    fn successful_validation_is_idempotent() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = object(vec![opt("name", string())]).catchall(array_of(string()));
        let doc = json!({"name": "x", "tags": ["a", "b"]});
        let typed = validator.validate(&doc, &schema).unwrap();
        let again = validator.validate(&typed, &schema).unwrap();
        assert_eq!(typed, again);
    }

    #[test]
    fn strict_typed_result_contains_only_declared_fields() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = object(vec![opt("name", string()), opt("alias", string())]).strict();
        let typed = validator.validate(&json!({"name": "a"}), &schema).unwrap();
        assert_eq!(typed, json!({"name": "a"}));
    }

    #[test]
    fn error_display_is_path_qualified() {
        let registry = empty_registry();
        let validator = Validator::new(&registry);
        let schema = object(vec![opt(
            "jobs",
            array_of(object(vec![req("stage", string())]).strict()),
        )])
        .strict();
        let errors = errors_of(validator.validate(&json!({"jobs": [{}]}), &schema));
        assert_eq!(errors[0].to_string(), "/jobs/0/stage: required field `stage` is missing");
    }
}
