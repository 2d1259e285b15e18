//! Declarative schema nodes and the named-schema registry.
//!
//! A schema is a tree of [`SchemaNode`]s describing every shape a document
//! may take: scalars with constraints, object shapes with an explicit policy
//! for undeclared keys, arrays, exact-value literals, string-keyed records,
//! and unions that must match exactly one alternative. Recursive shapes are
//! expressed with [`SchemaNode::Ref`], a named lookup into a
//! [`SchemaRegistry`] that is resolved lazily at traversal time, so a
//! registry can be built eagerly without infinite construction.
//!
//! Builder functions ([`string`], [`object`], [`one_of`], ...) keep large
//! schema declarations readable as data. Misusing a builder (an invalid
//! regex, a union with fewer than two alternatives, redefining a registry
//! name) is a programmer error and panics at construction time; it is never
//! reported as a document-validation failure.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// The runtime kind a [`SchemaNode::Scalar`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Number,
    Boolean,
    Null,
}

impl ScalarKind {
    /// Human-readable kind name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Number => "number",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Null => "null",
        }
    }
}

/// A single constraint applied to a scalar value, checked in declared order.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Minimum string length in characters.
    MinLength(usize),
    /// The string must match this pattern.
    Pattern(Regex),
    /// The number must be an integer (a float with zero fraction counts).
    Integer,
    /// Inclusive numeric lower bound.
    Minimum(f64),
    /// Inclusive numeric upper bound.
    Maximum(f64),
    /// The string must be one of these values.
    Enum(Vec<&'static str>),
}

/// Whether a declared object field must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

/// One declared field of an object shape.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub schema: SchemaNode,
    pub presence: Presence,
}

/// How an object shape treats keys it did not declare.
#[derive(Debug, Clone)]
pub enum ExtraPolicy {
    /// Every undeclared key is a validation error.
    Reject,
    /// Undeclared keys are copied into the result verbatim, unvalidated.
    Passthrough,
    /// Undeclared keys are validated against this schema and kept, typed.
    Catchall(Box<SchemaNode>),
}

/// One declarative unit of a validation tree.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Scalar {
        kind: ScalarKind,
        constraints: Vec<Constraint>,
    },
    /// Exact-value match.
    Literal(Value),
    Object {
        fields: Vec<FieldSpec>,
        extra: ExtraPolicy,
    },
    Array {
        element: Box<SchemaNode>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    /// The value must match exactly one of the alternatives.
    OneOf(Vec<SchemaNode>),
    /// Arbitrary string keys, every value matching the given schema.
    Record(Box<SchemaNode>),
    /// Accepts anything, unvalidated.
    Any,
    /// Deferred lookup of a named schema in the registry.
    Ref(&'static str),
}

impl SchemaNode {
    /// Set the minimum element count. Panics on a non-array node.
    pub fn min_items(mut self, n: usize) -> Self {
        match &mut self {
            SchemaNode::Array { min_items, .. } => *min_items = Some(n),
            other => panic!("min_items on non-array schema node: {other:?}"),
        }
        self
    }

    /// Set the maximum element count. Panics on a non-array node.
    pub fn max_items(mut self, n: usize) -> Self {
        match &mut self {
            SchemaNode::Array { max_items, .. } => *max_items = Some(n),
            other => panic!("max_items on non-array schema node: {other:?}"),
        }
        self
    }

    /// Reject undeclared keys. Panics on a non-object node.
    pub fn strict(mut self) -> Self {
        match &mut self {
            SchemaNode::Object { extra, .. } => *extra = ExtraPolicy::Reject,
            other => panic!("strict on non-object schema node: {other:?}"),
        }
        self
    }

    /// Validate undeclared keys against `value_schema` and keep them typed.
    /// Panics on a non-object node.
    pub fn catchall(mut self, value_schema: SchemaNode) -> Self {
        match &mut self {
            SchemaNode::Object { extra, .. } => {
                *extra = ExtraPolicy::Catchall(Box::new(value_schema))
            }
            other => panic!("catchall on non-object schema node: {other:?}"),
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// An unconstrained string.
pub fn string() -> SchemaNode {
    SchemaNode::Scalar {
        kind: ScalarKind::String,
        constraints: Vec::new(),
    }
}

/// A string with a minimum length.
pub fn string_min(min: usize) -> SchemaNode {
    SchemaNode::Scalar {
        kind: ScalarKind::String,
        constraints: vec![Constraint::MinLength(min)],
    }
}

/// A string matching the given regex. Panics if the pattern does not compile.
pub fn pattern(re: &str) -> SchemaNode {
    let compiled = Regex::new(re).unwrap_or_else(|e| panic!("invalid schema pattern {re:?}: {e}"));
    SchemaNode::Scalar {
        kind: ScalarKind::String,
        constraints: vec![Constraint::Pattern(compiled)],
    }
}

/// A string restricted to a closed set of values.
pub fn string_enum(values: &[&'static str]) -> SchemaNode {
    SchemaNode::Scalar {
        kind: ScalarKind::String,
        constraints: vec![Constraint::Enum(values.to_vec())],
    }
}

/// An exact string literal.
pub fn literal(value: &str) -> SchemaNode {
    SchemaNode::Literal(Value::String(value.to_string()))
}

pub fn boolean() -> SchemaNode {
    SchemaNode::Scalar {
        kind: ScalarKind::Boolean,
        constraints: Vec::new(),
    }
}

/// Any JSON number.
pub fn number() -> SchemaNode {
    SchemaNode::Scalar {
        kind: ScalarKind::Number,
        constraints: Vec::new(),
    }
}

/// An integer without bounds.
pub fn integer() -> SchemaNode {
    SchemaNode::Scalar {
        kind: ScalarKind::Number,
        constraints: vec![Constraint::Integer],
    }
}

/// An integer within an inclusive range.
pub fn int_range(min: i64, max: i64) -> SchemaNode {
    SchemaNode::Scalar {
        kind: ScalarKind::Number,
        constraints: vec![
            Constraint::Integer,
            Constraint::Minimum(min as f64),
            Constraint::Maximum(max as f64),
        ],
    }
}

pub fn null() -> SchemaNode {
    SchemaNode::Scalar {
        kind: ScalarKind::Null,
        constraints: Vec::new(),
    }
}

pub fn any() -> SchemaNode {
    SchemaNode::Any
}

pub fn array_of(element: SchemaNode) -> SchemaNode {
    SchemaNode::Array {
        element: Box::new(element),
        min_items: None,
        max_items: None,
    }
}

/// A union requiring exactly one matching alternative. Panics if fewer than
/// two alternatives are given; a singleton union should collapse to the
/// alternative itself.
pub fn one_of(alternatives: Vec<SchemaNode>) -> SchemaNode {
    assert!(
        alternatives.len() >= 2,
        "one_of requires at least two alternatives, got {}",
        alternatives.len()
    );
    SchemaNode::OneOf(alternatives)
}

pub fn record_of(value: SchemaNode) -> SchemaNode {
    SchemaNode::Record(Box::new(value))
}

/// An object shape. Undeclared keys pass through unless [`SchemaNode::strict`]
/// or [`SchemaNode::catchall`] is applied.
pub fn object(fields: Vec<FieldSpec>) -> SchemaNode {
    SchemaNode::Object {
        fields,
        extra: ExtraPolicy::Passthrough,
    }
}

/// A required field.
pub fn req(name: &'static str, schema: SchemaNode) -> FieldSpec {
    FieldSpec {
        name,
        schema,
        presence: Presence::Required,
    }
}

/// An optional field.
pub fn opt(name: &'static str, schema: SchemaNode) -> FieldSpec {
    FieldSpec {
        name,
        schema,
        presence: Presence::Optional,
    }
}

/// A deferred reference to a named schema.
pub fn named(name: &'static str) -> SchemaNode {
    SchemaNode::Ref(name)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A table of named schemas, built once at startup and immutable afterwards.
///
/// [`SchemaNode::Ref`] nodes are resolved against this table during
/// traversal, which is what allows shared sub-schemas to be declared once
/// and recursive shapes to terminate.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    nodes: HashMap<&'static str, SchemaNode>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under a unique name. Redefining a name is a
    /// programmer error and panics.
    pub fn define(&mut self, name: &'static str, node: SchemaNode) {
        if self.nodes.insert(name, node).is_some() {
            panic!("schema {name:?} defined twice");
        }
    }

    /// Look up a schema by name.
    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.nodes.get(name)
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
