//! Triple store boundary.
//!
//! Stores hand back loosely-shaped [`ResultRow`]s; every consumer converts them
//! into a typed row (`TryFrom<&ResultRow>`) so missing bindings surface as
//! [`StoreError::MissingBinding`] right at the boundary.

pub mod sparql;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::query::rewrite::GRAPH_VAR;

pub use sparql::OxigraphStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Per-query hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Whether the result may be served from (and written to) the result cache.
    pub cache: bool,
    /// Maximum age of a cached result.
    pub expiry: Duration,
    /// Whether entailment is requested.
    pub infer: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            cache: true,
            expiry: Duration::from_secs(300),
            infer: false,
        }
    }
}

/// A SPARQL endpoint answering SELECT queries.
pub trait TripleStore: Send + Sync {
    fn query(&self, sparql: &str, options: &QueryOptions) -> StoreResult<Vec<ResultRow>>;
}

/// Kind of term bound to a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingKind {
    Iri,
    BlankNode,
    Literal,
}

/// A bound term: its lexical value plus kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub value: String,
    pub kind: BindingKind,
}

impl Binding {
    pub fn iri(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: BindingKind::Iri,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: BindingKind::Literal,
        }
    }

    pub fn blank(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: BindingKind::BlankNode,
        }
    }
}

/// One solution: variable name (without `?`) → binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRow {
    bindings: BTreeMap<String, Binding>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for test doubles.
    pub fn with(mut self, var: impl Into<String>, binding: Binding) -> Self {
        self.bindings.insert(var.into(), binding);
        self
    }

    pub fn insert(&mut self, var: impl Into<String>, binding: Binding) {
        self.bindings.insert(var.into(), binding);
    }

    pub fn get(&self, var: &str) -> Option<&Binding> {
        self.bindings.get(var)
    }

    /// The binding of `var`, or [`StoreError::MissingBinding`].
    pub fn require(&self, var: &str) -> StoreResult<&Binding> {
        self.bindings.get(var).ok_or_else(|| StoreError::MissingBinding {
            variable: var.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// `?s a ?type` row of the thing search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThingTypeRow {
    pub thing: String,
    pub type_id: String,
}

impl TryFrom<&ResultRow> for ThingTypeRow {
    type Error = StoreError;

    fn try_from(row: &ResultRow) -> StoreResult<Self> {
        Ok(Self {
            thing: row.require("s")?.value.clone(),
            type_id: row.require("type")?.value.clone(),
        })
    }
}

/// Named graph matched by a graph-scoped sub-query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRow {
    pub graph: String,
}

impl TryFrom<&ResultRow> for GraphRow {
    type Error = StoreError;

    fn try_from(row: &ResultRow) -> StoreResult<Self> {
        Ok(Self {
            graph: row.require(GRAPH_VAR)?.value.clone(),
        })
    }
}

/// Predicate used inside a description graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateRow {
    pub predicate: String,
}

impl TryFrom<&ResultRow> for PredicateRow {
    type Error = StoreError;

    fn try_from(row: &ResultRow) -> StoreResult<Self> {
        Ok(Self {
            predicate: row.require("p")?.value.clone(),
        })
    }
}

/// Full statement of a description graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRow {
    pub subject: String,
    pub predicate: String,
    pub object: Binding,
}

impl TryFrom<&ResultRow> for StatementRow {
    type Error = StoreError;

    fn try_from(row: &ResultRow) -> StoreResult<Self> {
        Ok(Self {
            subject: row.require("s")?.value.clone(),
            predicate: row.require("p")?.value.clone(),
            object: row.require("o")?.clone(),
        })
    }
}
