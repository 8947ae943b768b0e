//! Decomposition of a SPARQL query into basic graph patterns and filters.
//!
//! Extraction is memoized in a [`BgpCache`] owned by the caller, so one
//! discovery request parses its query exactly once no matter how many stages
//! ask for the patterns.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use spargebra::Query;
use spargebra::algebra::{Expression, GraphPattern};

use crate::error::QueryError;

use super::{Bgp, FilterClauses};

/// Result type for extraction.
pub type ExtractResult<T> = std::result::Result<T, QueryError>;

/// A query as handed to the pipeline: raw text or an already-parsed algebra tree.
#[derive(Debug, Clone, Copy)]
pub enum QueryInput<'a> {
    Text(&'a str),
    Algebra(&'a Query),
}

impl<'a> From<&'a str> for QueryInput<'a> {
    fn from(text: &'a str) -> Self {
        QueryInput::Text(text)
    }
}

impl<'a> From<&'a Query> for QueryInput<'a> {
    fn from(query: &'a Query) -> Self {
        QueryInput::Algebra(query)
    }
}

impl QueryInput<'_> {
    /// Memoization key: the literal text, or the canonical serialization of the tree.
    pub fn cache_key(&self) -> String {
        match self {
            QueryInput::Text(text) => (*text).to_string(),
            QueryInput::Algebra(query) => query.to_string(),
        }
    }
}

/// The patterns of one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPatterns {
    /// Every BGP of the query. Triple order inside a BGP follows the query.
    pub bgps: Vec<Bgp>,
    /// Filter expressions keyed by constrained variable.
    pub filters: FilterClauses,
}

/// Request-scoped memo table for [`extract_bgps`].
#[derive(Debug, Default)]
pub struct BgpCache {
    entries: HashMap<String, Arc<ExtractedPatterns>>,
    parses: usize,
}

impl BgpCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of extractions that actually walked an algebra tree.
    pub fn parses(&self) -> usize {
        self.parses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse SPARQL text into algebra.
pub fn parse_query(text: &str) -> ExtractResult<Query> {
    Query::parse(text, None).map_err(|e| QueryError::Malformed {
        message: e.to_string(),
    })
}

/// Extract the BGPs and filter clauses of a query, memoized in `cache`.
///
/// A cache hit returns the same `Arc` that was stored on the first call.
pub fn extract_bgps(input: QueryInput<'_>, cache: &mut BgpCache) -> ExtractResult<Arc<ExtractedPatterns>> {
    let key = input.cache_key();
    if let Some(hit) = cache.entries.get(&key) {
        return Ok(Arc::clone(hit));
    }

    let patterns = match input {
        QueryInput::Text(text) => decompose(&parse_query(text)?),
        QueryInput::Algebra(query) => decompose(query),
    };
    cache.parses += 1;
    tracing::debug!(
        bgps = patterns.bgps.len(),
        filtered_vars = patterns.filters.len(),
        "extracted query patterns"
    );

    let patterns = Arc::new(patterns);
    cache.entries.insert(key, Arc::clone(&patterns));
    Ok(patterns)
}

/// Walk the algebra of `query` without memoization.
pub fn decompose(query: &Query) -> ExtractedPatterns {
    let pattern = match query {
        Query::Select { pattern, .. }
        | Query::Construct { pattern, .. }
        | Query::Describe { pattern, .. }
        | Query::Ask { pattern, .. } => pattern,
    };
    let mut out = ExtractedPatterns::default();
    walk(pattern, &mut out);
    out
}

fn walk(pattern: &GraphPattern, out: &mut ExtractedPatterns) {
    match pattern {
        GraphPattern::Bgp { patterns } => {
            if !patterns.is_empty() {
                out.bgps.push(Bgp {
                    triples: patterns.clone(),
                });
            }
        }
        GraphPattern::Filter { expr, inner } => {
            register_filter(expr, &mut out.filters);
            walk(inner, out);
        }
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => {
            walk(left, out);
            walk(right, out);
            if let Some(expr) = expression {
                register_filter(expr, &mut out.filters);
            }
        }
        GraphPattern::Join { left, right }
        | GraphPattern::Union { left, right }
        | GraphPattern::Minus { left, right } => {
            walk(left, out);
            walk(right, out);
        }
        GraphPattern::Graph { inner, .. }
        | GraphPattern::Extend { inner, .. }
        | GraphPattern::OrderBy { inner, .. }
        | GraphPattern::Project { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. }
        | GraphPattern::Group { inner, .. }
        | GraphPattern::Service { inner, .. } => walk(inner, out),
        // Property paths and inline VALUES carry no triple patterns.
        _ => {}
    }
}

fn register_filter(expr: &Expression, filters: &mut FilterClauses) {
    let mut vars = BTreeSet::new();
    expression_variables(expr, &mut vars);
    let rendered = expr.to_string();
    for var in vars {
        filters.entry(var).or_default().insert(rendered.clone());
    }
}

fn expression_variables(expr: &Expression, vars: &mut BTreeSet<String>) {
    match expr {
        Expression::Variable(v) | Expression::Bound(v) => {
            vars.insert(v.as_str().to_string());
        }
        Expression::Or(a, b)
        | Expression::And(a, b)
        | Expression::Equal(a, b)
        | Expression::SameTerm(a, b)
        | Expression::Greater(a, b)
        | Expression::GreaterOrEqual(a, b)
        | Expression::Less(a, b)
        | Expression::LessOrEqual(a, b)
        | Expression::Add(a, b)
        | Expression::Subtract(a, b)
        | Expression::Multiply(a, b)
        | Expression::Divide(a, b) => {
            expression_variables(a, vars);
            expression_variables(b, vars);
        }
        Expression::UnaryPlus(a) | Expression::UnaryMinus(a) | Expression::Not(a) => {
            expression_variables(a, vars);
        }
        Expression::In(a, list) => {
            expression_variables(a, vars);
            list.iter().for_each(|e| expression_variables(e, vars));
        }
        Expression::If(a, b, c) => {
            expression_variables(a, vars);
            expression_variables(b, vars);
            expression_variables(c, vars);
        }
        Expression::Coalesce(list) | Expression::FunctionCall(_, list) => {
            list.iter().for_each(|e| expression_variables(e, vars));
        }
        Expression::Exists(pattern) => {
            let mut inner = ExtractedPatterns::default();
            walk(pattern, &mut inner);
            for bgp in &inner.bgps {
                vars.extend(Bgp::variables_of(&bgp.triples));
            }
        }
        // Constants.
        _ => {}
    }
}
