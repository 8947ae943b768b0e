//! Query algebra analysis: pattern extraction and query rewriting.
//!
//! - **Extraction** ([`extract`]): SPARQL text or algebra → basic graph patterns + filters
//! - **Rewriting** ([`rewrite`]): BGPs → candidate-scoped and graph-scoped sub-queries

pub mod extract;
pub mod rewrite;

use std::collections::{BTreeMap, BTreeSet};

use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};

pub use extract::{BgpCache, ExtractedPatterns, QueryInput, extract_bgps};
pub use rewrite::{describing_patterns, graph_scoped_queries, per_candidate_queries};

/// IRI of `rdf:type`.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// A basic graph pattern: triple patterns evaluated together, in query order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bgp {
    pub triples: Vec<TriplePattern>,
}

impl Bgp {
    /// Names of every variable mentioned by the given patterns.
    pub fn variables_of<'a>(patterns: impl IntoIterator<Item = &'a TriplePattern>) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        for tp in patterns {
            if let TermPattern::Variable(v) = &tp.subject {
                vars.insert(v.as_str().to_string());
            }
            if let NamedNodePattern::Variable(v) = &tp.predicate {
                vars.insert(v.as_str().to_string());
            }
            if let TermPattern::Variable(v) = &tp.object {
                vars.insert(v.as_str().to_string());
            }
        }
        vars
    }
}

/// Filter expressions (SPARQL text) indexed by the variable names they constrain.
pub type FilterClauses = BTreeMap<String, BTreeSet<String>>;

/// IRI of a pattern's predicate, if it is not a variable.
pub(crate) fn predicate_iri(tp: &TriplePattern) -> Option<&str> {
    match &tp.predicate {
        NamedNodePattern::NamedNode(n) => Some(n.as_str()),
        NamedNodePattern::Variable(_) => None,
    }
}
