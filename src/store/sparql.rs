//! SPARQL triple store backed by oxigraph, with a time-bounded result cache.
//!
//! Cached results are served until they are older than the expiry requested
//! by the query; after that the query is evaluated again. Loading data clears
//! the cache.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use oxigraph::io::RdfFormat;
use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::error::StoreError;

use super::{Binding, QueryOptions, ResultRow, StoreResult, TripleStore};

struct CachedResult {
    rows: Arc<Vec<ResultRow>>,
    fetched_at: Instant,
}

/// Oxigraph-backed [`TripleStore`].
pub struct OxigraphStore {
    store: Store,
    cache: DashMap<String, CachedResult>,
    evaluations: AtomicUsize,
}

impl OxigraphStore {
    /// Create a new in-memory store (no persistence).
    pub fn in_memory() -> StoreResult<Self> {
        let store = Store::new().map_err(|e| StoreError::Load {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self::wrap(store))
    }

    /// Open or create a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(path).map_err(|e| StoreError::Io { source: e })?;
        let store = Store::open(path).map_err(|e| StoreError::Load {
            message: format!("failed to open oxigraph store at {}: {e}", path.display()),
        })?;
        Ok(Self::wrap(store))
    }

    fn wrap(store: Store) -> Self {
        Self {
            store,
            cache: DashMap::new(),
            evaluations: AtomicUsize::new(0),
        }
    }

    /// Load TriG data (named graphs allowed).
    pub fn load_trig(&self, data: impl Read) -> StoreResult<()> {
        self.load(RdfFormat::TriG, data)
    }

    /// Load Turtle data into the default graph.
    pub fn load_turtle(&self, data: impl Read) -> StoreResult<()> {
        self.load(RdfFormat::Turtle, data)
    }

    /// Load a file, choosing TriG for `.trig` and Turtle otherwise.
    pub fn load_file(&self, path: &Path) -> StoreResult<()> {
        let file = std::fs::File::open(path).map_err(|e| StoreError::Io { source: e })?;
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("trig") => RdfFormat::TriG,
            _ => RdfFormat::Turtle,
        };
        tracing::debug!(path = %path.display(), ?format, "loading RDF file");
        self.load(format, std::io::BufReader::new(file))
    }

    fn load(&self, format: RdfFormat, data: impl Read) -> StoreResult<()> {
        self.store
            .load_from_reader(format, data)
            .map_err(|e| StoreError::Load {
                message: e.to_string(),
            })?;
        self.invalidate();
        Ok(())
    }

    /// Drop every cached result.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    /// Number of results currently held in the cache.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Number of queries actually evaluated (cache misses).
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Number of quads in the store.
    pub fn len(&self) -> StoreResult<usize> {
        self.store.len().map_err(|e| StoreError::Query {
            message: format!("count failed: {e}"),
        })
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        self.len().map(|n| n == 0)
    }

    #[allow(deprecated)]
    fn evaluate(&self, sparql: &str) -> StoreResult<Vec<ResultRow>> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let results = self.store.query(sparql).map_err(|e| StoreError::Query {
            message: format!("SPARQL query failed: {e}"),
        })?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| StoreError::Query {
                        message: format!("solution error: {e}"),
                    })?;
                    let mut row = ResultRow::new();
                    for (var, term) in solution.iter() {
                        if let Some(binding) = term_binding(term) {
                            row.insert(var.as_str(), binding);
                        }
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            QueryResults::Boolean(_) | QueryResults::Graph(_) => Err(StoreError::Query {
                message: "only SELECT queries are supported".into(),
            }),
        }
    }
}

fn term_binding(term: &Term) -> Option<Binding> {
    match term {
        Term::NamedNode(n) => Some(Binding::iri(n.as_str())),
        Term::BlankNode(b) => Some(Binding::blank(b.as_str())),
        Term::Literal(l) => Some(Binding::literal(l.value())),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

impl TripleStore for OxigraphStore {
    fn query(&self, sparql: &str, options: &QueryOptions) -> StoreResult<Vec<ResultRow>> {
        if options.infer {
            tracing::trace!("entailment requested; oxigraph evaluates without it");
        }
        if options.cache {
            let fresh = self.cache.get(sparql).and_then(|hit| {
                (hit.fetched_at.elapsed() < options.expiry).then(|| hit.rows.as_ref().clone())
            });
            if let Some(rows) = fresh {
                return Ok(rows);
            }
            self.cache
                .remove_if(sparql, |_, stale| stale.fetched_at.elapsed() >= options.expiry);
        }

        let rows = self.evaluate(sparql)?;
        if options.cache {
            self.cache
                .retain(|_, cached| cached.fetched_at.elapsed() < options.expiry);
            self.cache.insert(
                sparql.to_string(),
                CachedResult {
                    rows: Arc::new(rows.clone()),
                    fetched_at: Instant::now(),
                },
            );
        }
        Ok(rows)
    }
}

impl std::fmt::Debug for OxigraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OxigraphStore")
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::BindingKind;

    const DATA: &str = r#"
        @prefix ex: <http://example.org/> .
        ex:t1 a ex:Sensor .
        ex:t2 a ex:Sensor .
        ex:t1 ex:label "first" .
    "#;

    fn store() -> OxigraphStore {
        let store = OxigraphStore::in_memory().unwrap();
        store.load_turtle(DATA.as_bytes()).unwrap();
        store
    }

    #[test]
    fn select_rows_carry_kinds() {
        let store = store();
        let rows = store
            .query(
                "SELECT ?s ?l WHERE { ?s <http://example.org/label> ?l }",
                &QueryOptions::default(),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("s").unwrap().kind, BindingKind::Iri);
        assert_eq!(rows[0].get("l").unwrap(), &Binding::literal("first"));
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn cached_result_is_served_until_expiry() {
        let store = store();
        let q = "SELECT ?s WHERE { ?s a <http://example.org/Sensor> }";
        let opts = QueryOptions::default();
        assert_eq!(store.query(q, &opts).unwrap().len(), 2);
        assert_eq!(store.query(q, &opts).unwrap().len(), 2);
        assert_eq!(store.evaluations(), 1);

        let expired = QueryOptions {
            expiry: Duration::ZERO,
            ..opts
        };
        store.query(q, &expired).unwrap();
        assert_eq!(store.evaluations(), 2);
    }

    #[test]
    fn expired_results_are_evicted() {
        let store = store();
        let opts = QueryOptions::default();
        store.query("SELECT ?s WHERE { ?s ?p ?o }", &opts).unwrap();
        store
            .query("SELECT ?s WHERE { ?s a <http://example.org/Sensor> }", &opts)
            .unwrap();
        assert_eq!(store.cached(), 2);

        // Every earlier entry is older than a zero expiry and gets pruned.
        let expired = QueryOptions {
            expiry: Duration::ZERO,
            ..opts
        };
        store
            .query("SELECT ?o WHERE { ?s ?p ?o }", &expired)
            .unwrap();
        assert_eq!(store.cached(), 1);

        store
            .query("SELECT ?o WHERE { ?s ?p ?o }", &expired)
            .unwrap();
        assert_eq!(store.cached(), 1);
        assert_eq!(store.evaluations(), 4);
    }

    #[test]
    fn uncached_queries_always_evaluate() {
        let store = store();
        let q = "SELECT ?s WHERE { ?s ?p ?o }";
        let opts = QueryOptions {
            cache: false,
            ..Default::default()
        };
        store.query(q, &opts).unwrap();
        store.query(q, &opts).unwrap();
        assert_eq!(store.evaluations(), 2);
    }

    #[test]
    fn loading_invalidates_cache() {
        let store = store();
        let q = "SELECT ?s WHERE { ?s a <http://example.org/Sensor> }";
        let opts = QueryOptions::default();
        assert_eq!(store.query(q, &opts).unwrap().len(), 2);
        store
            .load_turtle("<http://example.org/t3> a <http://example.org/Sensor> .".as_bytes())
            .unwrap();
        assert_eq!(store.query(q, &opts).unwrap().len(), 3);
    }

    #[test]
    fn syntax_errors_are_query_errors() {
        let store = store();
        let err = store
            .query("SELECT WHERE {", &QueryOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::Query { .. }));
    }

    #[test]
    fn ask_is_rejected() {
        let store = store();
        let err = store
            .query("ASK { ?s ?p ?o }", &QueryOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::Query { .. }));
    }
}
