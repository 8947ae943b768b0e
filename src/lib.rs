// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # thing-discovery
//!
//! Discovers the things of a federated knowledge base that are relevant to a
//! SPARQL query and composes them into a Thing Ecosystem Description (TED).
//!
//! ## Architecture
//!
//! - **Query analysis** (`query`): BGP/filter extraction and sub-query rewriting via `spargebra`
//! - **Type reasoning** (`types`): root type inference, lattice reductions, memoized reachability
//! - **Catalog** (`catalog`): type metadata with a petgraph connectivity graph
//! - **Store** (`store`): typed SPARQL results over oxigraph with a time-bounded cache
//! - **Composition** (`compose`): components and the TED, deduplicated per request
//! - **Orchestration** (`discovery`): the end-to-end pipeline
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use thing_discovery::catalog::SchemaCatalog;
//! use thing_discovery::config::DiscoveryConfig;
//! use thing_discovery::discovery::{Discoverer, SearchMode};
//! use thing_discovery::store::OxigraphStore;
//!
//! let config = DiscoveryConfig::default();
//! let store = Arc::new(OxigraphStore::in_memory().unwrap());
//! store.load_file(Path::new("things.trig")).unwrap();
//! let catalog = SchemaCatalog::load(Path::new("schema.toml"))
//!     .unwrap()
//!     .with_store(store.clone(), &config);
//! let discoverer = Discoverer::with_graph_composer(Arc::new(catalog), store, config);
//! let ted = discoverer
//!     .discover("PREFIX ex: <http://example.org/> SELECT * WHERE { ?x a ex:Sensor }", SearchMode::Full)
//!     .unwrap();
//! println!("{}", ted.to_json_pretty().unwrap());
//! ```

pub mod catalog;
pub mod compose;
pub mod config;
pub mod discovery;
pub mod error;
pub mod query;
pub mod store;
pub mod types;
