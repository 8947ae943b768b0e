//! Rich diagnostic error types for thing discovery.
//!
//! Each pipeline stage defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. [`EcoError`] wraps them all transparently so
//! the full diagnostic chain reaches the caller.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for a discovery request.
#[derive(Debug, Error, Diagnostic)]
pub enum EcoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience alias used across the crate.
pub type EcoResult<T> = std::result::Result<T, EcoError>;

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("malformed query: {message}")]
    #[diagnostic(
        code(discovery::query::malformed),
        help(
            "The query could not be parsed into SPARQL algebra. \
             Check the syntax and make sure every prefix used is declared."
        )
    )]
    Malformed { message: String },
}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("unknown type: {id}")]
    #[diagnostic(
        code(discovery::catalog::unknown_type),
        help("The type is not registered in the catalog. Add it to the schema first.")
    )]
    UnknownType { id: String },

    #[error("inconsistent type metadata for {id}: {message}")]
    #[diagnostic(
        code(discovery::catalog::inconsistent),
        help(
            "The catalog returned metadata that contradicts itself, for example a \
             supertype that is not registered. Rebuild the schema."
        )
    )]
    Inconsistent { id: String, message: String },

    #[error("could not resolve types of candidate {entity}: {message}")]
    #[diagnostic(
        code(discovery::catalog::candidate),
        help("Only this candidate is dropped; the rest of the search continues.")
    )]
    CandidateResolution { entity: String, message: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("store query failed: {message}")]
    #[diagnostic(
        code(discovery::store::query),
        help(
            "The triple store could not answer a query. Partial ecosystems are never \
             returned, so the whole discovery request fails."
        )
    )]
    Query { message: String },

    #[error("result row is missing required binding ?{variable}")]
    #[diagnostic(
        code(discovery::store::missing_binding),
        help("The store returned a row without a variable the query projects.")
    )]
    MissingBinding { variable: String },

    #[error("failed to load RDF data: {message}")]
    #[diagnostic(
        code(discovery::store::load),
        help("Check that the file is valid TriG or Turtle and that its IRIs are absolute.")
    )]
    Load { message: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(discovery::store::io),
        help("A filesystem operation failed. Check that the path exists and is readable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DiscoveryError {
    #[error("could not understand the given query")]
    #[diagnostic(
        code(discovery::no_root_type),
        help(
            "None of the query's entry variables could be anchored to a known type. \
             Add an rdf:type constraint or use properties whose domain is in the catalog."
        )
    )]
    NoRootType,
}

// ---------------------------------------------------------------------------
// Compose errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ComposeError {
    #[error("component for {root} was built more than once")]
    #[diagnostic(
        code(discovery::compose::duplicate_root),
        help("Each root thing may contribute exactly one component to an ecosystem.")
    )]
    DuplicateRoot { root: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    #[diagnostic(
        code(discovery::config::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(discovery::config::parse),
        help("The file must be valid TOML matching the documented configuration keys.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config {path}: {source}")]
    #[diagnostic(
        code(discovery::config::write),
        help("Check that the parent directory is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
