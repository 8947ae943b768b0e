//! Type catalog: the source of type, property and reachability metadata.
//!
//! The pipeline only talks to [`TypeCatalog`]. [`SchemaCatalog`] is an
//! in-process implementation built from a TOML schema.

pub mod schema;

use std::collections::BTreeSet;

use crate::error::{CatalogError, EcoResult};
use crate::types::TypeDescriptor;

pub use schema::{PropertySpec, SchemaCatalog, SchemaDocument, TypeSpec};

/// Result type for catalog lookups.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Read-only view over the type catalog.
pub trait TypeCatalog: Send + Sync {
    /// Describe a type. Fails with [`CatalogError::UnknownType`] when it is not catalogued.
    fn get_type(&self, id: &str) -> CatalogResult<TypeDescriptor>;

    /// Every catalogued type IRI.
    fn all_types(&self) -> BTreeSet<String>;

    fn contains(&self, id: &str) -> bool {
        self.all_types().contains(id)
    }

    /// Declared domain of a property; empty when unknown.
    fn property_domain(&self, predicate: &str) -> BTreeSet<String>;

    /// Predicates that belong to thing descriptions, catalog-wide.
    fn describing_predicates(&self) -> BTreeSet<String>;

    /// Describing predicates actually used by the description of `entity`.
    fn describing_predicates_of(&self, entity: &str) -> EcoResult<BTreeSet<String>>;

    /// Whether `target` can be reached from `source` through the type graph.
    fn is_type_reachable(&self, source: &str, target: &str) -> bool;
}
