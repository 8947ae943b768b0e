//! In-process type catalog built from a schema document.
//!
//! Types form a subsumption lattice through their declared supertypes. The
//! connectivity graph used for reachability has an edge from every type to each
//! direct supertype and from every property domain to each of its range types,
//! so a thing is connected to a type when it is a specialization of it or can
//! link to it through properties.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::config::DiscoveryConfig;
use crate::error::{CatalogError, ConfigError, EcoResult};
use crate::store::{PredicateRow, QueryOptions, TripleStore};
use crate::types::TypeDescriptor;

use super::{CatalogResult, TypeCatalog};

/// Serialized form of a catalog.
///
/// ```toml
/// [[type]]
/// id = "http://example.org/Thermometer"
/// super = ["http://example.org/Sensor"]
///
/// [[property]]
/// id = "http://example.org/hasValue"
/// domain = ["http://example.org/Sensor"]
/// describing = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default, rename = "type")]
    pub types: Vec<TypeSpec>,
    #[serde(default, rename = "property")]
    pub properties: Vec<PropertySpec>,
}

impl SchemaDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a type with its direct supertypes.
    pub fn with_type<I, S>(mut self, id: impl Into<String>, supers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types.push(TypeSpec {
            id: id.into(),
            supers: supers.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn with_property(mut self, property: PropertySpec) -> Self {
        self.properties.push(property);
        self
    }

    /// Validate the document and build the catalog.
    pub fn build(&self) -> CatalogResult<SchemaCatalog> {
        SchemaCatalog::from_document(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub id: String,
    /// Direct supertypes.
    #[serde(default, rename = "super")]
    pub supers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub id: String,
    #[serde(default)]
    pub domain: Vec<String>,
    #[serde(default)]
    pub range: Vec<String>,
    /// Whether the property is part of thing descriptions.
    #[serde(default)]
    pub describing: bool,
}

/// Type catalog with precomputed closures and a petgraph connectivity graph.
pub struct SchemaCatalog {
    types: BTreeMap<String, TypeDescriptor>,
    domains: HashMap<String, BTreeSet<String>>,
    describing: BTreeSet<String>,
    graph: DiGraph<String, ()>,
    node_index: HashMap<String, NodeIndex>,
    store: Option<(Arc<dyn TripleStore>, QueryOptions)>,
}

impl SchemaCatalog {
    /// Build the catalog. Every supertype, domain and range must be a declared type.
    pub fn from_document(doc: &SchemaDocument) -> CatalogResult<Self> {
        let mut parents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for spec in &doc.types {
            parents
                .entry(spec.id.clone())
                .or_default()
                .extend(spec.supers.iter().cloned());
        }
        for (id, supers) in &parents {
            if let Some(missing) = supers.iter().find(|s| !parents.contains_key(*s)) {
                return Err(CatalogError::Inconsistent {
                    id: id.clone(),
                    message: format!("supertype {missing} is not declared"),
                });
            }
        }

        let mut graph = DiGraph::new();
        let mut node_index = HashMap::new();
        for id in parents.keys() {
            node_index.insert(id.clone(), graph.add_node(id.clone()));
        }
        for (id, supers) in &parents {
            for s in supers {
                graph.add_edge(node_index[id], node_index[s], ());
            }
        }

        let mut domains: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut describing = BTreeSet::new();
        for prop in &doc.properties {
            for t in prop.domain.iter().chain(&prop.range) {
                if !parents.contains_key(t) {
                    return Err(CatalogError::Inconsistent {
                        id: prop.id.clone(),
                        message: format!("property refers to undeclared type {t}"),
                    });
                }
            }
            for d in &prop.domain {
                for r in &prop.range {
                    graph.add_edge(node_index[d], node_index[r], ());
                }
            }
            domains
                .entry(prop.id.clone())
                .or_default()
                .extend(prop.domain.iter().cloned());
            if prop.describing {
                describing.insert(prop.id.clone());
            }
        }

        let mut types: BTreeMap<String, TypeDescriptor> = parents
            .iter()
            .map(|(id, _)| {
                let desc = TypeDescriptor::new(id.clone()).with_super(ancestors(id, &parents));
                (id.clone(), desc)
            })
            .collect();
        let pairs: Vec<(String, String)> = types
            .values()
            .flat_map(|t| t.super_types.iter().map(|s| (s.clone(), t.id.clone())))
            .collect();
        for (sup, sub) in pairs {
            if let Some(desc) = types.get_mut(&sup) {
                desc.sub_types.insert(sub);
            }
        }

        tracing::debug!(
            types = types.len(),
            properties = domains.len(),
            describing = describing.len(),
            "built schema catalog"
        );

        Ok(Self {
            types,
            domains,
            describing,
            graph,
            node_index,
            store: None,
        })
    }

    /// Parse a TOML schema.
    pub fn from_toml_str(content: &str) -> EcoResult<Self> {
        let doc: SchemaDocument = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        Ok(Self::from_document(&doc)?)
    }

    /// Load a TOML schema from disk.
    pub fn load(path: &Path) -> EcoResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let doc: SchemaDocument = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::from_document(&doc)?)
    }

    /// Resolve per-entity describing predicates against the description graphs in `store`.
    pub fn with_store(mut self, store: Arc<dyn TripleStore>, config: &DiscoveryConfig) -> Self {
        let options = QueryOptions {
            cache: true,
            expiry: config.expiry(),
            infer: false,
        };
        self.store = Some((store, options));
        self
    }
}

/// Transitive supertypes of `id`, excluding `id` itself even on cycles.
fn ancestors(id: &str, parents: &BTreeMap<String, BTreeSet<String>>) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([id]);
    while let Some(current) = queue.pop_front() {
        for p in parents.get(current).into_iter().flatten() {
            if p != id && seen.insert(p.clone()) {
                queue.push_back(p.as_str());
            }
        }
    }
    seen
}

impl TypeCatalog for SchemaCatalog {
    fn get_type(&self, id: &str) -> CatalogResult<TypeDescriptor> {
        self.types
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownType { id: id.to_string() })
    }

    fn all_types(&self) -> BTreeSet<String> {
        self.types.keys().cloned().collect()
    }

    fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    fn property_domain(&self, predicate: &str) -> BTreeSet<String> {
        self.domains.get(predicate).cloned().unwrap_or_default()
    }

    fn describing_predicates(&self) -> BTreeSet<String> {
        self.describing.clone()
    }

    fn describing_predicates_of(&self, entity: &str) -> EcoResult<BTreeSet<String>> {
        let Some((store, options)) = &self.store else {
            return Ok(self.describing.clone());
        };
        let rows = store.query(
            &format!("SELECT DISTINCT ?p WHERE {{ GRAPH <{entity}> {{ ?s ?p ?o }} }}"),
            options,
        )?;
        let mut used = BTreeSet::new();
        for row in &rows {
            let row = PredicateRow::try_from(row)?;
            if self.describing.contains(&row.predicate) {
                used.insert(row.predicate);
            }
        }
        Ok(used)
    }

    fn is_type_reachable(&self, source: &str, target: &str) -> bool {
        match (self.node_index.get(source), self.node_index.get(target)) {
            (Some(&from), Some(&to)) => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }
}

impl std::fmt::Debug for SchemaCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCatalog")
            .field("types", &self.types.len())
            .field("properties", &self.domains.len())
            .field("store", &self.store.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        [[type]]
        id = "http://example.org/Thing"

        [[type]]
        id = "http://example.org/Sensor"
        super = ["http://example.org/Thing"]

        [[type]]
        id = "http://example.org/Thermometer"
        super = ["http://example.org/Sensor"]

        [[type]]
        id = "http://example.org/Platform"

        [[property]]
        id = "http://example.org/hosts"
        domain = ["http://example.org/Platform"]
        range = ["http://example.org/Sensor"]

        [[property]]
        id = "http://example.org/hasValue"
        domain = ["http://example.org/Sensor"]
        describing = true
    "#;

    fn ex(name: &str) -> String {
        format!("http://example.org/{name}")
    }

    #[test]
    fn closures_are_transitive_and_dual() {
        let catalog = SchemaCatalog::from_toml_str(SCHEMA).unwrap();
        let thermo = catalog.get_type(&ex("Thermometer")).unwrap();
        assert!(thermo.super_types.contains(&ex("Sensor")));
        assert!(thermo.super_types.contains(&ex("Thing")));
        let thing = catalog.get_type(&ex("Thing")).unwrap();
        assert!(thing.sub_types.contains(&ex("Thermometer")));
        assert!(thing.super_types.is_empty());
    }

    #[test]
    fn unknown_type_is_an_error() {
        let catalog = SchemaCatalog::from_toml_str(SCHEMA).unwrap();
        assert!(matches!(
            catalog.get_type(&ex("Nope")),
            Err(CatalogError::UnknownType { .. })
        ));
        assert!(!catalog.contains(&ex("Nope")));
    }

    #[test]
    fn reachability_follows_subsumption_and_properties() {
        let catalog = SchemaCatalog::from_toml_str(SCHEMA).unwrap();
        assert!(catalog.is_type_reachable(&ex("Thermometer"), &ex("Sensor")));
        assert!(catalog.is_type_reachable(&ex("Platform"), &ex("Sensor")));
        assert!(!catalog.is_type_reachable(&ex("Sensor"), &ex("Thermometer")));
        assert!(!catalog.is_type_reachable(&ex("Sensor"), &ex("Nope")));
    }

    #[test]
    fn describing_predicates_without_store_fall_back_to_global() {
        let catalog = SchemaCatalog::from_toml_str(SCHEMA).unwrap();
        assert_eq!(catalog.property_domain(&ex("hasValue")), BTreeSet::from([ex("Sensor")]));
        assert_eq!(
            catalog.describing_predicates_of(&ex("t1")).unwrap(),
            BTreeSet::from([ex("hasValue")])
        );
    }

    #[test]
    fn undeclared_supertype_is_inconsistent() {
        let doc = SchemaDocument {
            types: vec![TypeSpec {
                id: ex("A"),
                supers: vec![ex("B")],
            }],
            properties: vec![],
        };
        assert!(matches!(
            SchemaCatalog::from_document(&doc),
            Err(CatalogError::Inconsistent { .. })
        ));
    }

    #[test]
    fn chained_document_builds_same_catalog_as_toml() {
        let built = SchemaDocument::new()
            .with_type(ex("Thing"), Vec::<String>::new())
            .with_type(ex("Sensor"), [ex("Thing")])
            .with_property(PropertySpec {
                id: ex("hasValue"),
                domain: vec![ex("Sensor")],
                range: vec![],
                describing: true,
            })
            .build()
            .unwrap();
        assert_eq!(built.all_types(), BTreeSet::from([ex("Sensor"), ex("Thing")]));
        assert!(built.get_type(&ex("Thing")).unwrap().sub_types.contains(&ex("Sensor")));
        assert_eq!(built.describing_predicates(), BTreeSet::from([ex("hasValue")]));

        let broken = SchemaDocument::new().with_type(ex("A"), [ex("Missing")]).build();
        assert!(matches!(broken, Err(CatalogError::Inconsistent { .. })));
    }

    #[test]
    fn cyclic_supertypes_terminate() {
        let doc = SchemaDocument {
            types: vec![
                TypeSpec { id: ex("A"), supers: vec![ex("B")] },
                TypeSpec { id: ex("B"), supers: vec![ex("A")] },
            ],
            properties: vec![],
        };
        let catalog = SchemaCatalog::from_document(&doc).unwrap();
        let a = catalog.get_type(&ex("A")).unwrap();
        assert_eq!(a.super_types, BTreeSet::from([ex("B")]));
        assert_eq!(a.sub_types, BTreeSet::from([ex("B")]));
    }
}
