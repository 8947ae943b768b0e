//! Composition of discovered things into a Thing Ecosystem Description (TED).
//!
//! Components are built one root at a time against a shared [`NodeMap`], the
//! request-scoped deduplication context: a node seen by an earlier component
//! is emitted as a [`Fragment::Reference`] instead of being described again.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DiscoveryConfig;
use crate::error::{ComposeError, EcoResult};
use crate::store::{Binding, QueryOptions, StatementRow, TripleStore};

/// Dense identifier of a node within one ecosystem.
pub type NodeId = usize;

/// IRI → node id, shared by every component of one request.
#[derive(Debug, Default, Clone)]
pub struct NodeMap {
    ids: HashMap<String, NodeId>,
}

impl NodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, iri: &str) -> Option<NodeId> {
        self.ids.get(iri).copied()
    }

    /// Id of `iri`, allocating one if needed. The flag is `true` on first sight.
    pub fn intern(&mut self, iri: &str) -> (NodeId, bool) {
        if let Some(&id) = self.ids.get(iri) {
            return (id, false);
        }
        let id = self.ids.len();
        self.ids.insert(iri.to_string(), id);
        (id, true)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One statement about a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub predicate: String,
    pub object: Binding,
}

/// Piece of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    /// First description of a node in this ecosystem.
    Node {
        id: NodeId,
        iri: String,
        properties: Vec<Property>,
    },
    /// A node already described by an earlier fragment.
    Reference { id: NodeId, iri: String },
}

impl Fragment {
    pub fn iri(&self) -> &str {
        match self {
            Fragment::Node { iri, .. } | Fragment::Reference { iri, .. } => iri,
        }
    }
}

/// Description rooted at one discovered thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub root: String,
    pub fragments: Vec<Fragment>,
}

/// The composed ecosystem of one discovery request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingEcosystemDescription {
    components: Vec<Component>,
}

impl ThingEcosystemDescription {
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Root thing of every component.
    pub fn root_ids(&self) -> BTreeSet<String> {
        self.components.iter().map(|c| c.root.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds components and composes them into a TED.
pub trait EcosystemComposer: Send + Sync {
    fn build_component(&self, root: &str, nodes: &mut NodeMap) -> EcoResult<Component>;

    /// Compose components, ordered by root. Rejects two components with the same root.
    fn build_ted(&self, components: Vec<Component>) -> EcoResult<ThingEcosystemDescription> {
        let mut by_root = BTreeMap::new();
        for component in components {
            if by_root.contains_key(&component.root) {
                return Err(ComposeError::DuplicateRoot {
                    root: component.root,
                }
                .into());
            }
            by_root.insert(component.root.clone(), component);
        }
        Ok(ThingEcosystemDescription {
            components: by_root.into_values().collect(),
        })
    }
}

/// Composer reading each root's named description graph from the store.
pub struct GraphComposer {
    store: Arc<dyn TripleStore>,
    options: QueryOptions,
}

impl GraphComposer {
    pub fn new(store: Arc<dyn TripleStore>, config: &DiscoveryConfig) -> Self {
        Self {
            store,
            options: QueryOptions {
                cache: true,
                expiry: config.expiry(),
                infer: false,
            },
        }
    }
}

impl EcosystemComposer for GraphComposer {
    fn build_component(&self, root: &str, nodes: &mut NodeMap) -> EcoResult<Component> {
        let rows = self.store.query(
            &format!("SELECT ?s ?p ?o WHERE {{ GRAPH <{root}> {{ ?s ?p ?o }} }}"),
            &self.options,
        )?;

        let mut subjects: BTreeMap<String, Vec<Property>> = BTreeMap::new();
        subjects.entry(root.to_string()).or_default();
        for row in &rows {
            let st = StatementRow::try_from(row)?;
            subjects.entry(st.subject).or_default().push(Property {
                predicate: st.predicate,
                object: st.object,
            });
        }

        // Root first, then the remaining subjects in IRI order.
        let root_props = subjects.remove(root).unwrap_or_default();
        let mut fragments = Vec::with_capacity(subjects.len() + 1);
        for (iri, properties) in std::iter::once((root.to_string(), root_props)).chain(subjects) {
            let (id, fresh) = nodes.intern(&iri);
            fragments.push(if fresh {
                Fragment::Node { id, iri, properties }
            } else {
                Fragment::Reference { id, iri }
            });
        }

        tracing::debug!(root, fragments = fragments.len(), "built component");
        Ok(Component {
            root: root.to_string(),
            fragments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EcoError;
    use crate::store::OxigraphStore;

    const DATA: &str = r#"
        @prefix ex: <http://example.org/> .
        GRAPH ex:t1 {
            ex:t1 ex:hosts ex:probe .
            ex:probe ex:unit "C" .
        }
        GRAPH ex:t2 {
            ex:t2 ex:hosts ex:probe .
            ex:probe ex:unit "C" .
        }
    "#;

    fn composer() -> GraphComposer {
        let store = OxigraphStore::in_memory().unwrap();
        store.load_trig(DATA.as_bytes()).unwrap();
        GraphComposer::new(Arc::new(store), &DiscoveryConfig::default())
    }

    #[test]
    fn shared_sub_entity_is_described_once() {
        let composer = composer();
        let mut nodes = NodeMap::new();
        let c1 = composer
            .build_component("http://example.org/t1", &mut nodes)
            .unwrap();
        let c2 = composer
            .build_component("http://example.org/t2", &mut nodes)
            .unwrap();

        assert_eq!(c1.fragments[0].iri(), "http://example.org/t1");
        assert!(matches!(c1.fragments[1], Fragment::Node { .. }));
        assert!(matches!(
            &c2.fragments[1],
            Fragment::Reference { iri, .. } if iri == "http://example.org/probe"
        ));
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn undescribed_root_still_has_a_node() {
        let composer = composer();
        let mut nodes = NodeMap::new();
        let c = composer
            .build_component("http://example.org/ghost", &mut nodes)
            .unwrap();
        assert_eq!(c.fragments.len(), 1);
        assert!(matches!(&c.fragments[0], Fragment::Node { properties, .. } if properties.is_empty()));
    }

    #[test]
    fn ted_orders_components_and_rejects_duplicates() {
        let composer = composer();
        let component = |root: &str| Component {
            root: root.into(),
            fragments: vec![],
        };
        let ted = composer
            .build_ted(vec![component("b"), component("a")])
            .unwrap();
        assert_eq!(
            ted.components().iter().map(|c| c.root.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        let err = composer
            .build_ted(vec![component("a"), component("a")])
            .unwrap_err();
        assert!(matches!(err, EcoError::Compose(ComposeError::DuplicateRoot { .. })));
    }

    #[test]
    fn ted_serializes_fragment_kinds() {
        let ted = composer()
            .build_ted(vec![Component {
                root: "a".into(),
                fragments: vec![Fragment::Reference { id: 0, iri: "a".into() }],
            }])
            .unwrap();
        let json = ted.to_json_pretty().unwrap();
        assert!(json.contains("\"kind\": \"reference\""));
    }
}
