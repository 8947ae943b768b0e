//! Root type inference.
//!
//! The roots of a BGP are its independent entry points: subjects that no other
//! part of the pattern points at. On the pattern's subject→object graph these are
//! the members of strongly connected components without incoming edges, which
//! also yields entry points for cyclic patterns.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use spargebra::term::{TermPattern, TriplePattern};

use crate::catalog::TypeCatalog;
use crate::error::{DiscoveryError, EcoResult};
use crate::query::{Bgp, BgpCache, QueryInput, RDF_TYPE, extract_bgps, predicate_iri};

use super::{RootTypeSet, keep_general};

/// Node key of a term; literals never become nodes.
fn term_key(term: &TermPattern) -> Option<String> {
    match term {
        TermPattern::Literal(_) => None,
        other => Some(other.to_string()),
    }
}

/// Subjects of `bgp` that are entry points of the pattern.
pub fn bgp_roots(bgp: &Bgp) -> BTreeSet<String> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
    let mut subjects = BTreeSet::new();
    let mut node = |graph: &mut DiGraph<String, ()>, key: String| {
        *nodes
            .entry(key.clone())
            .or_insert_with(|| graph.add_node(key))
    };

    for tp in &bgp.triples {
        let Some(s) = term_key(&tp.subject) else {
            continue;
        };
        subjects.insert(s.clone());
        let from = node(&mut graph, s);
        if let Some(o) = term_key(&tp.object) {
            let to = node(&mut graph, o);
            graph.add_edge(from, to, ());
        }
    }

    let components = tarjan_scc(&graph);
    let mut component_of = vec![0usize; graph.node_count()];
    for (c, members) in components.iter().enumerate() {
        for n in members {
            component_of[n.index()] = c;
        }
    }
    let mut entered = vec![false; components.len()];
    for edge in graph.edge_references() {
        let (from, to) = (component_of[edge.source().index()], component_of[edge.target().index()]);
        if from != to {
            entered[to] = true;
        }
    }

    graph
        .node_indices()
        .filter(|n| !entered[component_of[n.index()]])
        .map(|n| graph[n].clone())
        .filter(|key| subjects.contains(key))
        .collect()
}

/// Concrete catalog types the roots of `bgp` must belong to.
///
/// A root's explicit `rdf:type` constraints win; a root without any known type
/// falls back to the common domain of the properties it uses.
pub fn bgp_root_types<C: TypeCatalog + ?Sized>(catalog: &C, bgp: &Bgp) -> BTreeSet<String> {
    let mut root_types = BTreeSet::new();
    for root in bgp_roots(bgp) {
        let root_tps: Vec<&TriplePattern> = bgp
            .triples
            .iter()
            .filter(|tp| term_key(&tp.subject).as_deref() == Some(root.as_str()))
            .collect();

        let explicit: BTreeSet<String> = root_tps
            .iter()
            .filter(|tp| predicate_iri(tp) == Some(RDF_TYPE))
            .filter_map(|tp| match &tp.object {
                TermPattern::NamedNode(n) if catalog.contains(n.as_str()) => {
                    Some(n.as_str().to_string())
                }
                _ => None,
            })
            .collect();
        if !explicit.is_empty() {
            root_types.extend(explicit);
            continue;
        }

        // Domains are compared modulo subsumption: each one stands for itself
        // and all of its subtypes.
        let mut common: Option<BTreeSet<String>> = None;
        for p in root_tps.iter().filter_map(|tp| predicate_iri(tp)) {
            if p == RDF_TYPE {
                continue;
            }
            let domain = subsumed_domain(catalog, p);
            if domain.is_empty() {
                continue;
            }
            common = Some(match common {
                Some(acc) => acc.intersection(&domain).cloned().collect(),
                None => domain,
            });
        }
        let candidates: RootTypeSet = common
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| catalog.get_type(&t).ok().map(|desc| (t, desc)))
            .collect();
        root_types.extend(keep_general(&candidates).into_keys());
    }
    root_types
}

/// Catalogued domain types of `predicate` together with all of their subtypes.
fn subsumed_domain<C: TypeCatalog + ?Sized>(catalog: &C, predicate: &str) -> BTreeSet<String> {
    let mut expanded = BTreeSet::new();
    for t in catalog.property_domain(predicate) {
        if let Ok(desc) = catalog.get_type(&t) {
            expanded.extend(desc.sub_types.into_iter().filter(|s| catalog.contains(s)));
            expanded.insert(t);
        }
    }
    expanded
}

/// The most general root types of a query, described by the catalog.
///
/// Fails with [`DiscoveryError::NoRootType`] when nothing can be anchored.
pub fn query_root_types<C: TypeCatalog + ?Sized>(
    catalog: &C,
    input: QueryInput<'_>,
    bgp_cache: &mut BgpCache,
) -> EcoResult<RootTypeSet> {
    let patterns = extract_bgps(input, bgp_cache)?;
    let ids = patterns
        .bgps
        .iter()
        .fold(BTreeSet::new(), |mut acc, bgp| {
            acc.extend(bgp_root_types(catalog, bgp));
            acc
        });

    let mut described = RootTypeSet::new();
    for id in ids {
        let desc = catalog.get_type(&id)?;
        described.insert(id, desc);
    }
    let general = keep_general(&described);
    tracing::debug!(
        inferred = described.len(),
        general = general.len(),
        "reduced query root types"
    );

    if general.is_empty() {
        return Err(DiscoveryError::NoRootType.into());
    }
    Ok(general)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaCatalog;
    use crate::error::EcoError;
    use crate::query::extract::{decompose, parse_query};

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
        super = ["http://example.org/Thing"]

        [[property]]
        id = "http://example.org/hosts"
        domain = ["http://example.org/Platform"]
        range = ["http://example.org/Sensor"]

        [[property]]
        id = "http://example.org/hasValue"
        domain = ["http://example.org/Sensor"]
        describing = true

        [[property]]
        id = "http://example.org/name"
        domain = ["http://example.org/Thing"]
    "#;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::from_toml_str(SCHEMA).unwrap()
    }

    fn first_bgp(text: &str) -> Bgp {
        decompose(&parse_query(text).unwrap()).bgps.remove(0)
    }

    fn ex(name: &str) -> String {
        format!("http://example.org/{name}")
    }

    #[test]
    fn roots_exclude_pointed_at_subjects() {
        let bgp = first_bgp(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?p ex:hosts ?s . ?s a ex:Sensor }",
        );
        assert_eq!(bgp_roots(&bgp), BTreeSet::from(["?p".to_string()]));
    }

    #[test]
    fn cyclic_pattern_still_has_roots() {
        let bgp = first_bgp(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?a ex:p ?b . ?b ex:p ?a }",
        );
        assert_eq!(bgp_roots(&bgp).len(), 2);
    }

    #[test]
    fn explicit_type_anchors_root() {
        let bgp = first_bgp(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?x a ex:Thermometer ; ex:hasValue ?v }",
        );
        assert_eq!(bgp_root_types(&catalog(), &bgp), BTreeSet::from([ex("Thermometer")]));
    }

    #[test]
    fn property_domain_anchors_untyped_root() {
        let bgp = first_bgp(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?x ex:hasValue ?v }",
        );
        assert_eq!(bgp_root_types(&catalog(), &bgp), BTreeSet::from([ex("Sensor")]));
    }

    #[test]
    fn domains_at_different_levels_meet_at_the_narrower_type() {
        let bgp = first_bgp(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?x ex:hasValue ?v ; ex:name ?n }",
        );
        assert_eq!(bgp_root_types(&catalog(), &bgp), BTreeSet::from([ex("Sensor")]));

        let mut cache = BgpCache::new();
        let text = "PREFIX ex: <http://example.org/>
            SELECT * WHERE { ?x ex:hasValue ?v ; ex:name ?n }";
        let roots = query_root_types(&catalog(), text.into(), &mut cache).unwrap();
        assert_eq!(roots.keys().cloned().collect::<Vec<_>>(), vec![ex("Sensor")]);
    }

    #[test]
    fn single_domain_keeps_its_most_general_type() {
        let bgp = first_bgp(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?x ex:name ?n }",
        );
        assert_eq!(bgp_root_types(&catalog(), &bgp), BTreeSet::from([ex("Thing")]));
    }

    #[test]
    fn disjoint_domains_anchor_nothing() {
        let bgp = first_bgp(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?x ex:hasValue ?v ; ex:hosts ?s }",
        );
        assert!(bgp_root_types(&catalog(), &bgp).is_empty());
    }

    #[test]
    fn nested_types_are_not_roots() {
        let bgp = first_bgp(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?p a ex:Platform ; ex:hosts ?s . ?s a ex:Thermometer }",
        );
        assert_eq!(bgp_root_types(&catalog(), &bgp), BTreeSet::from([ex("Platform")]));
    }

    #[test]
    fn query_root_types_keeps_general_members() {
        let text = "PREFIX ex: <http://example.org/>
            SELECT * WHERE { { ?x a ex:Thermometer } UNION { ?y a ex:Sensor } UNION { ?z a ex:Platform } }";
        let mut cache = BgpCache::new();
        let roots = query_root_types(&catalog(), text.into(), &mut cache).unwrap();
        assert_eq!(
            roots.keys().cloned().collect::<Vec<_>>(),
            vec![ex("Platform"), ex("Sensor")]
        );
        assert!(roots[&ex("Sensor")].sub_types.contains(&ex("Thermometer")));
    }

    #[test]
    fn unanchored_query_fails() {
        let text = "PREFIX ex: <http://example.org/>
            SELECT * WHERE { ?x a ex:Unknown ; ex:label ?l }";
        let mut cache = BgpCache::new();
        let err = query_root_types(&catalog(), text.into(), &mut cache).unwrap_err();
        assert!(matches!(err, EcoError::Discovery(DiscoveryError::NoRootType)));
    }
}
