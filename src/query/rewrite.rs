//! Rewriting a query into description-graph sub-queries.
//!
//! Only triple patterns whose predicate *describes* a thing survive the rewrite;
//! `rdf:type` is never one of them, since typing is handled by the reachability
//! stage. Each surviving BGP becomes one sub-query, carrying along the filters of
//! the variables it binds.

use std::collections::BTreeSet;

use super::{Bgp, ExtractedPatterns, RDF_TYPE, predicate_iri};

/// Variable projected by graph-scoped sub-queries.
pub const GRAPH_VAR: &str = "_graph";

/// Turn every BGP into `(triple block, filter clause)` restricted to predicates in `mask`.
///
/// BGPs left without any describing pattern are skipped. The filter clause is empty
/// when none of the kept variables is filtered.
pub fn describing_patterns<'a>(
    patterns: &'a ExtractedPatterns,
    mut mask: BTreeSet<String>,
) -> impl Iterator<Item = (String, String)> + 'a {
    mask.remove(RDF_TYPE);
    patterns.bgps.iter().filter_map(move |bgp| {
        let kept: Vec<_> = bgp
            .triples
            .iter()
            .filter(|tp| predicate_iri(tp).is_some_and(|p| mask.contains(p)))
            .collect();
        if kept.is_empty() {
            return None;
        }

        let clauses: BTreeSet<&str> = Bgp::variables_of(kept.iter().copied())
            .iter()
            .filter_map(|v| patterns.filters.get(v))
            .flatten()
            .map(String::as_str)
            .collect();
        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!(
                "FILTER({})",
                clauses.into_iter().collect::<Vec<_>>().join(" && ")
            )
        };

        let block = kept
            .iter()
            .map(|tp| tp.to_string())
            .collect::<Vec<_>>()
            .join(" .\n");
        Some((block, filter))
    })
}

/// Sub-queries testing whether the named graph of `entity` satisfies the query.
///
/// `predicates` is the entity's own set of describing predicates.
pub fn per_candidate_queries<'a>(
    entity: &'a str,
    patterns: &'a ExtractedPatterns,
    predicates: BTreeSet<String>,
) -> impl Iterator<Item = String> + 'a {
    describing_patterns(patterns, predicates).map(move |(block, filter)| {
        format!("SELECT DISTINCT * WHERE {{ GRAPH <{entity}> {{ {block} {filter} }} }}")
    })
}

/// Sub-queries asking which named graphs structurally match the query.
///
/// `predicates` is the catalog-wide set of describing predicates.
pub fn graph_scoped_queries<'a>(
    patterns: &'a ExtractedPatterns,
    predicates: BTreeSet<String>,
) -> impl Iterator<Item = String> + 'a {
    describing_patterns(patterns, predicates).map(|(block, filter)| {
        format!("SELECT DISTINCT ?{GRAPH_VAR} WHERE {{ GRAPH ?{GRAPH_VAR} {{ {block} {filter} }} }}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::extract::{decompose, parse_query};

    const EX: &str = "http://example.org/";

    fn patterns(text: &str) -> ExtractedPatterns {
        decompose(&parse_query(text).unwrap())
    }

    fn mask(preds: &[&str]) -> BTreeSet<String> {
        preds.iter().map(|p| format!("{EX}{p}")).collect()
    }

    #[test]
    fn candidate_query_embeds_filter() {
        let p = patterns(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?x a ex:Sensor . ?x ex:hasValue ?v FILTER(?v > 10) }",
        );
        let queries: Vec<_> =
            per_candidate_queries("http://example.org/t1", &p, mask(&["hasValue"])).collect();
        assert_eq!(queries.len(), 1);
        let q = &queries[0];
        assert!(q.contains("GRAPH <http://example.org/t1>"));
        assert!(q.contains("<http://example.org/hasValue>"));
        assert!(q.contains("FILTER("));
        assert!(q.contains("?v"));
        assert!(q.contains('>'));
        assert!(!q.contains("Sensor"));
        assert!(parse_query(q).is_ok());
    }

    #[test]
    fn rdf_type_never_survives() {
        let p = patterns(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?x a ex:Sensor }",
        );
        let mut preds = mask(&["hasValue"]);
        preds.insert(RDF_TYPE.to_string());
        assert_eq!(per_candidate_queries("http://example.org/t1", &p, preds).count(), 0);
    }

    #[test]
    fn unrelated_filters_are_left_out() {
        let p = patterns(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?x ex:hasValue ?v . ?x ex:label ?l FILTER(?l != \"x\") }",
        );
        let blocks: Vec<_> = describing_patterns(&p, mask(&["hasValue"])).collect();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].1.is_empty());
    }

    #[test]
    fn exists_filter_follows_its_variables() {
        let p = patterns(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE { ?x ex:hasValue ?v FILTER NOT EXISTS { ?x ex:label ?l } }",
        );
        let queries: Vec<_> =
            per_candidate_queries("http://example.org/t1", &p, mask(&["hasValue"])).collect();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("EXISTS"));
        assert!(parse_query(&queries[0]).is_ok());
    }

    #[test]
    fn one_query_per_describing_bgp() {
        let p = patterns(
            "PREFIX ex: <http://example.org/>
             SELECT * WHERE {
                { ?x ex:hasValue ?v } UNION { ?x ex:unit ?u } UNION { ?x a ex:Sensor }
             }",
        );
        let queries: Vec<_> = graph_scoped_queries(&p, mask(&["hasValue", "unit"])).collect();
        assert_eq!(queries.len(), 2);
        for q in &queries {
            assert!(q.starts_with("SELECT DISTINCT ?_graph"));
            assert!(parse_query(q).is_ok());
        }
    }
}
