//! Thing search: candidates of a root type recorded in the knowledge base.
//!
//! Candidates are the members of known ecosystems and the subjects of known
//! thing descriptions. A candidate survives when one of its catalogued types is
//! the root type or reaches it, and, unless only reachability is asked for, when
//! its own description graph satisfies every describing sub-query of the query.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CatalogError, EcoResult};
use crate::query::{QueryInput, extract_bgps, per_candidate_queries};
use crate::store::ThingTypeRow;
use crate::types::{TypeDescriptor, is_target_reachable};

use super::{DiscoveryContext, Discoverer};

const RDFS_RESOURCE: &str = "http://www.w3.org/2000/01/rdf-schema#Resource";

/// Resolved types of one thing, keyed by type IRI.
pub type ThingTypes = BTreeMap<String, TypeDescriptor>;

/// Thing IRI → resolved types.
pub type ThingMap = BTreeMap<String, ThingTypes>;

/// How strictly candidates are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Type reachability plus a structural check of each description graph.
    #[default]
    Full,
    /// Type reachability only.
    ReachabilityOnly,
}

impl Discoverer {
    fn candidates_query(&self) -> String {
        let c = &self.config;
        format!(
            "SELECT DISTINCT ?s ?type WHERE {{
                {{ [] a <{eco}> ; <{has}> ?s }}
                UNION
                {{ [] a <{td}> ; <{describes}> ?s }}
                ?s a ?type
                FILTER(isIRI(?type) && isIRI(?s) && ?type != <{RDFS_RESOURCE}>)
            }}",
            eco = c.ecosystem_class,
            has = c.has_component,
            td = c.description_class,
            describes = c.describes,
        )
    }

    /// Asserted types of every recorded thing.
    fn typed_candidates(&self) -> EcoResult<BTreeMap<String, BTreeSet<String>>> {
        let rows = self
            .store
            .query(&self.candidates_query(), &self.query_options(self.config.infer))?;
        let mut candidates: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in &rows {
            let row = ThingTypeRow::try_from(row)?;
            candidates.entry(row.thing).or_default().insert(row.type_id);
        }
        Ok(candidates)
    }

    /// Describe the catalogued subset of a candidate's asserted types.
    fn resolve_candidate(&self, thing: &str, asserted: &BTreeSet<String>) -> Result<ThingTypes, CatalogError> {
        let mut types = ThingTypes::new();
        for t in asserted.iter().filter(|t| self.catalog.contains(t)) {
            let desc = self
                .catalog
                .get_type(t)
                .map_err(|e| CatalogError::CandidateResolution {
                    entity: thing.to_string(),
                    message: e.to_string(),
                })?;
            types.insert(t.clone(), desc);
        }
        Ok(types)
    }

    /// Whether every describing sub-query of the query has a solution in `thing`'s graph.
    pub fn contains_solutions(
        &self,
        thing: &str,
        input: QueryInput<'_>,
        ctx: &mut DiscoveryContext,
    ) -> EcoResult<bool> {
        let patterns = extract_bgps(input, &mut ctx.bgp_cache)?;
        let predicates = self.catalog.describing_predicates_of(thing)?;
        let options = self.query_options(false);
        for sub_query in per_candidate_queries(thing, &patterns, predicates) {
            if self.store.query(&sub_query, &options)?.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Things of `root_type` (or reaching it) recorded in the knowledge base.
    pub fn search_things(
        &self,
        root_type: &TypeDescriptor,
        input: QueryInput<'_>,
        mode: SearchMode,
        ctx: &mut DiscoveryContext,
    ) -> EcoResult<ThingMap> {
        let target = root_type.id.as_str();
        let mut reachable = ThingMap::new();
        for (thing, asserted) in self.typed_candidates()? {
            let types = match self.resolve_candidate(&thing, &asserted) {
                Ok(types) => types,
                Err(e) => {
                    tracing::debug!(error = %e, "dropping candidate");
                    continue;
                }
            };
            if types.is_empty() {
                continue;
            }
            if types.contains_key(target)
                || is_target_reachable(
                    self.catalog.as_ref(),
                    types.keys().map(String::as_str),
                    target,
                    &mut ctx.reachability,
                )
            {
                reachable.insert(thing, types);
            }
        }

        if mode == SearchMode::ReachabilityOnly {
            return Ok(reachable);
        }

        let mut verified = ThingMap::new();
        for (thing, types) in reachable {
            if self.contains_solutions(&thing, input, ctx)? {
                verified.insert(thing, types);
            }
        }
        Ok(verified)
    }
}
