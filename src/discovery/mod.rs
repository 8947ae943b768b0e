//! Discovery orchestrator: query → root types → things → ecosystem description.
//!
//! A request runs in five stages, each completing before the next begins:
//!
//! 1. infer the query's most general root types (fails with `NoRootType`)
//! 2. search the knowledge base for things of each root type
//! 3. narrow them to the things whose description graphs match the query
//! 4. build one component per root thing against a shared [`NodeMap`]
//! 5. compose the components into a [`ThingEcosystemDescription`]
//!
//! Memo tables live in a [`DiscoveryContext`] owned by the caller, so request
//! isolation follows from ownership.

pub mod search;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::catalog::TypeCatalog;
use crate::compose::{EcosystemComposer, GraphComposer, NodeMap, ThingEcosystemDescription};
use crate::config::DiscoveryConfig;
use crate::error::EcoResult;
use crate::query::{BgpCache, QueryInput, extract_bgps, graph_scoped_queries};
use crate::store::{GraphRow, QueryOptions, TripleStore};
use crate::types::{ReachabilityCache, RootTypeSet, query_root_types};

pub use search::{SearchMode, ThingMap, ThingTypes};

/// Request-scoped memo tables.
#[derive(Debug, Default)]
pub struct DiscoveryContext {
    pub bgp_cache: BgpCache,
    pub reachability: ReachabilityCache,
}

impl DiscoveryContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Runs discovery requests against a catalog, a store and a composer.
pub struct Discoverer {
    catalog: Arc<dyn TypeCatalog>,
    store: Arc<dyn TripleStore>,
    composer: Arc<dyn EcosystemComposer>,
    config: DiscoveryConfig,
}

impl Discoverer {
    pub fn new(
        catalog: Arc<dyn TypeCatalog>,
        store: Arc<dyn TripleStore>,
        composer: Arc<dyn EcosystemComposer>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            composer,
            config,
        }
    }

    /// Discoverer composing from the description graphs of `store`.
    pub fn with_graph_composer(
        catalog: Arc<dyn TypeCatalog>,
        store: Arc<dyn TripleStore>,
        config: DiscoveryConfig,
    ) -> Self {
        let composer = Arc::new(GraphComposer::new(Arc::clone(&store), &config));
        Self::new(catalog, store, composer, config)
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub(crate) fn query_options(&self, infer: bool) -> QueryOptions {
        QueryOptions {
            cache: true,
            expiry: self.config.expiry(),
            infer,
        }
    }

    /// Most general root types of the query.
    pub fn root_types(&self, input: QueryInput<'_>, ctx: &mut DiscoveryContext) -> EcoResult<RootTypeSet> {
        query_root_types(self.catalog.as_ref(), input, &mut ctx.bgp_cache)
    }

    /// Named graphs that structurally match the query's describing patterns.
    ///
    /// `None` when the query has no describing pattern at all, in which case it
    /// cannot narrow the candidates.
    pub fn matching_graphs(
        &self,
        input: QueryInput<'_>,
        ctx: &mut DiscoveryContext,
    ) -> EcoResult<Option<BTreeSet<String>>> {
        let patterns = extract_bgps(input, &mut ctx.bgp_cache)?;
        let queries: Vec<String> =
            graph_scoped_queries(&patterns, self.catalog.describing_predicates()).collect();
        if queries.is_empty() {
            return Ok(None);
        }

        let options = self.query_options(false);
        let mut graphs = BTreeSet::new();
        for q in &queries {
            for row in self.store.query(q, &options)? {
                graphs.insert(GraphRow::try_from(&row)?.graph);
            }
        }
        Ok(Some(graphs))
    }

    /// Stages 1 to 3: the root things of the query's ecosystem.
    pub fn root_things(
        &self,
        input: QueryInput<'_>,
        mode: SearchMode,
        ctx: &mut DiscoveryContext,
    ) -> EcoResult<BTreeSet<String>> {
        let root_types = self.root_types(input, ctx)?;
        tracing::debug!(
            root_types = ?root_types.keys().collect::<Vec<_>>(),
            "searching for relevant things"
        );

        let mut typed_things = BTreeSet::new();
        for root_type in root_types.values() {
            let found = self.search_things(root_type, input, mode, ctx)?;
            tracing::debug!(root_type = %root_type.id, things = found.len(), "found things");
            typed_things.extend(found.into_keys());
        }

        let root_things = match self.matching_graphs(input, ctx)? {
            Some(graphs) => typed_things.intersection(&graphs).cloned().collect(),
            None => typed_things,
        };
        Ok(root_things)
    }

    /// Full discovery of one query text with a fresh context.
    pub fn discover(&self, query: &str, mode: SearchMode) -> EcoResult<ThingEcosystemDescription> {
        self.discover_with(QueryInput::Text(query), mode, &mut DiscoveryContext::new())
    }

    /// Full discovery reusing the caller's memo tables.
    pub fn discover_with(
        &self,
        input: QueryInput<'_>,
        mode: SearchMode,
        ctx: &mut DiscoveryContext,
    ) -> EcoResult<ThingEcosystemDescription> {
        tracing::debug!(query = %input.cache_key(), ?mode, "triggered discovery");
        let root_things = self.root_things(input, mode, ctx)?;
        tracing::info!(count = root_things.len(), "discovered root things");

        let mut nodes = NodeMap::new();
        let mut components = Vec::with_capacity(root_things.len());
        for root in &root_things {
            components.push(self.composer.build_component(root, &mut nodes)?);
        }
        let ted = self.composer.build_ted(components)?;
        tracing::debug!(components = ted.len(), nodes = nodes.len(), "composed ecosystem");
        Ok(ted)
    }
}

impl std::fmt::Debug for Discoverer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discoverer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
