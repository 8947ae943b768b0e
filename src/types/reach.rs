//! Memoized type reachability.

use std::collections::HashMap;

use crate::catalog::TypeCatalog;

/// `(source, target) → reachable` memo table.
///
/// Owned by one discovery request and passed down explicitly; share it across
/// requests only under external synchronization.
#[derive(Debug, Default, Clone)]
pub struct ReachabilityCache {
    entries: HashMap<(String, String), bool>,
    probes: usize,
}

impl ReachabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached answer for a pair, if any.
    pub fn get(&self, source: &str, target: &str) -> Option<bool> {
        self.entries
            .get(&(source.to_string(), target.to_string()))
            .copied()
    }

    /// Number of times the catalog primitive was actually invoked.
    pub fn probes(&self) -> usize {
        self.probes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether `target` is reachable from any of `sources`, probed in order.
///
/// Stops at the first hit. A memoized `false` only settles its own pair, so the
/// remaining sources are still examined.
pub fn is_target_reachable<'a, C>(
    catalog: &C,
    sources: impl IntoIterator<Item = &'a str>,
    target: &str,
    cache: &mut ReachabilityCache,
) -> bool
where
    C: TypeCatalog + ?Sized,
{
    for source in sources {
        let connected = match cache.get(source, target) {
            Some(known) => known,
            None => {
                cache.probes += 1;
                let connected = catalog.is_type_reachable(source, target);
                cache
                    .entries
                    .insert((source.to_string(), target.to_string()), connected);
                connected
            }
        };
        if connected {
            return true;
        }
    }
    false
}
