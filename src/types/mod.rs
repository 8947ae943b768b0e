//! Type-lattice reasoning over catalog types.
//!
//! - [`reduce`]: general-only / specific-only reductions of a type set
//! - [`infer`]: root types of a query's entry variables
//! - [`reach`]: memoized type-to-type reachability

pub mod infer;
pub mod reach;
pub mod reduce;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub use infer::{bgp_root_types, query_root_types};
pub use reach::{ReachabilityCache, is_target_reachable};
pub use reduce::{keep_general, keep_specific};

/// A catalog type with its super- and subtypes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Type IRI.
    pub id: String,
    /// All supertypes (transitive, excluding the type itself).
    #[serde(rename = "super")]
    pub super_types: BTreeSet<String>,
    /// All subtypes (transitive, excluding the type itself).
    #[serde(rename = "sub")]
    pub sub_types: BTreeSet<String>,
}

impl TypeDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            super_types: BTreeSet::new(),
            sub_types: BTreeSet::new(),
        }
    }

    pub fn with_super<I, S>(mut self, supers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.super_types.extend(supers.into_iter().map(Into::into));
        self
    }

    pub fn with_sub<I, S>(mut self, subs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_types.extend(subs.into_iter().map(Into::into));
        self
    }
}

/// Type IRI → descriptor, ordered by IRI.
pub type RootTypeSet = BTreeMap<String, TypeDescriptor>;
