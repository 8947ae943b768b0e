//! Pure reductions of a type set to its most general or most specific members.

use std::collections::BTreeSet;

use super::RootTypeSet;

/// Keep a type only if none of its supertypes is also in the set.
pub fn keep_general(types: &RootTypeSet) -> RootTypeSet {
    let ids: BTreeSet<&str> = types.keys().map(String::as_str).collect();
    types
        .iter()
        .filter(|(_, t)| t.super_types.iter().all(|s| !ids.contains(s.as_str())))
        .map(|(id, t)| (id.clone(), t.clone()))
        .collect()
}

/// Keep a type if it has supertypes none of which is in the set, or if none of
/// its subtypes is in the set.
///
/// Not used on the discovery path; callers that want the narrowest anchors of a
/// set choose this policy explicitly.
pub fn keep_specific(types: &RootTypeSet) -> RootTypeSet {
    let ids: BTreeSet<&str> = types.keys().map(String::as_str).collect();
    let absent = |set: &BTreeSet<String>| set.iter().all(|x| !ids.contains(x.as_str()));
    types
        .iter()
        .filter(|(_, t)| {
            (!t.super_types.is_empty() && absent(&t.super_types)) || absent(&t.sub_types)
        })
        .map(|(id, t)| (id.clone(), t.clone()))
        .collect()
}
