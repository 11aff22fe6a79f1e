//! Flattened root-node search index derivation.

use std::collections::HashSet;

use exposure_core::SearchIndexEntry;

/// Deduplicate entries on `(protocol, chain, id)` and order them by display
/// name for stable lookup output.
pub fn dedupe_and_sort(mut entries: Vec<SearchIndexEntry>) -> Vec<SearchIndexEntry> {
    let mut seen = HashSet::new();
    entries.retain(|entry| {
        seen.insert((
            entry.protocol.clone(),
            entry.chain.clone(),
            entry.id.clone(),
        ))
    });
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}
