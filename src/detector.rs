use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::models::{FamilyProfile, SearchHit};

/// True only for an out-of-stock to in-stock flip.
pub fn detect_transition(previous: bool, current: bool) -> bool {
    !previous && current
}

/// What one merge of search results changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub updated: usize,
    pub missing: usize,
    /// Ids of the variants that just came back in stock, in id order.
    pub transitions: Vec<String>,
}

/// Merges a cycle's parsed hits (keyed by variant name) into the profile and
/// recomputes every `alert` flag.
///
/// A variant missing from the hits is out of stock; its other fields are kept.
pub fn apply_search_results(
    profile: &mut FamilyProfile,
    hits: &HashMap<String, SearchHit>,
    now: DateTime<Utc>,
) -> DiffSummary {
    let mut summary = DiffSummary::default();

    for variant in profile.variants.values_mut() {
        let previous = variant.stock;

        match hits.get(variant.name.trim()) {
            Some(hit) => {
                variant.stock = hit.stock;
                variant.price = hit.price;
                if !hit.url.is_empty() {
                    variant.url = hit.url.clone();
                }
                variant.time_updated = Some(now);
                summary.updated += 1;
            }
            None => {
                variant.stock = false;
                summary.missing += 1;
            }
        }

        variant.alert = detect_transition(previous, variant.stock);
        if variant.alert {
            summary.transitions.push(variant.id.clone());
        }
    }

    profile.time_updated = Some(now);
    summary
}
