use crate::models::{FamilyProfile, Variant};

/// Picks the single variant worth a focused watch: a target that just came
/// back in stock, lowest priority value first. Ties go to the lowest id.
pub fn select_target(profile: &FamilyProfile) -> Option<&Variant> {
    profile
        .variants
        .values()
        .filter(|v| v.target && v.alert)
        .min_by_key(|v| v.priority)
}
