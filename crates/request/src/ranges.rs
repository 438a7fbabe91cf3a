use crate::error::RequestError;
use core_types::{CustomRange, RangeSetting};
use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

/// The active custom ranges of one query, keyed by slot label.
///
/// Only [`resolve_ranges`] creates this type, so holding one proves at least
/// one range is active.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRanges(BTreeMap<String, RangeSetting>);

impl ResolvedRanges {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&RangeSetting> {
        self.0.get(label)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, RangeSetting> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, RangeSetting> {
        self.0
    }
}

/// Turns the analyst's range toggles into the `custom_ranges` mapping of a
/// query.
///
/// A range is kept only when it is enabled and its center is above zero; the
/// 24-unit span around the center is applied by the analytics service, not
/// here. Labels must be unique across the input.
pub fn resolve_ranges(ranges: &[CustomRange]) -> Result<ResolvedRanges, RequestError> {
    let mut seen = BTreeSet::new();
    let mut resolved = BTreeMap::new();

    for range in ranges {
        let label = range.slot.label();
        if !seen.insert(label.clone()) {
            return Err(RequestError::DuplicateRange(label));
        }

        if !range.is_active() {
            tracing::debug!(range = %label, enabled = range.enabled, center = range.center, "Skipping inactive range.");
            continue;
        }

        resolved.insert(
            label,
            RangeSetting {
                enabled: true,
                value: range.center,
            },
        );
    }

    if resolved.is_empty() {
        return Err(RequestError::NoActiveRange);
    }

    Ok(ResolvedRanges(resolved))
}
