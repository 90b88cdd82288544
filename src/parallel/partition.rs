//! Grouping of work items into dispatch units
//!
//! Items are scanned once in submission order. Each item is bucketed by its
//! group key (or a synthesized per-item key when it has none); a unit is
//! created the first time its key is seen and appended to afterwards. Units
//! come out in first-occurrence order, so the partition is stable across runs.

use std::collections::HashMap;

use crate::models::{GroupingMode, ResolvedGroup, WorkItem};

/// Bucket key: a resolved group, or the position of an item with no group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PartitionKey {
    Group(ResolvedGroup),
    Solo(usize),
}

/// Smallest batch handed to one worker
///
/// Holds submission positions into the item slice the partition was built
/// from, in submission order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchUnit {
    group_key: Option<String>,
    positions: Vec<usize>,
}

impl DispatchUnit {
    fn single(position: usize) -> Self {
        Self {
            group_key: None,
            positions: vec![position],
        }
    }

    fn group(key: String, position: usize) -> Self {
        Self {
            group_key: Some(key),
            positions: vec![position],
        }
    }

    pub fn group_key(&self) -> Option<&str> {
        self.group_key.as_deref()
    }

    pub fn is_grouped(&self) -> bool {
        self.group_key.is_some()
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Split items into dispatch units
///
/// With grouping off every item is its own unit. With grouping on, items
/// sharing a resolved group key land in one unit in their original relative
/// order.
pub fn partition(items: &[WorkItem], grouping: GroupingMode) -> Vec<DispatchUnit> {
    if !grouping.is_enabled() {
        return (0..items.len()).map(DispatchUnit::single).collect();
    }

    let mut units: Vec<DispatchUnit> = Vec::new();
    let mut unit_index: HashMap<PartitionKey, usize> = HashMap::new();

    for (position, item) in items.iter().enumerate() {
        let key = match item.resolve_group_key(grouping) {
            Some(group) => PartitionKey::Group(group),
            None => PartitionKey::Solo(position),
        };

        match unit_index.get(&key) {
            Some(&index) => units[index].positions.push(position),
            None => {
                let unit = match &key {
                    PartitionKey::Group(group) => {
                        DispatchUnit::group(group.key().to_string(), position)
                    }
                    PartitionKey::Solo(_) => DispatchUnit::single(position),
                };
                unit_index.insert(key, units.len());
                units.push(unit);
            }
        }
    }

    let grouped = units.iter().filter(|unit| unit.is_grouped()).count();
    tracing::info!(
        "Grouped {} items into {} dispatch units ({} {} groups)",
        items.len(),
        units.len(),
        grouped,
        grouping
    );

    units
}
