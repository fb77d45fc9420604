//! FILENAME: core/pivot-engine/src/cache.rs
//! Pivot Cache - Grouping keys and aggregate accumulators.
//!
//! The cache is built in one pass over the source rows:
//! - Each row's group-by values are normalized into a hashable key
//! - Groups are kept in first-seen order, indexed by key for O(1) lookup
//! - Every group holds one accumulator per measure

use crate::definition::{AggregationType, FieldIndex};
use engine::{CellError, CellValue};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ============================================================================
// GROUP KEYS
// ============================================================================

/// A normalized, hashable representation of a cell value.
/// Text compares case-insensitively, so "East" and "EAST" share a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheValue {
    Empty,
    Number(OrderedFloat),
    Text(String),
    Boolean(bool),
    Error(CellError),
}

impl From<&CellValue> for CacheValue {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => CacheValue::Empty,
            CellValue::Number(n) => CacheValue::Number(OrderedFloat(*n)),
            CellValue::Text(s) => CacheValue::Text(s.to_lowercase()),
            CellValue::Boolean(b) => CacheValue::Boolean(*b),
            CellValue::Error(e) => CacheValue::Error(*e),
        }
    }
}

/// Wrapper around f64 that implements Eq and Hash for use as map keys.
/// NaN equals NaN and -0.0 equals 0.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

/// Key of one group: the normalized values of its group-by fields.
pub type GroupKey = SmallVec<[CacheValue; 4]>;

// ============================================================================
// AGGREGATION
// ============================================================================

/// Accumulator for computing aggregates incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateAccumulator {
    pub sum: f64,
    /// Non-empty values of any type.
    pub count: u64,
    pub count_numbers: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// First error value seen.
    pub error: Option<CellError>,
}

impl AggregateAccumulator {
    pub fn new() -> Self {
        AggregateAccumulator::default()
    }

    /// Adds one source value. Text and booleans are counted but not summed.
    pub fn add(&mut self, value: &CellValue) {
        match value {
            CellValue::Empty => {}
            CellValue::Number(n) => {
                self.count += 1;
                self.add_number(*n);
            }
            CellValue::Text(_) | CellValue::Boolean(_) => self.count += 1,
            CellValue::Error(e) => {
                self.count += 1;
                self.error.get_or_insert(*e);
            }
        }
    }

    fn add_number(&mut self, value: f64) {
        self.count_numbers += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Final value for the given aggregation. Errors win over every
    /// aggregation except Count.
    pub fn result(&self, aggregation: AggregationType) -> CellValue {
        if aggregation == AggregationType::Count {
            return CellValue::Number(self.count as f64);
        }
        if let Some(e) = self.error {
            return CellValue::Error(e);
        }
        match aggregation {
            AggregationType::Sum => CellValue::Number(self.sum),
            AggregationType::Average => {
                if self.count_numbers == 0 {
                    CellValue::Error(CellError::Div0)
                } else {
                    CellValue::Number(self.sum / self.count_numbers as f64)
                }
            }
            AggregationType::Min => CellValue::Number(self.min.unwrap_or(0.0)),
            AggregationType::Max => CellValue::Number(self.max.unwrap_or(0.0)),
            AggregationType::Count => CellValue::Number(self.count as f64),
        }
    }
}

// ============================================================================
// MAIN CACHE STRUCT
// ============================================================================

/// One distinct combination of group-by values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    /// Values as first seen in the source (original casing).
    pub labels: Vec<CellValue>,
    pub accumulators: Vec<AggregateAccumulator>,
}

/// Groups and per-group accumulators for one calculation.
#[derive(Debug, Clone, Default)]
pub struct PivotCache {
    group_fields: Vec<FieldIndex>,
    measure_fields: Vec<FieldIndex>,
    groups: Vec<GroupEntry>,
    index: FxHashMap<GroupKey, usize>,
}

impl PivotCache {
    pub fn new(group_fields: Vec<FieldIndex>, measure_fields: Vec<FieldIndex>) -> Self {
        PivotCache {
            group_fields,
            measure_fields,
            groups: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Folds one source record into its group, creating the group on first sight.
    pub fn add_record(&mut self, record: &[CellValue]) {
        let field = |i: FieldIndex| record.get(i).unwrap_or(&CellValue::Empty);

        let key: GroupKey = self
            .group_fields
            .iter()
            .map(|&i| CacheValue::from(field(i)))
            .collect();

        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.groups.len();
                self.groups.push(GroupEntry {
                    labels: self.group_fields.iter().map(|&i| field(i).clone()).collect(),
                    accumulators: vec![AggregateAccumulator::new(); self.measure_fields.len()],
                });
                self.index.insert(key, slot);
                slot
            }
        };

        let entry = &mut self.groups[slot];
        for (acc, &i) in entry.accumulators.iter_mut().zip(&self.measure_fields) {
            acc.add(field(i));
        }
    }

    /// Groups in first-seen order.
    pub fn groups(&self) -> &[GroupEntry] {
        &self.groups
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
