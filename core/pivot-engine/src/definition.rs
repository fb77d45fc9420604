//! FILENAME: core/pivot-engine/src/definition.rs
//! Pivot Table Definition - The serializable configuration.
//!
//! This module contains the types needed to DESCRIBE a pivot table.
//! These structures are designed to be:
//! - Serializable (sent over the service boundary as JSON)
//! - Immutable snapshots of user intent

use engine::{CellKey, CellRange};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a pivot table within a workbook.
pub type PivotId = u32;

/// Index into the source data columns (0-based).
pub type FieldIndex = usize;

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for measure fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    Sum,
    Count,
    Average,
    Min,
    Max,
}

impl Default for AggregationType {
    fn default() -> Self {
        AggregationType::Sum
    }
}

impl AggregationType {
    /// Display name used in generated measure headers ("Sum of Sales").
    pub fn display_name(&self) -> &'static str {
        match self {
            AggregationType::Sum => "Sum",
            AggregationType::Count => "Count",
            AggregationType::Average => "Average",
            AggregationType::Min => "Min",
            AggregationType::Max => "Max",
        }
    }
}

// ============================================================================
// FIELD DEFINITIONS
// ============================================================================

/// Addresses a source column either by its header text or by its 0-based
/// position inside the source range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    Index(FieldIndex),
    Name(String),
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        FieldRef::Name(name.to_string())
    }
}

impl From<FieldIndex> for FieldRef {
    fn from(index: FieldIndex) -> Self {
        FieldRef::Index(index)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Index(i) => write!(f, "#{}", i),
            FieldRef::Name(name) => f.write_str(name),
        }
    }
}

/// A field placed in the values area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureField {
    pub field: FieldRef,

    #[serde(default)]
    pub aggregation: AggregationType,

    /// Header text for the measure column. Defaults to "<Agg> of <Field>".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl MeasureField {
    pub fn new(field: impl Into<FieldRef>, aggregation: AggregationType) -> Self {
        MeasureField {
            field: field.into(),
            aggregation,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// ============================================================================
// PIVOT DEFINITION
// ============================================================================

/// The complete definition of a pivot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotDefinition {
    /// Source data; the first row holds the headers.
    pub source: CellRange,

    /// Fields whose distinct value combinations form the result rows.
    #[serde(default)]
    pub group_by: Vec<FieldRef>,

    /// One result column per measure.
    #[serde(default)]
    pub measures: Vec<MeasureField>,

    /// Top-left cell the result grid is written to on every refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<CellKey>,
}

impl PivotDefinition {
    pub fn new(source: CellRange) -> Self {
        PivotDefinition {
            source,
            group_by: Vec::new(),
            measures: Vec::new(),
            destination: None,
        }
    }

    pub fn group_by(mut self, field: impl Into<FieldRef>) -> Self {
        self.group_by.push(field.into());
        self
    }

    pub fn measure(mut self, measure: MeasureField) -> Self {
        self.measures.push(measure);
        self
    }

    pub fn destination(mut self, anchor: CellKey) -> Self {
        self.destination = Some(anchor);
        self
    }
}
