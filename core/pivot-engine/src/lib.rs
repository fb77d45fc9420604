//! FILENAME: core/pivot-engine/src/lib.rs
//! Pivot Table subsystem.
//!
//! This crate derives grouped, aggregated views from a workbook range. It
//! depends on `engine` for the shared cell and range types and for the
//! `Workbook` it reads sources from and writes destinations into.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the pivot table IS)
//! - `cache`: Grouping keys and aggregate accumulators (HOW we compute)
//! - `view`: The result grid (WHAT we display)
//! - `engine`: Calculation from a workbook snapshot
//! - `registry`: Pivot lifecycle per workbook (create/update/delete/refresh)

pub mod cache;
pub mod definition;
pub mod engine;
pub mod error;
pub mod registry;
pub mod view;

pub use cache::{AggregateAccumulator, CacheValue, PivotCache};
pub use definition::*;
pub use engine::{calculate_pivot, measure_label, read_source, resolve_field, SourceData};
pub use error::{PivotError, PivotResult, ValidationError};
pub use registry::{PivotRegistry, PivotTable, PivotWrites};
pub use view::PivotView;
