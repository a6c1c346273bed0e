//! Shared data models for the shortgen content pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Topics, work statuses and content fields (rows of the topic sheet)
//! - Column maps resolved from the sheet header
//! - Trend directives steering prompt construction
//! - Generated content packages

pub mod cell;
pub mod column_map;
pub mod content;
pub mod topic;
pub mod trend;
pub mod work_item;

// Re-export common types
pub use cell::{CellRef, CellRefError};
pub use column_map::ColumnMap;
pub use content::ContentPackage;
pub use topic::Topic;
pub use trend::TrendDirective;
pub use work_item::{ContentField, WorkStatus};
