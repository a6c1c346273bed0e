//! Row store access for the topic sheet.
//!
//! This crate provides:
//! - The `RowStore` trait consumed by the content pipeline
//! - A Google Sheets v4 REST client with service account auth via gcp_auth
//! - An in-memory store for tests and local runs
//! - Token caching and retry logic

pub mod client;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod retry;
pub mod store;
pub mod token_cache;
pub mod types;


pub use client::{SheetsClient, SheetsConfig};
pub use error::{SheetsError, SheetsResult};
pub use memory::MemoryRowStore;
pub use retry::RetryConfig;
pub use store::RowStore;
