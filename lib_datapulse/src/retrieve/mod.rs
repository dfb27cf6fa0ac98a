//! # Data Retrieval Module
//!
//! A single place for HTTP access so the collectors in [`crate::sources`]
//! only deal with payload shapes.
//!
//! - **`ky_http`**: `ApiClient`, a thin `reqwest` wrapper with a base URL,
//!   timeout and user agent, plus the [`JsonFetch`] seam the collectors are
//!   written against. There is deliberately no retry layer: a failed source
//!   is logged and skipped for this run.

/// Generic HTTP API client and the `JsonFetch` trait.
pub mod ky_http;

pub use ky_http::{ApiClient, ApiResponse, JsonFetch};
