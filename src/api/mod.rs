//! Remote prediction-service client.
//!
//! Gateway module: `client.rs` holds the typed operations and the shared
//! transport rule, `error.rs` the single error shape they return. Callers
//! only see what is re-exported here.

mod client;
mod error;

pub use client::{merge_headers, ApiClient, RequestOptions, DEFAULT_API_URL};
pub use error::ServiceRequestError;
