//! Shared infrastructure for the imgu binary
//!
//! Tracing setup, the JSON error body and the HTTP middleware that every
//! route shares.

pub mod error;
pub mod middleware;
pub mod telemetry;

pub use error::ErrorResponse;
pub use middleware::{request_id_middleware, security_headers_middleware, RequestId};
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};
