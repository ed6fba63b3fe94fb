//! HTTP surface of imgu
//!
//! A thin axum layer over `imgu-services`: extractors resolve the caller's
//! identity and client address, handlers translate requests into service
//! calls and service errors into JSON error bodies.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod utils;
