//! Core types shared by every imgu crate
//!
//! Configuration, the error taxonomy, domain models and the small set of
//! constants the storage, upload and expiry subsystems agree on.

pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod models;
pub mod settings;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel, UploadError};
pub use format::ImageFormat;
pub use models::*;
