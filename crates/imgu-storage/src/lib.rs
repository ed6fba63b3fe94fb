//! imgu storage library
//!
//! One capability trait, [`StorageDriver`], implemented independently per
//! backend, plus the [`StorageRegistry`] that builds drivers from persisted
//! configuration and picks one for each new upload.
//!
//! # Keys
//!
//! Keys are flat object names (`Ab3kQ9xz.webp`). They never contain path
//! separators or `..`; every backend rejects such keys with
//! [`StorageError::InvalidKey`].
//!
//! # Reads
//!
//! [`StorageDriver::get`] returns a [`StoredObject`]: either the bytes or a
//! URL the client should be redirected to. Backends with a public endpoint
//! (S3 with `public_url`, telegraph) redirect so payloads do not pass through
//! this process.

pub mod factory;
#[cfg(feature = "storage-ftp")]
pub mod ftp;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod registry;
#[cfg(feature = "storage-s3")]
pub mod s3;
#[cfg(feature = "storage-telegraph")]
pub mod telegraph;
pub mod timeout;
pub mod traits;
#[cfg(feature = "storage-webdav")]
pub mod webdav;

// Re-export commonly used types
pub use factory::{BackendDriverFactory, DriverFactory};
#[cfg(feature = "storage-ftp")]
pub use ftp::FtpStorage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use registry::{RegistryError, StorageRegistry};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
#[cfg(feature = "storage-telegraph")]
pub use telegraph::TelegraphStorage;
pub use timeout::TimeoutDriver;
pub use traits::{StorageDriver, StorageError, StorageResult, StoredObject};
#[cfg(feature = "storage-webdav")]
pub use webdav::WebdavStorage;
