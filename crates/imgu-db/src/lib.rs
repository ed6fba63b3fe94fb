//! Metadata store for imgu
//!
//! The services depend on the traits in [`store`]; [`db`] implements them on
//! PostgreSQL and, with the `memory` feature, [`memory`] implements them in
//! process for tests.

pub mod db;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod store;

pub use db::{
    GroupRepository, ImageRepository, SessionRepository, SettingRepository,
    StorageRepository, UserRepository,
};
#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryStore;
pub use store::{GroupStore, ImageStore, SessionStore, SettingStore, StorageConfigStore, UserStore};
