//! PostgreSQL repositories
//!
//! Each repository owns a clone of the pool and implements one store trait.
//! Multi-statement operations run inside a single transaction.

mod group;
mod image;
mod session;
mod setting;
mod storage;
mod user;

pub use group::GroupRepository;
pub use image::ImageRepository;
pub use session::SessionRepository;
pub use setting::SettingRepository;
pub use storage::StorageRepository;
pub use user::UserRepository;
