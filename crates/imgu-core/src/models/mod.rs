//! Data models for the application

mod group;
mod image;
mod storage;
mod user;

pub use group::*;
pub use image::*;
pub use storage::*;
pub use user::*;
