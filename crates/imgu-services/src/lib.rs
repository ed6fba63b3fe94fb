//! Application services for imgu
//!
//! Every service is constructed explicitly with the stores, registry and
//! codec it needs; nothing here reaches for process-wide state.

pub mod group_admin;
pub mod image;
pub mod policy;
pub mod scheduler;
pub mod settings;
pub mod settings_admin;
pub mod storage_admin;
pub mod tasks;
#[cfg(test)]
pub(crate) mod testing;
pub mod upload;

pub use group_admin::GroupAdminService;
pub use image::ImageService;
pub use policy::GroupResolver;
pub use scheduler::{ScheduledTask, TaskScheduler};
pub use settings::SiteSettings;
pub use settings_admin::SettingsAdminService;
pub use storage_admin::StorageAdminService;
pub use tasks::{GroupReversionSweep, ImageExpirySweep, SessionExpirySweep};
pub use upload::{UploadRequest, UploadService, UploadedImage};
