pub mod group_admin;
pub mod health;
pub mod image;
pub mod settings_admin;
pub mod storage_admin;
pub mod upload;
