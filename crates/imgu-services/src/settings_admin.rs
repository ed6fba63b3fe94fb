//! Admin reads and edits of the site settings

use std::sync::Arc;

use imgu_core::settings::{SettingsUpdate, SettingsView};
use imgu_core::AppError;
use imgu_db::GroupStore;
use validator::Validate;

use crate::settings::SiteSettings;

#[derive(Clone)]
pub struct SettingsAdminService {
    settings: SiteSettings,
    groups: Arc<dyn GroupStore>,
}

impl SettingsAdminService {
    pub fn new(settings: SiteSettings, groups: Arc<dyn GroupStore>) -> Self {
        Self { settings, groups }
    }

    pub async fn get(&self) -> Result<SettingsView, AppError> {
        self.settings.view().await
    }

    /// Validate the whole update before writing any of it. Default groups
    /// must name existing groups.
    pub async fn update(&self, update: SettingsUpdate) -> Result<SettingsView, AppError> {
        update.validate()?;
        for id in [update.default_group_guest, update.default_group_user]
            .into_iter()
            .flatten()
        {
            if self.groups.find_group(id).await?.is_none() {
                return Err(AppError::InvalidInput(format!(
                    "group {} does not exist",
                    id
                )));
            }
        }

        for (key, value) in update.entries() {
            self.settings.write(key, &value).await?;
            tracing::info!(key, value = %value, "Setting updated");
        }
        self.settings.view().await
    }
}
