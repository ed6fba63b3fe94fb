//! Admin operations on groups and group membership

use std::sync::Arc;

use chrono::{DateTime, Utc};
use imgu_core::constants::DEFAULT_GROUP_ID;
use imgu_core::{AppError, Group, GroupLimits};
use imgu_db::{GroupStore, UserStore};
use validator::Validate;

use crate::settings::SiteSettings;

#[derive(Clone)]
pub struct GroupAdminService {
    groups: Arc<dyn GroupStore>,
    users: Arc<dyn UserStore>,
    settings: SiteSettings,
}

impl GroupAdminService {
    pub fn new(
        groups: Arc<dyn GroupStore>,
        users: Arc<dyn UserStore>,
        settings: SiteSettings,
    ) -> Self {
        Self {
            groups,
            users,
            settings,
        }
    }

    pub async fn list(&self) -> Result<Vec<Group>, AppError> {
        self.groups.list_groups().await
    }

    /// Create a group. A blank name becomes `New user group #N`.
    pub async fn create(&self, mut limits: GroupLimits) -> Result<Group, AppError> {
        limits.name = limits.name.trim().to_string();
        if limits.name.is_empty() {
            let count = self.groups.list_groups().await?.len();
            limits.name = format!("New user group #{}", count + 1);
        }
        limits.validate()?;

        let group = self.groups.create_group(&limits).await?;
        tracing::info!(group_id = group.id, name = %group.name, "Group created");
        Ok(group)
    }

    pub async fn update(&self, id: i32, mut limits: GroupLimits) -> Result<Group, AppError> {
        limits.name = limits.name.trim().to_string();
        limits.validate()?;
        let group = self.groups.update_group(id, &limits).await?;
        tracing::info!(group_id = id, "Group updated");
        Ok(group)
    }

    /// Fails with `Conflict` while users are members or while the group is
    /// one of the configured defaults.
    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        let defaults = [
            DEFAULT_GROUP_ID,
            self.settings.default_guest_group().await?,
            self.settings.default_user_group().await?,
        ];
        if defaults.contains(&id) {
            return Err(AppError::Conflict(format!(
                "group {} is a default group",
                id
            )));
        }

        self.groups.delete_group_if_unreferenced(id).await?;
        tracing::info!(group_id = id, "Group deleted");
        Ok(())
    }

    /// Move a user into a group, optionally until `expires_at`, after which
    /// the reversion sweep returns them to the default user group.
    pub async fn assign_user(
        &self,
        user_id: i32,
        group_id: i32,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        if expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(AppError::InvalidInput(
                "group expiry must be in the future".to_string(),
            ));
        }
        if self.groups.find_group(group_id).await?.is_none() {
            return Err(AppError::NotFound(format!("group {} not found", group_id)));
        }
        if self.users.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user {} not found", user_id)));
        }

        self.users.set_user_group(user_id, group_id, expires_at).await?;
        tracing::info!(user_id, group_id, expires_at = ?expires_at, "User group assigned");
        Ok(())
    }
}
