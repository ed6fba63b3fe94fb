//! Quota and policy resolution
//!
//! Maps an identity to its effective [`Group`] and checks requests against
//! the group's ceilings. Group expiry is not evaluated here; the reversion
//! sweep resets expired assignments, so a user may briefly keep an expired
//! group between sweeps.

use std::sync::Arc;

use imgu_core::{AppError, Group, UploadError, User};
use imgu_db::GroupStore;

use crate::settings::SiteSettings;

#[derive(Clone)]
pub struct GroupResolver {
    groups: Arc<dyn GroupStore>,
    settings: SiteSettings,
}

impl GroupResolver {
    pub fn new(groups: Arc<dyn GroupStore>, settings: SiteSettings) -> Self {
        Self { groups, settings }
    }

    /// A registered user's stored group, or the guest default group
    #[tracing::instrument(skip(self, identity), fields(user_id = identity.map(|u| u.id)))]
    pub async fn resolve(&self, identity: Option<&User>) -> Result<Group, AppError> {
        let group_id = match identity {
            Some(user) => user.group_id,
            None => self.settings.default_guest_group().await?,
        };

        self.groups.find_group(group_id).await?.ok_or_else(|| {
            tracing::error!(group_id, "Effective group does not exist");
            AppError::Internal(format!("group {} does not exist", group_id))
        })
    }
}

/// Validate a requested retention against the group ceiling.
///
/// `requested` is in seconds, 0 meaning forever. A group without a ceiling
/// accepts anything; a group with ceiling N accepts 1..=N and rejects
/// forever with the same error as an overlong request.
pub fn check_retention(group: &Group, requested: i64) -> Result<(), UploadError> {
    if requested < 0 {
        return Err(UploadError::InvalidInput(
            "retention must not be negative".to_string(),
        ));
    }

    let max = group.max_retention_seconds;
    if max != 0 && (requested == 0 || requested > max) {
        return Err(UploadError::ExpireTooLarge { requested, max });
    }
    Ok(())
}

/// Validate a payload size against the group limit. Applied to both the raw
/// upload and the encoded output.
pub fn check_size(group: &Group, size: usize) -> Result<(), UploadError> {
    let max = group.max_file_size;
    if i64::try_from(size).map_or(true, |size| size > max) {
        return Err(UploadError::FileTooLarge { size, max });
    }
    Ok(())
}

/// Identity checks that come before group resolution
pub fn check_identity(identity: Option<&User>) -> Result<(), UploadError> {
    match identity {
        Some(user) if user.is_banned() => Err(UploadError::UserBanned),
        Some(user) if !user.email_verified => Err(UploadError::EmailNotVerified),
        _ => Ok(()),
    }
}
