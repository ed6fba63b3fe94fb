//! Keys of the site settings table and the admin view over them

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const SITE_NAME: &str = "SITE_NAME";
pub const SITE_URL: &str = "SITE_URL";
pub const AVIF_ENCODING: &str = "AVIF_ENCODING";
pub const WEBP_ENCODING: &str = "WEBP_ENCODING";
pub const DEFAULT_GROUP_GUEST: &str = "DEFAULT_GROUP_GUEST";
pub const DEFAULT_GROUP_USER: &str = "DEFAULT_GROUP_USER";

/// Effective settings, defaults applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsView {
    pub site_name: Option<String>,
    pub site_url: Option<String>,
    pub avif_encoding: bool,
    pub webp_encoding: bool,
    pub default_group_guest: i32,
    pub default_group_user: i32,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SettingsUpdate {
    #[validate(length(max = 255, message = "Site name must be at most 255 characters"))]
    pub site_name: Option<String>,
    #[validate(url(message = "Site URL must be an absolute URL"))]
    pub site_url: Option<String>,
    pub avif_encoding: Option<bool>,
    pub webp_encoding: Option<bool>,
    #[validate(range(min = 0, message = "Group id must be non-negative"))]
    pub default_group_guest: Option<i32>,
    #[validate(range(min = 0, message = "Group id must be non-negative"))]
    pub default_group_user: Option<i32>,
}

impl SettingsUpdate {
    /// Stored key and value for every field present
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        if let Some(name) = &self.site_name {
            entries.push((SITE_NAME, name.trim().to_string()));
        }
        if let Some(url) = &self.site_url {
            entries.push((SITE_URL, url.trim().trim_end_matches('/').to_string()));
        }
        if let Some(enabled) = self.avif_encoding {
            entries.push((AVIF_ENCODING, enabled.to_string()));
        }
        if let Some(enabled) = self.webp_encoding {
            entries.push((WEBP_ENCODING, enabled.to_string()));
        }
        if let Some(id) = self.default_group_guest {
            entries.push((DEFAULT_GROUP_GUEST, id.to_string()));
        }
        if let Some(id) = self.default_group_user {
            entries.push((DEFAULT_GROUP_USER, id.to_string()));
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rejects_bad_values() {
        let relative: SettingsUpdate =
            serde_json::from_str(r#"{"site_url": "img.example.com"}"#).unwrap();
        assert!(relative.validate().is_err());

        let negative: SettingsUpdate =
            serde_json::from_str(r#"{"default_group_user": -1}"#).unwrap();
        assert!(negative.validate().is_err());

        assert!(serde_json::from_str::<SettingsUpdate>(r#"{"SITE_NAME": "x"}"#).is_err());
    }

    #[test]
    fn test_entries_only_cover_present_fields() {
        let update: SettingsUpdate = serde_json::from_str(
            r#"{"site_url": "https://img.example.com/", "webp_encoding": false}"#,
        )
        .unwrap();
        assert!(update.validate().is_ok());
        assert_eq!(
            update.entries(),
            vec![
                (SITE_URL, "https://img.example.com".to_string()),
                (WEBP_ENCODING, "false".to_string()),
            ]
        );
    }
}
