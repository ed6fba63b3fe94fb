//! Typed view over the site settings table

use std::sync::Arc;

use imgu_core::constants::DEFAULT_GROUP_ID;
use imgu_core::settings::{
    SettingsView, AVIF_ENCODING, DEFAULT_GROUP_GUEST, DEFAULT_GROUP_USER, SITE_NAME, SITE_URL,
    WEBP_ENCODING,
};
use imgu_core::{AppError, ImageFormat};
use imgu_db::SettingStore;

/// Site-wide switches read by the upload path and the group resolver.
///
/// Values are read on every call so admin edits apply without a restart.
/// Missing or unparsable values fall back to defaults: encodings enabled,
/// both default groups pointing at group 0.
#[derive(Clone)]
pub struct SiteSettings {
    store: Arc<dyn SettingStore>,
}

impl SiteSettings {
    pub fn new(store: Arc<dyn SettingStore>) -> Self {
        Self { store }
    }

    async fn read_bool(&self, key: &str, default: bool) -> Result<bool, AppError> {
        Ok(match self.store.get_setting(key).await? {
            Some(value) => match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    tracing::warn!(key, value = %value, "Unparsable boolean setting, using default");
                    default
                }
            },
            None => default,
        })
    }

    async fn read_group(&self, key: &str) -> Result<i32, AppError> {
        Ok(match self.store.get_setting(key).await? {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %value, "Unparsable group setting, using default");
                DEFAULT_GROUP_ID
            }),
            None => DEFAULT_GROUP_ID,
        })
    }

    pub async fn avif_enabled(&self) -> Result<bool, AppError> {
        self.read_bool(AVIF_ENCODING, true).await
    }

    pub async fn webp_enabled(&self) -> Result<bool, AppError> {
        self.read_bool(WEBP_ENCODING, true).await
    }

    /// Whether uploads may be encoded to `format`. png, jpeg and gif are
    /// always available.
    pub async fn encoding_enabled(&self, format: ImageFormat) -> Result<bool, AppError> {
        match format {
            ImageFormat::Webp => self.webp_enabled().await,
            ImageFormat::Avif => self.avif_enabled().await,
            ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif => Ok(true),
        }
    }

    pub async fn default_guest_group(&self) -> Result<i32, AppError> {
        self.read_group(DEFAULT_GROUP_GUEST).await
    }

    pub async fn default_user_group(&self) -> Result<i32, AppError> {
        self.read_group(DEFAULT_GROUP_USER).await
    }

    /// Public base URL without a trailing slash, if configured
    pub async fn site_url(&self) -> Result<Option<String>, AppError> {
        Ok(self
            .store
            .get_setting(SITE_URL)
            .await?
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty()))
    }

    pub async fn site_name(&self) -> Result<Option<String>, AppError> {
        Ok(self
            .store
            .get_setting(SITE_NAME)
            .await?
            .filter(|name| !name.trim().is_empty()))
    }

    pub async fn view(&self) -> Result<SettingsView, AppError> {
        Ok(SettingsView {
            site_name: self.site_name().await?,
            site_url: self.site_url().await?,
            avif_encoding: self.avif_enabled().await?,
            webp_encoding: self.webp_enabled().await?,
            default_group_guest: self.default_guest_group().await?,
            default_group_user: self.default_user_group().await?,
        })
    }

    pub(crate) async fn write(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.store.set_setting(key, value).await
    }
}

#[cfg(test)]
mod tests {
    use imgu_db::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let settings = SiteSettings::new(Arc::new(MemoryStore::new()));
        assert!(settings.avif_enabled().await.unwrap());
        assert!(settings.webp_enabled().await.unwrap());
        assert_eq!(settings.default_guest_group().await.unwrap(), 0);
        assert_eq!(settings.default_user_group().await.unwrap(), 0);
        assert_eq!(settings.site_url().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reads_stored_values() {
        let store = MemoryStore::new();
        store.set_setting(AVIF_ENCODING, "false").await.unwrap();
        store.set_setting(WEBP_ENCODING, "garbage").await.unwrap();
        store.set_setting(DEFAULT_GROUP_GUEST, "3").await.unwrap();
        store.set_setting(SITE_URL, "https://img.example.com/").await.unwrap();
        let settings = SiteSettings::new(Arc::new(store));

        assert!(!settings.encoding_enabled(ImageFormat::Avif).await.unwrap());
        assert!(settings.encoding_enabled(ImageFormat::Webp).await.unwrap());
        assert!(settings.encoding_enabled(ImageFormat::Gif).await.unwrap());
        assert_eq!(settings.default_guest_group().await.unwrap(), 3);
        assert_eq!(
            settings.site_url().await.unwrap().as_deref(),
            Some("https://img.example.com")
        );
    }
}
