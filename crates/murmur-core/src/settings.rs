//! Settings service for the global notification configuration.

use tracing::info;

use crate::error::StorageError;
use crate::store::Store;
use crate::types::{NotificationSettings, Settings};

#[derive(Debug, Clone)]
pub struct SettingsService {
    store: Store,
}

impl SettingsService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn get(&self) -> Settings {
        self.store.read(|doc| doc.settings.clone()).await
    }

    /// Replace `settings.notifications` wholesale and persist.
    pub async fn update(&self, notifications: NotificationSettings) -> Result<Settings, StorageError> {
        let settings = self
            .store
            .mutate(|doc| {
                doc.settings.notifications = notifications;
                Ok::<_, StorageError>(doc.settings.clone())
            })
            .await?;

        info!(
            email_enabled = settings.notifications.address().is_some(),
            "notification settings updated"
        );
        Ok(settings)
    }
}
