use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub auto_launch_host: bool,
    pub host_path_override: Option<String>,
    pub mock_mode: bool,
}

// Absent fields leave the current value untouched; an explicit null
// clears the path override.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub auto_launch_host: Option<bool>,
    #[serde(deserialize_with = "nullable_field")]
    pub host_path_override: Option<Option<String>>,
    pub mock_mode: Option<bool>,
}

fn nullable_field<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl AppSettings {
    pub fn merged(&self, patch: &SettingsPatch) -> AppSettings {
        AppSettings {
            auto_launch_host: patch.auto_launch_host.unwrap_or(self.auto_launch_host),
            host_path_override: match &patch.host_path_override {
                Some(value) => value.clone(),
                None => self.host_path_override.clone(),
            },
            mock_mode: patch.mock_mode.unwrap_or(self.mock_mode),
        }
    }
}

// Updates are optimistic: the merged record becomes current before
// persistence to the host completes.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<RwLock<AppSettings>>,
}

impl SettingsStore {
    pub fn new(initial: AppSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub async fn current(&self) -> AppSettings {
        self.inner.read().await.clone()
    }

    pub async fn mock_mode(&self) -> bool {
        self.inner.read().await.mock_mode
    }

    // Returns the merged record for the caller to persist.
    pub async fn apply_patch(&self, patch: &SettingsPatch) -> AppSettings {
        let mut guard = self.inner.write().await;
        let merged = guard.merged(patch);
        *guard = merged.clone();
        merged
    }
}
