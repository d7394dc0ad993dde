use crate::config::HostConfig;
use crate::settings::AppSettings;
use crate::snapshot::SensorSnapshot;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("транспортная ошибка хоста: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("хост ответил статусом {status}: {body}")]
    Status { status: u16, body: String },
}

// The host process owns all real hardware access; this side only speaks
// its request/response surface.
#[derive(Clone)]
pub struct HostClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HostClient {
    pub fn new(cfg: &HostConfig) -> Self {
        let client = Client::builder()
            .user_agent("paneld/0.1.0")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(cfg.request_timeout_ms),
        }
    }

    pub async fn get_sensor_data(&self) -> Result<SensorSnapshot, HostError> {
        let resp = self
            .client
            .get(self.url("/sensors"))
            .timeout(self.timeout)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let snapshot: SensorSnapshot = resp.json().await?;
        Ok(snapshot.sanitized())
    }

    pub async fn get_settings(&self) -> Result<AppSettings, HostError> {
        let resp = self
            .client
            .get(self.url("/settings"))
            .timeout(self.timeout)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    // Idempotent full-record overwrite.
    pub async fn save_settings(&self, settings: &AppSettings) -> Result<(), HostError> {
        let resp = self
            .client
            .put(self.url("/settings"))
            .timeout(self.timeout)
            .json(settings)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    // Best-effort: a failure is surfaced as a transient message only.
    pub async fn launch_host(&self, path_override: Option<&str>) -> Result<(), HostError> {
        let resp = self
            .client
            .post(self.url("/launch"))
            .timeout(self.timeout)
            .json(&json!({ "pathOverride": path_override }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    // The dump stays opaque and never feeds the panel state.
    pub async fn debug_dump_sensors(&self) -> Result<serde_json::Value, HostError> {
        let resp = self
            .client
            .get(self.url("/debug/sensors"))
            .timeout(self.timeout)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, HostError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(HostError::Status {
        status: status.as_u16(),
        body,
    })
}
