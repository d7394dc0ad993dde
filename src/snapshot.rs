use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnStatus {
    Connected,
    #[default]
    NotConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmartHealth {
    Good,
    Warning,
    Critical,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FanStatus {
    Ok,
    Warning,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    #[serde(default, deserialize_with = "lenient_conn_status")]
    pub status: ConnStatus,
    #[serde(default)]
    pub captured_at_unix: Option<i64>,
    #[serde(default)]
    pub diagnostics: Diagnostics,
    #[serde(default)]
    pub cpu: CpuStat,
    #[serde(default)]
    pub gpu: GpuStat,
    #[serde(default)]
    pub storage: StorageStat,
    #[serde(default)]
    pub drives: Vec<DriveStat>,
    #[serde(default)]
    pub system: SystemStat,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    #[serde(default)]
    pub host_process_detected: bool,
    #[serde(default)]
    pub shared_channel_detected: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CpuStat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub package_temp_c: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub package_power_w: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub core_clock_mhz: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usage_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64_vec")]
    pub core_temps: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GpuStat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub hotspot_temp_c: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub memory_junction_temp_c: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub power_w: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub core_clock_mhz: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub memory_clock_mhz: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usage_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub vram_used_mb: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub vram_total_mb: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fan_speed_rpm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fan_speed_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageStat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub nvme_temp_c: Option<f64>,
    #[serde(default, deserialize_with = "lenient_smart_health")]
    pub smart_health: SmartHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DriveStat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub drive_letter: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temp_c: Option<f64>,
    #[serde(default, deserialize_with = "lenient_smart_health")]
    pub smart_health: SmartHealth,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_gb: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub free_gb: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SystemStat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub uptime_seconds: Option<u64>,
    #[serde(default, deserialize_with = "lenient_fan_status")]
    pub fan_status: FanStatus,
    #[serde(default)]
    pub fans: Vec<FanReading>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FanReading {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rpm: Option<f64>,
}

impl SensorSnapshot {
    pub fn not_connected(
        host_process_detected: bool,
        shared_channel_detected: bool,
        message: Option<String>,
    ) -> Self {
        Self {
            status: ConnStatus::NotConnected,
            diagnostics: Diagnostics {
                host_process_detected,
                shared_channel_detected,
                message,
            },
            ..Self::default()
        }
    }

    // Drops values that make no physical sense for their metric.
    pub fn sanitized(mut self) -> Self {
        self.cpu.package_temp_c = non_negative(self.cpu.package_temp_c);
        self.cpu.package_power_w = non_negative(self.cpu.package_power_w);
        self.cpu.core_clock_mhz = non_negative(self.cpu.core_clock_mhz);
        self.cpu.usage_percent = percent(self.cpu.usage_percent);
        self.cpu.core_temps.retain(|t| t.is_finite() && *t >= 0.0);

        self.gpu.hotspot_temp_c = non_negative(self.gpu.hotspot_temp_c);
        self.gpu.memory_junction_temp_c = non_negative(self.gpu.memory_junction_temp_c);
        self.gpu.power_w = non_negative(self.gpu.power_w);
        self.gpu.core_clock_mhz = non_negative(self.gpu.core_clock_mhz);
        self.gpu.memory_clock_mhz = non_negative(self.gpu.memory_clock_mhz);
        self.gpu.usage_percent = percent(self.gpu.usage_percent);
        self.gpu.vram_used_mb = non_negative(self.gpu.vram_used_mb);
        self.gpu.vram_total_mb = non_negative(self.gpu.vram_total_mb);
        self.gpu.fan_speed_rpm = non_negative(self.gpu.fan_speed_rpm);
        self.gpu.fan_speed_percent = percent(self.gpu.fan_speed_percent);

        self.storage.nvme_temp_c = non_negative(self.storage.nvme_temp_c);

        for drive in &mut self.drives {
            drive.temp_c = non_negative(drive.temp_c);
            drive.total_gb = non_negative(drive.total_gb);
            drive.free_gb = non_negative(drive.free_gb);
        }

        for fan in &mut self.system.fans {
            fan.rpm = non_negative(fan.rpm);
        }

        self
    }
}

fn non_negative(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

fn percent(value: Option<f64>) -> Option<f64> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.min(100.0))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|v| v.is_finite()))
}

fn lenient_f64_vec<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let Some(items) = value.as_array() else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .filter_map(|v| v.as_f64())
        .filter(|v| v.is_finite())
        .collect())
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

fn lenient_conn_status<'de, D>(deserializer: D) -> Result<ConnStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value.as_str() {
        Some("connected") => ConnStatus::Connected,
        _ => ConnStatus::NotConnected,
    })
}

fn lenient_smart_health<'de, D>(deserializer: D) -> Result<SmartHealth, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value.as_str() {
        Some("good") => SmartHealth::Good,
        Some("warning") => SmartHealth::Warning,
        Some("critical") => SmartHealth::Critical,
        _ => SmartHealth::Unknown,
    })
}

fn lenient_fan_status<'de, D>(deserializer: D) -> Result<FanStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value.as_str() {
        Some("ok") => FanStatus::Ok,
        Some("warning") => FanStatus::Warning,
        _ => FanStatus::Unknown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_become_absent() {
        let snapshot: SensorSnapshot = serde_json::from_str(
            r#"{"status":"connected","cpu":{"packageTempC":55.5}}"#,
        )
        .expect("частичный снимок должен разбираться");

        assert_eq!(snapshot.status, ConnStatus::Connected);
        assert_eq!(snapshot.cpu.package_temp_c, Some(55.5));
        assert!(snapshot.cpu.package_power_w.is_none());
        assert!(snapshot.gpu.hotspot_temp_c.is_none());
        assert!(snapshot.drives.is_empty());
        assert_eq!(snapshot.storage.smart_health, SmartHealth::Unknown);
    }

    #[test]
    fn malformed_fields_become_absent_not_errors() {
        let snapshot: SensorSnapshot = serde_json::from_str(
            r#"{
                "status": 42,
                "cpu": {"packageTempC": "hot", "packagePowerW": null},
                "storage": {"smartHealth": "excellent"},
                "system": {"fanStatus": 1, "uptimeSeconds": -5}
            }"#,
        )
        .expect("мусор в полях не должен быть ошибкой разбора");

        assert_eq!(snapshot.status, ConnStatus::NotConnected);
        assert!(snapshot.cpu.package_temp_c.is_none());
        assert!(snapshot.cpu.package_power_w.is_none());
        assert_eq!(snapshot.storage.smart_health, SmartHealth::Unknown);
        assert_eq!(snapshot.system.fan_status, FanStatus::Unknown);
        assert!(snapshot.system.uptime_seconds.is_none());
    }

    #[test]
    fn sanitize_drops_physically_meaningless_values() {
        let mut snapshot = SensorSnapshot::default();
        snapshot.cpu.package_temp_c = Some(-12.0);
        snapshot.cpu.usage_percent = Some(250.0);
        snapshot.cpu.core_temps = vec![45.0, -3.0, f64::NAN, 51.0];
        snapshot.gpu.fan_speed_rpm = Some(f64::INFINITY);
        snapshot.drives.push(DriveStat {
            temp_c: Some(-1.0),
            total_gb: Some(2000.0),
            ..DriveStat::default()
        });

        let snapshot = snapshot.sanitized();
        assert!(snapshot.cpu.package_temp_c.is_none());
        assert_eq!(snapshot.cpu.usage_percent, Some(100.0));
        assert_eq!(snapshot.cpu.core_temps, vec![45.0, 51.0]);
        assert!(snapshot.gpu.fan_speed_rpm.is_none());
        assert!(snapshot.drives[0].temp_c.is_none());
        assert_eq!(snapshot.drives[0].total_gb, Some(2000.0));
    }

    #[test]
    fn wire_format_is_camel_case() {
        let mut snapshot = SensorSnapshot::default();
        snapshot.status = ConnStatus::Connected;
        snapshot.gpu.memory_junction_temp_c = Some(68.0);

        let json = serde_json::to_string(&snapshot).expect("сериализация снимка");
        assert!(json.contains("\"memoryJunctionTempC\":68.0"));
        assert!(json.contains("\"status\":\"connected\""));
        assert!(json.contains("\"hostProcessDetected\""));
    }
}
