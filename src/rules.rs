use crate::snapshot::{FanStatus, SmartHealth};
use once_cell::sync::Lazy;
use regex::Regex;

pub const CPU_PACKAGE_WARN_C: f64 = 85.0;
pub const GPU_HOTSPOT_WARN_C: f64 = 95.0;
pub const GPU_MEMORY_JUNCTION_WARN_C: f64 = 100.0;
pub const DRIVE_TEMP_WARN_C: f64 = 70.0;

pub const NAME_BUDGET: usize = 20;
pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Good,
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Classification {
    pub fn is_warning(self) -> bool {
        matches!(self, Classification::Warning | Classification::Critical)
    }

    pub fn label(self) -> &'static str {
        match self {
            Classification::Good => "✓ Good",
            Classification::Ok => "✓ OK",
            Classification::Warning => "⚠ Warning",
            Classification::Critical => "✗ Critical",
            Classification::Unknown => "— Unknown",
        }
    }
}

// The threshold is inclusive: a reading exactly at the limit already warns.
pub fn classify_temp(value: Option<f64>, warn_threshold: f64) -> Classification {
    match value {
        None => Classification::Unknown,
        Some(v) if v >= warn_threshold => Classification::Warning,
        Some(_) => Classification::Good,
    }
}

// Host classifications are authoritative and only get mapped, never re-derived.
impl From<SmartHealth> for Classification {
    fn from(value: SmartHealth) -> Self {
        match value {
            SmartHealth::Good => Classification::Good,
            SmartHealth::Warning => Classification::Warning,
            SmartHealth::Critical => Classification::Critical,
            SmartHealth::Unknown => Classification::Unknown,
        }
    }
}

impl From<FanStatus> for Classification {
    fn from(value: FanStatus) -> Self {
        match value {
            FanStatus::Ok => Classification::Ok,
            FanStatus::Warning => Classification::Warning,
            FanStatus::Unknown => Classification::Unknown,
        }
    }
}

pub fn format_value(value: Option<f64>, unit: &str, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}{unit}"),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_temp_short(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}°", v),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_mhz(value: Option<f64>) -> String {
    match value {
        Some(v) if v >= 1000.0 => format!("{:.2} GHz", v / 1000.0),
        Some(v) => format!("{v:.0} MHz"),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_uptime(seconds: Option<u64>) -> String {
    let Some(seconds) = seconds else {
        return PLACEHOLDER.to_string();
    };

    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let mins = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {mins}m")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

pub fn format_vram(used_mb: Option<f64>, total_mb: Option<f64>) -> String {
    let Some(used_mb) = used_mb else {
        return PLACEHOLDER.to_string();
    };

    let used_gb = used_mb / 1024.0;
    match total_mb {
        Some(total_mb) => format!("{:.1} / {:.0} GB", used_gb, total_mb / 1024.0),
        None => format!("{used_gb:.1} GB"),
    }
}

pub fn format_fan_speed(rpm: Option<f64>, percent: Option<f64>) -> String {
    let Some(rpm) = rpm else {
        return PLACEHOLDER.to_string();
    };

    match percent {
        Some(p) => format!("{:.0} RPM ({:.0}%)", rpm, p),
        None => format!("{rpm:.0} RPM"),
    }
}

static SLOT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:CPU|GPU)\s*\[#\d+\]:\s*").expect("корректное выражение"));
static SMART_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^S\.M\.A\.R\.T\.:\s*").expect("корректное выражение"));
static DRIVE_LETTER_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\[[A-Z]:\].*$").expect("корректное выражение"));

// Strips the host's structural annotations: slot prefixes ("GPU [#0]: "),
// protocol prefixes ("S.M.A.R.T.: ") and bracketed drive-letter tails.
pub fn clean_device_name(name: &str) -> String {
    let name = SLOT_PREFIX.replace(name, "");
    let name = SMART_PREFIX.replace(&name, "");
    let name = DRIVE_LETTER_SUFFIX.replace(&name, "");
    name.trim().to_string()
}

pub fn shorten_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }

    let mut short: String = name.chars().take(max_len.saturating_sub(1)).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_value_is_unknown_never_a_class() {
        for threshold in [
            CPU_PACKAGE_WARN_C,
            GPU_HOTSPOT_WARN_C,
            GPU_MEMORY_JUNCTION_WARN_C,
            DRIVE_TEMP_WARN_C,
        ] {
            assert_eq!(classify_temp(None, threshold), Classification::Unknown);
        }
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        assert_eq!(
            classify_temp(Some(CPU_PACKAGE_WARN_C), CPU_PACKAGE_WARN_C),
            Classification::Warning
        );
        assert_eq!(
            classify_temp(Some(CPU_PACKAGE_WARN_C - 0.01), CPU_PACKAGE_WARN_C),
            Classification::Good
        );
        assert_eq!(
            classify_temp(Some(GPU_HOTSPOT_WARN_C), GPU_HOTSPOT_WARN_C),
            Classification::Warning
        );
        assert_eq!(
            classify_temp(Some(DRIVE_TEMP_WARN_C - 0.01), DRIVE_TEMP_WARN_C),
            Classification::Good
        );
    }

    #[test]
    fn host_health_maps_without_rederivation() {
        assert_eq!(
            Classification::from(SmartHealth::Critical),
            Classification::Critical
        );
        assert_eq!(Classification::from(FanStatus::Ok), Classification::Ok);
        assert_eq!(
            Classification::from(SmartHealth::Unknown),
            Classification::Unknown
        );
    }

    #[test]
    fn absent_values_render_as_placeholder() {
        assert_eq!(format_value(None, "°C", 1), "—");
        assert_eq!(format_mhz(None), "—");
        assert_eq!(format_uptime(None), "—");
        assert_eq!(format_vram(None, Some(24_576.0)), "—");
        assert_eq!(format_temp_short(None), "—");
    }

    #[test]
    fn fixed_precision_per_field() {
        assert_eq!(format_value(Some(87.25), "°C", 1), "87.2°C");
        assert_eq!(format_value(Some(43.6), "%", 0), "44%");
        assert_eq!(format_temp_short(Some(87.0)), "87°");
    }

    #[test]
    fn frequency_switches_units_at_1000() {
        assert_eq!(format_mhz(Some(999.0)), "999 MHz");
        assert_eq!(format_mhz(Some(1000.0)), "1.00 GHz");
        assert_eq!(format_mhz(Some(5_450.0)), "5.45 GHz");
    }

    #[test]
    fn uptime_omits_leading_zero_units() {
        assert_eq!(format_uptime(Some(59)), "0m");
        assert_eq!(format_uptime(Some(65 * 60)), "1h 5m");
        assert_eq!(format_uptime(Some(2 * 86_400 + 3 * 3_600 + 60)), "2d 3h 1m");
    }

    #[test]
    fn vram_renders_used_and_total() {
        assert_eq!(format_vram(Some(11_468.8), Some(24_576.0)), "11.2 / 24 GB");
        assert_eq!(format_vram(Some(1_024.0), None), "1.0 GB");
    }

    #[test]
    fn device_name_cleaning_strips_structural_annotations() {
        assert_eq!(
            clean_device_name("GPU [#0]: NVIDIA GeForce RTX 4090"),
            "NVIDIA GeForce RTX 4090"
        );
        assert_eq!(
            clean_device_name("CPU [#1]:  AMD Ryzen 9 7950X "),
            "AMD Ryzen 9 7950X"
        );
        assert_eq!(
            clean_device_name("S.M.A.R.T.: Samsung SSD 990 PRO 2TB [C:] SCSI"),
            "Samsung SSD 990 PRO 2TB"
        );
        assert_eq!(clean_device_name("Plain Name"), "Plain Name");
    }

    #[test]
    fn long_names_truncate_with_ellipsis() {
        assert_eq!(shorten_name("short", NAME_BUDGET), "short");
        let long = "NVIDIA GeForce RTX 4090 Founders Edition";
        let short = shorten_name(long, NAME_BUDGET);
        assert_eq!(short.chars().count(), NAME_BUDGET);
        assert!(short.ends_with('…'));
    }
}
