use crate::rules::{
    classify_temp, clean_device_name, format_fan_speed, format_mhz, format_temp_short,
    format_uptime, format_value, format_vram, shorten_name, Classification,
    CPU_PACKAGE_WARN_C, DRIVE_TEMP_WARN_C, GPU_HOTSPOT_WARN_C, GPU_MEMORY_JUNCTION_WARN_C,
    NAME_BUDGET, PLACEHOLDER,
};
use crate::settings::AppSettings;
use crate::snapshot::{ConnStatus, Diagnostics, DriveStat, SensorSnapshot};
use crate::state::PanelState;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    #[default]
    Overview,
    Cpu,
    Gpu,
    Storage,
    System,
}

// Drive selection is clamped both when set and when read, because the
// drive list can shrink between snapshots.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub active: ActiveView,
    pub selected_drive: usize,
}

impl ViewState {
    pub fn select_view(&mut self, view: ActiveView) {
        self.active = view;
    }

    pub fn select_drive(&mut self, index: usize, drive_count: usize) {
        self.selected_drive = clamp_drive(index, drive_count);
    }

    pub fn drive_for(&self, drive_count: usize) -> usize {
        clamp_drive(self.selected_drive, drive_count)
    }
}

fn clamp_drive(index: usize, drive_count: usize) -> usize {
    if drive_count == 0 {
        return 0;
    }
    index.min(drive_count - 1)
}

// The overview prefers the boot drive when it is identifiable by letter.
fn primary_drive(drives: &[DriveStat]) -> Option<&DriveStat> {
    drives
        .iter()
        .find(|d| d.drive_letter.as_deref() == Some("C:"))
        .or_else(|| drives.first())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricField {
    pub text: String,
    pub class: Classification,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusField {
    pub text: String,
    pub class: Classification,
}

impl StatusField {
    fn from_class(class: Classification) -> Self {
        Self {
            text: class.label().to_string(),
            class,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewCard {
    pub header: String,
    pub name: String,
    pub main: String,
    pub secondary: String,
    pub class: Classification,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewModel {
    pub cpu: OverviewCard,
    pub gpu: OverviewCard,
    pub storage: OverviewCard,
    pub system: OverviewCard,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuViewModel {
    pub name: Option<String>,
    pub package_temp: MetricField,
    pub package_power: String,
    pub core_clock: Option<String>,
    pub usage: Option<String>,
    pub core_temps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuViewModel {
    pub name: Option<String>,
    pub hotspot_temp: MetricField,
    pub memory_junction_temp: Option<MetricField>,
    pub power: String,
    pub core_clock: Option<String>,
    pub memory_clock: Option<String>,
    pub usage: Option<String>,
    pub vram: Option<String>,
    pub fan: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveRow {
    pub name: String,
    pub letter: Option<String>,
    pub temp: MetricField,
    pub health: StatusField,
    pub capacity: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageViewModel {
    pub name: Option<String>,
    pub temp: MetricField,
    pub smart_health: StatusField,
    pub selected_drive: usize,
    pub drives: Vec<DriveRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanRow {
    pub name: String,
    pub rpm: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemViewModel {
    pub name: Option<String>,
    pub uptime: String,
    pub fan_status: StatusField,
    pub fans: Vec<FanRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceModel {
    pub status: ConnStatus,
    pub is_loading: bool,
    pub error: Option<String>,
    pub captured_at: Option<String>,
    pub time_since_update: String,
    pub diagnostics: Diagnostics,
    pub mock_mode: bool,
    pub auto_launch_host: bool,
}

pub fn overview_model(state: &PanelState) -> OverviewModel {
    let snapshot = state.snapshot.as_ref();
    let cpu = snapshot.map(|s| &s.cpu);
    let gpu = snapshot.map(|s| &s.gpu);
    let storage = snapshot.map(|s| &s.storage);
    let system = snapshot.map(|s| &s.system);
    let drives: &[DriveStat] = snapshot.map(|s| s.drives.as_slice()).unwrap_or(&[]);
    let primary = primary_drive(drives);

    let cpu_temp = cpu.and_then(|c| c.package_temp_c);
    let gpu_temp = gpu.and_then(|g| g.hotspot_temp_c);
    let drive_temp = primary
        .and_then(|d| d.temp_c)
        .or_else(|| storage.and_then(|s| s.nvme_temp_c));

    let storage_header = primary
        .and_then(|d| d.drive_letter.clone())
        .or_else(|| storage.and_then(|s| s.name.clone()))
        .unwrap_or_else(|| "Storage".to_string());
    let storage_health = primary
        .map(|d| d.smart_health)
        .or_else(|| storage.map(|s| s.smart_health));

    OverviewModel {
        cpu: OverviewCard {
            header: "CPU".to_string(),
            name: display_name(cpu.and_then(|c| c.name.as_deref())),
            main: format_temp_short(cpu_temp),
            secondary: format_value(cpu.and_then(|c| c.package_power_w), "W", 0),
            class: classify_temp(cpu_temp, CPU_PACKAGE_WARN_C),
        },
        gpu: OverviewCard {
            header: "GPU".to_string(),
            name: display_name(gpu.and_then(|g| g.name.as_deref())),
            main: format_temp_short(gpu_temp),
            secondary: format_value(gpu.and_then(|g| g.power_w), "W", 0),
            class: classify_temp(gpu_temp, GPU_HOTSPOT_WARN_C),
        },
        storage: OverviewCard {
            header: storage_header,
            name: display_name(primary.and_then(|d| d.name.as_deref())),
            main: format_temp_short(drive_temp),
            secondary: storage_health
                .map(|h| Classification::from(h).label().to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            class: classify_temp(drive_temp, DRIVE_TEMP_WARN_C),
        },
        system: OverviewCard {
            header: "System".to_string(),
            name: display_name(system.and_then(|s| s.name.as_deref())),
            main: format_uptime(system.and_then(|s| s.uptime_seconds)),
            secondary: system
                .map(|s| Classification::from(s.fan_status).label().to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            class: system
                .map(|s| Classification::from(s.fan_status))
                .unwrap_or(Classification::Unknown),
        },
    }
}

pub fn cpu_model(state: &PanelState) -> CpuViewModel {
    let cpu = state.snapshot.as_ref().map(|s| &s.cpu);

    CpuViewModel {
        name: cleaned_name(cpu.and_then(|c| c.name.as_deref())),
        package_temp: MetricField {
            text: format_value(cpu.and_then(|c| c.package_temp_c), "°C", 1),
            class: classify_temp(cpu.and_then(|c| c.package_temp_c), CPU_PACKAGE_WARN_C),
        },
        package_power: format_value(cpu.and_then(|c| c.package_power_w), "W", 1),
        core_clock: cpu
            .and_then(|c| c.core_clock_mhz)
            .map(|v| format_mhz(Some(v))),
        usage: cpu
            .and_then(|c| c.usage_percent)
            .map(|v| format_value(Some(v), "%", 0)),
        core_temps: cpu
            .map(|c| c.core_temps.iter().map(|t| format!("{t:.0}°")).collect())
            .unwrap_or_default(),
    }
}

pub fn gpu_model(state: &PanelState) -> GpuViewModel {
    let gpu = state.snapshot.as_ref().map(|s| &s.gpu);
    let hotspot = gpu.and_then(|g| g.hotspot_temp_c);
    let junction = gpu.and_then(|g| g.memory_junction_temp_c);

    GpuViewModel {
        name: cleaned_name(gpu.and_then(|g| g.name.as_deref())),
        hotspot_temp: MetricField {
            text: format_value(hotspot, "°C", 1),
            class: classify_temp(hotspot, GPU_HOTSPOT_WARN_C),
        },
        memory_junction_temp: junction.map(|v| MetricField {
            text: format_value(Some(v), "°C", 1),
            class: classify_temp(Some(v), GPU_MEMORY_JUNCTION_WARN_C),
        }),
        power: format_value(gpu.and_then(|g| g.power_w), "W", 1),
        core_clock: gpu
            .and_then(|g| g.core_clock_mhz)
            .map(|v| format_mhz(Some(v))),
        memory_clock: gpu
            .and_then(|g| g.memory_clock_mhz)
            .map(|v| format_mhz(Some(v))),
        usage: gpu
            .and_then(|g| g.usage_percent)
            .map(|v| format_value(Some(v), "%", 0)),
        vram: gpu
            .and_then(|g| g.vram_used_mb)
            .map(|used| format_vram(Some(used), gpu.and_then(|g| g.vram_total_mb))),
        fan: gpu
            .and_then(|g| g.fan_speed_rpm)
            .filter(|rpm| *rpm > 0.0)
            .map(|rpm| format_fan_speed(Some(rpm), gpu.and_then(|g| g.fan_speed_percent))),
    }
}

pub fn storage_model(state: &PanelState, view: &ViewState) -> StorageViewModel {
    let snapshot = state.snapshot.as_ref();
    let storage = snapshot.map(|s| &s.storage);
    let drives: &[DriveStat] = snapshot.map(|s| s.drives.as_slice()).unwrap_or(&[]);

    let selected = view.drive_for(drives.len());
    let selected_stat = drives.get(selected);

    let temp = selected_stat
        .and_then(|d| d.temp_c)
        .or_else(|| storage.and_then(|s| s.nvme_temp_c));
    let health = selected_stat
        .map(|d| d.smart_health)
        .or_else(|| storage.map(|s| s.smart_health))
        .map(Classification::from)
        .unwrap_or(Classification::Unknown);

    StorageViewModel {
        name: cleaned_name(
            selected_stat
                .and_then(|d| d.name.as_deref())
                .or_else(|| storage.and_then(|s| s.name.as_deref())),
        ),
        temp: MetricField {
            text: format_value(temp, "°C", 1),
            class: classify_temp(temp, DRIVE_TEMP_WARN_C),
        },
        smart_health: StatusField::from_class(health),
        selected_drive: selected,
        drives: drives.iter().map(drive_row).collect(),
    }
}

fn drive_row(drive: &DriveStat) -> DriveRow {
    DriveRow {
        name: display_name(drive.name.as_deref()),
        letter: drive.drive_letter.clone(),
        temp: MetricField {
            text: format_value(drive.temp_c, "°C", 1),
            class: classify_temp(drive.temp_c, DRIVE_TEMP_WARN_C),
        },
        health: StatusField::from_class(Classification::from(drive.smart_health)),
        capacity: format_capacity(drive.total_gb, drive.free_gb),
    }
}

pub fn system_model(state: &PanelState) -> SystemViewModel {
    let system = state.snapshot.as_ref().map(|s| &s.system);

    SystemViewModel {
        name: system.and_then(|s| s.name.clone()),
        uptime: format_uptime(system.and_then(|s| s.uptime_seconds)),
        fan_status: StatusField::from_class(
            system
                .map(|s| Classification::from(s.fan_status))
                .unwrap_or(Classification::Unknown),
        ),
        fans: system
            .map(|s| {
                s.fans
                    .iter()
                    .map(|f| FanRow {
                        name: f.name.clone(),
                        rpm: format_fan_speed(f.rpm, None),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

pub fn data_source_model(
    state: &PanelState,
    settings: &AppSettings,
    now_unix: i64,
) -> DataSourceModel {
    let status = state
        .snapshot
        .as_ref()
        .map(|s| s.status)
        .unwrap_or(ConnStatus::NotConnected);
    let diagnostics = state
        .snapshot
        .as_ref()
        .map(|s| s.diagnostics.clone())
        .unwrap_or_default();

    DataSourceModel {
        status,
        is_loading: state.is_loading,
        error: state.last_error.clone(),
        captured_at: state.captured_at_unix.map(rfc3339),
        time_since_update: time_since(state.captured_at_unix, now_unix),
        diagnostics,
        mock_mode: settings.mock_mode,
        auto_launch_host: settings.auto_launch_host,
    }
}

fn time_since(captured_at_unix: Option<i64>, now_unix: i64) -> String {
    let Some(captured) = captured_at_unix else {
        return PLACEHOLDER.to_string();
    };

    let diff = now_unix.saturating_sub(captured).max(0);
    if diff < 1 {
        "just now".to_string()
    } else {
        format!("{diff}s ago")
    }
}

fn rfc3339(unix: i64) -> String {
    let st = SystemTime::UNIX_EPOCH + Duration::from_secs(unix.max(0) as u64);
    humantime::format_rfc3339_seconds(st).to_string()
}

fn format_capacity(total_gb: Option<f64>, free_gb: Option<f64>) -> String {
    match (total_gb, free_gb) {
        (Some(total), Some(free)) => format!("{free:.0} / {total:.0} GB free"),
        (Some(total), None) => format!("{total:.0} GB"),
        _ => PLACEHOLDER.to_string(),
    }
}

fn cleaned_name(name: Option<&str>) -> Option<String> {
    name.map(clean_device_name).filter(|n| !n.is_empty())
}

fn display_name(name: Option<&str>) -> String {
    cleaned_name(name)
        .map(|n| shorten_name(&n, NAME_BUDGET))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}
