use crate::snapshot::{
    ConnStatus, Diagnostics, DriveStat, FanReading, FanStatus, SensorSnapshot, SmartHealth,
};
use std::time::{SystemTime, UNIX_EPOCH};
use sysinfo::{System, SystemExt};

// Values wobble with wall-clock phase instead of an RNG, so consecutive
// polls look alive but a single millisecond is reproducible.
pub fn synthetic_snapshot() -> SensorSnapshot {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let variation = ((now_ms % 1000) as f64 / 1000.0) * 10.0 - 5.0;

    let system = System::new();

    let mut snapshot = SensorSnapshot {
        status: ConnStatus::Connected,
        captured_at_unix: None,
        diagnostics: Diagnostics {
            host_process_detected: true,
            shared_channel_detected: true,
            message: Some("Mock mode enabled".to_string()),
        },
        ..SensorSnapshot::default()
    };

    snapshot.cpu.name = Some("CPU [#0]: AMD Ryzen 9 7950X".to_string());
    snapshot.cpu.package_temp_c = Some(55.0 + variation);
    snapshot.cpu.package_power_w = Some(65.0 + variation * 2.0);
    snapshot.cpu.core_clock_mhz = Some(4_550.0 + variation * 40.0);
    snapshot.cpu.usage_percent = Some(18.0 + variation);
    snapshot.cpu.core_temps = (0..16)
        .map(|core| 48.0 + variation + (core % 4) as f64)
        .collect();

    snapshot.gpu.name = Some("GPU [#0]: NVIDIA GeForce RTX 4090".to_string());
    snapshot.gpu.hotspot_temp_c = Some(72.0 + variation);
    snapshot.gpu.memory_junction_temp_c = Some(68.0 + variation * 0.8);
    snapshot.gpu.power_w = Some(180.0 + variation * 5.0);
    snapshot.gpu.core_clock_mhz = Some(2_520.0 + variation * 15.0);
    snapshot.gpu.memory_clock_mhz = Some(10_501.0);
    snapshot.gpu.usage_percent = Some(35.0 + variation * 3.0);
    snapshot.gpu.vram_used_mb = Some(11_468.0 + variation * 100.0);
    snapshot.gpu.vram_total_mb = Some(24_576.0);
    snapshot.gpu.fan_speed_rpm = Some(1_450.0 + variation * 20.0);
    snapshot.gpu.fan_speed_percent = Some(43.0 + variation);

    snapshot.storage.name = Some("Samsung SSD 990 PRO 2TB".to_string());
    snapshot.storage.nvme_temp_c = Some(42.0 + variation * 0.5);
    snapshot.storage.smart_health = SmartHealth::Good;

    snapshot.drives = vec![
        DriveStat {
            name: Some("S.M.A.R.T.: Samsung SSD 990 PRO 2TB [C:] SCSI".to_string()),
            drive_letter: Some("C:".to_string()),
            temp_c: Some(42.0 + variation * 0.5),
            smart_health: SmartHealth::Good,
            total_gb: Some(1_863.0),
            free_gb: Some(712.0),
        },
        DriveStat {
            name: Some("S.M.A.R.T.: WD Black SN850X 4TB [D:] SCSI".to_string()),
            drive_letter: Some("D:".to_string()),
            temp_c: Some(38.0 + variation * 0.3),
            smart_health: SmartHealth::Good,
            total_gb: Some(3_726.0),
            free_gb: Some(1_204.0),
        },
    ];

    snapshot.system.name = system.host_name();
    snapshot.system.uptime_seconds = Some(system.uptime());
    snapshot.system.fan_status = FanStatus::Ok;
    snapshot.system.fans = vec![
        FanReading {
            name: "CPU Fan".to_string(),
            rpm: Some(1_450.0 + variation * 20.0),
        },
        FanReading {
            name: "Chassis Fan #1".to_string(),
            rpm: Some(980.0 + variation * 10.0),
        },
    ];

    snapshot.sanitized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_snapshot_covers_every_view() {
        let snapshot = synthetic_snapshot();

        assert_eq!(snapshot.status, ConnStatus::Connected);
        assert!(snapshot.diagnostics.host_process_detected);
        assert!(snapshot.cpu.package_temp_c.is_some());
        assert_eq!(snapshot.cpu.core_temps.len(), 16);
        assert!(snapshot.gpu.memory_junction_temp_c.is_some());
        assert!(snapshot.gpu.vram_total_mb.is_some());
        assert_eq!(snapshot.drives.len(), 2);
        assert_eq!(snapshot.drives[0].drive_letter.as_deref(), Some("C:"));
        assert_eq!(snapshot.system.fan_status, FanStatus::Ok);
        assert_eq!(snapshot.system.fans.len(), 2);
    }

    #[test]
    fn synthetic_values_stay_physical() {
        let snapshot = synthetic_snapshot();

        for temp in [
            snapshot.cpu.package_temp_c,
            snapshot.gpu.hotspot_temp_c,
            snapshot.storage.nvme_temp_c,
        ] {
            let temp = temp.expect("температура присутствует");
            assert!(temp.is_finite() && temp >= 0.0);
        }
        assert!(snapshot.cpu.core_temps.iter().all(|t| *t >= 0.0));
    }
}
