use crate::state::PanelState;
use prometheus::core::Collector;
use prometheus::{opts, Counter, Encoder, Gauge, GaugeVec, Registry, TextEncoder};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub panel_connected: Gauge,
    pub panel_loading: Gauge,
    pub panel_poll_total: Gauge,
    pub panel_poll_errors_total: Gauge,
    pub panel_last_capture_timestamp_seconds: Gauge,
    pub panel_cpu_package_temp_celsius: Gauge,
    pub panel_cpu_package_power_watts: Gauge,
    pub panel_cpu_usage_percent: Gauge,
    pub panel_gpu_hotspot_temp_celsius: Gauge,
    pub panel_gpu_memory_junction_temp_celsius: Gauge,
    pub panel_gpu_power_watts: Gauge,
    pub panel_gpu_usage_percent: Gauge,
    pub panel_drive_temp_celsius: GaugeVec,
    pub panel_drive_count: Gauge,
    pub panel_fan_rpm: GaugeVec,
    pub panel_system_uptime_seconds: Gauge,
    pub panel_uptime_seconds: Gauge,
    pub panel_scrape_count_total: Counter,
    pub panel_settings_persist_errors_total: Counter,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let panel_connected = Gauge::with_opts(opts!(
            "panel_connected",
            "Whether the latest applied snapshot reports the host as connected (0/1)"
        ))?;
        let panel_loading = Gauge::with_opts(opts!(
            "panel_loading",
            "Whether the first fetch is still pending (0/1)"
        ))?;
        let panel_poll_total =
            Gauge::with_opts(opts!("panel_poll_total", "Applied fetch cycles total"))?;
        let panel_poll_errors_total = Gauge::with_opts(opts!(
            "panel_poll_errors_total",
            "Applied fetch cycles that failed"
        ))?;
        let panel_last_capture_timestamp_seconds = Gauge::with_opts(opts!(
            "panel_last_capture_timestamp_seconds",
            "Unix timestamp of the last connected snapshot"
        ))?;
        let panel_cpu_package_temp_celsius = Gauge::with_opts(opts!(
            "panel_cpu_package_temp_celsius",
            "CPU package temperature in Celsius"
        ))?;
        let panel_cpu_package_power_watts = Gauge::with_opts(opts!(
            "panel_cpu_package_power_watts",
            "CPU package power draw in watts"
        ))?;
        let panel_cpu_usage_percent = Gauge::with_opts(opts!(
            "panel_cpu_usage_percent",
            "CPU usage in percent (0..100)"
        ))?;
        let panel_gpu_hotspot_temp_celsius = Gauge::with_opts(opts!(
            "panel_gpu_hotspot_temp_celsius",
            "GPU hotspot temperature in Celsius"
        ))?;
        let panel_gpu_memory_junction_temp_celsius = Gauge::with_opts(opts!(
            "panel_gpu_memory_junction_temp_celsius",
            "GPU memory junction temperature in Celsius"
        ))?;
        let panel_gpu_power_watts = Gauge::with_opts(opts!(
            "panel_gpu_power_watts",
            "GPU power draw in watts"
        ))?;
        let panel_gpu_usage_percent = Gauge::with_opts(opts!(
            "panel_gpu_usage_percent",
            "GPU usage in percent (0..100)"
        ))?;
        let panel_drive_temp_celsius = GaugeVec::new(
            opts!(
                "panel_drive_temp_celsius",
                "Drive temperature in Celsius by drive"
            ),
            &["drive"],
        )?;
        let panel_drive_count =
            Gauge::with_opts(opts!("panel_drive_count", "Number of reported drives"))?;
        let panel_fan_rpm = GaugeVec::new(
            opts!("panel_fan_rpm", "Fan speed in RPM by fan"),
            &["fan"],
        )?;
        let panel_system_uptime_seconds = Gauge::with_opts(opts!(
            "panel_system_uptime_seconds",
            "Monitored system uptime in seconds"
        ))?;
        let panel_uptime_seconds = Gauge::with_opts(opts!(
            "panel_uptime_seconds",
            "paneld process uptime in seconds"
        ))?;
        let panel_scrape_count_total = Counter::with_opts(opts!(
            "panel_scrape_count_total",
            "Number of /metrics scrapes"
        ))?;
        let panel_settings_persist_errors_total = Counter::with_opts(opts!(
            "panel_settings_persist_errors_total",
            "Settings persistence attempts that failed"
        ))?;

        register(&registry, &panel_connected)?;
        register(&registry, &panel_loading)?;
        register(&registry, &panel_poll_total)?;
        register(&registry, &panel_poll_errors_total)?;
        register(&registry, &panel_last_capture_timestamp_seconds)?;
        register(&registry, &panel_cpu_package_temp_celsius)?;
        register(&registry, &panel_cpu_package_power_watts)?;
        register(&registry, &panel_cpu_usage_percent)?;
        register(&registry, &panel_gpu_hotspot_temp_celsius)?;
        register(&registry, &panel_gpu_memory_junction_temp_celsius)?;
        register(&registry, &panel_gpu_power_watts)?;
        register(&registry, &panel_gpu_usage_percent)?;
        register(&registry, &panel_drive_temp_celsius)?;
        register(&registry, &panel_drive_count)?;
        register(&registry, &panel_fan_rpm)?;
        register(&registry, &panel_system_uptime_seconds)?;
        register(&registry, &panel_uptime_seconds)?;
        register(&registry, &panel_scrape_count_total)?;
        register(&registry, &panel_settings_persist_errors_total)?;

        Ok(Arc::new(Self {
            registry,
            panel_connected,
            panel_loading,
            panel_poll_total,
            panel_poll_errors_total,
            panel_last_capture_timestamp_seconds,
            panel_cpu_package_temp_celsius,
            panel_cpu_package_power_watts,
            panel_cpu_usage_percent,
            panel_gpu_hotspot_temp_celsius,
            panel_gpu_memory_junction_temp_celsius,
            panel_gpu_power_watts,
            panel_gpu_usage_percent,
            panel_drive_temp_celsius,
            panel_drive_count,
            panel_fan_rpm,
            panel_system_uptime_seconds,
            panel_uptime_seconds,
            panel_scrape_count_total,
            panel_settings_persist_errors_total,
        }))
    }

    pub fn update_from_state(&self, state: &PanelState) {
        self.panel_connected
            .set(if state.connected() { 1.0 } else { 0.0 });
        self.panel_loading
            .set(if state.is_loading { 1.0 } else { 0.0 });
        self.panel_poll_total.set(state.poll_total as f64);
        self.panel_poll_errors_total.set(state.poll_errors as f64);
        if let Some(ts) = state.captured_at_unix {
            self.panel_last_capture_timestamp_seconds.set(ts as f64);
        }

        self.panel_drive_temp_celsius.reset();
        self.panel_fan_rpm.reset();

        let Some(snapshot) = &state.snapshot else {
            let now = now_unix();
            self.panel_uptime_seconds
                .set(now.saturating_sub(state.started_at_unix) as f64);
            return;
        };

        if let Some(v) = snapshot.cpu.package_temp_c {
            self.panel_cpu_package_temp_celsius.set(v);
        }
        if let Some(v) = snapshot.cpu.package_power_w {
            self.panel_cpu_package_power_watts.set(v);
        }
        if let Some(v) = snapshot.cpu.usage_percent {
            self.panel_cpu_usage_percent.set(v);
        }
        if let Some(v) = snapshot.gpu.hotspot_temp_c {
            self.panel_gpu_hotspot_temp_celsius.set(v);
        }
        if let Some(v) = snapshot.gpu.memory_junction_temp_c {
            self.panel_gpu_memory_junction_temp_celsius.set(v);
        }
        if let Some(v) = snapshot.gpu.power_w {
            self.panel_gpu_power_watts.set(v);
        }
        if let Some(v) = snapshot.gpu.usage_percent {
            self.panel_gpu_usage_percent.set(v);
        }

        self.panel_drive_count.set(snapshot.drives.len() as f64);
        for (index, drive) in snapshot.drives.iter().enumerate() {
            let label = drive
                .drive_letter
                .clone()
                .or_else(|| drive.name.clone())
                .unwrap_or_else(|| index.to_string());
            if let Some(v) = drive.temp_c {
                self.panel_drive_temp_celsius
                    .with_label_values(&[&label])
                    .set(v);
            }
        }

        for fan in &snapshot.system.fans {
            if let Some(rpm) = fan.rpm {
                self.panel_fan_rpm.with_label_values(&[&fan.name]).set(rpm);
            }
        }
        if let Some(v) = snapshot.system.uptime_seconds {
            self.panel_system_uptime_seconds.set(v as f64);
        }

        let now = now_unix();
        self.panel_uptime_seconds
            .set(now.saturating_sub(state.started_at_unix) as f64);
    }

    pub fn inc_scrape_count(&self) {
        self.panel_scrape_count_total.inc();
    }

    pub fn inc_settings_persist_error(&self) {
        self.panel_settings_persist_errors_total.inc();
    }

    pub fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf)?;
        Ok(buf)
    }
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
