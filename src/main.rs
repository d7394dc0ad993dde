mod config;
mod host;
mod http;
mod metrics;
mod mock;
mod poller;
mod rules;
mod settings;
mod snapshot;
mod state;
mod views;

use axum::serve;
use clap::Parser;
use config::Config;
use host::HostClient;
use metrics::Metrics;
use poller::Sampler;
use settings::{AppSettings, SettingsStore};
use state::PanelState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use views::ViewState;

#[derive(Parser, Debug)]
#[command(name = "paneld")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
    #[arg(long, conflicts_with = "mock_off")]
    mock_on: bool,
    #[arg(long, conflicts_with = "mock_on")]
    mock_off: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match Config::load_from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "не удалось загрузить конфигурацию");
            std::process::exit(1);
        }
    };

    info!(
        listen = %cfg.listen,
        poll_interval_ms = cfg.poll_interval_ms,
        host = %cfg.host.base_url,
        "запуск paneld"
    );

    let now = poller::now_unix();
    let shared_state = Arc::new(RwLock::new(PanelState::new(now)));
    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(err) => {
            error!(error = %err, "не удалось инициализировать метрики");
            std::process::exit(1);
        }
    };
    let host_client = HostClient::new(&cfg.host);

    // Настройки загружаются с хоста один раз; его недоступность не должна
    // мешать панели подняться.
    let mut initial_settings = match host_client.get_settings().await {
        Ok(settings) => settings,
        Err(err) => {
            warn!(error = %err, "не удалось загрузить настройки с хоста, используются значения по умолчанию");
            AppSettings::default()
        }
    };
    if cli.mock_on {
        initial_settings.mock_mode = true;
    } else if cli.mock_off {
        initial_settings.mock_mode = false;
    }
    let settings = SettingsStore::new(initial_settings);

    if settings.current().await.auto_launch_host {
        let host_client = host_client.clone();
        let path_override = settings.current().await.host_path_override;
        tokio::spawn(async move {
            if let Err(err) = host_client.launch_host(path_override.as_deref()).await {
                warn!(error = %err, "автозапуск хост-процесса не удался");
            }
        });
    }

    let view = Arc::new(RwLock::new(ViewState::default()));
    let sampler = Sampler::new(
        shared_state.clone(),
        settings.clone(),
        host_client.clone(),
        metrics.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_task = {
        let cfg = cfg.clone();
        let app_state = http::HttpAppState {
            metrics: metrics.clone(),
            state: shared_state.clone(),
            settings: settings.clone(),
            view: view.clone(),
            host: host_client.clone(),
            sampler: sampler.clone(),
        };
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let app = http::build_router(app_state);
            let addr: SocketAddr = match cfg.listen.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    error!(error = %err, listen = %cfg.listen, "некорректный адрес listen");
                    return;
                }
            };

            let listener = match TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(err) => {
                    error!(error = %err, "не удалось запустить HTTP-сервер");
                    return;
                }
            };

            let server = serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });

            if let Err(err) = server.await {
                error!(error = %err, "ошибка HTTP-сервера");
            }
        })
    };

    let poller_task = poller::spawn(sampler, cfg.poll_interval_ms, shutdown_rx.clone());

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "не удалось дождаться Ctrl+C");
    }
    info!("получен Ctrl+C, выполняется остановка");

    let _ = shutdown_tx.send(true);

    let _ = poller_task.await;
    let _ = http_task.await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
