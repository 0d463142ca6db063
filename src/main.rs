use std::error::Error;
use tracing::{error, info};

mod ais_targets;
mod app_metrics;
mod ble_notifier;
mod command_intake;
mod config;
mod error;
mod gateway;
mod line_reader;
mod measurement;
mod network_identity;
mod pipeline;
mod sentence_decoder;
mod serial_transport;
mod state_store;
mod stream_hub;
mod tcp_broadcaster;
mod utilities;
mod vessel_state;
mod vessel_state_handler;
mod web;
mod work_queue;

use config::{Config, SettingsProvider};
use gateway::Gateway;

const CONFIG_FILE: &str = "config.json";

// ========== Logging Setup ==========

fn init_logging(log_config: &config::LogConfig) -> Result<(), Box<dyn Error>> {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    std::fs::create_dir_all(&log_config.directory)?;
    let file_appender = rolling::daily(&log_config.directory, &log_config.file_prefix);

    let timer = || {
        fmt::time::OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
            fmt::time::OffsetTime::new(time::UtcOffset::UTC, time::format_description::well_known::Rfc3339)
        })
    };

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_timer(timer());

    let console_layer = fmt::layer().with_writer(std::io::stdout).with_timer(timer());

    // RUST_LOG wins over the configured level
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

fn print_help() {
    println!("Marine Gateway");
    println!();
    println!("USAGE:");
    println!("    marine_gateway [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --validate-config, --validate, -v    Validate configuration and exit");
    println!("    --help, -h                           Show this help message");
    println!();
    println!("Configuration file: {} (in current directory)", CONFIG_FILE);
}

fn print_summary(cfg: &Config) {
    let uart = cfg.uart_settings();
    println!("✓ Configuration validation successful");
    println!(
        "  Serial: {} at {} baud, {} data bits, parity {:?}, {} stop bits",
        uart.port, uart.baud_rate, uart.data_bits, uart.parity, uart.stop_bits
    );
    println!(
        "  Pipeline: queue {} entries, enqueue timeout {} ms, adaptive backpressure {}",
        cfg.pipeline.queue_capacity, cfg.pipeline.enqueue_timeout_ms, cfg.pipeline.adaptive_backpressure
    );
    println!("  TCP: {} (max {} clients)", cfg.tcp.listen_address(), cfg.tcp.max_clients);
    println!(
        "  Web: {} ({})",
        cfg.web.listen_address(),
        if cfg.web.enabled { "enabled" } else { "disabled" }
    );
    println!(
        "  BLE: '{}' every {} ms ({})",
        cfg.ble.device_name,
        cfg.ble.update_interval_ms,
        if cfg.ble.enabled { "enabled" } else { "disabled" }
    );
    println!(
        "  State: data timeout {} s, AIS timeout {} s, max {} AIS targets",
        cfg.state.data_timeout_s, cfg.state.ais_timeout_s, cfg.state.max_ais_targets
    );
}

// ========== Main Application ==========

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    let has = |flag: &str| args.iter().any(|a| a == flag);

    if has("--help") || has("-h") {
        print_help();
        std::process::exit(0);
    }

    let validate_only = has("--validate-config") || has("--validate") || has("-v");

    let config = match Config::from_file(CONFIG_FILE) {
        Ok(cfg) => {
            if validate_only {
                print_summary(&cfg);
                std::process::exit(0);
            }
            cfg
        }
        Err(e) => {
            if validate_only {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
            eprintln!("Warning: Could not load {}: {}", CONFIG_FILE, e);
            eprintln!("Using default configuration");
            Config::default()
        }
    };

    init_logging(&config.logging)?;
    info!("Marine Gateway starting...");

    let gateway = match Gateway::start(&config) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!("Failed to start gateway: {}", e);
            return Err(e.into());
        }
    };

    info!("Streaming NMEA to TCP clients on {}", gateway.tcp_address());

    // The pipeline runs on its own threads; main only waits for a stop signal
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(tokio::signal::ctrl_c())?;
    info!("Stop signal received");
    gateway.metrics().log();

    gateway.shutdown();
    Ok(())
}
