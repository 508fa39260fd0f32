//! droid-bench - desktop shell for ADB/Fastboot device management
//!
//! This is the binary entry point. All logic lives in the member crates.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use dbench_app::{DeviceStore, OutputDirs, Settings};
use dbench_core::prelude::*;
use dbench_core::{ConsoleLog, Device};
use dbench_rpc::{locate_backend, BackendProcess, RpcBackend};

/// droid-bench - desktop shell for ADB/Fastboot device management
#[derive(Parser, Debug)]
#[command(name = "dbench")]
#[command(about = "Desktop shell for ADB/Fastboot device management", long_about = None)]
struct Args {
    /// Path to the backend daemon executable (PATH lookup otherwise)
    #[arg(long, value_name = "PATH")]
    backend: Option<PathBuf>,

    /// Device poll period in milliseconds
    #[arg(long, value_name = "MS")]
    interval: Option<u64>,

    /// Run without a UI, printing device snapshots as JSON lines
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dbench_core::logging::init()?;

    let args = Args::parse();

    // CLI flags override the persisted settings for this run only
    let mut settings = Settings::load()?;
    if let Some(ms) = args.interval {
        settings.device.refresh_interval_ms = ms;
    }
    if let Some(path) = args.backend {
        settings.backend.program = Some(path);
    }

    let program = locate_backend(settings.backend.program.as_deref())?;
    let process = BackendProcess::spawn(&program)?;
    let client = process
        .client()
        .with_timeout(Duration::from_secs(settings.backend.request_timeout_secs));

    let backend = Arc::new(RpcBackend::new(client));
    let console = Arc::new(ConsoleLog::new());
    let devices = DeviceStore::new(
        Arc::clone(&backend),
        Arc::clone(&console),
        settings.device.refresh_interval_ms,
    );
    let output_dirs = OutputDirs::new(Arc::clone(&backend), Arc::clone(&console));

    info!("Output directory: {}", output_dirs.init().await.display());

    devices.start_monitor();

    if args.headless {
        run_headless(&devices).await;
    } else {
        run_attached(&devices).await;
    }

    devices.stop_monitor();
    process.shutdown().await;
    Ok(())
}

/// Print a JSON snapshot line whenever the device state changes.
async fn run_headless(devices: &DeviceStore<RpcBackend>) {
    let mut ticker =
        tokio::time::interval(Duration::from_millis(devices.refresh_interval_ms().min(1000)));
    let mut last = serde_json::Value::Null;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let snapshot = serde_json::json!({
                    "devices": devices.devices(),
                    "current": devices.current_device(),
                    "info": devices.device_info(),
                    "connected": devices.is_connected(),
                });
                if snapshot != last {
                    println!("{snapshot}");
                    last = snapshot;
                }
            }
        }
    }
}

/// Report device arrivals and departures until ctrl-c.
async fn run_attached(devices: &DeviceStore<RpcBackend>) {
    println!(
        "Monitoring devices every {} ms (ctrl-c to exit)",
        devices.refresh_interval_ms()
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let mut known: Vec<Device> = Vec::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let current = devices.devices();
                for device in &current {
                    if !known.iter().any(|d| d.serial == device.serial) {
                        println!("+ {} [{}]", device.display_name(), device.status);
                    }
                }
                for device in &known {
                    if !current.iter().any(|d| d.serial == device.serial) {
                        println!("- {}", device.display_name());
                    }
                }
                known = current;
            }
        }
    }

    println!("Stopping.");
}
