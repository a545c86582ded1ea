//! Locker client demo: drives a simulated fleet through a full session.
//!
//! The binary wires the coordinator to the in-memory
//! [`SimulatedTransport`] and walks through the flow a UI would: power on
//! the adapter, scan, connect, enable encryption, open the lock, fetch and
//! validate device info, disconnect.  Every step prints the bridge's JSON
//! envelope to stdout.
//!
//! # Usage
//!
//! ```text
//! locker-client [OPTIONS]
//!
//! Options:
//!   --config <PATH>        Config file [default: platform config dir]
//!   --project-id <ID>      Overrides `sdk.project_id`
//!   --log-level <FILTER>   Overrides `sdk.log_level` (RUST_LOG wins over both)
//!   --password <TEXT>      Password sent to the lock [default: 1234]
//!   --latency-ms <MS>      Simulated radio latency [default: 25]
//!   --save-config          Writes the resolved config back to the config file
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use locker_client::application::adapter_availability::{AdapterAvailabilityMonitor, AdapterState};
use locker_client::application::coordinator::{ChannelCapacity, ConnectionCoordinator};
use locker_client::infrastructure::storage::config::{
    load_config, load_config_from, save_config, save_config_to, LockerConfig,
};
use locker_client::infrastructure::transport::simulated::{SimulatedLocker, SimulatedTransport};
use locker_client::infrastructure::ui_bridge::{
    connect_device, get_registry, get_session, render_result, ResultEnvelope,
};
use locker_core::{DeviceId, DeviceInfoRequestKind, EncryptionState};

/// Id of the demo locker that belongs to the configured project.
const DEMO_LOCKER: DeviceId = DeviceId(1001);
/// Id of a locker from another project; never reported.
const FOREIGN_LOCKER: DeviceId = DeviceId(2002);
const DEMO_PASSWORD: u64 = 1234;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Locker client demo against a simulated fleet.
#[derive(Debug, Parser)]
#[command(name = "locker-client", about = "Locker client demo", version)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "LOCKERCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Project id whose controllers are reported.
    #[arg(long, env = "LOCKERCTL_PROJECT_ID")]
    project_id: Option<u32>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "LOCKERCTL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Password text sent with the unlock command.
    #[arg(long, default_value = "1234")]
    password: String,

    /// Simulated radio latency in milliseconds.
    #[arg(long, default_value_t = 25)]
    latency_ms: u64,

    /// Persist the resolved config (file plus overrides) before running.
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    /// Loads the config file and applies CLI overrides on top.
    fn resolve_config(&self) -> anyhow::Result<LockerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => load_config().context("failed to load config")?,
        };
        if let Some(project_id) = self.project_id {
            config.sdk.project_id = project_id;
        }
        if let Some(level) = &self.log_level {
            config.sdk.log_level = level.clone();
        }
        Ok(config)
    }

    fn persist_config(&self, config: &LockerConfig) -> anyhow::Result<()> {
        match &self.config {
            Some(path) => save_config_to(path, config)
                .with_context(|| format!("failed to save config to {}", path.display())),
            None => save_config(config).context("failed to save config"),
        }
    }
}

fn print_step<T: Serialize>(step: &str, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to render step")?;
    println!("── {step}\n{json}");
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.sdk.log_level)),
        )
        .init();

    info!(project_id = config.sdk.project_id, "locker client starting");
    if cli.save_config {
        cli.persist_config(&config)?;
        info!("config saved");
    }

    // ── Wiring ────────────────────────────────────────────────────────────────
    let (transport, lifecycle) = SimulatedTransport::with_latency(
        config.sdk.project_id,
        config.coordinator.event_capacity,
        Duration::from_millis(cli.latency_ms),
    );
    let locker = SimulatedLocker::new(DEMO_LOCKER, config.sdk.project_id, DEMO_PASSWORD);
    transport.add_locker(locker.clone());
    transport.add_locker(SimulatedLocker::new(
        FOREIGN_LOCKER,
        config.sdk.project_id.wrapping_add(1),
        DEMO_PASSWORD,
    ));
    transport.bring_in_range(DEMO_LOCKER);
    transport.bring_in_range(FOREIGN_LOCKER);

    let adapter = AdapterAvailabilityMonitor::default();
    let coordinator = ConnectionCoordinator::spawn(
        transport.clone(),
        lifecycle,
        adapter.clone(),
        ChannelCapacity::from(&config.coordinator),
    );
    let mut events = coordinator.events();

    // ── Scan ──────────────────────────────────────────────────────────────────
    let refused: ResultEnvelope<()> = coordinator.start_scan().await.into();
    print_step("start scan with adapter off", &refused)?;

    adapter.update(AdapterState::PoweredOn);
    let started: ResultEnvelope<()> = coordinator.start_scan().await.into();
    print_step("start scan", &started)?;

    let mut snapshots = coordinator.subscribe();
    tokio::time::timeout(
        Duration::from_secs(2),
        snapshots.wait_for(|s| s.nearby.iter().any(|d| d.id() == DEMO_LOCKER)),
    )
    .await
    .context("demo locker was not discovered in time")?
    .context("coordinator stopped")
    .map(|_| ())?;
    print_step("registry", &get_registry(&coordinator).await)?;

    // ── Session ───────────────────────────────────────────────────────────────
    print_step("connect", &connect_device(&coordinator, DEMO_LOCKER).await)?;
    let session = coordinator
        .session(DEMO_LOCKER)
        .await
        .context("no session after connect")?;

    let encryption = session.enable_encryption().await;
    print_step(
        "enable encryption",
        &ResultEnvelope::<EncryptionState>::from(encryption),
    )?;

    let opened = session.open_lock(&cli.password).await;
    print_step("open lock", &render_result(&opened))?;

    for kind in DeviceInfoRequestKind::ALL {
        let public_key = match kind {
            DeviceInfoRequestKind::None => String::new(),
            DeviceInfoRequestKind::ProjectKey => locker.project_public_key(),
            DeviceInfoRequestKind::DeviceKey => locker.device_public_key(),
        };
        let info = session.request_device_info(kind, &public_key).await;
        print_step(&format!("device info ({kind})"), &render_result(&info))?;
    }

    print_step("session", &get_session(&coordinator, DEMO_LOCKER).await)?;

    // ── Teardown ──────────────────────────────────────────────────────────────
    let disconnected: ResultEnvelope<()> = coordinator.disconnect(DEMO_LOCKER).await.into();
    print_step("disconnect", &disconnected)?;
    coordinator.stop_scan().await;
    print_step("registry", &get_registry(&coordinator).await)?;

    while let Ok(event) = events.try_recv() {
        print_step("event", &event)?;
    }

    info!("locker client finished");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
