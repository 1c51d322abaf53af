//! USB Dongle Daemon - hot-key volume and profile service.
//!
//! Detects the first supported dongle, reads its state, optionally applies a
//! saved startup profile and then reacts to hot-key signals until shut down.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

mod config;
mod signals;

use config::Config;
use signals::HotKey;
use usbdongle_core::{FeatureValue, ProfileStore, UsbDongle};
use usbdongle_db::Database;
use usbdongle_hid::{DongleRepository, DongleWorker, UsbTransport, find_first_dongle};

const LOG_TARGETS: &[&str] = &["usbdongle_core", "usbdongle_hid", "usbdongle_db", "usbdongle_daemon"];
const STARTUP_LOG_LEVEL: &str = "info";

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[tokio::main]
async fn main() -> Result<()> {
    let log_filter = init_logging()?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting USB dongle daemon");

    let config = config::load_config()?;
    log_filter
        .reload(log_filter_for(&config.daemon.log_level)?)
        .context("Failed to apply configured log level")?;

    // Installed before any device I/O so early hot keys queue up instead of
    // terminating the process.
    let mut hotkeys = signals::setup_signal_handlers()?;

    let db = match &config.database.path {
        Some(path) => Database::open_at(path),
        None => Database::open(),
    }
    .context("Failed to open database")?;
    info!("Database initialized");

    let Some(device) = find_first_dongle().context("Failed to enumerate USB devices")? else {
        warn!("No supported dongle attached, exiting");
        return Ok(());
    };

    let transport =
        UsbTransport::new(config.device.usb_config()).context("Failed to initialize libusb")?;
    let repository =
        DongleRepository::new(transport).with_receive_timeout(config.device.receive_timeout());
    let worker = DongleWorker::new(repository, device);

    match worker.refresh().await {
        Ok(dongle) => log_snapshot("Dongle state loaded", &dongle),
        Err(e) => error!(error = %e, "Failed to read dongle state, continuing with defaults"),
    }

    if let Some(name) = &config.profiles.startup_profile {
        apply_startup_profile(&worker, &db, name, CancellationToken::new()).await;
    }

    info!("Daemon running");
    while let Some(key) = hotkeys.recv().await {
        if key == HotKey::Shutdown {
            break;
        }
        handle_hotkey(&worker, key, &config).await;
    }

    info!("USB dongle daemon stopped");
    Ok(())
}

fn log_filter_for(level: &str) -> Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env();
    for target in LOG_TARGETS {
        filter = filter.add_directive(
            format!("{target}={level}")
                .parse()
                .with_context(|| format!("Invalid log level: {level}"))?,
        );
    }
    Ok(filter)
}

/// Start logging at the startup level; the returned handle swaps in the
/// configured level once the config file has been read.
fn init_logging() -> Result<FilterHandle> {
    let (filter, handle) = reload::Layer::new(log_filter_for(STARTUP_LOG_LEVEL)?);
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
    Ok(handle)
}

fn log_snapshot(message: &str, dongle: &UsbDongle) {
    info!(
        model = %dongle.product_name(),
        volume_percent = dongle.volume_percent(),
        "{message}"
    );
    match serde_json::to_string(dongle) {
        Ok(json) => debug!(snapshot = %json, "Current snapshot"),
        Err(e) => debug!(error = %e, "Failed to serialize snapshot"),
    }
}

async fn apply_startup_profile<T>(
    worker: &DongleWorker<T>,
    db: &Database,
    name: &str,
    cancel: CancellationToken,
) where
    T: usbdongle_hid::Transport + 'static,
{
    let dongle = worker.snapshot();
    let profile = match db.find_profile(dongle.vendor_id(), dongle.product_id(), name) {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            warn!(profile = name, model = %dongle.product_name(), "Startup profile not found");
            return;
        }
        Err(e) => {
            error!(error = %e, profile = name, "Failed to load startup profile");
            return;
        }
    };

    match worker.apply_profile(profile, cancel).await {
        Ok(dongle) => log_snapshot("Startup profile applied", &dongle),
        Err(e) => {
            error!(error = %e, profile = name, "Startup profile only partially applied");
            log_snapshot("Dongle state after partial apply", &e.dongle);
        }
    }
}

async fn handle_hotkey<T>(worker: &DongleWorker<T>, key: HotKey, config: &Config)
where
    T: usbdongle_hid::Transport + 'static,
{
    let step = config.device.volume_step;
    if matches!(key, HotKey::VolumeUp | HotKey::VolumeDown) {
        // The knob may have moved since the last read.
        if let Err(e) = worker.refresh_volume().await {
            warn!(error = %e, "Failed to re-read volume, stepping from last snapshot");
        }
    }

    let result = match key {
        HotKey::VolumeUp => worker.volume_up(step).await,
        HotKey::VolumeDown => worker.volume_down(step).await,
        HotKey::ToggleDisplayInvert => {
            let UsbDongle::FiioKa5(ka5) = worker.snapshot().as_ref().clone() else {
                warn!("Display invert is not supported by this dongle");
                return;
            };
            worker
                .set_feature(FeatureValue::DisplayInvert(ka5.display_invert().toggled()))
                .await
        }
        HotKey::Shutdown => return,
    };

    match result {
        Ok(dongle) => log_snapshot("Hot key handled", &dongle),
        Err(e) => warn!(error = %e, ?key, "Hot key failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_for_levels() {
        assert!(log_filter_for(STARTUP_LOG_LEVEL).is_ok());
        assert!(log_filter_for("debug").is_ok());
        assert!(log_filter_for("not a level!").is_err());
    }
}
