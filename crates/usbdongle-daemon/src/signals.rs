//! Signal handling for hot keys and graceful shutdown.

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::info;

/// Actions that can be triggered from outside the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotKey {
    VolumeUp,
    VolumeDown,
    ToggleDisplayInvert,
    Shutdown,
}

/// Set up signal handlers.
///
/// `SIGUSR1` and `SIGUSR2` step the volume up and down, `SIGHUP` toggles the
/// display orientation, `SIGTERM` and `SIGINT` request shutdown.
pub fn setup_signal_handlers() -> Result<mpsc::Receiver<HotKey>> {
    let (tx, rx) = mpsc::channel(8);

    for (kind, name, key) in [
        (SignalKind::user_defined1(), "SIGUSR1", HotKey::VolumeUp),
        (SignalKind::user_defined2(), "SIGUSR2", HotKey::VolumeDown),
        (SignalKind::hangup(), "SIGHUP", HotKey::ToggleDisplayInvert),
        (SignalKind::terminate(), "SIGTERM", HotKey::Shutdown),
    ] {
        let mut stream = signal(kind).with_context(|| format!("Failed to install {name} handler"))?;
        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                info!(signal = name, "Received signal");
                if tx.send(key).await.is_err() {
                    break;
                }
            }
        });
    }

    // Handle SIGINT (Ctrl+C)
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT");
            let _ = tx.send(HotKey::Shutdown).await;
        }
    });

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_usr1_is_queued_as_volume_up() {
        let mut hotkeys = setup_signal_handlers().unwrap();

        let status = std::process::Command::new("kill")
            .args(["-USR1", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let key = tokio::time::timeout(Duration::from_secs(5), hotkeys.recv()).await.unwrap();
        assert_eq!(key, Some(HotKey::VolumeUp));
    }
}
