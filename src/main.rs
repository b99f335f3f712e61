//! # Touch Gamepad
//!
//! Turn a Linux touchscreen into a virtual game controller.
//!
//! Reads multitouch input via evdev, maps touches on the on-screen joystick
//! and buttons to controller events, and streams them over a WebSocket to
//! the receiver.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use touch_gamepad::config::{Config, LoggingConfig};
use touch_gamepad::input::NoHaptics;
use touch_gamepad::runtime::{log_status, Runtime};
use touch_gamepad::session::{FileIdentityProvider, SessionManager};
use touch_gamepad::touch::{ContactDecoder, Dispatcher, SurfaceMapping, TouchDevice};

/// Environment variable overriding the configuration file location
const CONFIG_ENV: &str = "TOUCH_GAMEPAD_CONFIG";

/// Configuration file used when `TOUCH_GAMEPAD_CONFIG` is not set
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for Touch Gamepad
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and set up logging
///    - Resolve the client id and derive the receiver endpoint
///    - Open the touchscreen
///
/// 2. **Event Loop**
///    - Connect to the receiver
///    - Forward touch input as controller events, ping every heartbeat period
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Shutdown**
///    - Release held controls, stop the heartbeat, close the connection
///
/// The process exits when the connection closes; there is no reconnection.
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded or is invalid
/// - The client id cannot be resolved
/// - No touchscreen can be opened
#[tokio::main]
async fn main() -> Result<()> {
    let (config, source) = load_config()?;
    let _log_guard = init_logging(&config.logging)?;

    info!("Touch Gamepad v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", source);

    let identity = FileIdentityProvider::new(&config.identity.path);
    let session = SessionManager::new(&config.server.origin, &identity, config.heartbeat.interval())
        .context("Failed to set up session")?;
    info!("Client id: {}", session.client_id());

    let touch = TouchDevice::open(&config.touchscreen.device_path).context("Failed to open touchscreen")?;
    let decoder = ContactDecoder::new(SurfaceMapping {
        x_range: touch.x_range(),
        y_range: touch.y_range(),
        width: config.touchscreen.width,
        height: config.touchscreen.height,
    });
    let events = touch.into_event_stream()?;
    let dispatcher = Dispatcher::from_config(&config, NoHaptics);

    let (runtime, status) = Runtime::new(session, dispatcher, decoder, config.server.connect_timeout());
    tokio::spawn(log_status(status));

    info!("Press Ctrl+C to exit");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let last = runtime.run(events, shutdown).await;
    match last.latency {
        Some(latency) => info!("Session ended ({}, last latency {} ms)", last.state, latency.as_millis()),
        None => info!("Session ended ({})", last.state),
    }
    Ok(())
}

/// Loads the configuration from `TOUCH_GAMEPAD_CONFIG`, the default file,
/// or built-in defaults, in that order. Returns the config and its source.
fn load_config() -> Result<(Config, String)> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        let path = Path::new(&path);
        let config = Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
        return Ok((config, path.display().to_string()));
    }

    let path = Path::new(DEFAULT_CONFIG_PATH);
    if path.exists() {
        let config = Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
        Ok((config, path.display().to_string()))
    } else {
        Ok((Config::default(), "built-in defaults".to_string()))
    }
}

/// Sets up stderr logging (level from `RUST_LOG`, default `info`) and an
/// optional daily rolling log file.
///
/// The returned guard must live until exit so buffered file output is flushed.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &logging.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log dir {}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, "touch-gamepad.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_default_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.heartbeat.interval_ms, 5000);
        assert_eq!(config.buttons.tap_ms, 100);
    }

    #[test]
    fn test_config_env_name() {
        assert_eq!(CONFIG_ENV, "TOUCH_GAMEPAD_CONFIG");
    }
}
