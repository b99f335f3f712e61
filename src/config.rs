//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{GamepadError, Result};
use crate::protocol::codes::{AXIS_X, AXIS_Y, BTN_A, BTN_B, BTN_SELECT, BTN_START, BTN_X, BTN_Y};
use crate::protocol::endpoint::parse_origin;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub touchscreen: TouchscreenConfig,
    #[serde(default)]
    pub joystick: JoystickConfig,
    #[serde(default)]
    pub buttons: ButtonsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Receiver connection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// HTTP(S) origin of the receiver; the WebSocket endpoint is derived from it
    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Heartbeat configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HeartbeatConfig {
    #[serde(default = "default_heartbeat_interval_ms")]
    pub interval_ms: u64,
}

/// Client identity configuration
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// File holding the persisted client id
    #[serde(default = "default_identity_path")]
    pub path: String,
}

/// Touchscreen configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TouchscreenConfig {
    /// Empty = auto-detect
    #[serde(default)]
    pub device_path: String,

    /// Logical surface width raw coordinates are scaled into
    #[serde(default = "default_surface_width")]
    pub width: f32,

    /// Logical surface height raw coordinates are scaled into
    #[serde(default = "default_surface_height")]
    pub height: f32,
}

/// Axis-aligned rectangle in surface coordinates
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct RectConfig {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Virtual joystick configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JoystickConfig {
    /// Touches starting here belong to the joystick; the base rests at its centre
    #[serde(default = "default_joystick_zone")]
    pub zone: RectConfig,

    /// Base diameter
    #[serde(default = "default_joystick_size")]
    pub size: f32,

    /// Knob diameter
    #[serde(default = "default_knob_size")]
    pub knob_size: f32,

    #[serde(default = "default_x_axis")]
    pub x_axis: u16,

    #[serde(default = "default_y_axis")]
    pub y_axis: u16,
}

/// A round on-screen button
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ButtonConfig {
    pub code: u16,
    /// Centre x
    pub x: f32,
    /// Centre y
    pub y: f32,
    pub diameter: f32,
}

/// On-screen button configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ButtonsConfig {
    /// Held buttons (press on touch, release on lift)
    #[serde(default = "default_face_buttons")]
    pub face: Vec<ButtonConfig>,

    /// Momentary buttons (press on touch, release after `tap_ms`)
    #[serde(default = "default_tap_buttons")]
    pub tap: Vec<ButtonConfig>,

    #[serde(default = "default_tap_ms")]
    pub tap_ms: u64,

    #[serde(default = "default_haptic_pulse_ms")]
    pub haptic_pulse_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; unset = stderr only
    #[serde(default)]
    pub dir: Option<String>,
}

// Default value functions
fn default_origin() -> String { "http://127.0.0.1:3000".to_string() }
fn default_connect_timeout_ms() -> u64 { 5000 }

fn default_heartbeat_interval_ms() -> u64 { 5000 }

fn default_identity_path() -> String { "./client_id".to_string() }

fn default_surface_width() -> f32 { 1280.0 }
fn default_surface_height() -> f32 { 720.0 }

fn default_joystick_zone() -> RectConfig {
    RectConfig { x: 0.0, y: 0.0, width: 640.0, height: 720.0 }
}
fn default_joystick_size() -> f32 { 150.0 }
fn default_knob_size() -> f32 { 50.0 }
fn default_x_axis() -> u16 { AXIS_X }
fn default_y_axis() -> u16 { AXIS_Y }

fn default_face_buttons() -> Vec<ButtonConfig> {
    // Diamond: Y top, X left, B right, A bottom
    vec![
        ButtonConfig { code: BTN_Y, x: 960.0, y: 270.0, diameter: 80.0 },
        ButtonConfig { code: BTN_X, x: 870.0, y: 360.0, diameter: 80.0 },
        ButtonConfig { code: BTN_B, x: 1050.0, y: 360.0, diameter: 80.0 },
        ButtonConfig { code: BTN_A, x: 960.0, y: 450.0, diameter: 80.0 },
    ]
}
fn default_tap_buttons() -> Vec<ButtonConfig> {
    vec![
        ButtonConfig { code: BTN_SELECT, x: 580.0, y: 40.0, diameter: 60.0 },
        ButtonConfig { code: BTN_START, x: 700.0, y: 40.0, diameter: 60.0 },
    ]
}
fn default_tap_ms() -> u64 { 100 }
fn default_haptic_pulse_ms() -> u64 { 15 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval_ms: default_heartbeat_interval_ms() }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { path: default_identity_path() }
    }
}

impl Default for TouchscreenConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            width: default_surface_width(),
            height: default_surface_height(),
        }
    }
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            zone: default_joystick_zone(),
            size: default_joystick_size(),
            knob_size: default_knob_size(),
            x_axis: default_x_axis(),
            y_axis: default_y_axis(),
        }
    }
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        Self {
            face: default_face_buttons(),
            tap: default_tap_buttons(),
            tap_ms: default_tap_ms(),
            haptic_pulse_ms: default_haptic_pulse_ms(),
        }
    }
}

impl ServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ButtonsConfig {
    pub fn tap_duration(&self) -> Duration {
        Duration::from_millis(self.tap_ms)
    }

    pub fn haptic_pulse(&self) -> Duration {
        Duration::from_millis(self.haptic_pulse_ms)
    }
}

fn invalid(msg: impl std::fmt::Display) -> GamepadError {
    GamepadError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing sections and fields fall back to their defaults.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use touch_gamepad::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Server
        let origin = self.server.origin.trim();
        if origin.is_empty() {
            return Err(invalid("server origin cannot be empty"));
        }
        if let Err(e) = parse_origin(origin) {
            return Err(invalid(format!("server origin: {}", e)));
        }
        if self.server.connect_timeout_ms == 0 || self.server.connect_timeout_ms > 60000 {
            return Err(invalid("connect_timeout_ms must be between 1 and 60000"));
        }

        if self.heartbeat.interval_ms == 0 || self.heartbeat.interval_ms > 60000 {
            return Err(invalid("heartbeat interval_ms must be between 1 and 60000"));
        }

        if self.identity.path.trim().is_empty() {
            return Err(invalid("identity path cannot be empty"));
        }

        // Touch surface
        if !(self.touchscreen.width > 0.0 && self.touchscreen.height > 0.0) {
            return Err(invalid("touchscreen width and height must be greater than 0"));
        }

        // Joystick
        let zone = &self.joystick.zone;
        if !(zone.width > 0.0 && zone.height > 0.0) {
            return Err(invalid("joystick zone width and height must be greater than 0"));
        }
        if !(self.joystick.size > 0.0) {
            return Err(invalid("joystick size must be greater than 0"));
        }
        if !(self.joystick.knob_size >= 0.0 && self.joystick.knob_size < self.joystick.size) {
            return Err(invalid("joystick knob_size must be at least 0 and smaller than size"));
        }
        if self.joystick.x_axis == self.joystick.y_axis {
            return Err(invalid("joystick x_axis and y_axis must differ"));
        }

        // Buttons
        let mut codes = BTreeSet::new();
        for button in self.buttons.face.iter().chain(&self.buttons.tap) {
            if !(button.diameter > 0.0) {
                return Err(invalid(format!("button {} diameter must be greater than 0", button.code)));
            }
            if !codes.insert(button.code) {
                return Err(invalid(format!("button code {} is configured more than once", button.code)));
            }
        }

        if self.buttons.tap_ms == 0 || self.buttons.tap_ms > 10000 {
            return Err(invalid("tap_ms must be between 1 and 10000"));
        }

        if self.buttons.haptic_pulse_ms > 1000 {
            return Err(invalid("haptic_pulse_ms must be between 0 and 1000"));
        }

        if let Some(dir) = &self.logging.dir {
            if dir.trim().is_empty() {
                return Err(invalid("logging dir cannot be empty when set"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[server]
origin = "https://pad.local:8443"

[heartbeat]
interval_ms = 2000

[joystick]
size = 200
knob_size = 60
zone = { x = 0, y = 100, width = 500, height = 620 }

[buttons]
tap_ms = 80
face = [
    { code = 304, x = 1000, y = 500, diameter = 90 },
]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.server.origin, "https://pad.local:8443");
        assert_eq!(config.heartbeat.interval(), Duration::from_millis(2000));
        assert_eq!(config.joystick.size, 200.0);
        assert_eq!(config.joystick.zone.y, 100.0);
        assert_eq!(config.buttons.face.len(), 1);
        assert_eq!(config.buttons.tap_duration(), Duration::from_millis(80));
        // Unspecified values keep their defaults
        assert_eq!(config.buttons.tap, default_tap_buttons());
        assert_eq!(config.buttons.haptic_pulse(), Duration::from_millis(15));
        assert_eq!(config.server.connect_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.heartbeat.interval_ms, 5000);
        assert_eq!(config.buttons.face.len(), 4);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/touch-gamepad.toml");
        assert!(matches!(result, Err(GamepadError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[server\norigin = ").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(GamepadError::Config(_))));
    }

    #[test]
    fn test_empty_origin() {
        let mut config = Config::default();
        config.server.origin = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_websocket_origin_rejected() {
        let mut config = Config::default();
        config.server.origin = "ws://10.0.0.2:3000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_origin_scheme_is_case_insensitive() {
        let mut config = Config::default();
        config.server.origin = "HTTP://10.0.0.2:3000".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_origin_without_host_rejected() {
        let mut config = Config::default();
        config.server.origin = "http://".to_string();
        match config.validate() {
            Err(GamepadError::Config(e)) => assert!(e.to_string().contains("origin")),
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn test_https_origin_accepted() {
        let mut config = Config::default();
        config.server.origin = "https://10.0.0.2".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connect_timeout_zero() {
        let mut config = Config::default();
        config.server.connect_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_heartbeat_interval_zero() {
        let mut config = Config::default();
        config.heartbeat.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_heartbeat_interval_too_high() {
        let mut config = Config::default();
        config.heartbeat.interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_identity_path() {
        let mut config = Config::default();
        config.identity.path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_surface() {
        let mut config = Config::default();
        config.touchscreen.height = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_knob_not_smaller_than_base() {
        let mut config = Config::default();
        config.joystick.knob_size = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_joystick_size() {
        let mut config = Config::default();
        config.joystick.size = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_axis_twice() {
        let mut config = Config::default();
        config.joystick.y_axis = config.joystick.x_axis;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_button_code_across_groups() {
        let mut config = Config::default();
        config.buttons.tap[0].code = BTN_A;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_button_diameter() {
        let mut config = Config::default();
        config.buttons.face[2].diameter = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tap_ms_out_of_range() {
        let mut config = Config::default();
        config.buttons.tap_ms = 0;
        assert!(config.validate().is_err());
        config.buttons.tap_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_haptic_pulse_zero_allowed() {
        let mut config = Config::default();
        config.buttons.haptic_pulse_ms = 0;
        assert!(config.validate().is_ok());
        config.buttons.haptic_pulse_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_set() {
        let mut config = Config::default();
        config.logging.dir = Some(String::new());
        assert!(config.validate().is_err());
        config.logging.dir = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_origin(), "http://127.0.0.1:3000");
        assert_eq!(default_connect_timeout_ms(), 5000);
        assert_eq!(default_heartbeat_interval_ms(), 5000);
        assert_eq!(default_joystick_size(), 150.0);
        assert_eq!(default_knob_size(), 50.0);
        assert_eq!(default_x_axis(), 0);
        assert_eq!(default_y_axis(), 1);
        assert_eq!(default_tap_ms(), 100);
        assert_eq!(default_haptic_pulse_ms(), 15);
        assert_eq!(default_face_buttons().len(), 4);
        assert_eq!(default_tap_buttons().len(), 2);
    }
}
