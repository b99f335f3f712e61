//! # Touchscreen Device
//!
//! Opens a Linux multitouch touchscreen through evdev.
//!
//! ## Device Detection
//!
//! A device qualifies when it reports `ABS_MT_POSITION_X` and
//! `ABS_MT_POSITION_Y`. With no configured path, `/dev/input/event*` is
//! scanned in sorted order and the first qualifying device is used.

use evdev::{AbsoluteAxisType, Device, EventStream};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{GamepadError, Result};

/// Raw coordinate range of one touch axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    /// Scales `raw` from this range onto `0..=extent`.
    ///
    /// A degenerate range maps everything to 0.
    pub fn scale(&self, raw: i32, extent: f32) -> f32 {
        let span = self.max as f32 - self.min as f32;
        if span <= 0.0 {
            return 0.0;
        }
        let t = ((raw as f32 - self.min as f32) / span).clamp(0.0, 1.0);
        t * extent
    }
}

/// An opened multitouch touchscreen
pub struct TouchDevice {
    device: Device,
    device_path: String,
    x_range: AxisRange,
    y_range: AxisRange,
}

impl TouchDevice {
    /// Open the touchscreen at `path`, or auto-detect one when `path` is empty
    ///
    /// # Errors
    ///
    /// - `TouchDeviceNotFound`: auto-detect found no multitouch device
    /// - `TouchDevice`: the configured device cannot be opened or is not multitouch
    pub fn open(path: &str) -> Result<Self> {
        if path.is_empty() {
            Self::detect()
        } else {
            Self::open_path(Path::new(path))
        }
    }

    /// Scan `/dev/input` for the first multitouch device
    pub fn detect() -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(GamepadError::TouchDevice(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| GamepadError::TouchDevice(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| GamepadError::TouchDevice(format!("Failed to read directory entry: {}", e)))?;

        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );
                    if is_multitouch(&device) {
                        return Self::from_device(device, path.to_string_lossy().to_string());
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(GamepadError::TouchDeviceNotFound)
    }

    fn open_path(path: &Path) -> Result<Self> {
        let device = Device::open(path)
            .map_err(|e| GamepadError::TouchDevice(format!("Failed to open {}: {}", path.display(), e)))?;

        if !is_multitouch(&device) {
            return Err(GamepadError::TouchDevice(format!(
                "{} does not report multitouch positions",
                path.display()
            )));
        }

        Self::from_device(device, path.to_string_lossy().to_string())
    }

    fn from_device(device: Device, device_path: String) -> Result<Self> {
        let abs = device
            .get_abs_state()
            .map_err(|e| GamepadError::TouchDevice(format!("Failed to read axis ranges: {}", e)))?;

        let x = abs[AbsoluteAxisType::ABS_MT_POSITION_X.0 as usize];
        let y = abs[AbsoluteAxisType::ABS_MT_POSITION_Y.0 as usize];
        let x_range = AxisRange { min: x.minimum, max: x.maximum };
        let y_range = AxisRange { min: y.minimum, max: y.maximum };

        info!(
            "Using touchscreen {} at {} (x {}..{}, y {}..{})",
            device.name().unwrap_or("unnamed"),
            device_path,
            x_range.min,
            x_range.max,
            y_range.min,
            y_range.max
        );

        Ok(Self {
            device,
            device_path,
            x_range,
            y_range,
        })
    }

    /// Get the device path of this touchscreen
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Human-readable device name
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Raw range of `ABS_MT_POSITION_X`
    pub fn x_range(&self) -> AxisRange {
        self.x_range
    }

    /// Raw range of `ABS_MT_POSITION_Y`
    pub fn y_range(&self) -> AxisRange {
        self.y_range
    }

    /// Converts into an async stream of raw input events
    ///
    /// # Errors
    ///
    /// Returns `TouchDevice` if the device cannot be switched to non-blocking mode.
    pub fn into_event_stream(self) -> Result<EventStream> {
        self.device
            .into_event_stream()
            .map_err(|e| GamepadError::TouchDevice(format!("Failed to stream events: {}", e)))
    }
}

fn is_multitouch(device: &Device) -> bool {
    device.supported_absolute_axes().map_or(false, |axes| {
        axes.contains(AbsoluteAxisType::ABS_MT_POSITION_X)
            && axes.contains(AbsoluteAxisType::ABS_MT_POSITION_Y)
    })
}
