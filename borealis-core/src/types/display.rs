//! Display sink and mode types.

use serde::{Deserialize, Serialize};

/// The physical connector kind of a display sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SinkConnector {
    Hdmi,
    DisplayPort,
    Dvi,
    Vga,
    Lvds,
    Edp,
    Virtual,
    Unknown,
}

/// Connection status of a display sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SinkStatus {
    Connected,
    Disconnected,
    Unknown,
}

/// A display timing mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    /// Refresh rate in millihertz for precision.
    pub refresh_mhz: u32,
}

impl DisplayMode {
    pub fn new(width: u32, height: u32, refresh_mhz: u32) -> Self {
        Self {
            width,
            height,
            refresh_mhz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mode_creation() {
        let mode = DisplayMode::new(1920, 1080, 60_000);
        assert_eq!(mode.width, 1920);
        assert_eq!(mode.height, 1080);
        assert_eq!(mode.refresh_mhz, 60_000);
    }

    #[test]
    fn test_mode_serde_roundtrip() {
        let mode = DisplayMode::new(2560, 1440, 144_000);
        let serialized = serde_json::to_string(&mode).unwrap();
        let deserialized: DisplayMode = serde_json::from_str(&serialized).unwrap();
        assert_eq!(mode, deserialized);
    }

    #[test]
    fn test_connector_serde() {
        let connector = SinkConnector::DisplayPort;
        let serialized = serde_json::to_string(&connector).unwrap();
        assert_eq!(serialized, "\"DisplayPort\"");
        let deserialized: SinkConnector = serde_json::from_str(&serialized).unwrap();
        assert_eq!(connector, deserialized);
    }
}
