//! Sinks: terminal display endpoints a pipeline can drive.

use borealis_core::types::{DisplayMode, SinkConnector, SinkStatus};

/// Identity of a sink. Doubles as its index in the device registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(usize);

impl SinkId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sink {}", self.0)
    }
}

/// A terminal display endpoint.
#[derive(Debug)]
pub struct Sink {
    pub id: SinkId,
    pub name: String,
    pub connector: SinkConnector,
    pub status: SinkStatus,
    pub modes: Vec<DisplayMode>,
}

impl Sink {
    pub fn new(id: SinkId, name: impl Into<String>, connector: SinkConnector) -> Self {
        Self {
            id,
            name: name.into(),
            connector,
            status: SinkStatus::Unknown,
            modes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_creation_defaults() {
        let sink = Sink::new(SinkId::new(0), "HDMI-A-1", SinkConnector::Hdmi);
        assert_eq!(sink.name, "HDMI-A-1");
        assert_eq!(sink.status, SinkStatus::Unknown);
        assert!(sink.modes.is_empty());
    }
}
