//! Virtual driver configuration.

use std::time::Duration;

/// Configuration for the virtual driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualConfig {
    /// Interval between two reads of the simulated receiver panel.
    pub poll_interval: Duration,
    /// Speed levels of the virtual fan.
    pub fan_steps: u16,
    /// Inputs offered by the simulated receiver, in panel order.
    pub receiver_inputs: Vec<String>,
}

impl Default for VirtualConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            fan_steps: 3,
            receiver_inputs: ["tv", "bluray", "tuner", "aux"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
