//! Simulated AV receiver front panel.
//!
//! The panel stands in for hardware the hub can only observe: it changes
//! on its own (someone presses a button) and the driver notices by polling.

use std::sync::{Mutex, MutexGuard, PoisonError};

use gadgethub_domain::gadget::SourceRef;

/// What the panel shows at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelReading {
    pub power: bool,
    pub input: String,
}

/// Thread-safe simulated panel.
#[derive(Debug)]
pub struct ReceiverPanel {
    inputs: Vec<String>,
    state: Mutex<PanelReading>,
}

impl ReceiverPanel {
    /// A powered-off panel on its first input.
    #[must_use]
    pub fn new(inputs: Vec<String>) -> Self {
        let input = inputs.first().cloned().unwrap_or_default();
        Self {
            inputs,
            state: Mutex::new(PanelReading {
                power: false,
                input,
            }),
        }
    }

    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    #[must_use]
    pub fn read(&self) -> PanelReading {
        self.lock().clone()
    }

    /// Toggle power, as the front button does.
    pub fn press_power(&self) {
        let mut state = self.lock();
        state.power = !state.power;
    }

    /// Turn the input knob to `input`. Unknown inputs are ignored.
    pub fn select_input(&self, input: &str) -> bool {
        if !self.inputs.iter().any(|known| known == input) {
            return false;
        }
        self.lock().input = input.to_string();
        true
    }

    /// The reading as a source reference for the receiver gadget.
    #[must_use]
    pub fn source(reading: &PanelReading) -> SourceRef {
        SourceRef::Name(reading.input.clone())
    }

    fn lock(&self) -> MutexGuard<'_, PanelReading> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
