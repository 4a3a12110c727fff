//! Virtual devices — lamp, fan and receiver.
//!
//! Each device has a fixed gadget id so it stays stable across restarts of
//! the driver.

mod receiver;

pub use receiver::{PanelReading, ReceiverPanel};

use gadgethub_domain::error::HubError;
use gadgethub_domain::gadget::{FanSpeed, Gadget, GadgetKind, Rgb, SourceSelector};
use gadgethub_domain::id::GadgetId;

pub const LAMP_ID: &str = "virtual_lamp";
pub const FAN_ID: &str = "virtual_fan";
pub const RECEIVER_ID: &str = "virtual_receiver";

/// A local RGB lamp, switched off.
///
/// # Errors
///
/// Returns a validation error if the builder fails.
pub fn lamp() -> Result<Gadget, HubError> {
    local(LAMP_ID, "Virtual Lamp", GadgetKind::RgbLamp(Rgb::default()))
}

/// A stopped local fan with `steps` speed levels.
///
/// # Errors
///
/// Returns a validation error if the builder fails.
pub fn fan(steps: u16) -> Result<Gadget, HubError> {
    local(FAN_ID, "Virtual Fan", GadgetKind::Fan(FanSpeed::new(steps)))
}

/// A local AV receiver mirroring `panel`.
///
/// # Errors
///
/// Returns an error if the panel offers no inputs or its current input is
/// not one of them.
pub fn receiver(panel: &ReceiverPanel) -> Result<Gadget, HubError> {
    let reading = panel.read();
    let selector = SourceSelector::new(panel.inputs().to_vec())?
        .with_selection(reading.power, &ReceiverPanel::source(&reading))?;
    local(
        RECEIVER_ID,
        "Virtual Receiver",
        GadgetKind::AvReceiver(selector),
    )
}

fn local(id: &str, name: &str, kind: GadgetKind) -> Result<Gadget, HubError> {
    Gadget::builder()
        .id(GadgetId::new(id)?)
        .name(name)
        .kind(kind)
        .build()
}
