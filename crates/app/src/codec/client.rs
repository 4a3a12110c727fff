//! Client snapshot encoding.

use serde_json::{Map, Value, json};

use gadgethub_domain::client::{Client, SoftwareInfo};
use gadgethub_domain::time::format_wire;

/// Wire snapshot of a client. Timestamps use the `YYYY-MM-DD HH:MM:SS` format.
#[must_use]
pub fn encode_client(client: &Client) -> Value {
    let port_mapping: Map<String, Value> = client
        .port_mapping
        .iter()
        .map(|(port, value)| (port.to_string(), Value::from(value)))
        .collect();
    json!({
        "id": client.id(),
        "created": format_wire(client.created()),
        "last_connected": client.last_connected().map(format_wire),
        "runtime_id": client.runtime_id(),
        "is_active": client.is_active(),
        "boot_mode": client.boot_mode,
        "software": client.software.as_ref().map(encode_software),
        "port_mapping": port_mapping,
        "api_version": client.api_version.to_string(),
    })
}

fn encode_software(software: &SoftwareInfo) -> Value {
    json!({
        "commit": software.commit,
        "branch": software.branch,
        "uploaded": format_wire(software.uploaded),
    })
}
