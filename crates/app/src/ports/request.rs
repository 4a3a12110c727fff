//! Request port — the contract every transport hands to the API layer.

use serde_json::Value;

/// An inbound API request.
///
/// `respond` consumes the request, so a handler can answer at most once; the
/// API handler answers every request it accepts.
pub trait Request {
    /// Exact API path, e.g. `gadget/update`.
    fn path(&self) -> &str;

    /// Parsed JSON body.
    fn payload(&self) -> &Value;

    /// Send the response back to the caller.
    fn respond(self, data: Value);
}
