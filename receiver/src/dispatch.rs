//! Call-event dispatch.
//!
//! Maps a verified Telnyx payload to the command sequence returned in the
//! webhook response. The mapping is total: every event type that is not
//! explicitly handled produces an empty command list, never an error.

use serde::{Deserialize, Serialize};

/// The one event type answered meaningfully.
pub const EVENT_CALL_INITIATED: &str = "call.initiated";

/// A single Telnyx call-control command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Accept the inbound call.
    Answer,
    /// Bridge the answered call to a SIP destination.
    Connect { to: String },
}

/// A verified Telnyx webhook payload.
///
/// Only constructed after signature verification succeeds. Fields beyond
/// the event-type discriminator are deliberately not modeled; payloads
/// missing `data` or `event_type` dispatch as unrecognized rather than
/// failing.
#[derive(Debug, Clone, Deserialize)]
pub struct CallEvent {
    #[serde(default)]
    data: Option<CallEventData>,
}

#[derive(Debug, Clone, Deserialize)]
struct CallEventData {
    #[serde(default)]
    event_type: Option<String>,
}

impl CallEvent {
    /// Parse a verified body. Fails only if the bytes are not valid JSON.
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// The event-type discriminator, if the payload carried one.
    pub fn event_type(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.event_type.as_deref())
    }
}

/// Map a verified event to its command sequence.
///
/// Stateless: a pure function of the payload and the configured
/// destination. `call.initiated` answers the call and connects it;
/// everything else is a no-op.
pub fn dispatch(event: &CallEvent, destination: &str) -> Vec<Command> {
    match event.event_type() {
        Some(EVENT_CALL_INITIATED) => vec![
            Command::Answer,
            Command::Connect {
                to: destination.to_string(),
            },
        ],
        _ => Vec::new(),
    }
}
