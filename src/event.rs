//! Wire shape of a Jetstream message.
//!
//! Every field is optional: a message that lacks something the classifier
//! needs is rejected there rather than failing to decode here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One message from the stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Event {
    pub did: Option<String>,
    pub commit: Option<Commit>,
}

/// Repository commit carried by `kind: "commit"` events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commit {
    pub operation: Option<String>,
    pub collection: Option<String>,
    pub rkey: Option<String>,
    pub record: Option<RecordPayload>,
}

/// Post record. Fields other than `text` and `langs` are carried through
/// untouched so the persisted sample keeps the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub langs: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// Decode a raw text frame. `None` means the frame was not a JSON object
    /// of the expected shape.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}
