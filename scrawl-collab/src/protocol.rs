//! JSON wire protocol between the editor widget and the server.
//!
//! Every frame is a JSON object with a single discriminating field:
//!
//! ```text
//! client → server                      server → client
//! ──────────────────────────────       ──────────────────────────────
//! {"Edit": {"revision": 2,             {"Identity": 4}
//!           "operation": [2, "x"]}}    {"History": {"start": 0,
//! {"SetLanguage": "rust"}                           "operations": [...]}}
//! {"ClientInfo": {"name": "Ada",       {"Language": "rust"}
//!                 "hue": 120}}         {"UserInfo": {"id": 4, "info": …}}
//! {"CursorData": {"cursors": [5],      {"UserCursor": {"id": 4,
//!                 "selections": []}}                  "data": …}}
//! ```
//!
//! Operations embed as the flat array form defined by `scrawl-ot`. The
//! shapes are fixed: deployed editor builds parse them field-for-field.

use serde::{Deserialize, Serialize};

use scrawl_ot::{transform_index, TextOperation};

/// Presence metadata a client reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    /// Cursor hue in degrees, `0..360`.
    pub hue: u32,
}

/// Caret positions and selections, in UTF-16 code units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorData {
    #[serde(default)]
    pub cursors: Vec<u64>,
    /// `(anchor, head)` pairs.
    #[serde(default)]
    pub selections: Vec<(u64, u64)>,
}

impl CursorData {
    /// Re-express every position across `operation`.
    pub fn transform(&self, operation: &TextOperation) -> CursorData {
        CursorData {
            cursors: self
                .cursors
                .iter()
                .map(|&position| transform_index(operation, position))
                .collect(),
            selections: self
                .selections
                .iter()
                .map(|&(anchor, head)| {
                    (
                        transform_index(operation, anchor),
                        transform_index(operation, head),
                    )
                })
                .collect(),
        }
    }
}

/// A committed operation tagged with its originating participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOperation {
    pub id: u64,
    pub operation: TextOperation,
}

/// Frames the client sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Submit an operation against the revision the client last saw.
    Edit {
        revision: u64,
        operation: TextOperation,
    },
    /// Change the document's language tag.
    SetLanguage(String),
    /// Update this participant's presence info.
    ClientInfo(UserInfo),
    /// Update this participant's carets and selections.
    CursorData(CursorData),
}

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// The participant id assigned to this connection.
    Identity(u64),
    /// A contiguous run of the log starting at revision `start`.
    History {
        start: u64,
        operations: Vec<UserOperation>,
    },
    /// The document's language tag changed.
    Language(String),
    /// Presence update; `info: None` announces a departure.
    UserInfo { id: u64, info: Option<UserInfo> },
    /// Another participant's cursor moved.
    UserCursor { id: u64, data: CursorData },
}

impl ClientMessage {
    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

impl ServerMessage {
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("server message serializes")
    }
}
