//! Cassette data structures for recording and replaying tracker interactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded call to a tracker port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Sequence number (assigned automatically by the recorder).
    pub seq: u64,
    /// Port name (`downstream` or `upstream`).
    pub port: String,
    /// Method name invoked on the port.
    pub method: String,
    /// Arguments of the call.
    pub input: serde_json::Value,
    /// `{"Ok": value}` or `{"Err": message}`.
    pub output: serde_json::Value,
}

/// A cassette containing a sequence of recorded interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name for this cassette.
    pub name: String,
    /// When this cassette was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Ordered list of interactions.
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}
