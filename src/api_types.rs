use serde::{Deserialize, Serialize};

use crate::models::{ContentItem, EventRecord, RiskEntry};

// Top-level shapes of the four registries. The arrays are required: a
// document without its expected array is a decode failure, not an empty
// registry. Per-record fields stay lenient (see models.rs) so one malformed
// record never sinks a whole payload.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsPayload {
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivePayload {
    #[serde(default)]
    pub generated_at: Option<String>,
    pub items: Vec<ContentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestPayload {
    #[serde(default)]
    pub as_of: Option<String>,
    pub items: Vec<ContentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardPayload {
    #[serde(default)]
    pub as_of: Option<String>,
    pub risks: Vec<RiskEntry>,
}
