use serde::{Deserialize, Serialize};

/// One published briefing as listed in the archive catalogue or the
/// latest-briefings index. Identity is `slug`; registries are read-only and
/// the engine only ever derives views from them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContentItem {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub as_of: String, // ISO-8601 calendar date
    #[serde(default)]
    pub tags: Vec<RawTag>,
    #[serde(default)]
    pub event_uid: Option<String>,
}

/// Tag as it appears in registry JSON: either a bare string or an explicit
/// slug/label pair. Normalization happens in `tags::reconcile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTag {
    Text(String),
    Pair {
        #[serde(default)]
        slug: Option<String>,
        label: String,
    },
}

/// Normalized display tag. Two tags are the same entity iff their slugs
/// match; the first label seen for a slug wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub slug: String,
    pub label: String,
}

/// One tracked event from the event registry. Keyed by `uid`; title is the
/// fallback key when a briefing carries no `event_uid`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventRecord {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub fingerprint_fields: Option<FingerprintFields>,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl EventRecord {
    /// Cluster value for the tag vocabulary: the event's own cluster, else
    /// the fingerprint cluster.
    pub fn effective_cluster(&self) -> Option<&str> {
        self.cluster
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| {
                self.fingerprint_fields
                    .as_ref()
                    .and_then(|f| f.cluster.as_deref())
                    .filter(|c| !c.trim().is_empty())
            })
    }
}

/// The subset of fingerprint fields this engine reads. The registry stores
/// more (entities, geography, instruments) but only these two feed the tag
/// vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FingerprintFields {
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
}

/// One ranked entry from the leaderboard snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RiskEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: f64, // clamped to [0,100] before display
    #[serde(default)]
    pub phase: Option<String>, // watch | elevated | critical
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

impl ContentItem {
    /// Raw tag labels, used by the free-text filter haystack.
    pub fn tag_labels(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| match t {
            RawTag::Text(s) => s.as_str(),
            RawTag::Pair { label, .. } => label.as_str(),
        })
    }
}
