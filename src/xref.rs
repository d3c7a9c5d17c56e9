use std::collections::HashMap;

use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::api_types::EventsPayload;
use crate::models::{ContentItem, EventRecord};

/// Fold a title into its lookup key: NFC, lower-cased, whitespace
/// collapsed. Irregular spacing or case in a briefing title still finds
/// its event.
pub fn normalize_title(title: &str) -> String {
    title
        .nfc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lookup from event uid to event record, with a secondary lookup keyed by
/// normalized title for briefings that carry no `event_uid`.
///
/// Collision policy mirrors the registry's write semantics: one live record
/// per uid, so a repeated uid is last-write-wins; a repeated title is more
/// likely a re-mention than the canonical record, so titles are
/// first-write-wins.
pub struct CrossRefIndex {
    by_uid: HashMap<String, EventRecord>,
    by_title: HashMap<String, EventRecord>,
}

impl CrossRefIndex {
    /// Build from a registry payload, skipping records without an identity
    /// rather than failing the whole build.
    pub fn build(payload: &EventsPayload) -> Self {
        let mut by_uid: HashMap<String, EventRecord> = HashMap::new();
        let mut by_title: HashMap<String, EventRecord> = HashMap::new();
        let mut skipped = 0usize;

        for event in &payload.events {
            let uid = event.uid.trim();
            if uid.is_empty() {
                skipped += 1;
                continue;
            }
            by_uid.insert(uid.to_string(), event.clone());
            if let Some(title) = event.title.as_deref() {
                let key = normalize_title(title);
                if !key.is_empty() {
                    by_title.entry(key).or_insert_with(|| event.clone());
                }
            }
        }

        debug!(
            "Cross-reference index built - events={}, titles={}, skipped={}",
            by_uid.len(),
            by_title.len(),
            skipped
        );
        Self { by_uid, by_title }
    }

    pub fn empty() -> Self {
        Self {
            by_uid: HashMap::new(),
            by_title: HashMap::new(),
        }
    }

    pub fn by_uid(&self, uid: &str) -> Option<&EventRecord> {
        self.by_uid.get(uid.trim())
    }

    pub fn by_title(&self, title: &str) -> Option<&EventRecord> {
        self.by_title.get(&normalize_title(title))
    }

    /// Resolve the event behind a briefing. The title fallback applies
    /// only when the identifier link is absent: a dangling uid resolves to
    /// nothing rather than risking a coincidental title match attaching
    /// the wrong event.
    pub fn lookup(&self, item: &ContentItem) -> Option<&EventRecord> {
        match item.event_uid.as_deref().map(str::trim) {
            Some(uid) if !uid.is_empty() => self.by_uid(uid),
            _ => self.by_title(&item.title),
        }
    }

    pub fn len(&self) -> usize {
        self.by_uid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(events: Vec<EventRecord>) -> EventsPayload {
        EventsPayload { events }
    }

    fn event(uid: &str, title: &str) -> EventRecord {
        EventRecord {
            uid: uid.into(),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    #[test]
    fn uid_collisions_are_last_write_wins() {
        let mut a = event("e-1", "First");
        a.score = Some(10.0);
        let mut b = event("e-1", "Second");
        b.score = Some(20.0);
        let idx = CrossRefIndex::build(&payload(vec![a, b]));
        assert_eq!(idx.by_uid("e-1").unwrap().score, Some(20.0));
    }

    #[test]
    fn title_collisions_are_first_write_wins() {
        let idx = CrossRefIndex::build(&payload(vec![
            event("e-1", "Port Closure"),
            event("e-2", "port closure"),
        ]));
        assert_eq!(idx.by_title("Port Closure").unwrap().uid, "e-1");
    }

    #[test]
    fn irregular_spacing_and_case_still_resolve() {
        let idx = CrossRefIndex::build(&payload(vec![event("1", "Foo Bar")]));
        let item = ContentItem {
            slug: "foo-bar".into(),
            title: "foo   bar".into(),
            ..Default::default()
        };
        assert_eq!(idx.lookup(&item).unwrap().uid, "1");
    }

    #[test]
    fn uid_link_beats_title_fallback() {
        let idx = CrossRefIndex::build(&payload(vec![
            event("e-1", "Shared Title"),
            event("e-2", "Other Title"),
        ]));
        let item = ContentItem {
            slug: "s".into(),
            title: "Shared Title".into(),
            event_uid: Some("e-2".into()),
            ..Default::default()
        };
        assert_eq!(idx.lookup(&item).unwrap().uid, "e-2");
    }

    #[test]
    fn dangling_uid_never_falls_back_to_title() {
        let idx = CrossRefIndex::build(&payload(vec![event("e-1", "Shared Title")]));
        let item = ContentItem {
            slug: "s".into(),
            title: "Shared Title".into(),
            event_uid: Some("e-gone".into()),
            ..Default::default()
        };
        assert!(idx.lookup(&item).is_none());
    }

    #[test]
    fn blank_uid_counts_as_absent() {
        let idx = CrossRefIndex::build(&payload(vec![event("e-1", "Port Closure")]));
        let item = ContentItem {
            slug: "s".into(),
            title: "port closure".into(),
            event_uid: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(idx.lookup(&item).unwrap().uid, "e-1");
    }

    #[test]
    fn missing_identity_is_skipped_not_fatal() {
        let idx = CrossRefIndex::build(&payload(vec![
            EventRecord::default(),
            event("e-1", "Kept"),
        ]));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn miss_is_none_not_error() {
        let idx = CrossRefIndex::empty();
        let item = ContentItem {
            slug: "s".into(),
            title: "Nothing here".into(),
            ..Default::default()
        };
        assert!(idx.lookup(&item).is_none());
    }
}
