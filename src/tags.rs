use std::collections::HashSet;

use crate::models::{ContentItem, EventRecord, RawTag, Tag};

/// URL-safe identifier for a tag: lowercase ASCII word characters and
/// hyphens, runs of anything else collapsed to a single hyphen, trimmed.
/// Idempotent: slugging a slug is a no-op.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out
}

/// Display form of a tag value: delimiters become spaces, whitespace
/// collapses, and the result is title-cased unless the source is already
/// all-uppercase (acronyms keep their shape).
pub fn normalize_label(value: &str) -> String {
    let spaced: String = value
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return collapsed;
    }
    let has_alpha = collapsed.chars().any(|c| c.is_alphabetic());
    let all_upper = has_alpha && !collapsed.chars().any(|c| c.is_lowercase());
    if all_upper {
        return collapsed;
    }
    collapsed
        .split(' ')
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

struct Candidate<'a> {
    value: &'a str,
    slug_hint: Option<&'a str>,
}

/// Merge the tag vocabulary for one briefing. Candidate order: tags already
/// present in markup, the cross-referenced event's cluster (falling back to
/// its fingerprint cluster), the event type, the item's own cluster, then
/// the item's explicit tag list. Deduplicated by slug, first occurrence
/// wins; candidates that normalize to nothing are dropped silently since
/// sparse metadata is expected.
pub fn reconcile(item: &ContentItem, event: Option<&EventRecord>, dom_tags: &[Tag]) -> Vec<Tag> {
    let mut candidates: Vec<Candidate<'_>> = Vec::new();

    for tag in dom_tags {
        candidates.push(Candidate {
            value: &tag.label,
            slug_hint: Some(&tag.slug),
        });
    }
    if let Some(ev) = event {
        if let Some(cluster) = ev.effective_cluster() {
            candidates.push(Candidate { value: cluster, slug_hint: None });
        }
        if let Some(event_type) = ev.event_type.as_deref() {
            candidates.push(Candidate { value: event_type, slug_hint: None });
        }
    }
    if let Some(cluster) = item.cluster.as_deref() {
        candidates.push(Candidate { value: cluster, slug_hint: None });
    }
    for raw in &item.tags {
        match raw {
            RawTag::Text(s) => candidates.push(Candidate { value: s, slug_hint: None }),
            RawTag::Pair { slug, label } => candidates.push(Candidate {
                value: label,
                slug_hint: slug.as_deref(),
            }),
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for c in candidates {
        let label = normalize_label(c.value);
        let slug = match c.slug_hint {
            Some(hint) if !slugify(hint).is_empty() => slugify(hint),
            _ => slugify(&label),
        };
        if slug.is_empty() || label.is_empty() {
            continue;
        }
        if seen.insert(slug.clone()) {
            out.push(Tag { slug, label });
        }
    }
    out
}
