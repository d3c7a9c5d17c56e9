use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::ContentItem;

/// Rapid keystrokes coalesce into one filter re-application after this
/// quiet period.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(180);

/// How far back a timeframe filter reaches. `All` means no constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    All,
    Days(u32),
}

impl Timeframe {
    /// Parse a timeframe control value: "all" (or blank) lifts the
    /// constraint, a positive integer is a day threshold. Anything else
    /// falls back to `All`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            return Timeframe::All;
        }
        match raw.parse::<u32>() {
            Ok(days) if days > 0 => Timeframe::Days(days),
            _ => Timeframe::All,
        }
    }
}

/// The three independent filter dimensions. Empty cluster/query and an
/// `All` timeframe each mean "no constraint" - the default state passes
/// everything.
#[derive(Debug, Clone)]
pub struct FilterState {
    pub cluster: String,
    pub timeframe: Timeframe,
    query: String, // held lower-cased
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            cluster: String::new(),
            timeframe: Timeframe::All,
            query: String::new(),
        }
    }
}

impl FilterState {
    pub fn new(cluster: &str, timeframe: Timeframe, query: &str) -> Self {
        let mut state = Self {
            cluster: cluster.trim().to_string(),
            timeframe,
            query: String::new(),
        };
        state.set_query(query);
        state
    }

    pub fn set_query(&mut self, raw: &str) {
        self.query = raw.trim().to_lowercase();
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

fn matches_cluster(item: &ContentItem, state: &FilterState) -> bool {
    if state.cluster.trim().is_empty() {
        return true;
    }
    match item.cluster.as_deref() {
        Some(c) => c.trim().eq_ignore_ascii_case(state.cluster.trim()),
        None => false, // active cluster filter, item without a cluster
    }
}

fn matches_timeframe(item: &ContentItem, state: &FilterState, today: NaiveDate) -> bool {
    let days = match state.timeframe {
        Timeframe::All => return true,
        Timeframe::Days(d) => d,
    };
    match NaiveDate::parse_from_str(item.as_of.trim(), "%Y-%m-%d") {
        Ok(date) => (today - date).num_days() <= i64::from(days),
        // Fail open: an unparsable date is shown, not hidden by a bug.
        Err(_) => true,
    }
}

fn matches_query(item: &ContentItem, state: &FilterState) -> bool {
    if state.query.is_empty() {
        return true;
    }
    let mut haystack = String::new();
    haystack.push_str(&item.title);
    haystack.push(' ');
    if let Some(summary) = &item.summary {
        haystack.push_str(summary);
        haystack.push(' ');
    }
    if let Some(cluster) = &item.cluster {
        haystack.push_str(cluster);
        haystack.push(' ');
    }
    for label in item.tag_labels() {
        haystack.push_str(label);
        haystack.push(' ');
    }
    haystack.to_lowercase().contains(&state.query)
}

/// Recompute the active subset from the full catalogue. Conjunctive over
/// the three predicates, never incremental over a previous subset, never
/// mutating: the result preserves catalogue order.
pub fn apply<'a>(
    catalogue: &'a [ContentItem],
    state: &FilterState,
    today: NaiveDate,
) -> Vec<&'a ContentItem> {
    let active: Vec<&ContentItem> = catalogue
        .iter()
        .filter(|item| {
            matches_cluster(item, state)
                && matches_timeframe(item, state, today)
                && matches_query(item, state)
        })
        .collect();
    debug!(
        "Filter applied - catalogue={}, active={}, cluster='{}', query='{}'",
        catalogue.len(),
        active.len(),
        state.cluster,
        state.query
    );
    active
}

/// Deterministic display order: `as_of` descending, ties broken by slug
/// descending. ISO dates compare correctly as strings.
pub fn sort_for_display(subset: &mut [&ContentItem]) {
    subset.sort_by(|a, b| b.as_of.cmp(&a.as_of).then_with(|| b.slug.cmp(&a.slug)));
}

/// Explicit cancellable debounce task for the search box. Every keystroke
/// aborts the pending timer and starts a fresh one; only the query that
/// survives the quiet period is delivered.
pub struct SearchDebouncer {
    delay: Duration,
    tx: mpsc::UnboundedSender<String>,
    pending: Option<JoinHandle<()>>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                tx,
                pending: None,
            },
            rx,
        )
    }

    pub fn keystroke(&mut self, query: &str) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let tx = self.tx.clone();
        let delay = self.delay;
        let query = query.to_string();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(query);
        }));
    }

    pub fn teardown(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawTag;

    fn item(slug: &str, title: &str, cluster: Option<&str>, as_of: &str) -> ContentItem {
        ContentItem {
            slug: slug.into(),
            title: title.into(),
            cluster: cluster.map(String::from),
            as_of: as_of.into(),
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    #[test]
    fn default_state_passes_everything_in_order() {
        let catalogue = vec![
            item("c", "Third", Some("credit"), "2024-05-03"),
            item("b", "Second", None, "not-a-date"),
            item("a", "First", Some("shipping"), "2024-05-01"),
        ];
        let active = apply(&catalogue, &FilterState::default(), today());
        let slugs: Vec<&str> = active.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, ["c", "b", "a"]);
    }

    #[test]
    fn cluster_filter_is_case_insensitive_and_strict_on_missing() {
        let catalogue = vec![
            item("a", "A", Some("Shipping"), "2024-05-01"),
            item("b", "B", None, "2024-05-02"),
        ];
        let state = FilterState {
            cluster: "shipping".into(),
            ..Default::default()
        };
        let active = apply(&catalogue, &state, today());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].slug, "a");
    }

    #[test]
    fn timeframe_fails_open_on_bad_dates() {
        let catalogue = vec![
            item("recent", "R", None, "2024-05-08"),
            item("old", "O", None, "2024-01-01"),
            item("broken", "B", None, "sometime"),
        ];
        let state = FilterState {
            timeframe: Timeframe::Days(7),
            ..Default::default()
        };
        let active = apply(&catalogue, &state, today());
        let slugs: Vec<&str> = active.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, ["recent", "broken"]);
    }

    #[test]
    fn query_searches_title_summary_cluster_and_tags() {
        let mut with_tag = item("t", "Quiet title", None, "2024-05-01");
        with_tag.tags = vec![RawTag::Text("Shipping".into())];
        let catalogue = vec![
            item("a", "Shipping squeeze", None, "2024-05-01"),
            item("b", "Credit crunch", None, "2024-05-02"),
            with_tag,
        ];
        let mut state = FilterState::default();
        state.set_query("Shipping");
        let active = apply(&catalogue, &state, today());
        let slugs: Vec<&str> = active.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, ["a", "t"]);
    }

    #[test]
    fn apply_is_idempotent_and_non_mutating() {
        let catalogue = vec![
            item("a", "Shipping squeeze", Some("shipping"), "2024-05-01"),
            item("b", "Credit crunch", Some("credit"), "2024-05-02"),
        ];
        let state = FilterState {
            cluster: "credit".into(),
            ..Default::default()
        };
        let first: Vec<String> = apply(&catalogue, &state, today())
            .iter()
            .map(|i| i.slug.clone())
            .collect();
        let second: Vec<String> = apply(&catalogue, &state, today())
            .iter()
            .map(|i| i.slug.clone())
            .collect();
        assert_eq!(first, second);
        assert_eq!(catalogue.len(), 2);
    }

    #[test]
    fn display_sort_is_deterministic() {
        let catalogue = vec![
            item("a", "A", None, "2024-05-01"),
            item("b", "B", None, "2024-05-03"),
            item("z", "Z", None, "2024-05-03"),
        ];
        let mut subset = apply(&catalogue, &FilterState::default(), today());
        sort_for_display(&mut subset);
        let slugs: Vec<&str> = subset.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, ["z", "b", "a"]);
    }

    #[test]
    fn timeframe_parse_accepts_days_and_falls_back_to_all() {
        assert_eq!(Timeframe::parse("30"), Timeframe::Days(30));
        assert_eq!(Timeframe::parse("all"), Timeframe::All);
        assert_eq!(Timeframe::parse(""), Timeframe::All);
        assert_eq!(Timeframe::parse("0"), Timeframe::All);
        assert_eq!(Timeframe::parse("soon"), Timeframe::All);
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_delivers_only_the_last_keystroke() {
        let (mut debouncer, mut rx) = SearchDebouncer::new(SEARCH_DEBOUNCE);
        debouncer.keystroke("s");
        debouncer.keystroke("sh");
        debouncer.keystroke("shipping");
        tokio::time::sleep(SEARCH_DEBOUNCE * 2).await;
        assert_eq!(rx.recv().await.unwrap(), "shipping");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_delivery() {
        let (mut debouncer, mut rx) = SearchDebouncer::new(SEARCH_DEBOUNCE);
        debouncer.keystroke("shipping");
        debouncer.teardown();
        tokio::time::sleep(SEARCH_DEBOUNCE * 2).await;
        assert!(rx.try_recv().is_err());
    }
}
