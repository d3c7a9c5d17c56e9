use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::api_types::{ArchivePayload, LatestPayload, LeaderboardPayload};
use crate::fetch::{FetchError, Loader};
use crate::filter::{self, FilterState, Timeframe};
use crate::models::ContentItem;
use crate::paging::{PageStep, Pager};
use crate::post;
use crate::render;
use crate::resolve::Resolver;
use crate::rotator::HighlightRotator;
use crate::tags;
use crate::xref::CrossRefIndex;

const EVENTS_PATH: &str = "data/events.json";
const ARCHIVE_PATH: &str = "data/briefings_archive.json";
const LATEST_PATH: &str = "data/latest_briefings.json";
const LEADERBOARD_PATH: &str = "data/leaderboard.json";

/// One page view's worth of configuration: where the registries live,
/// which filters are active, and which optional views to produce.
pub struct ViewConfig {
    pub page_base: Option<String>,
    pub data_base: Option<String>,
    pub output_dir: PathBuf,
    pub page_size: usize,
    pub cluster: String,
    pub timeframe: Timeframe,
    pub query: String,
    pub tag: Option<String>,
    pub post_path: Option<String>,
    pub sentinel_available: bool,
}

/// Load the registries, reconcile, and write every view this page renders.
/// Each widget is isolated: a failed registry degrades that widget to a
/// status fragment and never blocks a sibling.
pub async fn run(config: &ViewConfig, today: NaiveDate) -> Result<()> {
    let start = std::time::Instant::now();
    let resolver = Resolver::new(config.page_base.as_deref(), config.data_base.as_deref());
    let loader = Loader::new();

    // All registries for one view start together and are joined once all
    // settle; nothing re-fetches on filter changes.
    let events_url = resolver.resolve_fresh(EVENTS_PATH);
    let archive_url = resolver.resolve_fresh(ARCHIVE_PATH);
    let latest_url = resolver.resolve_fresh(LATEST_PATH);
    let leaderboard_url = resolver.resolve_fresh(LEADERBOARD_PATH);
    let (events, archive, latest, leaderboard) = futures::join!(
        loader.load_events(&events_url),
        loader.load_archive(&archive_url),
        loader.load_latest(&latest_url),
        loader.load_leaderboard(&leaderboard_url),
    );
    info!(
        "Registry loads settled - duration={:.2}s, events_ok={}, archive_ok={}, latest_ok={}, leaderboard_ok={}",
        start.elapsed().as_secs_f32(),
        events.is_ok(),
        archive.is_ok(),
        latest.is_ok(),
        leaderboard.is_ok()
    );

    // A missing event registry is a reconciliation degradation, not a
    // failure: views fall back to item-local metadata.
    let xref = match &events {
        Ok(payload) => CrossRefIndex::build(payload),
        Err(e) => {
            warn!("Event registry unavailable - {}", e);
            CrossRefIndex::empty()
        }
    };

    let archive_fragment = match &archive {
        Ok(payload) => archive_view(payload, &xref, config, today),
        Err(e) => status_for(e, "briefings"),
    };
    write_fragment(&config.output_dir, "archive.fragment.html", &archive_fragment)?;

    if let Some(tag_query) = config.tag.as_deref() {
        let fragment = match &archive {
            Ok(payload) => tag_view(payload, &xref, tag_query),
            Err(e) => status_for(e, "tagged briefings"),
        };
        write_fragment(&config.output_dir, "tag.fragment.html", &fragment)?;
    }

    let latest_fragment = match &latest {
        Ok(payload) => latest_view(payload, &xref),
        Err(e) => status_for(e, "latest briefings"),
    };
    write_fragment(&config.output_dir, "latest.fragment.html", &latest_fragment)?;

    let leaderboard_fragment = match &leaderboard {
        Ok(payload) => leaderboard_view(payload, archive.as_ref().ok()),
        Err(e) => status_for(e, "leaderboard"),
    };
    write_fragment(
        &config.output_dir,
        "leaderboard.fragment.html",
        &leaderboard_fragment,
    )?;

    if let Some(post_path) = config.post_path.as_deref() {
        let fragment = match &archive {
            Ok(payload) => post_view(post_path, payload, &xref),
            Err(e) => status_for(e, "briefing context"),
        };
        write_fragment(&config.output_dir, "post.fragment.html", &fragment)?;
    }

    info!(
        "View render completed - duration={:.2}s, output={}",
        start.elapsed().as_secs_f32(),
        config.output_dir.display()
    );
    Ok(())
}

fn card_for(item: &ContentItem, xref: &CrossRefIndex) -> String {
    let event = xref.lookup(item);
    let reconciled = tags::reconcile(item, event, &[]);
    render::render_card(item, &reconciled, event)
}

/// The archive grid: filtered, sorted, first page plus pagination
/// controls. Later pages render through the sentinel/manual triggers
/// against the same pager.
fn archive_view(
    payload: &ArchivePayload,
    xref: &CrossRefIndex,
    config: &ViewConfig,
    today: NaiveDate,
) -> String {
    let state = FilterState::new(&config.cluster, config.timeframe, &config.query);
    let mut active = filter::apply(&payload.items, &state, today);
    filter::sort_for_display(&mut active);

    if active.is_empty() {
        return render::render_status("No briefings match the current filters.");
    }

    let mut pager = Pager::new(config.page_size, config.sentinel_available);
    let mut out = String::new();
    if let PageStep::Page(page) = pager.next_page(&active) {
        for item in page {
            out.push_str(&card_for(item, xref));
            out.push('\n');
        }
    }
    out.push_str(&render::render_load_more(
        pager.is_exhausted(active.len()),
        pager.trigger(),
    ));
    debug!(
        "Archive view - active={}, rendered={}, trigger={:?}",
        active.len(),
        pager.rendered_count(),
        pager.trigger()
    );
    out
}

/// The tag archive: membership comes from each item's reconciled tag set,
/// matched case-insensitively against the requested slug.
fn tag_view(payload: &ArchivePayload, xref: &CrossRefIndex, tag_query: &str) -> String {
    let wanted = tag_query.trim().to_lowercase();
    if wanted.is_empty() {
        return render::render_status("No tag selected.");
    }

    let mut matched: Vec<&ContentItem> = Vec::new();
    let mut label = tags::normalize_label(&wanted);
    for item in &payload.items {
        let event = xref.lookup(item);
        let reconciled = tags::reconcile(item, event, &[]);
        if let Some(tag) = reconciled.iter().find(|t| t.slug == wanted) {
            if matched.is_empty() {
                label = tag.label.clone();
            }
            matched.push(item);
        }
    }

    if matched.is_empty() {
        return render::render_status(&format!("No briefings tagged \"{label}\" yet."));
    }
    filter::sort_for_display(&mut matched);

    let mut out = format!(
        "<h2 class=\"tag-archive__heading\">Briefings tagged {}</h2>\n",
        render::escape_html(&label)
    );
    for item in matched {
        out.push_str(&card_for(item, xref));
        out.push('\n');
    }
    out
}

fn latest_view(payload: &LatestPayload, xref: &CrossRefIndex) -> String {
    if payload.items.is_empty() {
        return render::render_status("No recent briefings.");
    }
    let mut out = String::new();
    for item in &payload.items {
        out.push_str(&card_for(item, xref));
        out.push('\n');
    }
    out
}

/// Initial frame of the highlight rotator: the current highlight, one
/// selector dot per entry, and the top-score aggregate. Rotation itself is
/// timer-driven at runtime.
fn leaderboard_view(payload: &LeaderboardPayload, archive: Option<&ArchivePayload>) -> String {
    let rotator = HighlightRotator::new(payload, archive);
    let Some(current) = rotator.current() else {
        return render::render_status("Leaderboard is empty.");
    };

    let mut out = String::from("<div class=\"highlight-rotator\" data-rotator=\"true\">\n");
    out.push_str(&format!(
        "  <p class=\"highlight-rotator__top-score\">Top score: {}</p>\n",
        rotator
            .top_score()
            .map(|s| (s.round() as i64).to_string())
            .unwrap_or_else(|| "n/a".to_string())
    ));
    out.push_str("  <div class=\"highlight-rotator__current\">\n");
    if let Some(badge) = current.phase.as_deref().and_then(render::phase_badge) {
        out.push_str(&format!("    {badge}\n"));
    }
    let name = render::escape_html(&current.name);
    match current.slug.as_deref() {
        Some(slug) => out.push_str(&format!(
            "    <h3><a href=\"posts/{}.html\">{}</a></h3>\n",
            render::escape_html(slug),
            name
        )),
        None => out.push_str(&format!("    <h3>{name}</h3>\n")),
    }
    out.push_str(&format!("    {}\n", render::render_score_chip(current.score)));
    if let Some(updated) = current
        .last_updated
        .as_deref()
        .and_then(render::render_last_updated)
    {
        out.push_str(&format!("    {updated}\n"));
    }
    if let Some(summary) = current.summary.as_deref() {
        out.push_str(&format!(
            "    <p class=\"highlight-rotator__summary\">{}</p>\n",
            render::escape_html(summary)
        ));
    }
    out.push_str("  </div>\n  <div class=\"highlight-rotator__dots\">\n");
    for (i, entry) in rotator.entries().iter().enumerate() {
        let active = if i == rotator.index() { " is-active" } else { "" };
        out.push_str(&format!(
            "    <button class=\"rotator-dot{}\" data-rotator-select=\"{}\" aria-label=\"Show {}\"></button>\n",
            active,
            i,
            render::escape_html(&entry.name)
        ));
    }
    out.push_str("  </div>\n</div>");
    out
}

/// Post-page enhancements: prev/next links, related tags, and the source
/// list that replaces inline citations. Every miss degrades to an absent
/// section.
fn post_view(post_path: &str, payload: &ArchivePayload, xref: &CrossRefIndex) -> String {
    let Some(slug) = post::slug_from_path(post_path) else {
        debug!("Not a content page - path={}", post_path);
        return String::new();
    };
    let Some(neighbors) = post::locate(&payload.items, &slug) else {
        debug!("Post not in catalogue - slug={}", slug);
        return String::new();
    };

    let mut sections = Vec::new();
    let event = xref.lookup(neighbors.current);
    if let Some(sources) = event.and_then(post::render_sources) {
        sections.push(sources);
    }
    let reconciled = tags::reconcile(neighbors.current, event, &[]);
    if let Some(related) = post::render_related_tags(&reconciled) {
        sections.push(related);
    }
    if let Some(nav) = post::render_prev_next(&neighbors) {
        sections.push(nav);
    }
    sections.join("\n")
}

/// Transport and parse failures surface as the same user-visible message;
/// the distinction lives in the logs.
fn status_for(err: &FetchError, what: &str) -> String {
    warn!("Widget degraded - {}", err);
    render::render_status(&format!("Unable to load {what} right now."))
}

fn write_fragment(dir: &Path, name: &str, html: &str) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(name);
    let mut body = html.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    std::fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_types::EventsPayload;
    use crate::models::{EventRecord, RiskEntry};

    fn archive_with(items: Vec<ContentItem>) -> ArchivePayload {
        ArchivePayload {
            generated_at: None,
            items,
        }
    }

    fn item(slug: &str, title: &str, cluster: Option<&str>, as_of: &str) -> ContentItem {
        ContentItem {
            slug: slug.into(),
            title: title.into(),
            cluster: cluster.map(String::from),
            as_of: as_of.into(),
            ..Default::default()
        }
    }

    fn config(tmp: &Path) -> ViewConfig {
        ViewConfig {
            page_base: None,
            data_base: None,
            output_dir: tmp.to_path_buf(),
            page_size: 2,
            cluster: String::new(),
            timeframe: Timeframe::All,
            query: String::new(),
            tag: None,
            post_path: None,
            sentinel_available: true,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    #[test]
    fn archive_view_renders_first_page_and_controls() {
        let payload = archive_with(vec![
            item("c", "C", None, "2024-05-03"),
            item("b", "B", None, "2024-05-02"),
            item("a", "A", None, "2024-05-01"),
        ]);
        let cfg = config(Path::new("/tmp/unused"));
        let html = archive_view(&payload, &CrossRefIndex::empty(), &cfg, today());
        assert!(html.contains("data-slug=\"c\""));
        assert!(html.contains("data-slug=\"b\""));
        assert!(!html.contains("data-slug=\"a\"")); // page_size = 2
        assert!(html.contains("data-load-more"));
    }

    #[test]
    fn empty_filter_result_is_a_status_not_an_error() {
        let payload = archive_with(vec![item("a", "A", Some("credit"), "2024-05-01")]);
        let mut cfg = config(Path::new("/tmp/unused"));
        cfg.cluster = "shipping".into();
        let html = archive_view(&payload, &CrossRefIndex::empty(), &cfg, today());
        assert!(html.contains("feed-status"));
    }

    #[test]
    fn tag_view_matches_reconciled_tags_case_insensitively() {
        let payload = archive_with(vec![
            item("a", "A", Some("Shipping"), "2024-05-01"),
            item("b", "B", Some("credit"), "2024-05-02"),
        ]);
        let html = tag_view(&payload, &CrossRefIndex::empty(), "  SHIPPING ");
        assert!(html.contains("data-slug=\"a\""));
        assert!(!html.contains("data-slug=\"b\""));
        assert!(html.contains("Briefings tagged Shipping"));
    }

    #[test]
    fn tag_view_picks_up_event_derived_tags() {
        let events = EventsPayload {
            events: vec![EventRecord {
                uid: "e-1".into(),
                title: Some("A".into()),
                event_type: Some("margin_call".into()),
                ..Default::default()
            }],
        };
        let xref = CrossRefIndex::build(&events);
        let payload = archive_with(vec![item("a", "A", None, "2024-05-01")]);
        let html = tag_view(&payload, &xref, "margin-call");
        assert!(html.contains("data-slug=\"a\""));
    }

    #[test]
    fn leaderboard_view_renders_clamped_scores_and_dots() {
        let payload = LeaderboardPayload {
            as_of: None,
            risks: vec![
                RiskEntry {
                    id: "r1".into(),
                    name: "Margin spiral".into(),
                    score: 140.0,
                    phase: Some("critical".into()),
                    last_updated: Some("2024-05-02".into()),
                    ..Default::default()
                },
                RiskEntry {
                    id: "r2".into(),
                    name: "Port closure".into(),
                    score: 55.0,
                    phase: Some("watch".into()),
                    ..Default::default()
                },
            ],
        };
        let html = leaderboard_view(&payload, None);
        assert!(html.contains("Top score: 100"));
        assert!(html.contains("risk-badge--high"));
        assert!(html.contains("Updated 02 May 2024"));
        assert_eq!(html.matches("rotator-dot").count(), 2);
    }

    #[test]
    fn post_view_degrades_on_misses() {
        let payload = archive_with(vec![item("a", "A", None, "2024-05-01")]);
        assert_eq!(post_view("/posts/index.html", &payload, &CrossRefIndex::empty()), "");
        assert_eq!(post_view("/posts/ghost.html", &payload, &CrossRefIndex::empty()), "");
    }

    #[test]
    fn post_view_stitches_nav_tags_and_sources() {
        let events = EventsPayload {
            events: vec![EventRecord {
                uid: "e-1".into(),
                title: Some("B".into()),
                cluster: Some("shipping".into()),
                sources: vec![
                    "https://Example.com/a/".into(),
                    "https://example.com/a".into(),
                ],
                ..Default::default()
            }],
        };
        let xref = CrossRefIndex::build(&events);
        let payload = archive_with(vec![
            item("c", "C", None, "2024-05-03"),
            item("b", "B", None, "2024-05-02"),
            item("a", "A", None, "2024-05-01"),
        ]);
        let html = post_view("/posts/b.html", &payload, &xref);
        assert!(html.contains("post-pagination__prev"));
        assert!(html.contains("href=\"a.html\""));
        assert!(html.contains("href=\"c.html\""));
        assert!(html.contains("Related topics"));
        // Duplicate sources collapse to one entry.
        assert_eq!(html.matches("<li>").count(), 1);
    }
}
