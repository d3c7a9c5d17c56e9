use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{ContentItem, EventRecord, Tag};
use crate::paging::PageTrigger;
use crate::tags::{normalize_label, slugify};

/// The engine's single injection boundary: every data-sourced string passes
/// through here before landing in a fragment.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Strip `:contentReference[...]{...}` helper markers that the upstream
/// generator sometimes leaves inside briefing HTML.
pub fn sanitize_fragment(html: &str) -> String {
    static WITH_BRACES: OnceLock<Regex> = OnceLock::new();
    static BARE: OnceLock<Regex> = OnceLock::new();
    let with_braces = WITH_BRACES
        .get_or_init(|| Regex::new(r":contentReference\[[^\]]*\]\{[^}]*\}").expect("static regex"));
    let bare =
        BARE.get_or_init(|| Regex::new(r":contentReference\[[^\]]*\]").expect("static regex"));
    let pass = with_braces.replace_all(html, "");
    bare.replace_all(&pass, "").into_owned()
}

/// Human date for cards and post headers: "03 May 2024". Unparsable values
/// render as-is rather than vanishing.
pub fn format_as_of(as_of: &str) -> String {
    match NaiveDate::parse_from_str(as_of.trim(), "%Y-%m-%d") {
        Ok(date) => date.format("%d %B %Y").to_string(),
        Err(_) => as_of.trim().to_string(),
    }
}

/// Badge class and display text for a risk phase. Unknown phases get the
/// watch styling with a title-cased label rather than disappearing.
pub fn phase_badge(phase: &str) -> Option<String> {
    let label = phase.trim();
    if label.is_empty() {
        return None;
    }
    let (class, text) = match label.to_lowercase().as_str() {
        "critical" => ("risk-badge--high", "Trigger risk: Critical".to_string()),
        "elevated" => ("risk-badge--medium", "Trigger risk: Elevated".to_string()),
        "watch" => ("risk-badge--watch", "Trigger risk: Watch".to_string()),
        _ => ("risk-badge--watch", format!("Phase: {}", normalize_label(label))),
    };
    Some(format!(
        r#"<span class="risk-badge {}">{}</span>"#,
        class,
        escape_html(&text)
    ))
}

/// Modifier class carrying the cluster-to-visual-theme mapping.
pub fn cluster_theme(cluster: &str) -> String {
    let slug = slugify(cluster);
    if slug.is_empty() {
        "card--untagged".to_string()
    } else {
        format!("card--{slug}")
    }
}

pub fn render_score_chip(score: f64) -> String {
    let clamped = score.clamp(0.0, 100.0);
    format!(
        r#"<span class="score-chip">Score: {}</span>"#,
        clamped.round() as i64
    )
}

/// Confidence chip: "Confidence: Medium". Blank values render nothing.
pub fn render_confidence_chip(confidence: &str) -> Option<String> {
    let value = confidence.trim();
    if value.is_empty() {
        return None;
    }
    let mut chars = value.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => return None,
    };
    Some(format!(
        r#"<span class="confidence-chip">Confidence: {}</span>"#,
        escape_html(&capitalized)
    ))
}

/// Last-assessed line for cards and the highlight frame.
pub fn render_last_updated(last_updated: &str) -> Option<String> {
    let value = last_updated.trim();
    if value.is_empty() {
        return None;
    }
    Some(format!(
        r#"<span class="updated-chip">Updated {}</span>"#,
        escape_html(&format_as_of(value))
    ))
}

fn tag_link(tag: &Tag) -> String {
    format!(
        r#"<a class="tag-chip" href="briefings.html?tag={}">{}</a>"#,
        escape_html(&tag.slug),
        escape_html(&tag.label)
    )
}

pub fn render_tag_links(tags: &[Tag]) -> String {
    tags.iter().map(tag_link).collect::<Vec<_>>().join("\n      ")
}

/// One briefing card: a self-contained fragment for the archive grid, the
/// tag archive, or the latest-briefings strip. Reconciled tags and the
/// cross-referenced event arrive pre-computed; missing pieces degrade to a
/// sparser card, never an error.
pub fn render_card(item: &ContentItem, tags: &[Tag], event: Option<&EventRecord>) -> String {
    let theme = cluster_theme(item.cluster.as_deref().unwrap_or(""));
    let mut out = String::new();
    out.push_str(&format!(
        "<article class=\"briefing-card {}\" data-slug=\"{}\">\n",
        theme,
        escape_html(&item.slug)
    ));
    if !item.as_of.trim().is_empty() {
        out.push_str(&format!(
            "  <p class=\"briefing-card__date\">{}</p>\n",
            escape_html(&format_as_of(&item.as_of))
        ));
    }
    out.push_str(&format!(
        "  <h3 class=\"briefing-card__title\"><a href=\"posts/{}.html\">{}</a></h3>\n",
        escape_html(&item.slug),
        escape_html(&item.title)
    ));
    if let Some(summary) = item.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!(
            "  <p class=\"briefing-card__summary\">{}</p>\n",
            escape_html(&sanitize_fragment(summary))
        ));
    }

    let mut meta = Vec::new();
    if let Some(ev) = event {
        if let Some(badge) = ev.phase.as_deref().and_then(phase_badge) {
            meta.push(badge);
        }
        if let Some(score) = ev.score {
            meta.push(render_score_chip(score));
        }
        if let Some(chip) = ev.confidence.as_deref().and_then(render_confidence_chip) {
            meta.push(chip);
        }
        if let Some(updated) = ev.last_updated.as_deref().and_then(render_last_updated) {
            meta.push(updated);
        }
    }
    if !meta.is_empty() {
        out.push_str(&format!(
            "  <div class=\"briefing-card__meta\">{}</div>\n",
            meta.join(" ")
        ));
    }
    if !tags.is_empty() {
        out.push_str(&format!(
            "  <div class=\"briefing-card__tags\">\n      {}\n  </div>\n",
            render_tag_links(tags)
        ));
    }
    out.push_str("</article>");
    out
}

/// User-visible status line for a container whose data failed to load or
/// came back empty.
pub fn render_status(message: &str) -> String {
    format!(
        r#"<p class="feed-status" role="status">{}</p>"#,
        escape_html(message)
    )
}

/// Pagination controls rendered after every page. The sentinel the
/// visibility observer watches is only emitted when sentinel observation
/// is available; otherwise the manual button is the sole trigger.
pub fn render_load_more(exhausted: bool, trigger: PageTrigger) -> String {
    if exhausted {
        return r#"<p class="feed-status feed-status--done">No more briefings.</p>"#.to_string();
    }
    let button =
        "<button class=\"btn btn-secondary\" data-load-more=\"true\">Load more briefings</button>";
    match trigger {
        PageTrigger::Sentinel => format!(
            "<div class=\"feed-sentinel\" data-feed-sentinel=\"true\"></div>\n{button}"
        ),
        PageTrigger::Manual => button.to_string(),
    }
}
