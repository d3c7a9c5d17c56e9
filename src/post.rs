use itertools::Itertools;
use url::Url;

use crate::models::{ContentItem, EventRecord, Tag};
use crate::render::{escape_html, render_tag_links};

/// Extract the content slug from a page path. The conventional index page
/// is never a content slug; query strings and fragments are not part of
/// the name.
pub fn slug_from_path(path: &str) -> Option<String> {
    let trimmed = path.split(['?', '#']).next().unwrap_or("");
    let name = trimmed.rsplit('/').next().unwrap_or("");
    let stem = name.strip_suffix(".html").unwrap_or(name).trim();
    if stem.is_empty() || stem.eq_ignore_ascii_case("index") {
        return None;
    }
    Some(stem.to_string())
}

/// Position of a post in the archive catalogue plus its chronological
/// neighbors. The catalogue is newest-first, so Prev (older) sits after
/// the entry in array order and Next (newer) before it.
pub struct Neighbors<'a> {
    pub current: &'a ContentItem,
    pub prev: Option<&'a ContentItem>,
    pub next: Option<&'a ContentItem>,
}

pub fn locate<'a>(items: &'a [ContentItem], slug: &str) -> Option<Neighbors<'a>> {
    let idx = items
        .iter()
        .position(|item| item.slug.eq_ignore_ascii_case(slug))?;
    Some(Neighbors {
        current: &items[idx],
        prev: items.get(idx + 1),
        next: idx.checked_sub(1).map(|i| &items[i]),
    })
}

/// Canonical form for source deduplication: lower-cased scheme, host and
/// path with the trailing slash, query and fragment stripped. Tracking
/// parameters or protocol case differences collapse into one entry.
/// Inputs that do not parse as absolute URLs canonicalize to their trimmed
/// selves.
pub fn canonicalize_url(raw: &str) -> String {
    let raw = raw.trim();
    let Ok(url) = Url::parse(raw) else {
        return raw.to_string();
    };
    let Some(host) = url.host_str() else {
        return raw.to_string();
    };
    let path = url.path().trim_end_matches('/');
    format!("{}://{}{}", url.scheme(), host.to_lowercase(), path)
}

/// Display label for a source link: the lower-cased hostname without a
/// leading `www.`.
pub fn source_label(raw: &str) -> String {
    if let Ok(url) = Url::parse(raw.trim()) {
        if let Some(host) = url.host_str() {
            let host = host.to_lowercase();
            return host.strip_prefix("www.").unwrap_or(&host).to_string();
        }
    }
    raw.trim().to_string()
}

/// Deduplicate a source list by canonical form, preserving first-seen
/// order and the original URL for the link target.
pub fn dedupe_sources(sources: &[String]) -> Vec<&String> {
    sources
        .iter()
        .filter(|s| !s.trim().is_empty())
        .unique_by(|s| canonicalize_url(s))
        .collect()
}

/// Rendered source list that replaces a post's inline citations when the
/// cross-referenced event supplies sources. Empty after dedupe means no
/// replacement happens and the inline markup stays.
pub fn render_sources(event: &EventRecord) -> Option<String> {
    let unique = dedupe_sources(&event.sources);
    if unique.is_empty() {
        return None;
    }
    let mut out = String::from("<section class=\"post-sources\">\n  <h2>Sources</h2>\n  <ul>\n");
    for source in unique {
        out.push_str(&format!(
            "    <li><a href=\"{}\" rel=\"noopener\">{}</a></li>\n",
            escape_html(source),
            escape_html(&source_label(source))
        ));
    }
    out.push_str("  </ul>\n</section>");
    Some(out)
}

/// Prev/next navigation fragment. Either side may be absent; with both
/// absent there is nothing to render.
pub fn render_prev_next(neighbors: &Neighbors<'_>) -> Option<String> {
    if neighbors.prev.is_none() && neighbors.next.is_none() {
        return None;
    }
    let mut out = String::from("<nav class=\"post-pagination\" aria-label=\"Briefing navigation\">\n");
    if let Some(prev) = neighbors.prev {
        out.push_str(&format!(
            "  <a class=\"post-pagination__prev\" href=\"{}.html\">&larr; {}</a>\n",
            escape_html(&prev.slug),
            escape_html(&prev.title)
        ));
    }
    if let Some(next) = neighbors.next {
        out.push_str(&format!(
            "  <a class=\"post-pagination__next\" href=\"{}.html\">{} &rarr;</a>\n",
            escape_html(&next.slug),
            escape_html(&next.title)
        ));
    }
    out.push_str("</nav>");
    Some(out)
}

/// Related-tags section for a post; nothing renders when the reconciled
/// set is empty.
pub fn render_related_tags(tags: &[Tag]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }
    Some(format!(
        "<section class=\"post-related-tags\">\n  <h2>Related topics</h2>\n  <div class=\"tag-list\">\n      {}\n  </div>\n</section>",
        render_tag_links(tags)
    ))
}
