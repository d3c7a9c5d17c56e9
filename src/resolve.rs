use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};
use url::Url;

/// Turns relative data paths into absolute URLs against the best available
/// base: the page base first (where the view is being rendered for), then
/// the engine's own data root. When neither base is usable the relative
/// path is returned unchanged so the caller can still attempt the fetch.
/// Resolution never fails; the degraded case is logged once.
pub struct Resolver {
    page_base: Option<Url>,
    data_base: Option<Url>,
    warned: AtomicBool,
}

impl Resolver {
    pub fn new(page_base: Option<&str>, data_base: Option<&str>) -> Self {
        Self {
            page_base: parse_base(page_base, "page base"),
            data_base: parse_base(data_base, "data base"),
            warned: AtomicBool::new(false),
        }
    }

    /// Resolve without cache-busting, for lookups that tolerate a cached
    /// response.
    pub fn resolve(&self, relative: &str) -> String {
        if let Some(url) = self.join(relative) {
            return url.into();
        }
        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!("No usable base URL - falling back to relative path '{}'", relative);
        }
        relative.to_string()
    }

    /// Resolve and append a cache-defeating query parameter derived from
    /// the current timestamp. Archive, leaderboard and latest feeds always
    /// load through this path.
    pub fn resolve_fresh(&self, relative: &str) -> String {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        if let Some(mut url) = self.join(relative) {
            url.query_pairs_mut().append_pair("cb", &stamp.to_string());
            return url.into();
        }
        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!("No usable base URL - falling back to relative path '{}'", relative);
        }
        // Still bust the cache on the raw path.
        let sep = if relative.contains('?') { '&' } else { '?' };
        format!("{relative}{sep}cb={stamp}")
    }

    fn join(&self, relative: &str) -> Option<Url> {
        for base in [&self.page_base, &self.data_base].into_iter().flatten() {
            match base.join(relative) {
                Ok(url) => return Some(url),
                Err(e) => debug!("Join failed against {} - {}", base, e),
            }
        }
        None
    }
}

fn parse_base(raw: Option<&str>, kind: &str) -> Option<Url> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    // A base without a trailing slash would swallow its last segment on
    // join; normalize before parsing.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    match Url::parse(&normalized) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Ignoring unparsable {} '{}' - {}", kind, raw, e);
            None
        }
    }
}
