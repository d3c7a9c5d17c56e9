use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api_types::{ArchivePayload, LeaderboardPayload};
use crate::models::RiskEntry;
use crate::xref::normalize_title;

/// How many leaderboard entries the highlight widget cycles through.
pub const HIGHLIGHT_COUNT: usize = 3;
/// Fixed rotation cadence while the page is visible.
pub const ROTATION_INTERVAL: Duration = Duration::from_secs(8);

pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 100.0)
}

/// One rotator entry: a clamped leaderboard risk, enriched from the
/// archive catalogue by title match when the snapshot itself carries no
/// slug or summary.
#[derive(Debug, Clone)]
pub struct Highlight {
    pub id: String,
    pub name: String,
    pub score: f64,
    pub phase: Option<String>,
    pub cluster: Option<String>,
    pub last_updated: Option<String>,
    pub summary: Option<String>,
    pub slug: Option<String>,
}

/// Cycles the top-N ranked risks. Pure state machine: `advance` is the
/// timer tick, `select` is an explicit user selection, visibility drives
/// the timer through `should_rotate`. With zero or one entries the timer
/// never starts.
pub struct HighlightRotator {
    entries: Vec<Highlight>,
    index: usize,
    visible: bool,
}

impl HighlightRotator {
    pub fn new(snapshot: &LeaderboardPayload, archive: Option<&ArchivePayload>) -> Self {
        let entries = snapshot
            .risks
            .iter()
            .take(HIGHLIGHT_COUNT)
            .map(|risk| enrich(risk, archive))
            .collect::<Vec<_>>();
        debug!("Highlight rotator built - entries={}", entries.len());
        Self {
            entries,
            index: 0,
            visible: true,
        }
    }

    pub fn entries(&self) -> &[Highlight] {
        &self.entries
    }

    pub fn current(&self) -> Option<&Highlight> {
        self.entries.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Timer tick: showing(i) -> showing((i+1) mod n).
    pub fn advance(&mut self) {
        if self.entries.len() > 1 {
            self.index = (self.index + 1) % self.entries.len();
        }
    }

    /// Explicit selection of position j; out-of-range selections are
    /// ignored.
    pub fn select(&mut self, j: usize) {
        if j < self.entries.len() {
            self.index = j;
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Whether the rotation timer should be running right now.
    pub fn should_rotate(&self) -> bool {
        self.visible && self.entries.len() > 1
    }

    /// Maximum clamped score across the displayed subset; `None` when the
    /// subset is empty.
    pub fn top_score(&self) -> Option<f64> {
        self.entries.iter().map(|h| h.score).reduce(f64::max)
    }
}

fn enrich(risk: &RiskEntry, archive: Option<&ArchivePayload>) -> Highlight {
    let mut slug = risk.slug.clone().filter(|s| !s.trim().is_empty());
    let mut summary = risk.summary.clone().filter(|s| !s.trim().is_empty());

    if slug.is_none() || summary.is_none() {
        if let Some(archive) = archive {
            let key = normalize_title(&risk.name);
            if let Some(item) = archive
                .items
                .iter()
                .find(|i| !key.is_empty() && normalize_title(&i.title) == key)
            {
                if slug.is_none() && !item.slug.trim().is_empty() {
                    slug = Some(item.slug.clone());
                }
                if summary.is_none() {
                    summary = item.summary.clone();
                }
            }
        }
    }

    Highlight {
        id: risk.id.clone(),
        name: risk.name.clone(),
        score: clamp_score(risk.score),
        phase: risk.phase.clone(),
        cluster: risk.cluster.clone(),
        last_updated: risk.last_updated.clone(),
        summary,
        slug,
    }
}

/// The rotator's explicit, cancellable timer: a tokio task that emits a
/// tick per interval. Stopped on visibility loss and on teardown; a
/// restart always begins a fresh interval.
pub struct RotationTimer {
    interval: Duration,
    tx: mpsc::UnboundedSender<()>,
    task: Option<JoinHandle<()>>,
}

impl RotationTimer {
    pub fn new(interval: Duration) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                interval,
                tx,
                task: None,
            },
            rx,
        )
    }

    pub fn start(&mut self) {
        self.stop();
        let tx = self.tx.clone();
        let interval = self.interval;
        self.task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for RotationTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Apply a visibility change: clear the timer when hidden, restart it
/// fresh when visible again (and rotation is warranted).
pub fn on_visibility_change(rotator: &mut HighlightRotator, timer: &mut RotationTimer, visible: bool) {
    rotator.set_visible(visible);
    if rotator.should_rotate() {
        timer.start();
    } else {
        timer.stop();
    }
}
