use tracing::debug;

use crate::models::ContentItem;

pub const DEFAULT_PAGE_SIZE: usize = 9;

/// What fires the next page render. Both triggers map onto the same
/// `next_page` call; when sentinel observation is unavailable the manual
/// control is the sole trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTrigger {
    Sentinel,
    Manual,
}

/// Outcome of a page render request.
#[derive(Debug)]
pub enum PageStep<'a> {
    /// The next slice of the active subset, in established order.
    Page(Vec<&'a ContentItem>),
    /// Terminal: everything in the active subset is already rendered.
    Exhausted,
}

/// Renders the active subset in fixed-size pages. The pager never holds
/// the subset itself; the caller passes the current epoch's subset in, and
/// a filter change must `reset` before the new epoch's first page.
#[derive(Debug)]
pub struct Pager {
    rendered_count: usize,
    page_size: usize,
    trigger: PageTrigger,
}

impl Pager {
    pub fn new(page_size: usize, sentinel_available: bool) -> Self {
        Self {
            rendered_count: 0,
            page_size: page_size.max(1),
            trigger: if sentinel_available {
                PageTrigger::Sentinel
            } else {
                PageTrigger::Manual
            },
        }
    }

    pub fn rendered_count(&self) -> usize {
        self.rendered_count
    }

    pub fn trigger(&self) -> PageTrigger {
        self.trigger
    }

    pub fn is_exhausted(&self, active_len: usize) -> bool {
        self.rendered_count >= active_len
    }

    /// Render the next page: exactly `min(page_size, remaining)` items.
    /// A no-op with a terminal status once the subset is exhausted or
    /// empty.
    pub fn next_page<'a>(&mut self, active: &[&'a ContentItem]) -> PageStep<'a> {
        if self.rendered_count >= active.len() {
            return PageStep::Exhausted;
        }
        let end = (self.rendered_count + self.page_size).min(active.len());
        let page: Vec<&'a ContentItem> = active[self.rendered_count..end].to_vec();
        debug!(
            "Page rendered - from={}, count={}, remaining={}",
            self.rendered_count,
            page.len(),
            active.len() - end
        );
        self.rendered_count = end;
        PageStep::Page(page)
    }

    /// Start a new filter epoch: zero the render cursor and rebuild the
    /// trigger before the first page renders again, so a stale epoch can
    /// never append after the new epoch's items.
    pub fn reset(&mut self, sentinel_available: bool) {
        self.rendered_count = 0;
        self.trigger = if sentinel_available {
            PageTrigger::Sentinel
        } else {
            PageTrigger::Manual
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<ContentItem> {
        (0..n)
            .map(|i| ContentItem {
                slug: format!("item-{i}"),
                title: format!("Item {i}"),
                as_of: "2024-05-01".into(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn pages_are_fixed_size_until_the_remainder() {
        let owned = items(7);
        let active: Vec<&ContentItem> = owned.iter().collect();
        let mut pager = Pager::new(3, true);

        match pager.next_page(&active) {
            PageStep::Page(p) => assert_eq!(p.len(), 3),
            PageStep::Exhausted => panic!("expected a page"),
        }
        match pager.next_page(&active) {
            PageStep::Page(p) => assert_eq!(p.len(), 3),
            PageStep::Exhausted => panic!("expected a page"),
        }
        match pager.next_page(&active) {
            PageStep::Page(p) => {
                assert_eq!(p.len(), 1);
                assert_eq!(p[0].slug, "item-6");
            }
            PageStep::Exhausted => panic!("expected the remainder"),
        }
        assert!(pager.is_exhausted(active.len()));
        assert!(matches!(pager.next_page(&active), PageStep::Exhausted));
    }

    #[test]
    fn terminal_exactly_when_rendered_equals_len() {
        let owned = items(3);
        let active: Vec<&ContentItem> = owned.iter().collect();
        let mut pager = Pager::new(3, true);
        assert!(!pager.is_exhausted(active.len()));
        assert!(matches!(pager.next_page(&active), PageStep::Page(_)));
        assert_eq!(pager.rendered_count(), 3);
        assert!(pager.is_exhausted(active.len()));
    }

    #[test]
    fn empty_subset_is_terminal_immediately() {
        let active: Vec<&ContentItem> = Vec::new();
        let mut pager = Pager::new(5, true);
        assert!(matches!(pager.next_page(&active), PageStep::Exhausted));
    }

    #[test]
    fn never_renders_more_than_the_subset_holds() {
        let owned = items(4);
        let active: Vec<&ContentItem> = owned.iter().collect();
        let mut pager = Pager::new(10, false);
        let mut total = 0;
        while let PageStep::Page(p) = pager.next_page(&active) {
            total += p.len();
        }
        assert_eq!(total, 4);
    }

    #[test]
    fn reset_starts_a_new_epoch_and_rebuilds_the_trigger() {
        let owned = items(5);
        let active: Vec<&ContentItem> = owned.iter().collect();
        let mut pager = Pager::new(2, true);
        assert_eq!(pager.trigger(), PageTrigger::Sentinel);
        let _ = pager.next_page(&active);
        let _ = pager.next_page(&active);
        assert_eq!(pager.rendered_count(), 4);

        pager.reset(false);
        assert_eq!(pager.rendered_count(), 0);
        assert_eq!(pager.trigger(), PageTrigger::Manual);
        match pager.next_page(&active) {
            PageStep::Page(p) => assert_eq!(p[0].slug, "item-0"),
            PageStep::Exhausted => panic!("fresh epoch should render"),
        }
    }

    #[test]
    fn manual_is_sole_trigger_without_sentinel_support() {
        let pager = Pager::new(3, false);
        assert_eq!(pager.trigger(), PageTrigger::Manual);
    }
}
