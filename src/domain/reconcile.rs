//! Merging freshly fetched bars into a persisted, most-recent-first series.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::domain::ohlcv::{sort_descending, OhlcvBar};
use crate::ports::fetch_port::FetchPort;

pub const DEFAULT_MAX_PAGES: usize = 10;

/// Union of `persisted` and `fetched`, unique by date, most recent first.
///
/// A fetched bar is dropped when the series already holds its date, so the
/// persisted values win on conflict. A date repeated inside either input keeps
/// its first occurrence.
pub fn merge(fetched: Vec<OhlcvBar>, persisted: Vec<OhlcvBar>) -> Vec<OhlcvBar> {
    let mut seen: HashSet<NaiveDate> = HashSet::with_capacity(persisted.len() + fetched.len());
    let mut merged = Vec::with_capacity(persisted.len() + fetched.len());
    for bar in persisted.into_iter().chain(fetched) {
        if seen.insert(bar.date) {
            merged.push(bar);
        } else {
            tracing::trace!(date = %bar.date, "duplicate date skipped");
        }
    }
    sort_descending(&mut merged);
    merged
}

/// Paging stops on an empty page, or once a page's newest date is not strictly
/// after the newest persisted date.
pub fn should_stop_fetching(page: &[OhlcvBar], persisted_newest: Option<NaiveDate>) -> bool {
    let Some(page_newest) = page.iter().map(|b| b.date).max() else {
        return true;
    };
    match persisted_newest {
        Some(newest) => page_newest <= newest,
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Merged series, most recent first.
    pub bars: Vec<OhlcvBar>,
    /// No series had been persisted before this run.
    pub initial_creation: bool,
    pub pages_fetched: usize,
    pub bars_added: usize,
}

/// Drives page fetching and merges each accepted page.
pub struct Reconciler<'a> {
    source: &'a dyn FetchPort,
    max_pages: usize,
}

impl<'a> Reconciler<'a> {
    pub fn new(source: &'a dyn FetchPort, max_pages: usize) -> Self {
        Self { source, max_pages }
    }

    /// Fetch pages `1..=max_pages` for `code` and merge them into `persisted`
    /// (`None` means initial creation). A failing fetch ends paging with what
    /// has been merged so far.
    pub fn reconcile(&self, code: &str, persisted: Option<Vec<OhlcvBar>>) -> Reconciliation {
        let initial_creation = persisted.is_none();
        let mut bars = persisted.unwrap_or_default();
        sort_descending(&mut bars);
        let persisted_newest = if initial_creation {
            None
        } else {
            bars.first().map(|b| b.date)
        };
        let starting_len = bars.len();
        let mut pages_fetched = 0;

        for page in 1..=self.max_pages {
            let fetched = match self.source.fetch_page(code, page) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(code, page, error = %e, "fetch failed; stopping");
                    break;
                }
            };
            pages_fetched += 1;
            tracing::info!(code, page, rows = fetched.len(), "fetched page");

            if should_stop_fetching(&fetched, persisted_newest) {
                tracing::info!(code, page, "no newer data; stopping");
                break;
            }
            bars = merge(fetched, bars);
        }

        let bars_added = bars.len() - starting_len;
        Reconciliation {
            bars,
            initial_creation,
            pages_fetched,
            bars_added,
        }
    }
}
