//! Search box state machine
//!
//! `PlaceSearch` owns the query text, the candidate list and the panel
//! flags. It does no I/O: `poll`/`flush` hand out `LookupRequest`s and the
//! caller reports back through `complete`. Every request carries a
//! generation number, and only the newest generation may update the list.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::debounce::Debouncer;
use super::{PlaceCandidate, PlaceSelection, SearchError, DEBOUNCE_INTERVAL};

/// A lookup the caller should perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub generation: u64,
    pub query: String,
}

/// What the results panel should show
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Panel<'a> {
    Hidden,
    Loading,
    NoResults,
    Results(&'a [PlaceCandidate]),
}

#[derive(Debug)]
pub struct PlaceSearch {
    query: String,
    results: Vec<PlaceCandidate>,
    open: bool,
    loading: bool,
    generation: u64,
    debouncer: Debouncer<String>,
}

impl Default for PlaceSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceSearch {
    pub fn new() -> Self {
        Self::with_interval(DEBOUNCE_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            query: String::new(),
            results: Vec::new(),
            open: false,
            loading: false,
            generation: 0,
            debouncer: Debouncer::new(interval),
        }
    }

    /// Start with existing text and a closed panel, without a lookup
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::new()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[PlaceCandidate] {
        &self.results
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// When the pending lookup becomes due, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Handle a change of the query text
    ///
    /// Whitespace-only text clears the list right away and drops any
    /// pending or in-flight lookup.
    pub fn input(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        self.open = true;

        if text.trim().is_empty() {
            self.debouncer.cancel();
            self.results.clear();
            self.loading = false;
            self.generation += 1;
        } else {
            self.debouncer.push(text.clone(), now);
        }
        self.query = text;
    }

    /// Fire the debounced lookup once its quiet window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<LookupRequest> {
        let query = self.debouncer.poll(now)?;
        Some(self.start(query))
    }

    /// Fire the pending lookup immediately
    pub fn flush(&mut self) -> Option<LookupRequest> {
        let query = self.debouncer.flush()?;
        Some(self.start(query))
    }

    fn start(&mut self, query: String) -> LookupRequest {
        self.generation += 1;
        self.loading = true;
        debug!(generation = self.generation, query = %query, "Starting place lookup");
        LookupRequest {
            generation: self.generation,
            query,
        }
    }

    /// Report a lookup outcome
    ///
    /// Returns false when the response belongs to a superseded request and
    /// was discarded.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<Vec<PlaceCandidate>, SearchError>,
    ) -> bool {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "Discarding stale place lookup"
            );
            return false;
        }

        self.loading = false;
        match result {
            Ok(items) => self.results = items,
            Err(e) => {
                warn!(error = %e, query = %self.query, "Place search failed");
                self.results.clear();
            }
        }
        true
    }

    /// Pick a candidate; the query becomes its name and the panel closes
    pub fn select(&mut self, index: usize) -> Option<PlaceSelection> {
        let selection = PlaceSelection::from(self.results.get(index)?);

        self.query = selection.name.clone();
        self.open = false;
        self.loading = false;
        self.debouncer.cancel();
        self.generation += 1;
        Some(selection)
    }

    /// Close the panel, keeping the text
    pub fn dismiss(&mut self) {
        self.open = false;
    }

    /// Reopen the panel
    pub fn focus(&mut self) {
        self.open = true;
    }

    pub fn panel(&self) -> Panel<'_> {
        if !self.open || self.query.trim().is_empty() {
            Panel::Hidden
        } else if self.loading {
            Panel::Loading
        } else if self.results.is_empty() {
            Panel::NoResults
        } else {
            Panel::Results(&self.results)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coords;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn candidate(id: u32, name: &str) -> PlaceCandidate {
        PlaceCandidate {
            id,
            name: name.into(),
            address: format!("{id} Main St"),
            coords: Some(Coords {
                lat: 37.0,
                lng: 127.0,
            }),
        }
    }

    #[test]
    fn test_typing_burst_yields_one_request() {
        let t0 = Instant::now();
        let mut search = PlaceSearch::new();

        search.input("a", t0);
        search.input("ab", t0 + ms(50));
        search.input("abc", t0 + ms(100));
        search.input("abcd", t0 + ms(300));

        assert_eq!(search.poll(t0 + ms(400)), None);
        let request = search.poll(t0 + ms(600)).unwrap();
        assert_eq!(request.query, "abcd");
        assert!(search.is_loading());
        assert_eq!(search.panel(), Panel::Loading);
        assert_eq!(search.poll(t0 + ms(1200)), None);
    }

    #[test]
    fn test_whitespace_clears_without_lookup() {
        let t0 = Instant::now();
        let mut search = PlaceSearch::new();

        search.input("ramen", t0);
        let request = search.flush().unwrap();
        search.complete(request.generation, Ok(vec![candidate(0, "Ramen")]));
        assert_eq!(search.results().len(), 1);

        search.input("   ", t0 + ms(10));
        assert!(search.results().is_empty());
        assert_eq!(search.poll(t0 + ms(1000)), None);
        assert_eq!(search.panel(), Panel::Hidden);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let t0 = Instant::now();
        let mut search = PlaceSearch::new();

        search.input("slow", t0);
        let slow = search.flush().unwrap();
        search.input("fast", t0 + ms(10));
        let fast = search.flush().unwrap();

        assert!(search.complete(fast.generation, Ok(vec![candidate(0, "Fast")])));
        assert!(!search.complete(slow.generation, Ok(vec![candidate(0, "Slow")])));
        assert_eq!(search.results()[0].name, "Fast");
    }

    #[test]
    fn test_failure_clears_results_and_loading() {
        let t0 = Instant::now();
        let mut search = PlaceSearch::new();

        search.input("pho", t0);
        let first = search.flush().unwrap();
        search.complete(first.generation, Ok(vec![candidate(0, "Pho")]));

        search.input("pho 2", t0 + ms(10));
        let second = search.flush().unwrap();
        assert!(search.complete(second.generation, Err(SearchError::Status(502))));

        assert!(!search.is_loading());
        assert!(search.results().is_empty());
        assert_eq!(search.panel(), Panel::NoResults);
    }

    #[test]
    fn test_select_closes_panel() {
        let t0 = Instant::now();
        let mut search = PlaceSearch::new();

        search.input("bak", t0);
        let request = search.flush().unwrap();
        search.complete(
            request.generation,
            Ok(vec![candidate(0, "Bakery"), candidate(1, "Bake House")]),
        );

        let selection = search.select(1).unwrap();
        assert_eq!(selection.name, "Bake House");
        assert_eq!(selection.address, "1 Main St");
        assert_eq!(search.query(), "Bake House");
        assert_eq!(search.panel(), Panel::Hidden);
        assert!(search.select(5).is_none());

        search.focus();
        assert!(matches!(search.panel(), Panel::Results(items) if items.len() == 2));
        search.dismiss();
        assert_eq!(search.panel(), Panel::Hidden);
    }
}
