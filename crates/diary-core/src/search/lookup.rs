//! Place lookup client and debounced driver

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use super::state::PlaceSearch;
use super::{PlaceCandidate, SearchError, SearchErrorBody, SearchResponse};

/// Timeout for one lookup round trip
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can resolve a query into place candidates
pub trait PlaceLookup: Send + Sync + 'static {
    fn lookup(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<PlaceCandidate>, SearchError>> + Send;
}

/// Lookup against the `/api/search` proxy
#[derive(Debug, Clone)]
pub struct HttpPlaceLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlaceLookup {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/search", self.base_url.trim_end_matches('/'))
    }
}

impl PlaceLookup for HttpPlaceLookup {
    async fn lookup(&self, query: &str) -> Result<Vec<PlaceCandidate>, SearchError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match response.json::<SearchErrorBody>().await {
                Ok(body) => SearchError::Upstream(body.error),
                Err(_) => SearchError::Status(status.as_u16()),
            });
        }

        let body: SearchResponse = response.json().await?;
        debug!(query, count = body.items.len(), "Place lookup finished");
        Ok(body.items)
    }
}

/// Changes to the candidate list pushed by `run_debounced`
#[derive(Debug, Clone, PartialEq)]
pub enum SearchUpdate {
    /// The query became blank
    Cleared,
    /// A lookup for this query started
    Loading(String),
    /// The list was replaced (empty after a failure)
    Results(Vec<PlaceCandidate>),
}

type Completion = (u64, Result<Vec<PlaceCandidate>, SearchError>);

/// Drive a `PlaceSearch` from a stream of query texts
///
/// Each text restarts the quiet window. Lookups run as separate tasks and
/// are never cancelled; responses that lost the race are dropped. Returns
/// once the keystroke channel is closed and nothing is pending or in
/// flight, or when the update receiver goes away.
pub async fn run_debounced<L: PlaceLookup>(
    lookup: Arc<L>,
    mut keystrokes: mpsc::Receiver<String>,
    updates: mpsc::Sender<SearchUpdate>,
) {
    let mut search = PlaceSearch::new();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
    let mut in_flight = 0usize;
    let mut input_open = true;

    loop {
        let deadline = search.next_deadline();
        if !input_open && deadline.is_none() && in_flight == 0 {
            break;
        }

        let update = tokio::select! {
            text = keystrokes.recv(), if input_open => match text {
                Some(text) => {
                    let blank = text.trim().is_empty();
                    search.input(text, Instant::now());
                    blank.then_some(SearchUpdate::Cleared)
                }
                None => {
                    input_open = false;
                    None
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                search.poll(Instant::now()).map(|request| {
                    in_flight += 1;
                    let lookup = Arc::clone(&lookup);
                    let done = done_tx.clone();
                    let query = request.query.clone();
                    tokio::spawn(async move {
                        let result = lookup.lookup(&request.query).await;
                        let _ = done.send((request.generation, result));
                    });
                    SearchUpdate::Loading(query)
                })
            }
            Some((generation, result)) = done_rx.recv(), if in_flight > 0 => {
                in_flight -= 1;
                search
                    .complete(generation, result)
                    .then(|| SearchUpdate::Results(search.results().to_vec()))
            }
        };

        if let Some(update) = update {
            if updates.send(update).await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Lookup that records calls and answers after a per-query delay
    #[derive(Default)]
    struct RecordingLookup {
        calls: Mutex<Vec<(String, Instant)>>,
        slow: Option<&'static str>,
    }

    impl PlaceLookup for RecordingLookup {
        async fn lookup(&self, query: &str) -> Result<Vec<PlaceCandidate>, SearchError> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), Instant::now()));

            let delay = if self.slow == Some(query) { 500 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            Ok(vec![PlaceCandidate {
                id: 0,
                name: query.to_string(),
                address: String::new(),
                coords: None,
            }])
        }
    }

    async fn drain(mut rx: mpsc::Receiver<SearchUpdate>) -> Vec<SearchUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        updates
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_triggers_single_lookup() {
        let lookup = Arc::new(RecordingLookup::default());
        let (key_tx, key_rx) = mpsc::channel(8);
        let (update_tx, update_rx) = mpsc::channel(8);
        let start = Instant::now();

        let driver = tokio::spawn(run_debounced(Arc::clone(&lookup), key_rx, update_tx));

        key_tx.send("a".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        key_tx.send("ab".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        key_tx.send("abc".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        key_tx.send("abcd".to_string()).await.unwrap();
        drop(key_tx);

        driver.await.unwrap();
        let updates = drain(update_rx).await;

        let calls = lookup.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "abcd");
        assert!(calls[0].1 - start >= Duration::from_millis(600));

        assert_eq!(updates[0], SearchUpdate::Loading("abcd".to_string()));
        assert!(matches!(&updates[1], SearchUpdate::Results(items) if items[0].name == "abcd"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stale_response_is_dropped() {
        let lookup = Arc::new(RecordingLookup {
            slow: Some("slow"),
            ..Default::default()
        });
        let (key_tx, key_rx) = mpsc::channel(8);
        let (update_tx, update_rx) = mpsc::channel(8);

        let driver = tokio::spawn(run_debounced(Arc::clone(&lookup), key_rx, update_tx));

        key_tx.send("slow".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        key_tx.send("fast".to_string()).await.unwrap();
        drop(key_tx);

        driver.await.unwrap();
        let updates = drain(update_rx).await;

        assert_eq!(lookup.calls.lock().unwrap().len(), 2);
        assert_eq!(
            updates,
            vec![
                SearchUpdate::Loading("slow".to_string()),
                SearchUpdate::Loading("fast".to_string()),
                SearchUpdate::Results(vec![PlaceCandidate {
                    id: 0,
                    name: "fast".to_string(),
                    address: String::new(),
                    coords: None,
                }]),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_clears() {
        let lookup = Arc::new(RecordingLookup::default());
        let (key_tx, key_rx) = mpsc::channel(8);
        let (update_tx, update_rx) = mpsc::channel(8);

        let driver = tokio::spawn(run_debounced(Arc::clone(&lookup), key_rx, update_tx));

        key_tx.send("ramen".to_string()).await.unwrap();
        key_tx.send(" ".to_string()).await.unwrap();
        drop(key_tx);

        driver.await.unwrap();
        assert_eq!(drain(update_rx).await, vec![SearchUpdate::Cleared]);
        assert!(lookup.calls.lock().unwrap().is_empty());
    }
}
