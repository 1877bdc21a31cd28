//! Place search command handlers

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;

use diary_core::search::{run_debounced, HttpPlaceLookup, Panel, PlaceLookup, SearchUpdate};
use diary_core::{Config, PlaceSearch};

use crate::output::Output;

/// One-shot lookup against the search proxy
pub async fn search(config: &Config, query: String, output: &Output) -> Result<()> {
    let lookup = HttpPlaceLookup::new(config.search_url.clone())?;
    let mut search = PlaceSearch::new();

    search.input(query, Instant::now());
    if let Some(request) = search.flush() {
        let result = lookup.lookup(&request.query).await;
        search.complete(request.generation, result);
    }

    output.print_panel(search.panel());
    Ok(())
}

/// Type-ahead search: every stdin line replaces the query
pub async fn live(config: &Config, output: &Output) -> Result<()> {
    let lookup = Arc::new(HttpPlaceLookup::new(config.search_url.clone())?);
    let (key_tx, key_rx) = mpsc::channel(16);
    let (update_tx, mut update_rx) = mpsc::channel(16);

    output.message("Type a place name; results follow each pause. Ctrl+D to finish.");

    let driver = tokio::spawn(run_debounced(lookup, key_rx, update_tx));
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if key_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    while let Some(update) = update_rx.recv().await {
        match update {
            SearchUpdate::Cleared => output.message("(cleared)"),
            SearchUpdate::Loading(query) => output.message(&format!("Searching '{}'...", query)),
            SearchUpdate::Results(items) if items.is_empty() => output.print_panel(Panel::NoResults),
            SearchUpdate::Results(items) => output.print_panel(Panel::Results(&items)),
        }
    }

    reader.await.context("Input reader failed")?;
    driver.await.context("Search driver failed")?;
    Ok(())
}
