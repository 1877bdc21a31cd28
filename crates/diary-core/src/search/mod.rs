//! Place search
//!
//! Debounced type-ahead lookup of places through the search proxy.
//!
//! - `debounce`: clock-injected quiet-window timer
//! - `state`: the search box state machine
//! - `lookup`: the `PlaceLookup` seam, its HTTP client and the async driver

pub mod debounce;
pub mod lookup;
pub mod state;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Coords;

pub use debounce::Debouncer;
pub use lookup::{run_debounced, HttpPlaceLookup, PlaceLookup, SearchUpdate};
pub use state::{LookupRequest, Panel, PlaceSearch};

/// Quiet window after the last keystroke before a lookup fires
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(300);

/// A place returned by the search proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    /// Position in the proxy's result list
    pub id: u32,
    pub name: String,
    pub address: String,
    /// Missing when geocoding failed
    #[serde(default)]
    pub coords: Option<Coords>,
}

/// Successful proxy response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<PlaceCandidate>,
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchErrorBody {
    pub error: String,
}

/// What a selected candidate contributes to the draft
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSelection {
    pub name: String,
    pub address: String,
    pub coords: Option<Coords>,
}

impl From<&PlaceCandidate> for PlaceSelection {
    fn from(candidate: &PlaceCandidate) -> Self {
        Self {
            name: candidate.name.clone(),
            address: candidate.address.clone(),
            coords: candidate.coords,
        }
    }
}

/// Failed place lookup
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search proxy returned HTTP {0}")]
    Status(u16),

    #[error("Search proxy error: {0}")]
    Upstream(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_without_items_is_empty() {
        let body: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(body.items.is_empty());
    }

    #[test]
    fn test_candidate_wire_format() {
        let json = r#"{"items":[
            {"id":0,"name":"Noodle Bar","address":"1 Main St","coords":{"lat":37.5,"lng":127.0}},
            {"id":1,"name":"Taco Stand","address":"2 Side St","coords":null}
        ]}"#;
        let body: SearchResponse = serde_json::from_str(json).unwrap();

        assert_eq!(body.items.len(), 2);
        assert_eq!(
            body.items[0].coords,
            Some(Coords {
                lat: 37.5,
                lng: 127.0
            })
        );
        assert_eq!(body.items[1].coords, None);
    }
}
