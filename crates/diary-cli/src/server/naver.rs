//! Naver local search and geocoding client
//!
//! Search results are cleaned up and geocoded concurrently. A failed
//! geocode only drops the coordinates of that one item.

use std::time::Duration;

use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{debug, warn};

use diary_core::{Coords, PlaceCandidate};

pub const LOCAL_SEARCH_URL: &str = "https://openapi.naver.com/v1/search/local.json";
pub const GEOCODE_URL: &str = "https://naveropenapi.apigw.ntruss.com/map-geocode/v2/geocode";

/// Results requested per search
const DISPLAY: &str = "8";
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// API keys for the two Naver services
#[derive(Debug, Clone, Default)]
pub struct NaverCredentials {
    pub search_id: String,
    pub search_secret: String,
    pub geocode_id: String,
    pub geocode_secret: String,
}

impl NaverCredentials {
    /// Read keys from NAVER_DEV_CLIENT_* (search) and NAVER_CLIENT_* (geocoding)
    pub fn from_env() -> Self {
        let var = |name: &str| {
            std::env::var(name).unwrap_or_else(|_| {
                warn!("{} is not set; upstream calls will be rejected", name);
                String::new()
            })
        };
        Self {
            search_id: var("NAVER_DEV_CLIENT_ID"),
            search_secret: var("NAVER_DEV_CLIENT_SECRET"),
            geocode_id: var("NAVER_CLIENT_ID"),
            geocode_secret: var("NAVER_CLIENT_SECRET"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LocalSearchResponse {
    #[serde(default)]
    items: Vec<LocalItem>,
}

#[derive(Debug, Deserialize)]
struct LocalItem {
    title: String,
    #[serde(default)]
    address: String,
    #[serde(default, rename = "roadAddress")]
    road_address: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    addresses: Vec<GeocodeAddress>,
}

/// Coordinates come back as decimal strings
#[derive(Debug, Deserialize)]
struct GeocodeAddress {
    x: String,
    y: String,
}

impl GeocodeAddress {
    fn coords(&self) -> Option<Coords> {
        Some(Coords {
            lat: self.y.trim().parse().ok()?,
            lng: self.x.trim().parse().ok()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NaverClient {
    http: reqwest::Client,
    credentials: NaverCredentials,
    search_url: String,
    geocode_url: String,
}

impl NaverClient {
    pub fn new(credentials: NaverCredentials) -> Result<Self, reqwest::Error> {
        Self::with_endpoints(credentials, LOCAL_SEARCH_URL, GEOCODE_URL)
    }

    pub fn with_endpoints(
        credentials: NaverCredentials,
        search_url: impl Into<String>,
        geocode_url: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            credentials,
            search_url: search_url.into(),
            geocode_url: geocode_url.into(),
        })
    }

    /// Search places and geocode each result
    pub async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, reqwest::Error> {
        let body: LocalSearchResponse = self
            .http
            .get(&self.search_url)
            .query(&[("query", query), ("display", DISPLAY)])
            .header("X-Naver-Client-Id", &self.credentials.search_id)
            .header("X-Naver-Client-Secret", &self.credentials.search_secret)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(query, count = body.items.len(), "Local search returned");

        let candidates = body
            .items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| self.candidate(idx as u32, item));
        Ok(join_all(candidates).await)
    }

    async fn candidate(&self, id: u32, item: LocalItem) -> PlaceCandidate {
        let address = if item.road_address.is_empty() {
            item.address
        } else {
            item.road_address
        };

        let coords = if address.is_empty() {
            None
        } else {
            match self.geocode(&address).await {
                Ok(coords) => coords,
                Err(e) => {
                    warn!(address = %address, error = %e, "Geocoding failed");
                    None
                }
            }
        };

        PlaceCandidate {
            id,
            name: clean_title(&item.title),
            address,
            coords,
        }
    }

    async fn geocode(&self, address: &str) -> Result<Option<Coords>, reqwest::Error> {
        let body: GeocodeResponse = self
            .http
            .get(&self.geocode_url)
            .query(&[("query", address)])
            .header("X-NCP-APIGW-API-KEY-ID", &self.credentials.geocode_id)
            .header("X-NCP-APIGW-API-KEY", &self.credentials.geocode_secret)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body.addresses.first().and_then(GeocodeAddress::coords))
    }
}

/// Remove the bold markup Naver puts around matched words
pub fn clean_title(title: &str) -> String {
    title.replace("<b>", "").replace("</b>", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("<b>Noodle</b> Bar"), "Noodle Bar");
        assert_eq!(clean_title("<b>맛집</b> <b>본점</b>"), "맛집 본점");
        assert_eq!(clean_title("Plain"), "Plain");
    }

    #[test]
    fn test_geocode_address_parsing() {
        let body: GeocodeResponse =
            serde_json::from_str(r#"{"addresses":[{"x":"126.978","y":"37.5665"}]}"#).unwrap();
        assert_eq!(
            body.addresses[0].coords(),
            Some(Coords {
                lat: 37.5665,
                lng: 126.978
            })
        );

        let bad = GeocodeAddress {
            x: "east".into(),
            y: "1".into(),
        };
        assert_eq!(bad.coords(), None);

        let empty: GeocodeResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.addresses.is_empty());
    }
}
