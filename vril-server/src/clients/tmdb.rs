//! TMDb API client
//!
//! Wraps the search, details, and credits endpoints plus the image CDN.
//! Upstream payloads are untyped JSON in practice: numeric fields are
//! coerced permissively (non-numeric → 0) and missing fields default
//! rather than fail, so a malformed record degrades instead of aborting
//! an ingestion.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use thiserror::Error;

const TMDB_API_URL: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_URL: &str = "https://image.tmdb.org/t/p";
const USER_AGENT: &str = "vril-tracker/0.1.0";
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// TMDb client errors
#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("TMDb API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Coerce an untyped JSON field to i64, defaulting to 0
fn de_i64_permissive<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;

    Ok(coerce_i64(&value))
}

/// Number, numeric string, or garbage → i64 (garbage → 0)
pub fn coerce_i64(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n.as_i64().unwrap_or_else(|| {
            n.as_f64().map(|f| f as i64).unwrap_or(0)
        }),
        serde_json::Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

/// One search result row
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResult {
    #[serde(default, deserialize_with = "de_i64_permissive")]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// One page of search results
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchPage {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default, deserialize_with = "de_i64_permissive")]
    pub total_pages: i64,
    #[serde(default, deserialize_with = "de_i64_permissive")]
    pub total_results: i64,
}

/// Genre or production-company reference inside a details payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TermRef {
    #[serde(default, deserialize_with = "de_i64_permissive")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// Per-country release-date entries (carries the certification)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReleaseDatesBlock {
    #[serde(default)]
    pub results: Vec<CountryReleases>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CountryReleases {
    #[serde(default)]
    pub iso_3166_1: String,
    #[serde(default)]
    pub release_dates: Vec<ReleaseEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReleaseEntry {
    #[serde(default)]
    pub certification: String,
}

/// Movie details payload
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MovieDetails {
    #[serde(default, deserialize_with = "de_i64_permissive")]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "de_i64_permissive")]
    pub runtime: i64,
    #[serde(default, deserialize_with = "de_i64_permissive")]
    pub budget: i64,
    #[serde(default, deserialize_with = "de_i64_permissive")]
    pub revenue: i64,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub genres: Vec<TermRef>,
    #[serde(default)]
    pub production_companies: Vec<TermRef>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_dates: Option<ReleaseDatesBlock>,
}

impl MovieDetails {
    /// Four-digit release year, when the date parses
    pub fn release_year(&self) -> Option<i32> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(0..4))
            .and_then(|y| y.parse().ok())
    }

    /// US certification from the release-dates block, when present
    pub fn certification(&self) -> Option<String> {
        self.release_dates
            .as_ref()?
            .results
            .iter()
            .find(|c| c.iso_3166_1 == "US")?
            .release_dates
            .iter()
            .map(|r| r.certification.trim())
            .find(|c| !c.is_empty())
            .map(String::from)
    }
}

/// Credits payload
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Credits {
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CrewMember {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub job: String,
}

impl Credits {
    /// Director names, deduplicated, in crew order
    pub fn directors(&self) -> Vec<String> {
        self.pick(|m| {
            m.department == "Directing" && matches!(m.job.as_str(), "Director" | "Directed by")
        })
    }

    /// Writer names, deduplicated, in crew order
    pub fn writers(&self) -> Vec<String> {
        self.pick(|m| m.department == "Writing" && (m.job == "Writer" || m.job.contains("Screenplay")))
    }

    fn pick(&self, matches: impl Fn(&CrewMember) -> bool) -> Vec<String> {
        let mut names = Vec::new();
        for member in &self.crew {
            if matches(member) && !names.contains(&member.name) {
                names.push(member.name.clone());
            }
        }

        names
    }
}

/// TMDb API client
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http_client: reqwest::Client,
    api_key: String,
    api_url: String,
    image_url: String,
}

impl TmdbClient {
    pub fn new(api_key: String) -> Result<Self, TmdbError> {
        Self::with_urls(api_key, TMDB_API_URL.to_string(), TMDB_IMAGE_URL.to_string())
    }

    /// Client against custom base URLs (tests point this at a stub server)
    pub fn with_urls(
        api_key: String,
        api_url: String,
        image_url: String,
    ) -> Result<Self, TmdbError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TmdbError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
            image_url,
        })
    }

    /// Search for movies by title
    ///
    /// Zero matches is an empty page, not an error.
    pub async fn search_by_title(&self, title: &str, page: i64) -> Result<SearchPage, TmdbError> {
        let url = format!("{}/search/movie", self.api_url);

        tracing::debug!(title = %title, page, "Querying TMDb search");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", title),
                ("page", &page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| TmdbError::Network(e.to_string()))?;

        Self::parse_response(response).await
    }

    /// Fetch full details for one movie
    pub async fn fetch_details(&self, tmdb_id: i64) -> Result<MovieDetails, TmdbError> {
        let url = format!("{}/movie/{}", self.api_url, tmdb_id);

        tracing::debug!(tmdb_id, "Querying TMDb details");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("append_to_response", "release_dates"),
            ])
            .send()
            .await
            .map_err(|e| TmdbError::Network(e.to_string()))?;

        let details: MovieDetails = Self::parse_response(response).await?;

        tracing::info!(tmdb_id, title = %details.title, "Retrieved movie details from TMDb");

        Ok(details)
    }

    /// Fetch credits for one movie
    ///
    /// Callers treat a failure here as non-fatal: a movie without credits
    /// still gets created, just with empty director/writer fields.
    pub async fn fetch_credits(&self, tmdb_id: i64) -> Result<Credits, TmdbError> {
        let url = format!("{}/movie/{}/credits", self.api_url, tmdb_id);

        tracing::debug!(tmdb_id, "Querying TMDb credits");

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| TmdbError::Network(e.to_string()))?;

        Self::parse_response(response).await
    }

    /// Build an image CDN URL for a width and image path
    pub fn image_url(&self, width: u32, path: &str) -> String {
        format!("{}/w{}/{}", self.image_url, width, path.trim_start_matches('/'))
    }

    /// Download an image from the CDN
    pub async fn download_image(&self, width: u32, path: &str) -> Result<Vec<u8>, TmdbError> {
        let url = self.image_url(width, path);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| TmdbError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TmdbError::Api(status.as_u16(), url));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TmdbError::Network(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TmdbError> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TmdbError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| TmdbError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coercion_is_permissive() {
        assert_eq!(coerce_i64(&json!(603)), 603);
        assert_eq!(coerce_i64(&json!("603")), 603);
        assert_eq!(coerce_i64(&json!("not a number")), 0);
        assert_eq!(coerce_i64(&json!(null)), 0);
        assert_eq!(coerce_i64(&json!(1.9)), 1);
    }

    #[test]
    fn details_tolerate_missing_and_mistyped_fields() {
        let details: MovieDetails = serde_json::from_value(json!({
            "id": "603",
            "title": "The Matrix",
            "budget": "63000000",
            "revenue": null,
        }))
        .expect("permissive parse");

        assert_eq!(details.id, 603);
        assert_eq!(details.budget, 63_000_000);
        assert_eq!(details.revenue, 0);
        assert_eq!(details.runtime, 0);
        assert!(details.genres.is_empty());
        assert!(details.poster_path.is_none());
    }

    #[test]
    fn release_year_and_certification() {
        let details: MovieDetails = serde_json::from_value(json!({
            "id": 603,
            "release_date": "1999-03-31",
            "release_dates": {
                "results": [
                    {"iso_3166_1": "DE", "release_dates": [{"certification": "16"}]},
                    {"iso_3166_1": "US", "release_dates": [{"certification": ""}, {"certification": "R"}]},
                ]
            }
        }))
        .expect("parse");

        assert_eq!(details.release_year(), Some(1999));
        assert_eq!(details.certification().as_deref(), Some("R"));
    }

    #[test]
    fn credits_pick_directors_and_writers_independently() {
        let credits: Credits = serde_json::from_value(json!({
            "crew": [
                {"name": "Lana Wachowski", "department": "Directing", "job": "Director"},
                {"name": "Lilly Wachowski", "department": "Directing", "job": "Director"},
                {"name": "Lana Wachowski", "department": "Writing", "job": "Screenplay"},
                {"name": "Bill Pope", "department": "Camera", "job": "Director of Photography"},
            ]
        }))
        .expect("parse");

        assert_eq!(credits.directors(), vec!["Lana Wachowski", "Lilly Wachowski"]);
        assert_eq!(credits.writers(), vec!["Lana Wachowski"]);
    }

    #[test]
    fn image_url_normalizes_leading_slash() {
        let client = TmdbClient::new("key".to_string()).expect("client");
        assert_eq!(
            client.image_url(780, "/abc.jpg"),
            "https://image.tmdb.org/t/p/w780/abc.jpg"
        );
    }

    #[test]
    fn empty_search_page_is_not_an_error() {
        let page: SearchPage = serde_json::from_value(json!({
            "results": [],
            "total_pages": 0,
            "total_results": 0,
        }))
        .expect("parse");

        assert!(page.results.is_empty());
    }
}
