use std::time::Duration;

use anyhow::{Result, bail};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error};

use crate::auth::AppState;

/// Some regional data hosts refuse requests without a browser user agent.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the third-party administrative region service.
pub struct GeoClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeoClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Raw JSON body of the district list for one regency.
    pub async fn districts(&self, regency_code: &str) -> Result<Bytes> {
        if !is_region_code(regency_code) {
            bail!("invalid regency code '{}'", regency_code);
        }

        let url = format!("{}/districts/{}.json", self.base_url, regency_code);
        debug!("Fetching {}", url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("upstream {} returned {}", url, response.status());
        }
        Ok(response.bytes().await?)
    }
}

/// Region codes are digits separated by single dots, e.g. `32.73`.
fn is_region_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

fn cors_headers() -> [(HeaderName, &'static str); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    ]
}

/// OPTIONS /api/location/districts/{regency_code}: CORS preflight.
pub async fn districts_preflight() -> Response {
    (StatusCode::NO_CONTENT, cors_headers()).into_response()
}

/// GET /api/location/districts/{regency_code}: relays the upstream body
/// untouched. Any failure degrades to 500 with an empty `data` array.
pub async fn districts(
    State(state): State<AppState>,
    Path(regency_code): Path<String>,
) -> Response {
    match state.geo.districts(&regency_code).await {
        Ok(body) => (
            StatusCode::OK,
            cors_headers(),
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("District lookup for {} failed: {:#}", regency_code, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                cors_headers(),
                Json(json!({ "data": [] })),
            )
                .into_response()
        }
    }
}
