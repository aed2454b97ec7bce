use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    config::GeoConfig,
    error::{AppError, Result},
    gateways::GeoLocator,
};

/// Unauthenticated ip-api.com lookup. Best effort: the short timeout is
/// the point, currency resolution falls back to the default rather than
/// holding a request open.
pub struct IpApiGeoLocator {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    status: String,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
}

impl IpApiGeoLocator {
    pub fn new(config: &GeoConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeoLocator for IpApiGeoLocator {
    async fn country_code(&self, client_ip: &str) -> Result<Option<String>> {
        let url = format!("{}/json/{}?fields=status,countryCode", self.base_url, client_ip);

        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::ExternalTimeout("geolocation lookup timed out".to_string())
            } else {
                AppError::External("geolocation lookup failed".to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(AppError::External(format!(
                "geolocation service returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: GeoResponse = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("invalid geolocation response: {}", e)))?;

        if body.status == "success" {
            Ok(body.country_code)
        } else {
            Ok(None)
        }
    }
}
