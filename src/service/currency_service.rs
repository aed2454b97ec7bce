use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::catalog::{self, DEFAULT_CURRENCY};
use crate::gateways::GeoLocator;

/// Decides which currency to quote. An explicit override wins, then a
/// cached per-session geolocation result, then the default. Every
/// failure path lands on the default; this never takes a request down.
pub struct CurrencyService {
    geo: Arc<dyn GeoLocator>,
    cache: RwLock<HashMap<String, String>>,
}

impl CurrencyService {
    pub fn new(geo: Arc<dyn GeoLocator>) -> Self {
        Self {
            geo,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn resolve(
        &self,
        override_code: Option<&str>,
        session_key: &str,
        client_ip: Option<&str>,
    ) -> String {
        // Override is for test/debug and always wins, but only for
        // currencies we actually price in.
        if let Some(code) = override_code {
            if let Some(currency) = catalog::supported_currency(code) {
                return currency.to_string();
            }
        }

        if let Some(cached) = self.cache.read().await.get(session_key) {
            return cached.clone();
        }

        let resolved = match client_ip {
            Some(ip) => match self.geo.country_code(ip).await {
                Ok(Some(country)) => {
                    catalog::currency_for_country(&country).unwrap_or(DEFAULT_CURRENCY)
                }
                Ok(None) => DEFAULT_CURRENCY,
                Err(e) => {
                    tracing::debug!(error = %e, "geolocation failed, using default currency");
                    DEFAULT_CURRENCY
                }
            },
            None => DEFAULT_CURRENCY,
        };

        self.cache
            .write()
            .await
            .insert(session_key.to_string(), resolved.to_string());

        resolved.to_string()
    }
}
