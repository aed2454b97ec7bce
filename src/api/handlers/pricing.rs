use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::state::AppState,
    domain::catalog::{self, Addon, Plan},
    error::Result,
};

#[derive(Debug, Deserialize)]
pub struct PricingParams {
    /// Explicit currency override, primarily for test/debug.
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlanDto {
    pub id: &'static str,
    pub name: &'static str,
    pub tagline: &'static str,
    pub price: i64,
    pub features: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct AddonDto {
    pub id: &'static str,
    pub name: &'static str,
    pub badge: Option<&'static str>,
    pub price: i64,
}

#[derive(Debug, Serialize)]
pub struct PricingResponse {
    pub currency: String,
    pub plans: Vec<PlanDto>,
    pub addons: Vec<AddonDto>,
}

fn plan_dto(plan: &Plan, currency: &str) -> PlanDto {
    PlanDto {
        id: plan.id,
        name: plan.name,
        tagline: plan.tagline,
        price: catalog::price_in(plan.prices, currency).unwrap_or(0),
        features: plan.features,
    }
}

fn addon_dto(addon: &Addon, currency: &str) -> AddonDto {
    AddonDto {
        id: addon.id,
        name: addon.name,
        badge: addon.badge,
        price: catalog::price_in(addon.prices, currency).unwrap_or(0),
    }
}

/// `GET /public/pricing` — catalog quoted in the resolved currency.
/// Resolution is cached per session; the default currency answers
/// immediately if geolocation has nothing yet.
pub async fn pricing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PricingParams>,
) -> Result<Json<PricingResponse>> {
    let client_ip = client_ip(&headers);
    let session_key = headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .or_else(|| client_ip.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let currency = state
        .service_context
        .currency_service
        .resolve(params.currency.as_deref(), &session_key, client_ip.as_deref())
        .await;

    Ok(Json(PricingResponse {
        plans: catalog::PLANS.iter().map(|p| plan_dto(p, &currency)).collect(),
        addons: catalog::ADDONS.iter().map(|a| addon_dto(a, &currency)).collect(),
        currency,
    }))
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
