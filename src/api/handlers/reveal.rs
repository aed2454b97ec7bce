use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    api::handlers::moments::{to_public_dto, PublicMomentDto},
    api::state::AppState,
    error::Result,
    service::{DenyReason, RevealDecision},
};

#[derive(Debug, Deserialize)]
pub struct RevealCheckParams {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct RevealCheckResponse {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
}

/// `GET /public/reveal-check?id=` — status and schedule gating, plus
/// whether a face unlock will be demanded.
pub async fn reveal_check(
    State(state): State<AppState>,
    Query(params): Query<RevealCheckParams>,
) -> Result<Json<RevealCheckResponse>> {
    let decision = state
        .service_context
        .reveal_service
        .check(&params.id, Utc::now(), None)
        .await?;

    Ok(Json(match decision {
        RevealDecision::Allowed => RevealCheckResponse { allowed: true, reason: None },
        RevealDecision::Denied(reason) => RevealCheckResponse {
            allowed: false,
            reason: Some(reason),
        },
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RevealUnlockRequest {
    pub id: String,
    /// Live camera capture, base64 or data URL. The verdict comes from
    /// the server-side comparator, never from the client.
    #[validate(length(min = 1))]
    pub snapshot: String,
}

#[derive(Debug, Serialize)]
pub struct RevealUnlockResponse {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    /// Present only when the gate opened.
    pub moment: Option<PublicMomentDto>,
}

/// `POST /public/reveal-unlock` — one comparator call per attempt. On a
/// match the content ships in the response; a denial only ever carries
/// its reason category.
pub async fn reveal_unlock(
    State(state): State<AppState>,
    Json(request): Json<RevealUnlockRequest>,
) -> Result<Json<RevealUnlockResponse>> {
    request.validate()?;

    let decision = state
        .service_context
        .reveal_service
        .check(&request.id, Utc::now(), Some(&request.snapshot))
        .await?;

    match decision {
        RevealDecision::Allowed => {
            let moment = state
                .service_context
                .moment_service
                .resolve_public(&request.id)
                .await?;
            Ok(Json(RevealUnlockResponse {
                allowed: true,
                reason: None,
                moment: Some(to_public_dto(moment, None)),
            }))
        }
        RevealDecision::Denied(reason) => Ok(Json(RevealUnlockResponse {
            allowed: false,
            reason: Some(reason),
            moment: None,
        })),
    }
}
