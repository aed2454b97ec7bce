use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::state::AppState,
    error::Result,
    service::PaymentOutcome,
};

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, max = 100))]
    pub reference: String,
    pub draft_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub moment_id: Uuid,
    pub already_applied: bool,
    pub paid_amount: i64,
    pub balance_due: i64,
}

impl From<PaymentOutcome> for VerifyPaymentResponse {
    fn from(outcome: PaymentOutcome) -> Self {
        Self {
            success: true,
            moment_id: outcome.moment_id,
            already_applied: outcome.already_applied,
            paid_amount: outcome.paid_amount,
            balance_due: outcome.balance_due,
        }
    }
}

/// `POST /public/payments/verify` — the client returns from the gateway
/// checkout with a reference; everything that matters about the charge
/// is re-checked server-side.
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>> {
    request.validate()?;

    let outcome = state
        .service_context
        .payment_service
        .confirm(&request.reference, request.draft_id)
        .await?;

    Ok(Json(outcome.into()))
}
