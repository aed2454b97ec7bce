use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::PaymentEvent,
    error::{AppError, Result},
    gateways::PaymentGateway,
    pricing,
    repository::MomentRepository,
};

#[derive(Debug, Serialize)]
pub struct PaymentOutcome {
    pub moment_id: Uuid,
    /// True when this reference had already been credited; nothing
    /// changed on this call.
    pub already_applied: bool,
    pub paid_amount: i64,
    pub balance_due: i64,
}

/// The only code path allowed to set `is_paid` and publish a moment.
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    moments: Arc<dyn MomentRepository>,
}

impl PaymentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, moments: Arc<dyn MomentRepository>) -> Self {
        Self { gateway, moments }
    }

    /// Verify a gateway reference and apply it: verify → load → credit
    /// → publish, strictly in order. The verification call is never
    /// retried; a replayed reference is a no-op.
    pub async fn confirm(&self, reference: &str, draft_id: Uuid) -> Result<PaymentOutcome> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AppError::Validation("reference must not be empty".to_string()));
        }

        let verification = self.gateway.verify(reference).await?;

        if !verification.success {
            tracing::warn!(
                reference,
                gateway_status = %verification.gateway_status,
                "payment verification rejected"
            );
            return Err(AppError::PaymentVerification(format!(
                "Transaction was not successful: {}",
                verification.gateway_status
            )));
        }

        let moment = self
            .moments
            .find_by_id(draft_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Moment not found".to_string()))?;

        let event = PaymentEvent {
            id: Uuid::new_v4(),
            moment_id: moment.id,
            reference: reference.to_string(),
            amount: verification.amount,
            currency: verification.currency.clone(),
            paid_at: verification.paid_at.unwrap_or_else(Utc::now),
            created_at: Utc::now(),
        };

        // The charge already went through on the gateway side; if the
        // write fails there is no rollback path, only reconciliation.
        let application = self.moments.apply_payment(moment.id, event).await.map_err(|e| {
            tracing::error!(
                reference,
                moment_id = %moment.id,
                error = %e,
                "payment verified but persistence failed; manual reconciliation required"
            );
            e
        })?;

        if application.already_applied {
            tracing::info!(reference, moment_id = %moment.id, "replayed payment reference ignored");
        } else {
            tracing::info!(
                reference,
                moment_id = %moment.id,
                amount = verification.amount,
                currency = %verification.currency,
                "moment published"
            );
        }

        let published = &application.moment;
        let quote_currency = published
            .paid_currency
            .as_deref()
            .unwrap_or(&verification.currency);
        let total = pricing::calculate_total(&published.plan, &published.addons, quote_currency);

        Ok(PaymentOutcome {
            moment_id: published.id,
            already_applied: application.already_applied,
            paid_amount: published.paid_amount,
            balance_due: pricing::balance_due(total, published.paid_amount),
        })
    }
}
