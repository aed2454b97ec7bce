use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A gateway-confirmed charge applied to a moment. The reference is
/// unique across all events; replaying a webhook or a verify call with
/// a reference already recorded here is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub id: Uuid,
    pub moment_id: Uuid,
    /// Gateway transaction reference.
    pub reference: String,
    /// Verified amount in minor units.
    pub amount: i64,
    pub currency: String,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Result of applying a payment event to a moment.
#[derive(Debug, Clone)]
pub struct PaymentApplication {
    pub moment: super::Moment,
    /// True when the reference had already been credited and nothing
    /// changed on this call.
    pub already_applied: bool,
}
