use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::PaymentEvent,
    error::{AppError, Result},
    repository::PaymentRepository,
};

// Payment events are written only by the moment repository's
// transactional apply_payment; this repository is the read side
// (idempotency pre-checks, owner receipts).
#[derive(FromRow)]
struct PaymentEventRow {
    id: String,
    moment_id: String,
    reference: String,
    amount: i64,
    currency: String,
    paid_at: NaiveDateTime,
    created_at: NaiveDateTime,
}

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: PaymentEventRow) -> Result<PaymentEvent> {
        Ok(PaymentEvent {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            moment_id: Uuid::parse_str(&row.moment_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            reference: row.reference,
            amount: row.amount,
            currency: row.currency,
            paid_at: DateTime::from_naive_utc_and_offset(row.paid_at, Utc),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentEvent>> {
        let row = sqlx::query_as::<_, PaymentEventRow>(
            r#"
            SELECT id, moment_id, reference, amount, currency, paid_at, created_at
            FROM payment_events
            WHERE reference = ?
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_event(r)?)),
            None => Ok(None),
        }
    }

    async fn list_by_moment(&self, moment_id: Uuid) -> Result<Vec<PaymentEvent>> {
        let moment_id_str = moment_id.to_string();
        let rows = sqlx::query_as::<_, PaymentEventRow>(
            r#"
            SELECT id, moment_id, reference, amount, currency, paid_at, created_at
            FROM payment_events
            WHERE moment_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(&moment_id_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_event).collect()
    }
}
