use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::*;
use crate::error::Result;

pub mod moment_repository;
pub mod payment_repository;

pub use moment_repository::SqliteMomentRepository;
pub use payment_repository::SqlitePaymentRepository;

#[async_trait]
pub trait MomentRepository: Send + Sync {
    async fn create(&self, owner_id: &str, request: CreateMomentRequest) -> Result<Moment>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Moment>>;
    /// Equality lookup on the indexed slug column. Callers pass the
    /// already-lowercased slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Moment>>;
    async fn list_by_owner(&self, owner_id: &str, limit: i64, offset: i64) -> Result<Vec<Moment>>;
    /// Partial field merge; `None` fields are left as stored. Never
    /// touches payment fields.
    async fn update(&self, id: Uuid, update: MomentUpdate) -> Result<Moment>;
    /// Credit a verified charge and publish, atomically with the
    /// payment-event insert. A reference that was already recorded is a
    /// no-op and reports `already_applied`.
    async fn apply_payment(&self, id: Uuid, event: PaymentEvent) -> Result<PaymentApplication>;
    async fn increment_views(&self, id: Uuid) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentEvent>>;
    async fn list_by_moment(&self, moment_id: Uuid) -> Result<Vec<PaymentEvent>>;
}
