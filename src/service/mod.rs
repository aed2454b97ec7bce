pub mod currency_service;
pub mod moment_service;
pub mod payment_service;
pub mod reveal_service;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::gateways::{FaceComparator, GeoLocator, PaymentGateway};
use crate::repository::*;

pub use currency_service::CurrencyService;
pub use moment_service::MomentService;
pub use payment_service::{PaymentOutcome, PaymentService};
pub use reveal_service::{DenyReason, RevealDecision, RevealService};

pub struct ServiceContext {
    pub moment_repo: Arc<dyn MomentRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub moment_service: Arc<MomentService>,
    pub payment_service: Arc<PaymentService>,
    pub reveal_service: Arc<RevealService>,
    pub currency_service: Arc<CurrencyService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        moment_repo: Arc<dyn MomentRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        payment_gateway: Arc<dyn PaymentGateway>,
        face_comparator: Arc<dyn FaceComparator>,
        geo_locator: Arc<dyn GeoLocator>,
        db_pool: SqlitePool,
    ) -> Self {
        let moment_service = Arc::new(MomentService::new(moment_repo.clone()));
        let payment_service =
            Arc::new(PaymentService::new(payment_gateway, moment_repo.clone()));
        let reveal_service =
            Arc::new(RevealService::new(moment_repo.clone(), face_comparator));
        let currency_service = Arc::new(CurrencyService::new(geo_locator));

        Self {
            moment_repo,
            payment_repo,
            moment_service,
            payment_service,
            reveal_service,
            currency_service,
            db_pool,
        }
    }
}
