//! Outbound integrations. Each external collaborator sits behind a
//! trait so services stay testable; every client bounds its wait and
//! maps timeouts to a distinct error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

pub mod geo;
pub mod paystack;
pub mod vision;

pub use geo::IpApiGeoLocator;
pub use paystack::PaystackGateway;
pub use vision::GenerativeVisionComparator;

/// What the payment gateway reported for a transaction reference.
#[derive(Debug, Clone)]
pub struct ChargeVerification {
    pub reference: String,
    /// True only for a successful transaction status.
    pub success: bool,
    /// Raw gateway status, for logs and operator-facing errors.
    pub gateway_status: String,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Server-side verification of a charge. Called with a secret
/// credential; must never be exposed to clients.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn verify(&self, reference: &str) -> Result<ChargeVerification>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceVerdict {
    Match,
    NoMatch,
}

/// External vision comparator. Non-deterministic: the same inputs may
/// not always yield the same verdict, so callers make exactly one call
/// per attempt and never retry toward a match.
#[async_trait]
pub trait FaceComparator: Send + Sync {
    async fn compare(&self, reference_image_url: &str, snapshot_b64: &str) -> Result<FaceVerdict>;
}

/// Best-effort country lookup for currency resolution. `Ok(None)`
/// means the service answered but could not place the address.
#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn country_code(&self, client_ip: &str) -> Result<Option<String>>;
}

// =============================================================================
// Test fakes
// =============================================================================

#[cfg(any(test, feature = "test-utils"))]
pub mod fakes {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::{ChargeVerification, FaceComparator, FaceVerdict, GeoLocator, PaymentGateway};
    use crate::error::{AppError, Result};

    #[derive(Default)]
    pub struct FakePaymentGateway {
        charges: Mutex<HashMap<String, ChargeVerification>>,
        unavailable: AtomicBool,
        pub verify_calls: AtomicUsize,
    }

    impl FakePaymentGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn succeed(&self, reference: &str, amount: i64, currency: &str) {
            self.charges.lock().unwrap().insert(
                reference.to_string(),
                ChargeVerification {
                    reference: reference.to_string(),
                    success: true,
                    gateway_status: "success".to_string(),
                    amount,
                    currency: currency.to_string(),
                    paid_at: Some(Utc::now()),
                },
            );
        }

        pub fn fail(&self, reference: &str, gateway_status: &str) {
            self.charges.lock().unwrap().insert(
                reference.to_string(),
                ChargeVerification {
                    reference: reference.to_string(),
                    success: false,
                    gateway_status: gateway_status.to_string(),
                    amount: 0,
                    currency: String::new(),
                    paid_at: None,
                },
            );
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PaymentGateway for FakePaymentGateway {
        async fn verify(&self, reference: &str) -> Result<ChargeVerification> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::ExternalTimeout("payment gateway".to_string()));
            }
            match self.charges.lock().unwrap().get(reference) {
                Some(charge) => Ok(charge.clone()),
                None => Ok(ChargeVerification {
                    reference: reference.to_string(),
                    success: false,
                    gateway_status: "not_found".to_string(),
                    amount: 0,
                    currency: String::new(),
                    paid_at: None,
                }),
            }
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub enum FakeFaceBehavior {
        Match,
        NoMatch,
        Error,
    }

    pub struct FakeFaceComparator {
        behavior: Mutex<FakeFaceBehavior>,
        pub compare_calls: AtomicUsize,
    }

    impl FakeFaceComparator {
        pub fn new(behavior: FakeFaceBehavior) -> Self {
            Self {
                behavior: Mutex::new(behavior),
                compare_calls: AtomicUsize::new(0),
            }
        }

        pub fn set_behavior(&self, behavior: FakeFaceBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }
    }

    #[async_trait]
    impl FaceComparator for FakeFaceComparator {
        async fn compare(&self, _reference: &str, _snapshot: &str) -> Result<FaceVerdict> {
            self.compare_calls.fetch_add(1, Ordering::SeqCst);
            match *self.behavior.lock().unwrap() {
                FakeFaceBehavior::Match => Ok(FaceVerdict::Match),
                FakeFaceBehavior::NoMatch => Ok(FaceVerdict::NoMatch),
                FakeFaceBehavior::Error => {
                    Err(AppError::External("vision comparator".to_string()))
                }
            }
        }
    }

    pub struct FakeGeoLocator {
        country: Mutex<Option<String>>,
        fail: AtomicBool,
    }

    impl FakeGeoLocator {
        pub fn returning(country: Option<&str>) -> Self {
            Self {
                country: Mutex::new(country.map(|c| c.to_string())),
                fail: AtomicBool::new(false),
            }
        }

        pub fn failing() -> Self {
            let locator = Self::returning(None);
            locator.fail.store(true, Ordering::SeqCst);
            locator
        }
    }

    #[async_trait]
    impl GeoLocator for FakeGeoLocator {
        async fn country_code(&self, _client_ip: &str) -> Result<Option<String>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::ExternalTimeout("geolocation".to_string()));
            }
            Ok(self.country.lock().unwrap().clone())
        }
    }
}
