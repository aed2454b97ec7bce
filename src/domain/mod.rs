pub mod catalog;
pub mod moment;
pub mod payment;

pub use catalog::{Addon, Plan, Price, DEFAULT_CURRENCY, PREMIUM_PLAN_ID};
pub use moment::{
    normalize_slug, CreateMomentRequest, MediaItem, MediaKind, Moment, MomentStatus,
    MomentUpdate, MusicChoice, RevealType, WizardStep,
};
pub use payment::{PaymentApplication, PaymentEvent};
