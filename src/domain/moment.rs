use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A celebration record, from first wizard step through publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moment {
    pub id: Uuid,
    /// Subject of the identity provider's session token.
    pub owner_id: String,
    /// Lowercase, globally unique. Resolved after id in public lookups.
    pub url_slug: Option<String>,
    pub recipient_name: String,
    pub sender_name: Option<String>,
    pub is_anonymous: bool,
    pub occasion: Option<String>,
    pub message: Option<String>,
    pub memories: Vec<String>,
    pub media: Vec<MediaItem>,
    pub theme: Option<String>,
    pub music: Option<MusicChoice>,
    /// Catalog plan id.
    pub plan: String,
    /// Selected addon ids, deduplicated and sorted at write time.
    pub addons: Vec<String>,
    pub reveal_type: RevealType,
    pub reveal_at: Option<DateTime<Utc>>,
    /// Reference image for the biometric unlock, when configured.
    pub face_lock_image_url: Option<String>,
    pub status: MomentStatus,
    pub is_paid: bool,
    /// Cumulative verified amount in minor units. Never decreases.
    pub paid_amount: i64,
    pub paid_currency: Option<String>,
    /// Addons covered by confirmed payments. Grows by union, never shrinks.
    pub paid_addons: Vec<String>,
    pub completed_steps: Vec<WizardStep>,
    pub last_step: Option<WizardStep>,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Moment {
    /// Union of selected and paid addons, the set entitlements are
    /// computed from.
    pub fn effective_addons(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .addons
            .iter()
            .chain(self.paid_addons.iter())
            .cloned()
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MomentStatus {
    Draft,
    Configuring,
    AwaitingPayment,
    Published,
}

impl MomentStatus {
    /// Lifecycle order. Transitions only ever move forward; nothing
    /// un-publishes a moment.
    fn rank(self) -> u8 {
        match self {
            MomentStatus::Draft => 0,
            MomentStatus::Configuring => 1,
            MomentStatus::AwaitingPayment => 2,
            MomentStatus::Published => 3,
        }
    }

    pub fn can_transition_to(self, next: MomentStatus) -> bool {
        next.rank() >= self.rank()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RevealType {
    Instant,
    Scheduled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    Recipient,
    Message,
    Memories,
    Media,
    Style,
    Reveal,
    Pay,
}

impl WizardStep {
    pub fn as_str(self) -> &'static str {
        match self {
            WizardStep::Recipient => "recipient",
            WizardStep::Message => "message",
            WizardStep::Memories => "memories",
            WizardStep::Media => "media",
            WizardStep::Style => "style",
            WizardStep::Reveal => "reveal",
            WizardStep::Pay => "pay",
        }
    }

    pub fn from_str(s: &str) -> Option<WizardStep> {
        match s {
            "recipient" => Some(WizardStep::Recipient),
            "message" => Some(WizardStep::Message),
            "memories" => Some(WizardStep::Memories),
            "media" => Some(WizardStep::Media),
            "style" => Some(WizardStep::Style),
            "reveal" => Some(WizardStep::Reveal),
            "pay" => Some(WizardStep::Pay),
            _ => None,
        }
    }

    /// Steps that must be complete before a balance is quoted. Memories
    /// are skippable; pay is completed by the confirmation handler.
    pub fn required_before_payment() -> &'static [WizardStep] {
        &[
            WizardStep::Recipient,
            WizardStep::Message,
            WizardStep::Media,
            WizardStep::Style,
            WizardStep::Reveal,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MusicChoice {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub preview_url: Option<String>,
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMomentRequest {
    #[validate(length(min = 1, max = 80))]
    pub recipient_name: String,
    #[validate(length(max = 80))]
    pub occasion: Option<String>,
    /// Defaults to the cheapest plan when omitted.
    pub plan: Option<String>,
}

/// Partial field merge applied by the repository. `None` leaves a field
/// untouched. Payment fields are deliberately absent: only the payment
/// confirmation path may change them.
#[derive(Debug, Clone, Default)]
pub struct MomentUpdate {
    pub url_slug: Option<String>,
    pub recipient_name: Option<String>,
    pub sender_name: Option<String>,
    pub is_anonymous: Option<bool>,
    pub occasion: Option<String>,
    pub message: Option<String>,
    pub memories: Option<Vec<String>>,
    pub media: Option<Vec<MediaItem>>,
    pub theme: Option<String>,
    pub music: Option<MusicChoice>,
    pub plan: Option<String>,
    pub addons: Option<Vec<String>>,
    pub reveal_type: Option<RevealType>,
    pub reveal_at: Option<DateTime<Utc>>,
    pub face_lock_image_url: Option<String>,
    pub status: Option<MomentStatus>,
    pub completed_steps: Option<Vec<WizardStep>>,
    pub last_step: Option<WizardStep>,
}

/// Lowercase a requested slug and check its shape. Uniqueness is the
/// repository's problem; shape is decided here so every caller agrees.
pub fn normalize_slug(raw: &str) -> Option<String> {
    let slug = raw.trim().to_lowercase();
    let ok_len = (3..=40).contains(&slug.len());
    let ok_chars = slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if ok_len && ok_chars && !slug.starts_with('-') && !slug.ends_with('-') {
        Some(slug)
    } else {
        None
    }
}
