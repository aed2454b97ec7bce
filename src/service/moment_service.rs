use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{
        catalog, normalize_slug, CreateMomentRequest, MediaItem, Moment, MomentStatus,
        MomentUpdate, MusicChoice, RevealType, WizardStep,
    },
    entitlements,
    error::{AppError, Result},
    repository::MomentRepository,
};

const MAX_MEMORIES: usize = 20;
const MAX_MEMORY_LEN: usize = 500;

/// Resolve a public identifier: id first, then slug. A slug that
/// happens to look like someone else's id is unreachable by design —
/// the id match wins.
pub async fn resolve_moment(
    repo: &dyn MomentRepository,
    id_or_slug: &str,
) -> Result<Option<Moment>> {
    if let Ok(id) = Uuid::parse_str(id_or_slug) {
        if let Some(moment) = repo.find_by_id(id).await? {
            return Ok(Some(moment));
        }
    }
    repo.find_by_slug(&id_or_slug.to_lowercase()).await
}

// =============================================================================
// Wizard step payloads
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RecipientStep {
    #[validate(length(min = 1, max = 80))]
    pub recipient_name: String,
    #[validate(length(max = 80))]
    pub sender_name: Option<String>,
    pub is_anonymous: Option<bool>,
    #[validate(length(max = 80))]
    pub occasion: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MessageStep {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct MemoriesStep {
    pub memories: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MediaStep {
    pub items: Vec<MediaItem>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StyleStep {
    #[validate(length(max = 40))]
    pub theme: Option<String>,
    pub music: Option<MusicChoice>,
}

#[derive(Debug, Deserialize)]
pub struct RevealStep {
    pub reveal_type: RevealType,
    pub reveal_at: Option<DateTime<Utc>>,
    pub face_lock_image_url: Option<String>,
    pub url_slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PayStep {
    pub plan: String,
    #[serde(default)]
    pub addons: Vec<String>,
}

pub struct MomentService {
    moments: Arc<dyn MomentRepository>,
}

impl MomentService {
    pub fn new(moments: Arc<dyn MomentRepository>) -> Self {
        Self { moments }
    }

    pub async fn create_draft(&self, owner_id: &str, request: CreateMomentRequest) -> Result<Moment> {
        request.validate()?;
        if let Some(ref plan) = request.plan {
            if catalog::plan(plan).is_none() {
                return Err(AppError::BadRequest(format!("Unknown plan: {}", plan)));
            }
        }
        self.moments.create(owner_id, request).await
    }

    /// Owner-scoped fetch. Someone else's moment reads as absent rather
    /// than forbidden, so ids don't leak existence.
    pub async fn get_owned(&self, owner_id: &str, id: Uuid) -> Result<Moment> {
        let moment = self
            .moments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Moment not found".to_string()))?;
        if moment.owner_id != owner_id {
            return Err(AppError::NotFound("Moment not found".to_string()));
        }
        Ok(moment)
    }

    pub async fn list_owned(&self, owner_id: &str, limit: i64, offset: i64) -> Result<Vec<Moment>> {
        self.moments.list_by_owner(owner_id, limit, offset).await
    }

    pub async fn delete_owned(&self, owner_id: &str, id: Uuid) -> Result<()> {
        self.get_owned(owner_id, id).await?;
        self.moments.delete(id).await
    }

    /// Public lookup for the reveal page. Only published moments are
    /// visible; a successful view bumps the counter (eventually
    /// consistent, by design).
    pub async fn resolve_public(&self, id_or_slug: &str) -> Result<Moment> {
        let moment = resolve_moment(self.moments.as_ref(), id_or_slug)
            .await?
            .filter(|m| m.status == MomentStatus::Published)
            .ok_or_else(|| AppError::NotFound("Moment not found".to_string()))?;
        self.moments.increment_views(moment.id).await?;
        Ok(moment)
    }

    /// Apply one wizard step as a partial update. Completed steps are a
    /// set (re-completing is a no-op) and status only ever moves
    /// forward. Concurrent edits from two tabs resolve last-write-wins
    /// per field group; that weak consistency is accepted.
    pub async fn apply_step(
        &self,
        owner_id: &str,
        id: Uuid,
        step: WizardStep,
        payload: serde_json::Value,
    ) -> Result<Moment> {
        let moment = self.get_owned(owner_id, id).await?;

        if moment.status == MomentStatus::Published {
            return Err(AppError::Conflict(
                "Published moments can no longer be edited".to_string(),
            ));
        }

        let mut update = self.step_update(&moment, step, payload).await?;

        // Pay is completed by the confirmation handler, not by saving a
        // plan selection.
        let mut completed = moment.completed_steps.clone();
        if step != WizardStep::Pay && !completed.contains(&step) {
            completed.push(step);
        }

        let mut status = moment.status;
        if status == MomentStatus::Draft {
            status = MomentStatus::Configuring;
        }
        let all_required_done = WizardStep::required_before_payment()
            .iter()
            .all(|s| completed.contains(s));
        if all_required_done && status.can_transition_to(MomentStatus::AwaitingPayment) {
            status = MomentStatus::AwaitingPayment;
        }

        update.completed_steps = Some(completed);
        update.last_step = Some(step);
        update.status = Some(status);

        self.moments.update(id, update).await
    }

    async fn step_update(
        &self,
        moment: &Moment,
        step: WizardStep,
        payload: serde_json::Value,
    ) -> Result<MomentUpdate> {
        let mut update = MomentUpdate::default();

        match step {
            WizardStep::Recipient => {
                let body: RecipientStep = parse_payload(payload)?;
                body.validate()?;
                update.recipient_name = Some(body.recipient_name);
                update.sender_name = body.sender_name;
                update.is_anonymous = body.is_anonymous;
                update.occasion = body.occasion;
            }
            WizardStep::Message => {
                let body: MessageStep = parse_payload(payload)?;
                body.validate()?;
                update.message = Some(body.message);
            }
            WizardStep::Memories => {
                let body: MemoriesStep = parse_payload(payload)?;
                if body.memories.len() > MAX_MEMORIES {
                    return Err(AppError::Validation(format!(
                        "At most {} memories are allowed",
                        MAX_MEMORIES
                    )));
                }
                if body.memories.iter().any(|m| m.len() > MAX_MEMORY_LEN) {
                    return Err(AppError::Validation(format!(
                        "Each memory must be at most {} characters",
                        MAX_MEMORY_LEN
                    )));
                }
                update.memories = Some(body.memories);
            }
            WizardStep::Media => {
                let body: MediaStep = parse_payload(payload)?;
                if body.items.iter().any(|i| i.url.trim().is_empty()) {
                    return Err(AppError::Validation(
                        "Every media item needs a URL".to_string(),
                    ));
                }
                // Same entitlement math the wizard displays; enforced
                // here because the client-side count is advisory.
                let limit = entitlements::media_limit(&moment.plan, &moment.effective_addons());
                if body.items.len() > limit as usize {
                    return Err(AppError::Validation(format!(
                        "Your plan allows up to {} media items",
                        limit
                    )));
                }
                update.media = Some(body.items);
            }
            WizardStep::Style => {
                let body: StyleStep = parse_payload(payload)?;
                body.validate()?;
                update.theme = body.theme;
                update.music = body.music;
            }
            WizardStep::Reveal => {
                let body: RevealStep = parse_payload(payload)?;
                if body.reveal_type == RevealType::Scheduled && body.reveal_at.is_none() {
                    return Err(AppError::Validation(
                        "A scheduled reveal needs a reveal time".to_string(),
                    ));
                }
                if let Some(ref raw) = body.url_slug {
                    update.url_slug = Some(self.claim_slug(moment, raw).await?);
                }
                update.reveal_type = Some(body.reveal_type);
                update.reveal_at = body.reveal_at;
                update.face_lock_image_url = body.face_lock_image_url;
            }
            WizardStep::Pay => {
                let body: PayStep = parse_payload(payload)?;
                if catalog::plan(&body.plan).is_none() {
                    return Err(AppError::BadRequest(format!("Unknown plan: {}", body.plan)));
                }
                if let Some(unknown) = body.addons.iter().find(|id| catalog::addon(id).is_none()) {
                    return Err(AppError::BadRequest(format!("Unknown addon: {}", unknown)));
                }
                let mut addons = body.addons;
                addons.sort();
                addons.dedup();
                update.plan = Some(body.plan);
                update.addons = Some(addons);
            }
        }

        Ok(update)
    }

    /// Slugs are stored lowercase and are unique across all moments.
    async fn claim_slug(&self, moment: &Moment, raw: &str) -> Result<String> {
        let slug = normalize_slug(raw).ok_or_else(|| {
            AppError::Validation(
                "URLs must be 3-40 characters of letters, digits and dashes".to_string(),
            )
        })?;

        if !entitlements::custom_url_allowed(&moment.plan, &moment.effective_addons()) {
            return Err(AppError::Validation(
                "Custom URLs require the custom-url addon or the premium plan".to_string(),
            ));
        }

        if let Some(existing) = self.moments.find_by_slug(&slug).await? {
            if existing.id != moment.id {
                return Err(AppError::Conflict("That URL is already taken".to_string()));
            }
        }

        Ok(slug)
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(payload: serde_json::Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| AppError::BadRequest(format!("Invalid payload: {}", e)))
}
