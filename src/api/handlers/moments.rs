use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{
        CreateMomentRequest, MediaItem, Moment, MomentStatus, MusicChoice, PaymentEvent,
        RevealType, WizardStep,
    },
    entitlements::{self, Entitlements},
    error::{AppError, Result},
    pricing,
    service::reveal_service::{schedule_gate, DenyReason},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    moments: Vec<MomentDto>,
    total: usize,
}

#[derive(Debug, Serialize)]
pub struct QuoteDto {
    pub currency: String,
    pub total: i64,
    pub paid: i64,
    pub balance_due: i64,
}

/// Owner-facing view: the full wizard state plus the derived quote and
/// entitlements the dashboard renders.
#[derive(Debug, Serialize)]
pub struct MomentDto {
    pub id: Uuid,
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
    pub plan: String,
    pub addons: Vec<String>,
    pub reveal_type: RevealType,
    pub reveal_at: Option<DateTime<Utc>>,
    pub face_locked: bool,
    pub status: MomentStatus,
    pub is_expired: bool,
    pub is_paid: bool,
    pub paid_addons: Vec<String>,
    pub completed_steps: Vec<WizardStep>,
    pub last_step: Option<WizardStep>,
    pub view_count: i64,
    pub entitlements: Entitlements,
    pub quote: QuoteDto,
    pub created_at: String,
    pub updated_at: String,
    pub published_at: Option<String>,
}

/// Quotes stick to the currency a moment was first paid in; otherwise
/// the caller's requested currency applies.
pub fn quote_for(moment: &Moment, requested_currency: &str) -> QuoteDto {
    let currency = moment
        .paid_currency
        .as_deref()
        .unwrap_or(requested_currency)
        .to_string();
    let total = pricing::calculate_total(&moment.plan, &moment.addons, &currency);
    QuoteDto {
        balance_due: pricing::balance_due(total, moment.paid_amount),
        total,
        paid: moment.paid_amount,
        currency,
    }
}

fn to_dto(moment: Moment, currency: &str) -> MomentDto {
    let quote = quote_for(&moment, currency);
    MomentDto {
        id: moment.id,
        url_slug: moment.url_slug.clone(),
        is_expired: entitlements::is_expired(&moment, Utc::now()),
        entitlements: entitlements::for_moment(&moment),
        quote,
        recipient_name: moment.recipient_name,
        sender_name: moment.sender_name,
        is_anonymous: moment.is_anonymous,
        occasion: moment.occasion,
        message: moment.message,
        memories: moment.memories,
        media: moment.media,
        theme: moment.theme,
        music: moment.music,
        plan: moment.plan,
        addons: moment.addons,
        reveal_type: moment.reveal_type,
        reveal_at: moment.reveal_at,
        face_locked: moment.face_lock_image_url.is_some(),
        status: moment.status,
        is_paid: moment.is_paid,
        paid_addons: moment.paid_addons,
        completed_steps: moment.completed_steps,
        last_step: moment.last_step,
        view_count: moment.view_count,
        created_at: moment.created_at.to_rfc3339(),
        updated_at: moment.updated_at.to_rfc3339(),
        published_at: moment.published_at.map(|dt| dt.to_rfc3339()),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateMomentRequest>,
) -> Result<(StatusCode, Json<MomentDto>)> {
    let moment = state
        .service_context
        .moment_service
        .create_draft(&user.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(to_dto(moment, crate::domain::DEFAULT_CURRENCY))))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let moments = state
        .service_context
        .moment_service
        .list_owned(&user.user_id, params.limit, params.offset)
        .await?;

    let total = moments.len();
    let moments: Vec<MomentDto> = moments
        .into_iter()
        .map(|m| to_dto(m, crate::domain::DEFAULT_CURRENCY))
        .collect();

    Ok(Json(ListResponse { moments, total }))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<MomentDto>> {
    let moment = state
        .service_context
        .moment_service
        .get_owned(&user.user_id, id)
        .await?;

    let currency = params
        .currency
        .unwrap_or_else(|| crate::domain::DEFAULT_CURRENCY.to_string());
    Ok(Json(to_dto(moment, &currency)))
}

pub async fn update_step(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, step)): Path<(Uuid, String)>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<MomentDto>> {
    let step = WizardStep::from_str(&step)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown wizard step: {}", step)))?;

    let moment = state
        .service_context
        .moment_service
        .apply_step(&user.user_id, id, step, payload)
        .await?;

    Ok(Json(to_dto(moment, crate::domain::DEFAULT_CURRENCY)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state
        .service_context
        .moment_service
        .delete_owned(&user.user_id, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Standalone quote for the pay step: total, paid so far, balance due.
pub async fn quote(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<QuoteDto>> {
    let moment = state
        .service_context
        .moment_service
        .get_owned(&user.user_id, id)
        .await?;

    let currency = params
        .currency
        .unwrap_or_else(|| crate::domain::DEFAULT_CURRENCY.to_string());
    Ok(Json(quote_for(&moment, &currency)))
}

#[derive(Debug, Serialize)]
pub struct PaymentEventDto {
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub paid_at: String,
}

impl From<PaymentEvent> for PaymentEventDto {
    fn from(event: PaymentEvent) -> Self {
        Self {
            reference: event.reference,
            amount: event.amount,
            currency: event.currency,
            paid_at: event.paid_at.to_rfc3339(),
        }
    }
}

/// Owner receipts for a moment.
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PaymentEventDto>>> {
    state
        .service_context
        .moment_service
        .get_owned(&user.user_id, id)
        .await?;

    let events = state
        .service_context
        .payment_repo
        .list_by_moment(id)
        .await?;

    Ok(Json(events.into_iter().map(Into::into).collect()))
}

// =============================================================================
// Public reveal page
// =============================================================================

#[derive(Debug, Serialize)]
pub struct PublicContent {
    pub message: Option<String>,
    pub memories: Vec<String>,
    pub media: Vec<MediaItem>,
    pub music: Option<MusicChoice>,
}

/// Visitor-facing view. Content is withheld until the gate allows it;
/// the sender stays hidden when the moment is anonymous.
#[derive(Debug, Serialize)]
pub struct PublicMomentDto {
    pub id: Uuid,
    pub url_slug: Option<String>,
    pub recipient_name: String,
    pub sender_name: Option<String>,
    pub occasion: Option<String>,
    pub theme: Option<String>,
    pub branding_removed: bool,
    pub reveal_at: Option<DateTime<Utc>>,
    pub locked: bool,
    pub lock_reason: Option<DenyReason>,
    pub content: Option<PublicContent>,
}

pub fn to_public_dto(moment: Moment, decision: Option<DenyReason>) -> PublicMomentDto {
    let branding_removed =
        entitlements::branding_removed(&moment.plan, &moment.effective_addons());
    let sender_name = if moment.is_anonymous {
        None
    } else {
        moment.sender_name.clone()
    };
    let content = if decision.is_none() {
        Some(PublicContent {
            message: moment.message.clone(),
            memories: moment.memories.clone(),
            media: moment.media.clone(),
            music: moment.music.clone(),
        })
    } else {
        None
    };

    PublicMomentDto {
        id: moment.id,
        url_slug: moment.url_slug,
        recipient_name: moment.recipient_name,
        sender_name,
        occasion: moment.occasion,
        theme: moment.theme,
        branding_removed,
        reveal_at: moment.reveal_at,
        locked: decision.is_some(),
        lock_reason: decision,
        content,
    }
}

/// `GET /public/moments/:id_or_slug` — id resolution precedes slug.
/// The schedule gate applies here; a face lock additionally withholds
/// content until an unlock attempt succeeds.
pub async fn public_view(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<PublicMomentDto>> {
    let moment = state
        .service_context
        .moment_service
        .resolve_public(&id_or_slug)
        .await?;

    let decision = schedule_gate(&moment, Utc::now()).or_else(|| {
        moment
            .face_lock_image_url
            .as_ref()
            .map(|_| DenyReason::FaceRequired)
    });

    Ok(Json(to_public_dto(moment, decision)))
}
