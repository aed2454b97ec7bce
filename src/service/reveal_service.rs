use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    domain::{Moment, MomentStatus, RevealType},
    error::{AppError, Result},
    gateways::{FaceComparator, FaceVerdict},
    repository::MomentRepository,
    service::moment_service::resolve_moment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealDecision {
    Allowed,
    Denied(DenyReason),
}

/// Reason categories only; a denial never reports how close a face
/// match came.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NotPublished,
    NotYetTime,
    FaceRequired,
    FaceMismatch,
    Inconclusive,
}

/// Status and schedule gating; pure so both the reveal check and the
/// unlock attempt share it.
pub fn schedule_gate(moment: &Moment, now: DateTime<Utc>) -> Option<DenyReason> {
    if moment.status != MomentStatus::Published {
        return Some(DenyReason::NotPublished);
    }
    if moment.reveal_type == RevealType::Scheduled {
        if let Some(reveal_at) = moment.reveal_at {
            if now < reveal_at {
                return Some(DenyReason::NotYetTime);
            }
        }
    }
    None
}

/// Server-side reveal gate. A client-reported match is never trusted;
/// the comparator's verdict is the only thing that unlocks a face-locked
/// moment, and it is consulted exactly once per attempt.
pub struct RevealService {
    moments: Arc<dyn MomentRepository>,
    comparator: Arc<dyn FaceComparator>,
}

impl RevealService {
    pub fn new(moments: Arc<dyn MomentRepository>, comparator: Arc<dyn FaceComparator>) -> Self {
        Self { moments, comparator }
    }

    pub async fn check(
        &self,
        id_or_slug: &str,
        now: DateTime<Utc>,
        snapshot_b64: Option<&str>,
    ) -> Result<RevealDecision> {
        let moment = resolve_moment(self.moments.as_ref(), id_or_slug)
            .await?
            .ok_or_else(|| AppError::NotFound("Moment not found".to_string()))?;

        if let Some(reason) = schedule_gate(&moment, now) {
            return Ok(RevealDecision::Denied(reason));
        }

        let Some(ref reference_url) = moment.face_lock_image_url else {
            return Ok(RevealDecision::Allowed);
        };

        let Some(snapshot) = snapshot_b64 else {
            return Ok(RevealDecision::Denied(DenyReason::FaceRequired));
        };

        match self.comparator.compare(reference_url, strip_data_url(snapshot)).await {
            Ok(FaceVerdict::Match) => Ok(RevealDecision::Allowed),
            Ok(FaceVerdict::NoMatch) => Ok(RevealDecision::Denied(DenyReason::FaceMismatch)),
            Err(e) => {
                // Comparator failure is not a mismatch; fail closed but
                // tell the visitor the check didn't complete.
                tracing::warn!(moment_id = %moment.id, error = %e, "face comparison inconclusive");
                Ok(RevealDecision::Denied(DenyReason::Inconclusive))
            }
        }
    }
}

/// Browsers send camera captures as data URLs; the comparator wants the
/// bare base64 payload.
fn strip_data_url(snapshot: &str) -> &str {
    if snapshot.starts_with("data:") {
        snapshot.split_once(',').map(|(_, rest)| rest).unwrap_or(snapshot)
    } else {
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn published_moment() -> Moment {
        Moment {
            id: Uuid::new_v4(),
            owner_id: "user-1".to_string(),
            url_slug: None,
            recipient_name: "Ada".to_string(),
            sender_name: None,
            is_anonymous: false,
            occasion: None,
            message: None,
            memories: vec![],
            media: vec![],
            theme: None,
            music: None,
            plan: "base".to_string(),
            addons: vec![],
            reveal_type: RevealType::Instant,
            reveal_at: None,
            face_lock_image_url: None,
            status: MomentStatus::Published,
            is_paid: true,
            paid_amount: 400,
            paid_currency: Some("USD".to_string()),
            paid_addons: vec![],
            completed_steps: vec![],
            last_step: None,
            view_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            published_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_draft_is_not_revealable() {
        let mut moment = published_moment();
        moment.status = MomentStatus::Draft;
        assert_eq!(
            schedule_gate(&moment, Utc::now()),
            Some(DenyReason::NotPublished)
        );
    }

    #[test]
    fn test_scheduled_future_is_not_yet_time() {
        let mut moment = published_moment();
        moment.reveal_type = RevealType::Scheduled;
        moment.reveal_at = Some(Utc::now() + Duration::hours(2));
        assert_eq!(
            schedule_gate(&moment, Utc::now()),
            Some(DenyReason::NotYetTime)
        );
    }

    #[test]
    fn test_scheduled_past_is_open() {
        let mut moment = published_moment();
        moment.reveal_type = RevealType::Scheduled;
        moment.reveal_at = Some(Utc::now() - Duration::hours(2));
        assert_eq!(schedule_gate(&moment, Utc::now()), None);
    }

    #[test]
    fn test_instant_published_is_open() {
        assert_eq!(schedule_gate(&published_moment(), Utc::now()), None);
    }

    #[test]
    fn test_strip_data_url() {
        assert_eq!(strip_data_url("data:image/jpeg;base64,abc123"), "abc123");
        assert_eq!(strip_data_url("abc123"), "abc123");
    }
}
