use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use supriseal::{
    domain::{CreateMomentRequest, MomentUpdate, PaymentEvent, RevealType},
    gateways::fakes::{FakeFaceBehavior, FakeFaceComparator},
    repository::{MomentRepository, SqliteMomentRepository},
    service::{DenyReason, RevealDecision, RevealService},
};
use uuid::Uuid;

struct Fixture {
    repo: Arc<SqliteMomentRepository>,
    comparator: Arc<FakeFaceComparator>,
    service: RevealService,
}

async fn setup(behavior: FakeFaceBehavior) -> anyhow::Result<Fixture> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let repo = Arc::new(SqliteMomentRepository::new(pool));
    let comparator = Arc::new(FakeFaceComparator::new(behavior));
    let service = RevealService::new(repo.clone(), comparator.clone());

    Ok(Fixture { repo, comparator, service })
}

async fn create_draft(fixture: &Fixture) -> anyhow::Result<Uuid> {
    let moment = fixture
        .repo
        .create(
            "user-1",
            CreateMomentRequest {
                recipient_name: "Ada".to_string(),
                occasion: None,
                plan: Some("base".to_string()),
            },
        )
        .await?;
    Ok(moment.id)
}

async fn publish(fixture: &Fixture, id: Uuid) -> anyhow::Result<()> {
    fixture
        .repo
        .apply_payment(
            id,
            PaymentEvent {
                id: Uuid::new_v4(),
                moment_id: id,
                reference: format!("ref-{}", id),
                amount: 400,
                currency: "USD".to_string(),
                paid_at: Utc::now(),
                created_at: Utc::now(),
            },
        )
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_draft_is_denied_even_with_proof() -> anyhow::Result<()> {
    let fixture = setup(FakeFaceBehavior::Match).await?;
    let id = create_draft(&fixture).await?;

    let decision = fixture
        .service
        .check(&id.to_string(), Utc::now(), Some("snapshot"))
        .await?;

    assert_eq!(decision, RevealDecision::Denied(DenyReason::NotPublished));
    // The comparator is never consulted for an unpublished moment.
    assert_eq!(fixture.comparator.compare_calls.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn test_scheduled_future_reveal_is_not_yet_time() -> anyhow::Result<()> {
    let fixture = setup(FakeFaceBehavior::Match).await?;
    let id = create_draft(&fixture).await?;
    fixture
        .repo
        .update(
            id,
            MomentUpdate {
                reveal_type: Some(RevealType::Scheduled),
                reveal_at: Some(Utc::now() + Duration::hours(6)),
                ..Default::default()
            },
        )
        .await?;
    publish(&fixture, id).await?;

    let decision = fixture.service.check(&id.to_string(), Utc::now(), None).await?;
    assert_eq!(decision, RevealDecision::Denied(DenyReason::NotYetTime));

    // Once the scheduled time passes, the gate opens.
    let later = Utc::now() + Duration::hours(7);
    let decision = fixture.service.check(&id.to_string(), later, None).await?;
    assert_eq!(decision, RevealDecision::Allowed);

    Ok(())
}

#[tokio::test]
async fn test_instant_published_without_lock_is_allowed() -> anyhow::Result<()> {
    let fixture = setup(FakeFaceBehavior::Match).await?;
    let id = create_draft(&fixture).await?;
    publish(&fixture, id).await?;

    let decision = fixture.service.check(&id.to_string(), Utc::now(), None).await?;
    assert_eq!(decision, RevealDecision::Allowed);
    assert_eq!(fixture.comparator.compare_calls.load(Ordering::SeqCst), 0);

    Ok(())
}

async fn face_locked_published(fixture: &Fixture) -> anyhow::Result<Uuid> {
    let id = create_draft(fixture).await?;
    fixture
        .repo
        .update(
            id,
            MomentUpdate {
                face_lock_image_url: Some("https://cdn.example/reference.jpg".to_string()),
                ..Default::default()
            },
        )
        .await?;
    publish(fixture, id).await?;
    Ok(id)
}

#[tokio::test]
async fn test_face_lock_demands_a_snapshot() -> anyhow::Result<()> {
    let fixture = setup(FakeFaceBehavior::Match).await?;
    let id = face_locked_published(&fixture).await?;

    let decision = fixture.service.check(&id.to_string(), Utc::now(), None).await?;
    assert_eq!(decision, RevealDecision::Denied(DenyReason::FaceRequired));
    assert_eq!(fixture.comparator.compare_calls.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn test_face_match_unlocks() -> anyhow::Result<()> {
    let fixture = setup(FakeFaceBehavior::Match).await?;
    let id = face_locked_published(&fixture).await?;

    let decision = fixture
        .service
        .check(&id.to_string(), Utc::now(), Some("data:image/jpeg;base64,abc"))
        .await?;

    assert_eq!(decision, RevealDecision::Allowed);
    // Exactly one comparator call per attempt, never retried.
    assert_eq!(fixture.comparator.compare_calls.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_face_mismatch_is_denied() -> anyhow::Result<()> {
    let fixture = setup(FakeFaceBehavior::NoMatch).await?;
    let id = face_locked_published(&fixture).await?;

    let decision = fixture
        .service
        .check(&id.to_string(), Utc::now(), Some("abc"))
        .await?;

    assert_eq!(decision, RevealDecision::Denied(DenyReason::FaceMismatch));
    assert_eq!(fixture.comparator.compare_calls.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_comparator_error_is_inconclusive_not_mismatch() -> anyhow::Result<()> {
    let fixture = setup(FakeFaceBehavior::Error).await?;
    let id = face_locked_published(&fixture).await?;

    let decision = fixture
        .service
        .check(&id.to_string(), Utc::now(), Some("abc"))
        .await?;

    // Fail closed, but distinctly: the visitor retries, the gate does
    // not pretend the face failed to match.
    assert_eq!(decision, RevealDecision::Denied(DenyReason::Inconclusive));
    assert_eq!(fixture.comparator.compare_calls.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_reveal_check_resolves_slugs() -> anyhow::Result<()> {
    let fixture = setup(FakeFaceBehavior::Match).await?;
    let id = create_draft(&fixture).await?;
    fixture
        .repo
        .update(
            id,
            MomentUpdate {
                url_slug: Some("for-ada".to_string()),
                ..Default::default()
            },
        )
        .await?;
    publish(&fixture, id).await?;

    let decision = fixture.service.check("For-Ada", Utc::now(), None).await?;
    assert_eq!(decision, RevealDecision::Allowed);

    Ok(())
}
