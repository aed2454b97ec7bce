use std::sync::Arc;

use sqlx::SqlitePool;
use supriseal::{
    domain::{CreateMomentRequest, MomentStatus, MomentUpdate, WizardStep},
    error::AppError,
    gateways::fakes::FakePaymentGateway,
    repository::{MomentRepository, SqliteMomentRepository},
    service::PaymentService,
};
use uuid::Uuid;

struct Fixture {
    repo: Arc<SqliteMomentRepository>,
    gateway: Arc<FakePaymentGateway>,
    service: PaymentService,
}

async fn setup() -> anyhow::Result<Fixture> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let repo = Arc::new(SqliteMomentRepository::new(pool));
    let gateway = Arc::new(FakePaymentGateway::new());
    let service = PaymentService::new(gateway.clone(), repo.clone());

    Ok(Fixture { repo, gateway, service })
}

/// A base-plan draft with extra-media and custom-url selected:
/// $4.00 + $2.00 + $1.00 = $7.00.
async fn draft_with_addons(fixture: &Fixture) -> anyhow::Result<Uuid> {
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

    fixture
        .repo
        .update(
            moment.id,
            MomentUpdate {
                addons: Some(vec!["custom-url".to_string(), "extra-media".to_string()]),
                ..Default::default()
            },
        )
        .await?;

    Ok(moment.id)
}

#[tokio::test]
async fn test_verified_payment_publishes_the_moment() -> anyhow::Result<()> {
    let fixture = setup().await?;
    let id = draft_with_addons(&fixture).await?;
    fixture.gateway.succeed("ref-1", 700, "USD");

    let outcome = fixture.service.confirm("ref-1", id).await?;

    assert!(!outcome.already_applied);
    assert_eq!(outcome.paid_amount, 700);
    assert_eq!(outcome.balance_due, 0);

    let moment = fixture.repo.find_by_id(id).await?.unwrap();
    assert_eq!(moment.status, MomentStatus::Published);
    assert!(moment.is_paid);
    assert_eq!(moment.paid_amount, 700);
    assert_eq!(moment.paid_currency.as_deref(), Some("USD"));
    assert_eq!(
        moment.paid_addons,
        vec!["custom-url".to_string(), "extra-media".to_string()]
    );
    assert!(moment.published_at.is_some());
    assert!(moment.completed_steps.contains(&WizardStep::Pay));
    assert_eq!(moment.last_step, Some(WizardStep::Pay));

    Ok(())
}

#[tokio::test]
async fn test_replayed_reference_credits_exactly_once() -> anyhow::Result<()> {
    let fixture = setup().await?;
    let id = draft_with_addons(&fixture).await?;
    fixture.gateway.succeed("ref-1", 700, "USD");

    let first = fixture.service.confirm("ref-1", id).await?;
    assert!(!first.already_applied);

    // A retried webhook or a double-submitted return page replays the
    // same reference; the credit must not double.
    let second = fixture.service.confirm("ref-1", id).await?;
    assert!(second.already_applied);
    assert_eq!(second.paid_amount, 700);

    let moment = fixture.repo.find_by_id(id).await?.unwrap();
    assert_eq!(moment.paid_amount, 700);
    assert_eq!(moment.status, MomentStatus::Published);

    Ok(())
}

#[tokio::test]
async fn test_rejected_verification_does_not_advance_lifecycle() -> anyhow::Result<()> {
    let fixture = setup().await?;
    let id = draft_with_addons(&fixture).await?;
    fixture.gateway.fail("ref-bad", "abandoned");

    let result = fixture.service.confirm("ref-bad", id).await;
    assert!(matches!(result, Err(AppError::PaymentVerification(_))));

    let moment = fixture.repo.find_by_id(id).await?.unwrap();
    assert_eq!(moment.status, MomentStatus::Draft);
    assert!(!moment.is_paid);
    assert_eq!(moment.paid_amount, 0);
    assert!(moment.paid_addons.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unknown_moment_is_not_found() -> anyhow::Result<()> {
    let fixture = setup().await?;
    fixture.gateway.succeed("ref-1", 700, "USD");

    let result = fixture.service.confirm("ref-1", Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_partial_payments_accumulate_monotonically() -> anyhow::Result<()> {
    let fixture = setup().await?;
    let id = draft_with_addons(&fixture).await?;
    fixture.gateway.succeed("ref-1", 300, "USD");
    fixture.gateway.succeed("ref-2", 400, "USD");

    // Any successful verified payment publishes and accumulates; the
    // remaining balance is reported alongside.
    let first = fixture.service.confirm("ref-1", id).await?;
    assert_eq!(first.paid_amount, 300);
    assert_eq!(first.balance_due, 400);

    let moment = fixture.repo.find_by_id(id).await?.unwrap();
    assert_eq!(moment.status, MomentStatus::Published);

    let second = fixture.service.confirm("ref-2", id).await?;
    assert_eq!(second.paid_amount, 700);
    assert_eq!(second.balance_due, 0);

    // Overpayment floors the balance at zero and never rolls anything
    // back.
    fixture.gateway.succeed("ref-3", 500, "USD");
    let third = fixture.service.confirm("ref-3", id).await?;
    assert_eq!(third.paid_amount, 1200);
    assert_eq!(third.balance_due, 0);

    let moment = fixture.repo.find_by_id(id).await?.unwrap();
    assert_eq!(moment.status, MomentStatus::Published);
    assert!(moment.is_paid);

    Ok(())
}

#[tokio::test]
async fn test_gateway_outage_leaves_moment_untouched() -> anyhow::Result<()> {
    let fixture = setup().await?;
    let id = draft_with_addons(&fixture).await?;
    fixture.gateway.set_unavailable(true);

    let result = fixture.service.confirm("ref-1", id).await;
    assert!(matches!(result, Err(AppError::ExternalTimeout(_))));

    let moment = fixture.repo.find_by_id(id).await?.unwrap();
    assert_eq!(moment.status, MomentStatus::Draft);
    assert_eq!(moment.paid_amount, 0);

    Ok(())
}

#[tokio::test]
async fn test_blank_reference_is_rejected_before_the_gateway() -> anyhow::Result<()> {
    let fixture = setup().await?;
    let id = draft_with_addons(&fixture).await?;

    let result = fixture.service.confirm("   ", id).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(
        fixture
            .gateway
            .verify_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );

    Ok(())
}
