use sqlx::SqlitePool;
use supriseal::{
    domain::{CreateMomentRequest, MediaItem, MediaKind, MomentStatus, MomentUpdate},
    repository::{MomentRepository, SqliteMomentRepository},
    service::moment_service::resolve_moment,
};

async fn setup() -> anyhow::Result<SqliteMomentRepository> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(SqliteMomentRepository::new(pool))
}

fn draft_request(recipient: &str) -> CreateMomentRequest {
    CreateMomentRequest {
        recipient_name: recipient.to_string(),
        occasion: Some("Birthday".to_string()),
        plan: None,
    }
}

#[tokio::test]
async fn test_moment_crud() -> anyhow::Result<()> {
    let repo = setup().await?;

    // Test Create
    let moment = repo.create("user-1", draft_request("Ada")).await?;
    assert_eq!(moment.recipient_name, "Ada");
    assert_eq!(moment.status, MomentStatus::Draft);
    assert_eq!(moment.plan, "base");
    assert!(!moment.is_paid);
    assert_eq!(moment.paid_amount, 0);
    assert!(moment.media.is_empty());

    // Test Find by ID
    let found = repo.find_by_id(moment.id).await?;
    assert!(found.is_some());
    assert_eq!(found.unwrap().id, moment.id);

    // Test List by owner
    let owned = repo.list_by_owner("user-1", 10, 0).await?;
    assert_eq!(owned.len(), 1);
    assert!(repo.list_by_owner("user-2", 10, 0).await?.is_empty());

    // Test Update with a JSON-valued field
    let media = vec![MediaItem {
        kind: MediaKind::Photo,
        url: "https://cdn.example/photo-1.jpg".to_string(),
        caption: Some("Us at the beach".to_string()),
    }];
    let updated = repo
        .update(
            moment.id,
            MomentUpdate {
                message: Some("Happy birthday!".to_string()),
                media: Some(media.clone()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.message.as_deref(), Some("Happy birthday!"));
    assert_eq!(updated.media, media);

    // Test Delete
    repo.delete(moment.id).await?;
    assert!(repo.find_by_id(moment.id).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_partial_update_leaves_other_fields_alone() -> anyhow::Result<()> {
    let repo = setup().await?;
    let moment = repo.create("user-1", draft_request("Ada")).await?;

    repo.update(
        moment.id,
        MomentUpdate {
            message: Some("First".to_string()),
            ..Default::default()
        },
    )
    .await?;

    let after_theme = repo
        .update(
            moment.id,
            MomentUpdate {
                theme: Some("confetti".to_string()),
                ..Default::default()
            },
        )
        .await?;

    // The theme write must not clobber fields it never mentioned.
    assert_eq!(after_theme.message.as_deref(), Some("First"));
    assert_eq!(after_theme.recipient_name, "Ada");
    assert_eq!(after_theme.occasion.as_deref(), Some("Birthday"));

    Ok(())
}

#[tokio::test]
async fn test_slug_lookup_matches_lowercased_slug() -> anyhow::Result<()> {
    let repo = setup().await?;
    let moment = repo.create("user-1", draft_request("Big Mama")).await?;

    repo.update(
        moment.id,
        MomentUpdate {
            url_slug: Some("bigmama".to_string()),
            ..Default::default()
        },
    )
    .await?;

    // The service lowercases before the equality query.
    let resolved = resolve_moment(&repo, "BigMama").await?;
    assert_eq!(resolved.map(|m| m.id), Some(moment.id));

    assert!(repo.find_by_slug("somebody-else").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_id_lookup_precedes_slug_lookup() -> anyhow::Result<()> {
    let repo = setup().await?;
    let slug_owner = repo.create("user-1", draft_request("Ada")).await?;
    let id_owner = repo.create("user-2", draft_request("Ben")).await?;

    // A slug that collides with another moment's id is unreachable by
    // slug: the id match wins first.
    repo.update(
        slug_owner.id,
        MomentUpdate {
            url_slug: Some(id_owner.id.to_string()),
            ..Default::default()
        },
    )
    .await?;

    let resolved = resolve_moment(&repo, &id_owner.id.to_string()).await?;
    assert_eq!(resolved.map(|m| m.id), Some(id_owner.id));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_slug_is_rejected() -> anyhow::Result<()> {
    let repo = setup().await?;
    let first = repo.create("user-1", draft_request("Ada")).await?;
    let second = repo.create("user-1", draft_request("Ben")).await?;

    repo.update(
        first.id,
        MomentUpdate {
            url_slug: Some("for-ada".to_string()),
            ..Default::default()
        },
    )
    .await?;

    let result = repo
        .update(
            second.id,
            MomentUpdate {
                url_slug: Some("for-ada".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(result.is_err());

    Ok(())
}

#[tokio::test]
async fn test_view_counter_increments() -> anyhow::Result<()> {
    let repo = setup().await?;
    let moment = repo.create("user-1", draft_request("Ada")).await?;

    repo.increment_views(moment.id).await?;
    repo.increment_views(moment.id).await?;

    let found = repo.find_by_id(moment.id).await?.unwrap();
    assert_eq!(found.view_count, 2);

    Ok(())
}
