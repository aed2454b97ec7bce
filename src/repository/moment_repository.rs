use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        CreateMomentRequest, MediaItem, Moment, MomentStatus, MomentUpdate, MusicChoice,
        PaymentApplication, PaymentEvent, RevealType, WizardStep,
    },
    error::{AppError, Result},
    repository::MomentRepository,
};

// Database row struct that matches the SQLite schema. List-valued
// fields are stored as JSON text.
#[derive(FromRow)]
struct MomentRow {
    id: String,
    owner_id: String,
    url_slug: Option<String>,
    recipient_name: String,
    sender_name: Option<String>,
    is_anonymous: i32,
    occasion: Option<String>,
    message: Option<String>,
    memories: String,
    media: String,
    theme: Option<String>,
    music: Option<String>,
    plan: String,
    addons: String,
    reveal_type: String,
    reveal_at: Option<NaiveDateTime>,
    face_lock_image_url: Option<String>,
    status: String,
    is_paid: i32,
    paid_amount: i64,
    paid_currency: Option<String>,
    paid_addons: String,
    completed_steps: String,
    last_step: Option<String>,
    view_count: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    published_at: Option<NaiveDateTime>,
}

const MOMENT_COLUMNS: &str = r#"
    id, owner_id, url_slug, recipient_name, sender_name, is_anonymous,
    occasion, message, memories, media, theme, music, plan, addons,
    reveal_type, reveal_at, face_lock_image_url, status, is_paid,
    paid_amount, paid_currency, paid_addons, completed_steps, last_step,
    view_count, created_at, updated_at, published_at
"#;

pub struct SqliteMomentRepository {
    pool: SqlitePool,
}

impl SqliteMomentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_moment(row: MomentRow) -> Result<Moment> {
        Ok(Moment {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            owner_id: row.owner_id,
            url_slug: row.url_slug,
            recipient_name: row.recipient_name,
            sender_name: row.sender_name,
            is_anonymous: row.is_anonymous != 0,
            occasion: row.occasion,
            message: row.message,
            memories: parse_json(&row.memories)?,
            media: parse_json::<Vec<MediaItem>>(&row.media)?,
            theme: row.theme,
            music: row
                .music
                .as_deref()
                .map(parse_json::<MusicChoice>)
                .transpose()?,
            plan: row.plan,
            addons: parse_json(&row.addons)?,
            reveal_type: Self::parse_reveal_type(&row.reveal_type)?,
            reveal_at: row.reveal_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            face_lock_image_url: row.face_lock_image_url,
            status: Self::parse_status(&row.status)?,
            is_paid: row.is_paid != 0,
            paid_amount: row.paid_amount,
            paid_currency: row.paid_currency,
            paid_addons: parse_json(&row.paid_addons)?,
            completed_steps: Self::parse_steps(&row.completed_steps)?,
            last_step: row
                .last_step
                .as_deref()
                .map(|s| {
                    WizardStep::from_str(s)
                        .ok_or_else(|| AppError::Database(format!("Invalid wizard step: {}", s)))
                })
                .transpose()?,
            view_count: row.view_count,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
            published_at: row
                .published_at
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
        })
    }

    fn parse_status(s: &str) -> Result<MomentStatus> {
        match s {
            "Draft" => Ok(MomentStatus::Draft),
            "Configuring" => Ok(MomentStatus::Configuring),
            "AwaitingPayment" => Ok(MomentStatus::AwaitingPayment),
            "Published" => Ok(MomentStatus::Published),
            _ => Err(AppError::Database(format!("Invalid moment status: {}", s))),
        }
    }

    fn status_to_str(status: &MomentStatus) -> &'static str {
        match status {
            MomentStatus::Draft => "Draft",
            MomentStatus::Configuring => "Configuring",
            MomentStatus::AwaitingPayment => "AwaitingPayment",
            MomentStatus::Published => "Published",
        }
    }

    fn parse_reveal_type(s: &str) -> Result<RevealType> {
        match s {
            "instant" => Ok(RevealType::Instant),
            "scheduled" => Ok(RevealType::Scheduled),
            _ => Err(AppError::Database(format!("Invalid reveal type: {}", s))),
        }
    }

    fn reveal_type_to_str(reveal_type: &RevealType) -> &'static str {
        match reveal_type {
            RevealType::Instant => "instant",
            RevealType::Scheduled => "scheduled",
        }
    }

    fn parse_steps(s: &str) -> Result<Vec<WizardStep>> {
        let names: Vec<String> = parse_json(s)?;
        names
            .iter()
            .map(|name| {
                WizardStep::from_str(name)
                    .ok_or_else(|| AppError::Database(format!("Invalid wizard step: {}", name)))
            })
            .collect()
    }

    fn steps_to_json(steps: &[WizardStep]) -> Result<String> {
        let names: Vec<&str> = steps.iter().map(|s| s.as_str()).collect();
        to_json(&names)
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<Moment>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, MomentRow>(&format!(
            "SELECT {} FROM moments WHERE id = ?",
            MOMENT_COLUMNS
        ))
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_moment(r)?)),
            None => Ok(None),
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| AppError::Database(e.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| AppError::Database(e.to_string()))
}

#[async_trait]
impl MomentRepository for SqliteMomentRepository {
    async fn create(&self, owner_id: &str, request: CreateMomentRequest) -> Result<Moment> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let plan = request.plan.unwrap_or_else(|| "base".to_string());

        let id_str = id.to_string();
        let now_naive = now.naive_utc();
        let empty_list = "[]";

        sqlx::query(
            r#"
            INSERT INTO moments (
                id, owner_id, recipient_name, occasion, is_anonymous,
                memories, media, plan, addons, reveal_type, status,
                is_paid, paid_amount, paid_addons, completed_steps,
                view_count, created_at, updated_at
            ) VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?, 'instant', 'Draft', 0, 0, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(owner_id)
        .bind(&request.recipient_name)
        .bind(&request.occasion)
        .bind(empty_list)
        .bind(empty_list)
        .bind(&plan)
        .bind(empty_list)
        .bind(empty_list)
        .bind(empty_list)
        .bind(now_naive)
        .bind(now_naive)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.fetch_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created moment".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Moment>> {
        self.fetch_by_id(id).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Moment>> {
        let row = sqlx::query_as::<_, MomentRow>(&format!(
            "SELECT {} FROM moments WHERE url_slug = ? LIMIT 1",
            MOMENT_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_moment(r)?)),
            None => Ok(None),
        }
    }

    async fn list_by_owner(&self, owner_id: &str, limit: i64, offset: i64) -> Result<Vec<Moment>> {
        let rows = sqlx::query_as::<_, MomentRow>(&format!(
            "SELECT {} FROM moments WHERE owner_id = ? ORDER BY updated_at DESC LIMIT ? OFFSET ?",
            MOMENT_COLUMNS
        ))
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_moment).collect()
    }

    async fn update(&self, id: Uuid, update: MomentUpdate) -> Result<Moment> {
        let _existing = self
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Moment not found".to_string()))?;

        let now = Utc::now();
        let id_str = id.to_string();
        let now_naive = now.naive_utc();

        let memories_json = update.memories.as_ref().map(|m| to_json(m)).transpose()?;
        let media_json = update.media.as_ref().map(|m| to_json(m)).transpose()?;
        let music_json = update.music.as_ref().map(|m| to_json(m)).transpose()?;
        let addons_json = update.addons.as_ref().map(|a| to_json(a)).transpose()?;
        let steps_json = update
            .completed_steps
            .as_ref()
            .map(|s| Self::steps_to_json(s))
            .transpose()?;
        let status_str = update.status.as_ref().map(Self::status_to_str);
        let reveal_type_str = update.reveal_type.as_ref().map(Self::reveal_type_to_str);
        let reveal_at_naive = update.reveal_at.map(|dt| dt.naive_utc());
        let last_step_str = update.last_step.map(|s| s.as_str());

        sqlx::query(
            r#"
            UPDATE moments
            SET url_slug = COALESCE(?, url_slug),
                recipient_name = COALESCE(?, recipient_name),
                sender_name = COALESCE(?, sender_name),
                is_anonymous = COALESCE(?, is_anonymous),
                occasion = COALESCE(?, occasion),
                message = COALESCE(?, message),
                memories = COALESCE(?, memories),
                media = COALESCE(?, media),
                theme = COALESCE(?, theme),
                music = COALESCE(?, music),
                plan = COALESCE(?, plan),
                addons = COALESCE(?, addons),
                reveal_type = COALESCE(?, reveal_type),
                reveal_at = COALESCE(?, reveal_at),
                face_lock_image_url = COALESCE(?, face_lock_image_url),
                status = COALESCE(?, status),
                completed_steps = COALESCE(?, completed_steps),
                last_step = COALESCE(?, last_step),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.url_slug)
        .bind(&update.recipient_name)
        .bind(&update.sender_name)
        .bind(update.is_anonymous.map(|b| if b { 1i32 } else { 0i32 }))
        .bind(&update.occasion)
        .bind(&update.message)
        .bind(&memories_json)
        .bind(&media_json)
        .bind(&update.theme)
        .bind(&music_json)
        .bind(&update.plan)
        .bind(&addons_json)
        .bind(reveal_type_str)
        .bind(reveal_at_naive)
        .bind(&update.face_lock_image_url)
        .bind(status_str)
        .bind(&steps_json)
        .bind(last_step_str)
        .bind(now_naive)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed: moments.url_slug") {
                AppError::Conflict("That URL is already taken".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })?;

        self.fetch_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve updated moment".to_string()))
    }

    async fn apply_payment(&self, id: Uuid, event: PaymentEvent) -> Result<PaymentApplication> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // The UNIQUE reference column is the idempotency guard: a
        // replayed reference inserts zero rows and must not credit the
        // moment a second time.
        let inserted = sqlx::query(
            r#"
            INSERT INTO payment_events (id, moment_id, reference, amount, currency, paid_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(reference) DO NOTHING
            "#,
        )
        .bind(event.id.to_string())
        .bind(event.moment_id.to_string())
        .bind(&event.reference)
        .bind(event.amount)
        .bind(&event.currency)
        .bind(event.paid_at.naive_utc())
        .bind(event.created_at.naive_utc())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if inserted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            let moment = self
                .fetch_by_id(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Moment not found".to_string()))?;
            return Ok(PaymentApplication { moment, already_applied: true });
        }

        let id_str = id.to_string();
        let row = sqlx::query_as::<_, MomentRow>(&format!(
            "SELECT {} FROM moments WHERE id = ?",
            MOMENT_COLUMNS
        ))
        .bind(&id_str)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let moment = match row {
            Some(r) => Self::row_to_moment(r)?,
            None => {
                tx.rollback()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                return Err(AppError::NotFound("Moment not found".to_string()));
            }
        };

        // Addons covered by this payment: everything selected at
        // confirmation time, merged into what was already paid for.
        let mut paid_addons = moment.effective_addons();
        paid_addons.sort();
        paid_addons.dedup();

        let mut completed = moment.completed_steps.clone();
        if !completed.contains(&WizardStep::Pay) {
            completed.push(WizardStep::Pay);
        }

        let now_naive = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE moments
            SET status = 'Published',
                is_paid = 1,
                paid_amount = paid_amount + ?,
                paid_currency = ?,
                paid_addons = ?,
                completed_steps = ?,
                last_step = 'pay',
                published_at = COALESCE(published_at, ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(event.amount)
        .bind(&event.currency)
        .bind(to_json(&paid_addons)?)
        .bind(Self::steps_to_json(&completed)?)
        .bind(now_naive)
        .bind(now_naive)
        .bind(&id_str)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let moment = self
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve published moment".to_string()))?;

        Ok(PaymentApplication { moment, already_applied: false })
    }

    async fn increment_views(&self, id: Uuid) -> Result<()> {
        let id_str = id.to_string();
        sqlx::query("UPDATE moments SET view_count = view_count + 1 WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let id_str = id.to_string();
        sqlx::query("DELETE FROM moments WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
