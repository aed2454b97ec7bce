use chrono::{Duration, Utc};
use clap::Parser;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::{FirstName, Name};
use fake::Fake;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use supriseal::{
    domain::{CreateMomentRequest, PaymentEvent, WizardStep},
    repository::{MomentRepository, SqliteMomentRepository},
};

#[derive(Parser)]
#[command(about = "Seed the database with demo moments")]
struct Args {
    /// Database to seed
    #[arg(long, default_value = "sqlite:supriseal.db")]
    database_url: String,

    /// How many moments to create
    #[arg(long, default_value_t = 12)]
    count: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("🌱 Starting database seeding...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    // Run migrations first
    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let moment_repo = SqliteMomentRepository::new(db_pool.clone());

    println!("🎉 Creating moments...");

    for i in 0..args.count {
        let recipient: String = FirstName().fake();
        let sender: String = Name().fake();
        let message: String = Sentence(8..20).fake();

        let moment = moment_repo
            .create(
                &format!("demo-user-{}", i % 3),
                CreateMomentRequest {
                    recipient_name: recipient.clone(),
                    occasion: Some(occasion_for(i).to_string()),
                    plan: Some(if i % 4 == 0 { "premium" } else { "base" }.to_string()),
                },
            )
            .await?;

        // Walk a few through the wizard so the dashboard has variety.
        if i % 3 != 0 {
            moment_repo
                .update(
                    moment.id,
                    supriseal::domain::MomentUpdate {
                        sender_name: Some(sender),
                        message: Some(message),
                        completed_steps: Some(vec![
                            WizardStep::Recipient,
                            WizardStep::Message,
                        ]),
                        last_step: Some(WizardStep::Message),
                        status: Some(supriseal::domain::MomentStatus::Configuring),
                        ..Default::default()
                    },
                )
                .await?;
        }

        // Publish a third of them through the real payment path.
        if i % 3 == 2 {
            let now = Utc::now();
            moment_repo
                .apply_payment(
                    moment.id,
                    PaymentEvent {
                        id: Uuid::new_v4(),
                        moment_id: moment.id,
                        reference: format!("seed-ref-{}", i),
                        amount: 400,
                        currency: "USD".to_string(),
                        paid_at: now - Duration::minutes(i as i64),
                        created_at: now,
                    },
                )
                .await?;
            println!("  📬 Published moment for {}", recipient);
        } else {
            println!("  ✏️  Draft moment for {}", recipient);
        }
    }

    println!("✅ Seeded {} moments", args.count);

    Ok(())
}

fn occasion_for(i: usize) -> &'static str {
    const OCCASIONS: &[&str] = &["Birthday", "Anniversary", "Graduation", "Promotion"];
    OCCASIONS[i % OCCASIONS.len()]
}
