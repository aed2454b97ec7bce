use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use supriseal::{
    api,
    config::Settings,
    gateways::{GenerativeVisionComparator, IpApiGeoLocator, PaystackGateway},
    repository::{SqliteMomentRepository, SqlitePaymentRepository},
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "supriseal=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration. Missing gateway credentials are fatal here,
    // at boot, rather than a silent null checked before every call.
    let settings = Settings::new()?;

    tracing::info!(
        "Starting Supriseal server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    // Initialize repositories
    let moment_repo = Arc::new(SqliteMomentRepository::new(db_pool.clone()));
    let payment_repo = Arc::new(SqlitePaymentRepository::new(db_pool.clone()));

    // Outbound integrations
    let payment_gateway = Arc::new(PaystackGateway::new(&settings.paystack)?);
    let face_comparator = Arc::new(GenerativeVisionComparator::new(&settings.vision)?);
    let geo_locator = Arc::new(IpApiGeoLocator::new(&settings.geo)?);

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        moment_repo,
        payment_repo,
        payment_gateway,
        face_comparator,
        geo_locator,
        db_pool.clone(),
    ));

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        settings.server.host, settings.server.port
    ))
    .await?;

    tracing::info!(
        "Server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
