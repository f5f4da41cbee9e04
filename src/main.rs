use anyhow::Context;
use bookstore_app::modules::{self, books::repository};
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookstore settings")?;

    bookstore_telemetry::init(&settings.telemetry)
        .with_context(|| "failed to initialize telemetry")?;

    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.database.backend,
        db = %settings.database.name,
        "bookstore bootstrap starting"
    );

    let books = repository::open(&settings.database)
        .await
        .with_context(|| "failed to open the book store")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, books);

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    tracing::info!("bookstore bootstrap complete");

    let served =
        bookstore_http::start_server(&registry, &settings, bookstore_http::shutdown_signal()).await;

    registry.stop_modules().await?;
    served
}
