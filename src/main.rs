use std::sync::Arc;

use tracing::info;

use imoveis_importer::app::import_use_case::ImportUseCase;
use imoveis_importer::config::Config;
use imoveis_importer::observability::logging::init_logging;
use imoveis_importer::server::router::app_router;
use imoveis_importer::server::state::AppState;
use imoveis_importer::storage::PgListingStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    init_logging();

    let cfg = Config::from_env()?;

    info!("connecting to Postgres at {}:{}", cfg.db_host, cfg.db_port);
    let store = PgListingStore::connect(&cfg.database_url()).await?;
    store.apply_schema().await?;

    let importer = ImportUseCase::new(
        Arc::new(store),
        cfg.mapping_error_policy,
        cfg.storage_timeout,
    );

    let state = AppState {
        importer: Arc::new(importer),
        max_upload_bytes: cfg.max_upload_bytes,
    };
    let app = app_router(state);

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("feed importer listening on {bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
