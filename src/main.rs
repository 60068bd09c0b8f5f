use dotenvy::dotenv;
use log::info;

use zued_storefront::{
    config::Config,
    create_router,
    database::create_database_pool,
    store::PgStore,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = Config::from_env()?;

    let db = create_database_pool(&config.database_url).await?;
    let store = PgStore::new(db);
    store.init_schema().await?;

    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState::new(store, config));

    info!("ZUED storefront API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
