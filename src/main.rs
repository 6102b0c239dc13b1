use covid_sms_bot::{config::AppConfig, startup::build_router, telemetry::init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    let app = build_router(&config);
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening for inbound sms on /sms");
    axum::serve(listener, app).await?;
    Ok(())
}
