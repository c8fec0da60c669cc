use anyhow::Context;

use bazaar_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    bazaar_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = bazaar_api::app::build_app(&config)
        .await
        .context("failed to initialise services")?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
