use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wifto_backend::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wifto_backend=info,server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load();
    let addr = config.addr();

    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Upload directory: {}", config.upload_dir.display());

    let app = wifto_backend::app(config)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Backend running on http://{}", addr);
    tracing::info!("   POST /api/register - Create an account");
    tracing::info!("   POST /api/login    - Check credentials");
    tracing::info!("   POST /api/upload   - Upload a file, image or text");
    tracing::info!("   GET  /api/uploads  - List uploads, newest first");
    tracing::info!("   GET  /uploads/*    - Fetch a stored file");

    axum::serve(listener, app).await?;

    Ok(())
}
