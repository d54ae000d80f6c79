use tracing_subscriber::{EnvFilter, FmtSubscriber};
use voxline::config::Config;
use voxline::transport::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("voxline booting...");

    // 2. Configuration
    let config = Config::load()?;
    let bind_addr = config.server.bind_addr.clone();
    tracing::info!(
        silence_timeout_ms = config.pipeline.silence_timeout_ms,
        denoise = config.pipeline.denoise,
        "pipeline configuration loaded"
    );
    if config.tts.api_key.trim().is_empty() {
        tracing::warn!("tts.api_key is not set; calls will be refused at connect time");
    }

    // 3. Serve webhook + media websocket
    let state = AppState::new(config);
    let app = transport::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
