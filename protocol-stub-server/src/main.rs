use protocol_stub_server::{StubBackend, create_app};
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "5000".to_string())
        .parse::<u16>()
        .unwrap_or(5000);

    let (app, _recorder) = create_app(StubBackend::default());
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    let addr = listener.local_addr()?;

    info!("Protocol analyzer stub backend starting on {}", addr);
    info!("Health check endpoint: http://{}/api/health", addr);
    info!("Upload endpoint: POST http://{}/api/upload", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
