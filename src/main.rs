use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docrag::config::Config;
use docrag::server::{AppContext, router};
use docrag::sessions::{NoopSessionSink, PgSessionSink, SessionSink};
use docrag::types::RagError;

#[tokio::main]
async fn main() -> Result<(), RagError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    // Session logging is best-effort: an unreachable or unconfigured database
    // downgrades the sink to a no-op instead of blocking startup.
    let sink: Arc<dyn SessionSink> = match &config.database_url {
        Some(url) => match PgSessionSink::connect(url).await {
            Ok(sink) => Arc::new(sink),
            Err(err) => {
                warn!(error = %err, "session log database unavailable, logging disabled");
                Arc::new(NoopSessionSink)
            }
        },
        None => {
            warn!("DATABASE_URL not set, session logging disabled");
            Arc::new(NoopSessionSink)
        }
    };

    let context = Arc::new(AppContext::build(&config, sink)?);
    let app = router(context);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, collection = %config.collection_name, "serving RAG API");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
}
