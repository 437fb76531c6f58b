use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pdfchat_api::{build_router, config::Config, state::AppState};
use pdfchat_graph::{OrchestratorConfig, PdfExtractor, SessionController, TurnOrchestrator};
use pdfchat_llm::{ClientFactory, ProviderConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Fails without GOOGLE_API_KEY
    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting pdfchat API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    tracing::info!(model = %config.llm.model, base_url = %config.llm.base_url, "Initializing LLM client");
    let client = ClientFactory::create_chat_client(
        ProviderConfig::new(config.google_api_key.clone()).with_base_url(config.llm.base_url.clone()),
    )?;

    let orchestrator = TurnOrchestrator::new(client, OrchestratorConfig::from(&config.llm));
    let session = SessionController::new(orchestrator, Arc::new(PdfExtractor));

    let state = Arc::new(AppState::new(config.clone(), session));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
