use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use codeport::config::Config;
use codeport::llm::LLMFactory;
use codeport::routes;
use codeport::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("codeport=debug,tower_http=debug")),
        )
        .init();

    // Load configuration - first file that parses wins, defaults otherwise
    let mut config = None;
    for path in Config::candidate_paths() {
        if !path.exists() {
            continue;
        }
        match Config::load(&path) {
            Ok(cfg) => {
                info!("Loaded configuration from: {}", path.display());
                config = Some(cfg);
                break;
            }
            Err(e) => debug!("Failed to load config from {}: {:#}", path.display(), e),
        }
    }
    let config = config.unwrap_or_else(|| {
        info!("No configuration file found, using defaults");
        Config::default()
    });

    // Refuse to start without a credential
    let llm_config = &config.llm_config;
    let api_key = llm_config.resolve_api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "API key not set: export {} or set llm_config.api_key",
            llm_config.api_key_env
        )
    })?;
    let llm = LLMFactory::create_llm(llm_config, api_key)?;

    let app_state = AppState::new(config.clone(), llm);
    let app = routes::app(app_state);

    let addr = format!("{}:{}", config.system_config.host, config.system_config.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
