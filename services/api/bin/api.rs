//! Main Entrypoint for the Study Partner API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading the persona prompt and the scenario from the prompts directory.
//! 3. Initializing the generation runtime and the case database clients.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use std::{collections::HashMap, fs, net::SocketAddr, sync::Arc};
use study_partner_api::{
    config::Config, router::create_router, state::AppState, store::SessionStore,
};
use study_partner_core::{
    case_db::{CaseFactSource, HttpCaseDatabase, StaticCaseDatabase},
    conductor::Conductor,
    generic_types::GenerationSettings,
    llm_client::OpenAICompatibleClient,
    scenario::Scenario,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// A helper function to load prompts from a directory.
fn load_prompts(prompts_path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for entry in fs::read_dir(prompts_path)
        .with_context(|| format!("Could not read prompts directory {}", prompts_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Load Persona and Scenario ---
    let prompts = load_prompts(&config.prompts_path)?;
    let persona = prompts
        .get("system_prompt")
        .context("system_prompt.md not found in prompts directory")?
        .clone();
    let scenario = Scenario::parse(
        prompts
            .get("scenario")
            .context("scenario.md not found in prompts directory")?,
    )
    .context("Invalid scenario.md")?;
    info!(
        subject = %scenario.subject,
        options = scenario.options.len(),
        "Scenario loaded."
    );

    // --- 4. Initialize Collaborators ---
    let api_key = config
        .api_key()
        .context("No API key configured for the selected provider")?;
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(config.provider.api_base());
    let llm_client = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
        config.temperature,
    ));

    let cases: Arc<dyn CaseFactSource> = match &config.case_db_url {
        Some(url) => {
            info!(url = %url, "Using case database.");
            Arc::new(HttpCaseDatabase::new(url.clone()))
        }
        None => {
            warn!("CASE_DB_URL is not set; elaboration will run without case content.");
            Arc::new(StaticCaseDatabase::empty())
        }
    };

    let conductor = Arc::new(Conductor::new(
        llm_client,
        cases,
        persona,
        GenerationSettings::default(),
    ));

    let app_state = Arc::new(AppState {
        store: Arc::new(SessionStore::new()),
        conductor,
        scenario: Arc::new(scenario),
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        temperature = config.temperature,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
