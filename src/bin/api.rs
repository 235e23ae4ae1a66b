use loan_desk::{
    agent::WorkflowOrchestrator,
    agents::create_default_registry,
    api::{start_server, ApiState},
    config::Config,
    execution::ExecutionEngine,
    state::InMemoryPortfolioStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (reads .env)
    let config = Config::from_env()?;

    // Initialize tracing; RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Loan Desk - API Server");
    info!(
        port = config.port,
        population_size = config.population_size,
        seed = ?config.population_seed,
        agent_latency_ms = config.agent_latency.as_millis() as u64,
        "Configuration loaded"
    );

    // Create components
    let store = Arc::new(InMemoryPortfolioStore::generate(
        config.population_size,
        config.population_seed,
    ));
    let info = store.population_info().await;
    info!(count = info.count, seed = info.seed, "Population generated");

    let engine = ExecutionEngine::new(create_default_registry(), config.agent_latency);
    let orchestrator = Arc::new(WorkflowOrchestrator::new(Arc::new(engine)));

    let state = ApiState {
        store,
        orchestrator,
        default_population_size: config.population_size,
    };

    info!("Starting API server...");
    start_server(state, config.port).await?;

    Ok(())
}
