use loan_desk::{
    agent::WorkflowOrchestrator,
    agents::create_default_registry,
    analytics::cash_flow_charts,
    config::Config,
    execution::ExecutionEngine,
    models::{AgentStage, LoanStatus},
    query::{applications_for_stage, format_currency, portfolio_summary},
    state::{InMemoryPortfolioStore, PortfolioStore},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Loan Desk starting");

    let store = InMemoryPortfolioStore::generate(config.population_size, config.population_seed);
    let population = store.population_info().await;
    let applications = store.list_applications(None, None).await?;

    // === PORTFOLIO SUMMARY ===
    let summary = portfolio_summary(&applications);
    println!("\n=== PORTFOLIO (seed {}) ===", population.seed);
    println!("Applications:   {}", summary.total_applications);
    println!("In process:     {}", summary.in_process);
    println!("Decided:        {}", summary.decided);
    println!("Approval rate:  {}", summary.approval_rate_display);
    println!("Total volume:   {}", summary.total_amount_display);
    println!("Average amount: {}", format_currency(summary.average_amount));

    println!("\nBy status:");
    for (status, count) in &summary.by_status {
        println!("  {:<20} {}", status.display_status(), count);
    }

    println!("\nAgent queues:");
    for stage in AgentStage::ALL {
        println!(
            "  {:<20} {}",
            stage.as_str(),
            applications_for_stage(&applications, stage).len()
        );
    }

    // === WORKFLOW DEMO ===
    let Some(candidate) = applications
        .iter()
        .find(|app| app.status == LoanStatus::Underwriting)
        .or_else(|| applications.first())
    else {
        println!("\nEmpty population; nothing to review.");
        return Ok(());
    };

    let analysis = store.cash_flow_analysis(&candidate.id).await?;
    let charts = cash_flow_charts(&analysis);

    println!("\n=== CASH FLOW: {} ===", candidate.id);
    println!("Borrower:       {}", candidate.borrower.display_name());
    println!("Amount:         {}", format_currency(candidate.amount));
    println!("DSCR:           {:.2}x", analysis.projections.debt_service_coverage_ratio);
    println!("Health:         {}", analysis.cash_flow_health);
    for entry in &charts.source_breakdown {
        println!("  {:<20} {:>3}%  {}", entry.name, entry.percentage, format_currency(entry.value));
    }

    let engine = ExecutionEngine::new(create_default_registry(), Duration::ZERO);
    let orchestrator = WorkflowOrchestrator::new(Arc::new(engine));

    info!(application_id = %candidate.id, "Running workflow");

    match orchestrator.run(candidate, Some(&analysis)).await {
        Ok(result) => {
            println!("\n=== WORKFLOW RESULT ===");
            println!("Workflow ID: {}", result.workflow_id);
            println!("Decision:    {}", result.recommended_decision.target_status().display_status());
            println!("Risk Level:  {}", result.risk_summary);
            println!("Score:       {}", result.score);
            println!("\nReasoning Trace:");
            for (i, trace) in result.reasoning_trace.iter().enumerate() {
                println!("  {}: {}", i + 1, trace);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Workflow failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
