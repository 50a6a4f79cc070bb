use agentic_rag_orchestrator::{
    agent::Orchestrator,
    config::AppConfig,
    llm::{GroqClient, LanguageModel},
    logging::init_logging,
    models::DEFAULT_SESSION_ID,
};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

/// Answer one question from the knowledge base or the quote source
#[derive(Parser, Debug)]
#[command(name = "orchestrator")]
#[command(about = "Route a query to knowledge-base search or a stock quote", long_about = None)]
#[command(version)]
struct Args {
    /// Conversation session scoping chat history
    #[arg(short, long, default_value = DEFAULT_SESSION_ID)]
    session: String,

    /// The question; every word after the first belongs to it
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    query: Vec<String>,
}

impl Args {
    fn query_text(&self) -> String {
        self.query.join(" ")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_logging(config.log_level.as_deref())?;

    let model: Arc<dyn LanguageModel> = Arc::new(GroqClient::new(&config.llm)?);
    let orchestrator = Orchestrator::from_config(&config, model)?;

    info!(
        session_id = %args.session,
        mode = %orchestrator.mode(),
        "Running query"
    );

    let response = orchestrator.run(&args.query_text(), &args.session).await;
    println!("{}", response);

    Ok(())
}
