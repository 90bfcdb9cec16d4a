use aegis_orchestrator::config::Config;
use aegis_orchestrator::models::{Intent, IntentContext, IntentType, Priority};
use aegis_orchestrator::Orchestrator;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "aegis-orchestrator", about = "Run a single intent through the orchestration core")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyse an intent and print the resulting task plan, without an agent registered.
    Analyze {
        #[arg(long, value_enum)]
        intent_type: IntentTypeArg,
        #[arg(long)]
        action: String,
        #[arg(long)]
        session: String,
    },
}

#[derive(Clone, clap::ValueEnum)]
enum IntentTypeArg {
    Lending,
    Liquidity,
    Portfolio,
    Trading,
    Analysis,
    Info,
    Risk,
}

impl From<IntentTypeArg> for IntentType {
    fn from(value: IntentTypeArg) -> Self {
        match value {
            IntentTypeArg::Lending => IntentType::Lending,
            IntentTypeArg::Liquidity => IntentType::Liquidity,
            IntentTypeArg::Portfolio => IntentType::Portfolio,
            IntentTypeArg::Trading => IntentType::Trading,
            IntentTypeArg::Analysis => IntentType::Analysis,
            IntentTypeArg::Info => IntentType::Info,
            IntentTypeArg::Risk => IntentType::Risk,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let orchestrator = Orchestrator::new(&config)?;

    match cli.command {
        Command::Analyze { intent_type, action, session } => {
            let intent = Intent::new(
                intent_type.into(),
                action,
                HashMap::new(),
                IntentContext::new(session),
                Priority::Medium,
            );
            let analyzed = orchestrator.analyze_intent(intent).await?;
            info!(
                confidence = analyzed.confidence,
                complexity = ?analyzed.estimated_complexity,
                "intent analysed"
            );
            println!("{}", serde_json::to_string_pretty(&analyzed)?);
        }
    }

    orchestrator.stop().await;
    Ok(())
}
