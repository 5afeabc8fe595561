use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use webpilot::config::AgentConfig;
use webpilot::face;
use webpilot::llm::{LlmClient, OpenAiClient};

#[derive(Parser, Debug)]
#[command(name = "webpilot", about = "LLM-driven autonomous browser agent")]
struct Args {
    /// Address to bind the web console on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind; the next nine are tried if it is taken.
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Show the browser window instead of running headless.
    #[arg(long)]
    headed: bool,

    /// Model to use for decisions and extraction.
    #[arg(long, env = "WEBPILOT_MODEL")]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("webpilot=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = AgentConfig::from_env();
    if args.headed {
        config.headless = false;
    }
    if let Some(model) = args.model {
        config.model = model;
    }

    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::from_env(config.model.clone())?);
    tracing::info!(model = %config.model, headless = config.headless, "starting webpilot");

    face::serve(&args.host, args.port, config, llm).await
}
