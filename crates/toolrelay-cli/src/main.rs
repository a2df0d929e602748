use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;
mod logging;
mod prompt;
mod render;
mod session;

use toolrelay::orchestrator::DEFAULT_MAX_ITERATIONS;
use toolrelay::providers::configs::{
    AnthropicProviderConfig, ANTHROPIC_HOST, ANTHROPIC_MAX_TOKENS, ANTHROPIC_MODEL,
};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/mcp";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Use the available tools whenever they help answer the user.";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// URL of the remote MCP server
    #[arg(long, global = true, env = "MCP_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    model: ModelArgs,

    #[command(flatten)]
    exchange: ExchangeArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Settings for the Anthropic messages api
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Anthropic API key
    #[arg(long, global = true, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model to use
    #[arg(short, long, global = true, env = "ANTHROPIC_MODEL", default_value = ANTHROPIC_MODEL)]
    model: String,

    /// Maximum tokens per model response
    #[arg(long, global = true, env = "ANTHROPIC_MAX_TOKENS", default_value_t = ANTHROPIC_MAX_TOKENS)]
    max_tokens: i32,

    /// Base url of the messages api
    #[arg(long, global = true, env = "ANTHROPIC_HOST", default_value = ANTHROPIC_HOST)]
    anthropic_host: String,

    /// Value for the anthropic-beta header
    #[arg(long, global = true, env = "ANTHROPIC_BETA")]
    beta: Option<String>,

    /// Sampling temperature
    #[arg(long, global = true)]
    temperature: Option<f32>,
}

impl ModelArgs {
    pub fn provider_config(&self) -> Result<AnthropicProviderConfig> {
        let api_key = self.api_key.clone().filter(|key| !key.is_empty()).ok_or_else(|| {
            anyhow::anyhow!("API key must be provided via --api-key or ANTHROPIC_API_KEY")
        })?;

        let mut config = AnthropicProviderConfig::new(api_key, self.model.clone());
        config.host = self.anthropic_host.clone();
        config.max_tokens = self.max_tokens;
        config.beta = self.beta.clone();
        config.temperature = self.temperature;
        Ok(config)
    }
}

/// Settings for the tool loop
#[derive(Args, Debug, Clone)]
pub struct ExchangeArgs {
    /// System prompt sent with every model call
    #[arg(long, global = true, env = "TOOLRELAY_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    system: String,

    /// Maximum number of tool rounds per query
    #[arg(long, global = true, env = "TOOLRELAY_MAX_ITERATIONS", default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Chat with the model using the server's tools (the default)
    Chat {
        /// Run a single query and exit
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Run a fixed set of sample queries
    Samples,

    /// Show the server's details and tools, optionally calling one tool directly
    Inspect {
        /// Name of a tool to call
        #[arg(long)]
        call: Option<String>,

        /// JSON arguments for the tool call
        #[arg(long, default_value = "{}", requires = "call")]
        args: String,
    },

    /// Check that the server answers plain HTTP and a raw initialize request
    Probe {
        /// Request timeout in seconds
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },

    /// Send a single greeting to the model, without tools
    Ping,

    /// Relay JSON-RPC between stdio and the HTTP server
    Proxy,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let Cli {
        server_url,
        verbose,
        model,
        exchange,
        command,
    } = Cli::parse();

    logging::init(verbose);

    match command.unwrap_or(Command::Chat { query: None }) {
        Command::Chat { query } => {
            commands::chat::run(&server_url, &model, &exchange, query).await
        }
        Command::Samples => commands::samples::run(&server_url, &model, &exchange).await,
        Command::Inspect { call, args } => {
            commands::inspect::run(&server_url, call.as_deref(), &args).await
        }
        Command::Probe { timeout } => commands::probe::run(&server_url, timeout).await,
        Command::Ping => commands::ping::run(&model).await,
        Command::Proxy => commands::proxy::run(&server_url).await,
    }
}
