mod agent;
mod ai_sdk;
mod client;
mod command;
mod protocol;
mod search;
mod server;
mod session;
mod ui;

use clap::{Parser, Subcommand};
use client::{ClientConfig, RelayClient};
use protocol::Provider;
use session::Session;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "relay",
    about = "Chat relay between a terminal client and an LLM agent server"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve POST /chat and forward requests to the configured providers
    Server {
        #[arg(long, env = "RELAY_LISTEN", default_value = "127.0.0.1:9999")]
        listen: String,

        #[arg(long, env = "GROQ_BASE_URL", default_value = agent::DEFAULT_GROQ_BASE_URL)]
        groq_base_url: String,

        #[arg(long, env = "OPENAI_BASE_URL", default_value = agent::DEFAULT_OPENAI_BASE_URL)]
        openai_base_url: String,

        #[arg(long, env = "TAVILY_BASE_URL", default_value = search::DEFAULT_TAVILY_BASE_URL)]
        tavily_base_url: String,
    },
    /// Interactive terminal chat against a running server
    Client {
        #[arg(long, env = "RELAY_SERVER", default_value = "http://127.0.0.1:9999")]
        server: String,

        /// Groq or OpenAI
        #[arg(long, env = "RELAY_PROVIDER", default_value = "Groq", value_parser = parse_provider)]
        provider: Provider,

        /// Defaults to the provider's first model
        #[arg(long, env = "RELAY_MODEL")]
        model: Option<String>,

        /// "Act as" instructions, e.g. "AI Tutor"
        #[arg(long, env = "RELAY_ACT_AS", default_value = "")]
        act_as: String,

        /// Allow the agent to use web search
        #[arg(long, env = "RELAY_SEARCH")]
        search: bool,

        #[arg(long, env = "RELAY_TIMEOUT_SECS", default_value_t = client::DEFAULT_TIMEOUT.as_secs())]
        timeout_secs: u64,

        /// Extra attempts after a connection failure or timeout
        #[arg(long, env = "RELAY_RETRIES", default_value_t = 0)]
        retries: u32,
    },
}

fn parse_provider(value: &str) -> Result<Provider, String> {
    Provider::parse(value)
        .ok_or_else(|| format!("unknown provider {:?}, expected Groq or OpenAI", value))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Server {
            listen,
            groq_base_url,
            openai_base_url,
            tavily_base_url,
        } => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .init();
            server::run(server::ServerConfig {
                listen,
                groq_base_url,
                openai_base_url,
                tavily_base_url,
            })
            .await
        }
        Command::Client {
            server,
            provider,
            model,
            act_as,
            search,
            timeout_secs,
            retries,
        } => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
                .init();
            let mut session = Session::new(provider);
            if let Some(model) = model {
                session.set_model(&model)?;
            }
            session.set_act_as(act_as);
            session.set_allow_search(search);

            let client = RelayClient::new(ClientConfig {
                base_url: server,
                timeout: Duration::from_secs(timeout_secs),
                retries,
            })?;
            log::info!("session {} using {}", session.id(), client.base_url());

            ui::run_tui(session, client)
        }
    }
}
