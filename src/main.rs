mod cli;
mod qa_client;

use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use crate::cli::chat::html::SanitizePolicy;
use crate::cli::chat::speech::CommandDictation;
use crate::cli::chat::{ChatContext, ChatOptions};
use crate::qa_client::QaClient;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Question to ask without entering the interactive shell
    #[arg(short, long)]
    input: Option<String>,

    /// Start against the UNA news API instead of the answers API
    #[arg(short, long)]
    news: bool,

    /// Show a suggestion list at most once until one is picked
    #[arg(long)]
    suppress_repeat_suggestions: bool,

    /// Strip HTML tags from bot replies instead of printing raw markup
    #[arg(long)]
    strip_html: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat {
        /// Question to ask without entering the interactive shell
        #[arg(short, long)]
        input: Option<String>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let (input, verbose) = match cli.command {
        Some(Commands::Chat { input, verbose }) => (input, verbose),
        None => (cli.input, cli.verbose),
    };

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Starting UNA Chat CLI");

    let service = match QaClient::new() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to initialize the UNA client: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let options = ChatOptions {
        input,
        interactive: true,
        news_mode: cli.news,
        suppress_repeat_suggestions: cli.suppress_repeat_suggestions,
        sanitize: if cli.strip_html {
            SanitizePolicy::StripTags
        } else {
            SanitizePolicy::Raw
        },
    };

    let mut chat_context = ChatContext::new(
        Box::new(io::stdout()),
        Box::new(service),
        Box::new(CommandDictation::from_env()),
        options,
    );
    chat_context.run().await
}
