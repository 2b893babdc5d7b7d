use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ragchat_core::{Config, ConversationStore, HttpAnswerClient, Orchestrator, Role};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(about = "Chat with a RAG question-answering service from the terminal")]
struct Cli {
    /// Base URL of the answering service (overrides config and RAGCHAT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory for exported transcripts
    #[arg(long, global = true)]
    export_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply
    Ask {
        /// Your question
        question: String,
    },
    /// Check whether the answering service is up
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = init_logging()?;

    let config = Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url.as_deref());
    let client = HttpAnswerClient::with_timeout(&api_url, config.request_timeout())?;
    tracing::info!("Using answering service at {}", api_url);

    match cli.command {
        None => {
            let export_dir = cli.export_dir.unwrap_or_else(|| config.export_dir());
            run_tui(client, api_url, export_dir).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Ask { question }) => ask_once(client, question).await,
        Some(Commands::Health) => check_health(client, &api_url).await,
    }
}

/// Log to a daily file; the terminal belongs to the UI
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ragchat")
        .join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "ragchat.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

async fn run_tui(client: HttpAnswerClient, api_url: String, export_dir: PathBuf) -> Result<()> {
    let orchestrator = Orchestrator::new(Arc::new(client.clone()));
    let mut app = App::new(orchestrator, api_url, export_dir);
    app.start_health_check(client);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new(Duration::from_millis(300));

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    tracing::info!("Exiting after {} messages", app.store.len());
    result
}

async fn ask_once(client: HttpAnswerClient, question: String) -> Result<ExitCode> {
    let orchestrator = Orchestrator::new(Arc::new(client));
    let mut store = ConversationStore::new();
    let mut input = question;

    let Some(role) = orchestrator.ask(&mut store, &mut input).await else {
        eprintln!("Nothing to ask: the question is empty");
        return Ok(ExitCode::FAILURE);
    };

    if let Some(reply) = store.last() {
        match role {
            Role::Assistant => println!("{}", reply.content()),
            _ => eprintln!("{}", reply.content()),
        }
    }

    Ok(if role == Role::Assistant { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn check_health(client: HttpAnswerClient, api_url: &str) -> Result<ExitCode> {
    match client.health().await {
        Ok(health) => {
            println!(
                "{} {} ({} {})",
                api_url,
                health.status,
                health.service.as_deref().unwrap_or("unknown service"),
                health.version.as_deref().unwrap_or("unknown version"),
            );
            Ok(if health.is_healthy() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Err(e) => {
            eprintln!("{} unreachable: {}", api_url, e);
            Ok(ExitCode::FAILURE)
        }
    }
}
