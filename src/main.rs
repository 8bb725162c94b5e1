use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arogya_mitra::app::App;
use arogya_mitra::chat::{Outcome, QUICK_QUESTIONS};
use arogya_mitra::config::Config;
use arogya_mitra::{handler, tui, ui, AskClient, ChatExchange, Document};

#[derive(Parser)]
#[command(name = "arogya")]
#[command(version, about = "Chat with Arogya Mitra, your AI health assistant")]
struct Cli {
    /// Assistant backend base URL (overrides AROGYA_BACKEND_URL and the config file)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        query: String,
        /// Medical report to attach (PDF only)
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// List the quick questions
    Quick,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    // Logging first so a broken config file is reported
    match command {
        Commands::Chat => init_file_logging(cli.verbose)?,
        Commands::Ask { .. } | Commands::Quick => init_stderr_logging(cli.verbose),
    }

    let config = Config::load().unwrap_or_else(|err| {
        warn!(error = %err, "could not load config, using defaults");
        Config::new()
    });
    let backend_url = config.resolve_backend_url(cli.backend_url.as_deref());

    match command {
        Commands::Chat => {
            run_tui(&config, &backend_url).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ask { query, pdf } => ask_once(&backend_url, &query, pdf).await,
        Commands::Quick => {
            for (i, q) in QUICK_QUESTIONS.iter().enumerate() {
                if config.show_hindi {
                    println!("F{}  {}  ({})", i + 1, q.text, q.hindi);
                } else {
                    println!("F{}  {}", i + 1, q.text);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let log_level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("arogya_mitra={log_level},arogya={log_level}")))
}

fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

/// The TUI owns the terminal, so logs go to a file under the cache dir.
fn init_file_logging(verbose: bool) -> Result<()> {
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("arogya-mitra");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("arogya.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();
    Ok(())
}

async fn run_tui(config: &Config, backend_url: &str) -> Result<()> {
    info!(backend_url, "starting chat");
    let mut app = App::new(config, backend_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        anyhow::Ok(())
    }
    .await;

    app.shutdown();
    tui::restore()?;
    result
}

async fn ask_once(backend_url: &str, query: &str, pdf: Option<PathBuf>) -> Result<ExitCode> {
    let client = AskClient::new(backend_url);
    let mut exchange = ChatExchange::new();

    let attachment = match pdf {
        Some(path) => Some(Document::from_path(&path)?),
        None => None,
    };

    let outcome = match exchange.submit(&client, query, attachment).await {
        Ok(outcome) => outcome,
        Err(rejection) => {
            eprintln!("{rejection}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let Some(answer) = exchange.transcript().last() else {
        return Ok(ExitCode::FAILURE);
    };
    println!("{}", answer.text);

    if let Some(notice) = exchange.notices().latest() {
        eprintln!("{}", notice.text);
    }

    Ok(match outcome {
        Outcome::Failure(_) => ExitCode::FAILURE,
        Outcome::Success(_) | Outcome::Pending => ExitCode::SUCCESS,
    })
}
