//! thumbledger CLI: run the service, replay ingest events, poke the ledger.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thumbledger::app::App;
use thumbledger::config::Config;
use thumbledger::normalizer::NormalizeOutcome;
use thumbledger::telemetry::{TelemetryConfig, init_telemetry};
use thumbledger::trigger::{self, IngestDispatcher};

#[derive(Parser)]
#[command(name = "thumbledger", about = "Image uploads, square thumbnails and a task ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service with the local ingest trigger
    Serve,
    /// Run the normalizer over an ingest event file
    Normalize {
        /// JSON file holding `{bucket, key}` or a notification envelope
        event_file: PathBuf,
    },
    /// Task ledger operations
    Todos {
        #[command(subcommand)]
        action: TodoAction,
    },
}

#[derive(Subcommand)]
enum TodoAction {
    /// List all tasks
    List,
    /// Add a task
    Add {
        /// Task text
        text: String,
    },
    /// Remove a task by id
    Rm {
        /// Exact task id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "thumbledger".to_string(),
        default_filter: config.log_level.clone(),
    })?;

    let app = App::from_config(&config).await?;

    match cli.command {
        Command::Serve => cmd_serve(&config, app).await,
        Command::Normalize { event_file } => cmd_normalize(&app, event_file).await,
        Command::Todos { action } => match action {
            TodoAction::List => cmd_todos_list(&app).await,
            TodoAction::Add { text } => cmd_todos_add(&app, text).await,
            TodoAction::Rm { id } => cmd_todos_rm(&app, id).await,
        },
    }
}

async fn cmd_serve(config: &Config, app: App) -> anyhow::Result<()> {
    let (ingest, dispatcher) = IngestDispatcher::new(app.normalizer.clone());
    let dispatcher = tokio::spawn(dispatcher.run());

    let router = app.router(Some(ingest));
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    thumbledger::http::serve(listener, router, async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown requested");
    })
    .await?;

    // The router (and with it the last sender) is gone once serve returns,
    // so the dispatcher drains what is queued and stops.
    dispatcher.await?;
    Ok(())
}

async fn cmd_normalize(app: &App, event_file: PathBuf) -> anyhow::Result<()> {
    let payload = tokio::fs::read(&event_file).await?;
    let events = trigger::parse_events(&payload)?;
    let outcomes = trigger::handle_all(&app.normalizer, &events).await?;

    for outcome in outcomes {
        match outcome {
            NormalizeOutcome::Processed {
                source_key,
                dest_key,
                size,
                ..
            } => println!("Processed: {source_key} → {dest_key} ({size}x{size})"),
            NormalizeOutcome::Skipped { key, reason } => {
                println!("Skipped:   {key} ({reason:?})")
            }
        }
    }
    Ok(())
}

async fn cmd_todos_list(app: &App) -> anyhow::Result<()> {
    let tasks = app.ledger.list().await?;
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    println!("{:<24}  {:<4}  {:<16}  TEXT", "ID", "DONE", "CREATED");
    println!("{}", "-".repeat(80));
    for task in &tasks {
        println!(
            "{:<24}  {:<4}  {:<16}  {}",
            task.id,
            if task.completed { "yes" } else { "no" },
            task.created_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            task.text
        );
    }
    println!("\n{} task(s)", tasks.len());
    Ok(())
}

async fn cmd_todos_add(app: &App, text: String) -> anyhow::Result<()> {
    let task = app.ledger.create(&text).await?;
    println!("Created: {} ({})", task.id, task.text);
    Ok(())
}

async fn cmd_todos_rm(app: &App, id: String) -> anyhow::Result<()> {
    let task = app.ledger.delete(&id).await?;
    println!("Deleted: {} ({})", task.id, task.text);
    Ok(())
}
