//! dugout - command-line client for dugout-server

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use dugout_common::config::load_toml_config;
use dugout_common::{Record, RecordUpdate};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use dugout_client::api_client::DEFAULT_SERVER_URL;
use dugout_client::{ApiClient, StreamConsumer};

#[derive(Parser, Debug)]
#[command(name = "dugout")]
#[command(about = "Browse records and stream their generated descriptions")]
#[command(version)]
struct Cli {
    /// dugout-server base URL (falls back to `server_url` in the config file)
    #[arg(long, global = true, env = "DUGOUT_SERVER_URL")]
    server: Option<String>,

    /// TOML config file (default: ~/.config/dugout/config.toml if present)
    #[arg(short, long, global = true, env = "DUGOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or EnvFilter directives (overridden by RUST_LOG)
    #[arg(long, global = true, env = "DUGOUT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored records
    List,
    /// Replace the stored collection from the upstream source
    Fetch,
    /// Edit fields of one record
    Update(UpdateArgs),
    /// Show a record's description, generating it if needed
    Describe {
        /// Record id
        id: Uuid,
    },
}

#[derive(Args, Debug)]
struct UpdateArgs {
    /// Record id
    id: Uuid,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long)]
    hits: Option<u32>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    bats: Option<String>,
    /// Replace the stored description
    #[arg(long)]
    result: Option<String>,
}

impl UpdateArgs {
    fn changes(&self) -> RecordUpdate {
        RecordUpdate {
            name: self.name.clone(),
            age: self.age,
            hits: self.hits,
            year: self.year,
            bats: self.bats.clone(),
            result: self.result.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let toml_config = load_toml_config(cli.config.as_deref())
        .context("Failed to load configuration file")?;
    let server = cli
        .server
        .clone()
        .or(toml_config.server_url)
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

    let client = ApiClient::new(&server).context("Failed to create client")?;

    match cli.command {
        Command::List => {
            let records = client.list_records().await.context("Failed to list records")?;
            if records.is_empty() {
                println!("No records stored. Run `dugout fetch` first.");
            }
            for record in &records {
                print_record(record);
            }
        }
        Command::Fetch => {
            let summary = client.fetch_records().await.context("Failed to fetch records")?;
            println!("{} ({} records)", summary.message, summary.count);
        }
        Command::Update(args) => {
            let changes = args.changes();
            if changes.is_empty() {
                bail!("Nothing to update; pass at least one field");
            }
            let record = client
                .update_record(args.id, &changes)
                .await
                .context("Failed to update record")?;
            print_record(&record);
        }
        Command::Describe { id } => describe(client, id).await?,
    }

    Ok(())
}

fn print_record(record: &Record) {
    let year = record.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string());
    let marker = if record.has_result() { "*" } else { " " };
    println!(
        "{:>3} {} {:<24} {:>4} hits {:>4}  bats {:<2} {}",
        record.rank, marker, record.name, record.hits, year, record.bats, record.id
    );
}

/// Stream one description to stdout; Ctrl-C cancels
async fn describe(client: ApiClient, id: Uuid) -> Result<()> {
    let records = client.list_records().await.context("Failed to list records")?;
    let Some(record) = records.iter().find(|r| r.id == id).cloned() else {
        bail!("No record with id {}", id);
    };

    let consumer = StreamConsumer::new(Arc::new(client));
    consumer.set_records(records);
    let mut updates = consumer.subscribe();

    println!("{} ({})", record.name, record.year.map(|y| y.to_string()).unwrap_or_default());
    consumer.open(&record);

    let mut shown = String::new();
    let mut stdout = std::io::stdout();

    loop {
        let state = updates.borrow_and_update().clone();

        if state.failed {
            println!();
            bail!("{}", state.displayed);
        }

        // Live text only grows; the final stored text may differ from it
        match state.displayed.strip_prefix(shown.as_str()) {
            Some(fresh) => print!("{}", fresh),
            None => print!("\n{}", state.displayed),
        }
        shown = state.displayed.clone();
        stdout.flush().context("Failed to write output")?;

        if !state.generating {
            println!();
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                consumer.cancel();
                println!();
                eprintln!("Canceled");
                break;
            }
        }
    }

    consumer.join().await;
    Ok(())
}
