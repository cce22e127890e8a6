//! Adlens CLI: submit media for analysis and browse saved results.
//!
//! Set ADLENS_API_URL (or API_URL) to point at the server. Results are
//! kept client-side in a single JSON file under `~/.adlens`.

use std::path::PathBuf;
use std::sync::Arc;

use adlens_api_client::ApiClient;
use adlens_cli::store::ResultsStore;
use adlens_cli::{init_tracing, submit, truncate_string};
use adlens_core::models::{AnalysisItem, ItemState, MediaAnalysis};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "adlens", about = "Adlens media analysis CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more video or image files
    Submit {
        /// Paths of the files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Post files straight to the analyze endpoint, skipping the blob
        /// handshake
        #[arg(long)]
        direct: bool,
    },
    /// List saved analysis results
    List {
        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show one saved result in full
    Show {
        /// Result UUID
        id: Uuid,
    },
    /// Delete one saved result
    Delete {
        /// Result UUID
        id: Uuid,
    },
    /// Delete every saved result
    Clear,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let client = ApiClient::from_env().context("Failed to create API client")?;
    let store =
        Arc::new(ResultsStore::open_default().context("Failed to open the results store")?);

    let cli = Cli::parse();

    match cli.command {
        Commands::Submit { files, direct } => {
            submit::submit_files(client, store, files, direct).await?;
        }
        Commands::List { format } => {
            let items = store.list().await?;
            match format.as_str() {
                "json" => print_json(&items)?,
                _ => print_results_table(&items),
            }
        }
        Commands::Show { id } => {
            let item = store
                .get(id)
                .await?
                .with_context(|| format!("No saved result with id {}", id))?;
            print_json(&item)?;
        }
        Commands::Delete { id } => {
            if !store.delete(id).await? {
                anyhow::bail!("No saved result with id {}", id);
            }
            print_json(
                &serde_json::json!({ "success": true, "message": format!("Result {} deleted", id) }),
            )?;
        }
        Commands::Clear => {
            store.clear().await?;
            print_json(&serde_json::json!({ "success": true, "message": "All results cleared" }))?;
        }
    }

    Ok(())
}

fn print_results_table(items: &[AnalysisItem]) {
    if items.is_empty() {
        println!("No saved results.");
        return;
    }

    println!(
        "\n{:<36} {:<10} {:<6} {:<28} {:<19} {}",
        "ID", "Status", "Type", "File", "Submitted", "Summary"
    );
    println!("{}", "-".repeat(120));

    for item in items {
        let (status, summary) = match &item.state {
            ItemState::Pending => ("pending", String::new()),
            ItemState::Processing => ("processing", String::new()),
            ItemState::Completed { result } => ("completed", summary_line(result)),
            ItemState::Error { error } => ("error", error.clone()),
        };
        println!(
            "{:<36} {:<10} {:<6} {:<28} {:<19} {}",
            item.id.to_string(),
            status,
            item.kind.as_str(),
            truncate_string(&item.file_name, 28),
            item.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            truncate_string(&summary, 48)
        );
    }
    println!();
}

/// One-line summary for the table: the generated headline when present,
/// otherwise the analysis description.
fn summary_line(result: &MediaAnalysis) -> String {
    match result.claude_ad_copy() {
        Some(copy) => copy.headline.clone(),
        None => result.description().to_string(),
    }
}
