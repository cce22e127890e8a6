//! Per-file submission tasks.
//!
//! Each file runs as an independent spawned task: upload-token handshake,
//! blob PUT, then analysis (or a single multipart POST in direct mode).
//! Tasks report completion over an mpsc channel keyed by the item id, and
//! the receiving loop folds every outcome back into the results store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use adlens_api_client::{content_type_for_file_name, ApiClient, MediaAnalysis};
use adlens_core::models::{AnalysisItem, ItemState, MediaKind};
use anyhow::{Context, Result};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::store::ResultsStore;

/// Completion event for one submission task.
#[derive(Debug)]
struct SubmissionEvent {
    id: Uuid,
    file_name: String,
    outcome: Result<MediaAnalysis, String>,
}

/// Submit each file as an independent task and persist every state
/// transition as it happens.
pub async fn submit_files(
    client: ApiClient,
    store: Arc<ResultsStore>,
    files: Vec<PathBuf>,
    direct: bool,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<SubmissionEvent>(files.len().max(1));

    let mut spawned = 0usize;
    for path in files {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
            println!("{:<9}  {:<36}  {}", "skipped", "-", path.display());
            continue;
        };
        let Some((content_type, kind)) = classify(&file_name) else {
            println!(
                "{:<9}  {:<36}  {}  (not a video or image)",
                "skipped", "-", file_name
            );
            continue;
        };

        let item = AnalysisItem::new(file_name.clone(), kind);
        let id = item.id;
        store.append(item).await?;
        println!("{:<9}  {:<36}  {}", "queued", id, file_name);

        let task_client = client.clone();
        let task_store = store.clone();
        let task_tx = tx.clone();
        tokio::spawn(async move {
            if let Err(error) = task_store.update_state(id, ItemState::Processing).await {
                tracing::warn!(%id, error = %error, "Failed to persist processing state");
            }
            let outcome = run_submission(&task_client, &path, &file_name, content_type, direct)
                .await
                .map_err(|error| format!("{:#}", error));
            let _ = task_tx
                .send(SubmissionEvent {
                    id,
                    file_name,
                    outcome,
                })
                .await;
        });
        spawned += 1;
    }
    drop(tx);

    if spawned == 0 {
        anyhow::bail!("No supported files to submit");
    }

    let mut completed = 0usize;
    let mut failed = 0usize;
    while let Some(event) = rx.recv().await {
        let state = match event.outcome {
            Ok(result) => {
                completed += 1;
                println!("{:<9}  {:<36}  {}", "completed", event.id, event.file_name);
                ItemState::Completed { result }
            }
            Err(error) => {
                failed += 1;
                println!(
                    "{:<9}  {:<36}  {}  {}",
                    "error", event.id, event.file_name, error
                );
                ItemState::Error { error }
            }
        };
        if !store.update_state(event.id, state).await? {
            tracing::warn!(id = %event.id, "Completed item vanished from the store");
        }
    }

    println!();
    println!("{} completed, {} failed", completed, failed);
    Ok(())
}

/// Content type and media kind for a submittable file name, by extension.
fn classify(file_name: &str) -> Option<(&'static str, MediaKind)> {
    let content_type = content_type_for_file_name(file_name)?;
    let kind = MediaKind::from_content_type(content_type)?;
    Some((content_type, kind))
}

async fn run_submission(
    client: &ApiClient,
    path: &Path,
    file_name: &str,
    content_type: &'static str,
    direct: bool,
) -> Result<MediaAnalysis> {
    if direct {
        return client.analyze_file(&path.to_string_lossy()).await;
    }

    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let token = client
        .request_upload_token(file_name)
        .await
        .context("Failed to obtain an upload token")?;
    let blob = client
        .put_blob(file_name, &token.client_token, content_type, data)
        .await
        .context("Failed to upload file to blob storage")?;

    tracing::debug!(pathname = %blob.pathname, "Upload stored, requesting analysis");
    client
        .analyze_blob(&blob.url, content_type, file_name)
        .await
}
