//! Log collector endpoint used by the `receiver` binary.
//!
//! Accepts any JSON document and appends it as one line to a local file.

use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::AppError;

/// Append-only output file shared by collector requests.
#[derive(Clone)]
pub struct CollectorState {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl CollectorState {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, payload: &Value) -> std::io::Result<()> {
        let mut line = payload.to_string();
        line.push('\n');

        // Lines from concurrent requests must not interleave.
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

/// `POST /`
///
/// # Errors
///
/// - `400`/`422` from the `Json` extractor for malformed bodies
/// - `500` when the line cannot be written
pub async fn receive_handler(
    State(state): State<CollectorState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    state.append(&payload).await.map_err(|e| {
        tracing::error!(error = %e, path = %state.path.display(), "Failed to append payload");
        AppError::internal("Failed to store payload", json!({}))
    })?;

    tracing::debug!("Payload stored");
    Ok(Json(json!({ "message": "Data received successfully" })))
}
