use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};
use url::Url;

use crate::domain::dispatch_event::{DispatchData, DispatchPayload};

/// Drains the dispatch queue and POSTs each payload to the collector.
///
/// At most `concurrency` deliveries are in flight at once. Failed deliveries
/// (connect errors, timeouts, non-2xx answers) are logged and dropped; there is
/// no retry. The worker exits once every sender has been dropped.
pub(super) async fn run_dispatch_worker(
    mut rx: mpsc::Receiver<DispatchData>,
    client: Client,
    endpoint: Url,
    concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));

    while let Some(data) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        let client = client.clone();
        let endpoint = endpoint.clone();
        tokio::spawn(async move {
            deliver(&client, endpoint, DispatchPayload::new(data)).await;
            drop(permit);
        });
    }

    debug!("Dispatch queue closed, worker stopping");
}

async fn deliver(client: &Client, endpoint: Url, payload: DispatchPayload) {
    let trace_id = payload
        .data
        .trace_id()
        .map(|id| id.to_string())
        .unwrap_or_default();

    match client.post(endpoint).json(&payload).send().await {
        Ok(response) if response.status().is_success() => {
            debug!(trace_id = %trace_id, "Log payload delivered");
        }
        Ok(response) => {
            warn!(
                trace_id = %trace_id,
                status = %response.status(),
                "Log collector rejected payload"
            );
        }
        Err(e) => {
            warn!(trace_id = %trace_id, error = %e, "Error sending log to collector");
        }
    }
}
