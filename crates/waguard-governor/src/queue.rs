// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queued recompute requests, drained by a single worker task.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use waguard_core::{ConnectionId, GovernorError, HealthScore, ScoreWindow};

use crate::batch::BatchReport;
use crate::metrics;
use crate::service::Governor;

/// One connection, or every active connection when `connection_id` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecalcRequest {
    pub connection_id: Option<ConnectionId>,
    pub window: ScoreWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecalcResponse {
    Single(HealthScore),
    Batch(BatchReport),
}

impl Governor {
    /// Run a request synchronously. The queue worker calls this too.
    pub async fn execute(&self, request: RecalcRequest) -> Result<RecalcResponse, GovernorError> {
        match request.connection_id {
            Some(id) => self
                .recalculate(id, request.window)
                .await
                .map(RecalcResponse::Single),
            None => self
                .recalculate_all(request.window)
                .await
                .map(RecalcResponse::Batch),
        }
    }
}

/// Handle for submitting requests to the background worker.
#[derive(Clone)]
pub struct RecalcQueue {
    tx: mpsc::Sender<RecalcRequest>,
    capacity: usize,
}

impl RecalcQueue {
    /// Spawn the worker. It stops when `cancel` fires or every handle is dropped.
    pub fn start(
        governor: Arc<Governor>,
        capacity: usize,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let capacity = capacity.max(1);
        let (tx, mut rx) = mpsc::channel::<RecalcRequest>(capacity);

        let worker = tokio::spawn(async move {
            loop {
                let request = tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("recalc queue worker shutting down");
                        break;
                    }
                    request = rx.recv() => match request {
                        Some(r) => r,
                        None => break,
                    },
                };
                metrics::set_queue_depth(rx.len());

                match governor.execute(request).await {
                    Ok(_) => debug!(?request, "queued recompute done"),
                    Err(e) => warn!(?request, error = %e, "queued recompute failed"),
                }
            }
        });

        (Self { tx, capacity }, worker)
    }

    /// Enqueue without waiting. Fails when the queue is full or stopped.
    pub fn submit(&self, request: RecalcRequest) -> Result<(), GovernorError> {
        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                GovernorError::Internal("recalculation queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                GovernorError::Internal("recalculation queue is stopped".to_string())
            }
        })?;
        metrics::set_queue_depth(self.depth());
        Ok(())
    }

    /// Requests waiting for the worker.
    pub fn depth(&self) -> usize {
        self.capacity - self.tx.capacity()
    }
}
