//! Sequential upload driver.
//!
//! Owns the queue cursor and drives one artifact at a time through
//! read → encode → transmit → confirm. A simulated progress ticker races each
//! real request and is converged to 100% on success or killed on failure.
//! Failures never advance or skip a queue position: the same position is
//! re-prompted until a submission for it is confirmed.

mod endpoint;

pub use endpoint::{HttpEndpoint, UploadEndpoint};

use crate::error::UploadError;
use crate::model::{
    ArtifactType, ReceiptItem, SessionReceipt, UploadEvent, UploadRequest, UserDetails,
};
use crate::naming;
use crate::progress::{ProgressProfile, ProgressSimulator};
use crate::queue::UploadQueue;
use base64::Engine as _;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;
use tracing::{debug, error, warn};

pub const PDF_MIME: &str = "application/pdf";

/// Pause after a confirmed upload before moving on, so the 100% state is
/// user-perceivable.
pub const DEFAULT_CONFIRM_DELAY: Duration = Duration::from_millis(1200);

/// One user-supplied file answering a `PromptForArtifact` event.
#[derive(Debug, Clone)]
pub struct ArtifactSubmission {
    pub path: PathBuf,
    pub mime_type: String,
}

pub struct UploadDriver<E> {
    endpoint: E,
    details: UserDetails,
    queue: UploadQueue,
    cursor: usize,
    confirm_delay: Duration,
}

impl<E: UploadEndpoint> UploadDriver<E> {
    pub fn new(endpoint: E, details: UserDetails, queue: UploadQueue) -> Self {
        Self {
            endpoint,
            details,
            queue,
            cursor: 0,
            confirm_delay: DEFAULT_CONFIRM_DELAY,
        }
    }

    pub fn with_confirm_delay(mut self, delay: Duration) -> Self {
        self.confirm_delay = delay;
        self
    }

    /// Consume the queue one position at a time. For each position the driver
    /// prompts for a file, then processes submissions until one is confirmed;
    /// only a confirmed submission advances the cursor. Returns the session
    /// receipt, partial if the submission channel closes before the queue is
    /// exhausted.
    pub async fn run(
        mut self,
        event_tx: UnboundedSender<UploadEvent>,
        mut submission_rx: UnboundedReceiver<ArtifactSubmission>,
    ) -> Result<SessionReceipt, UploadError> {
        let mut receipt = SessionReceipt::new(&self.details);
        let mut attempts = 0u32;

        while let Some(artifact) = self.queue.get(self.cursor) {
            let _ = event_tx.send(UploadEvent::PromptForArtifact { artifact });

            let Some(submission) = submission_rx.recv().await else {
                debug!(position = self.cursor, "submission channel closed, ending session early");
                return Ok(receipt);
            };
            attempts += 1;

            match self.process_item(artifact, submission, &event_tx).await {
                Ok(file_name) => {
                    let is_last = self.cursor + 1 == self.queue.len();
                    self.cursor += 1;
                    receipt.items.push(ReceiptItem {
                        artifact,
                        file_name: file_name.clone(),
                        attempts,
                    });
                    attempts = 0;
                    let _ = event_tx.send(UploadEvent::ItemConfirmed {
                        artifact,
                        file_name,
                        is_last,
                    });
                }
                Err(err @ UploadError::Precondition(_)) => {
                    error!(%artifact, %err, "aborting session");
                    return Err(err);
                }
                Err(err) => {
                    // Same cursor: the position is re-prompted, nothing is
                    // skipped or duplicated.
                    warn!(%artifact, %err, "upload attempt failed");
                    let _ = event_tx.send(UploadEvent::ItemFailed {
                        artifact,
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let _ = event_tx.send(UploadEvent::AllComplete);
        Ok(receipt)
    }

    /// Drive a single submission through the item state machine. Returns the
    /// canonical filename on confirmation.
    async fn process_item(
        &self,
        artifact: ArtifactType,
        submission: ArtifactSubmission,
        event_tx: &UnboundedSender<UploadEvent>,
    ) -> Result<String, UploadError> {
        // Idle → Reading: only PDFs consume the queue position.
        if submission.mime_type != PDF_MIME {
            return Err(UploadError::WrongType {
                mime_type: submission.mime_type,
            });
        }

        let bytes = tokio::fs::read(&submission.path)
            .await
            .map_err(|source| UploadError::Read {
                path: submission.path.clone(),
                source,
            })?;

        let file_name = naming::file_name(artifact, &self.details)?;
        debug!(%artifact, %file_name, size = bytes.len(), "transmitting");

        // Encoding → Transmitting: the ticker races the real request and is
        // reconciled with its outcome below.
        let network_done = Arc::new(AtomicBool::new(false));
        let simulator = ProgressSimulator::spawn(
            artifact,
            ProgressProfile::for_size(bytes.len() as u64),
            network_done.clone(),
            event_tx.clone(),
        );

        let request = UploadRequest {
            file_name: file_name.clone(),
            mime_type: submission.mime_type,
            base64_file: base64::engine::general_purpose::STANDARD.encode(&bytes),
            branch: self.details.branch.to_string(),
            sem: self.details.sem.clone(),
        };

        match self.endpoint.upload(&request).await {
            Ok(resp) if resp.is_success() => {
                // Flipped exactly once per item; the next tick shows 100.
                network_done.store(true, Ordering::Relaxed);
                simulator.finish().await;
                tokio::time::sleep(self.confirm_delay).await;
                Ok(file_name)
            }
            Ok(resp) => {
                simulator.abort();
                Err(UploadError::Network(
                    resp.message
                        .unwrap_or_else(|| "an unknown error occurred".into()),
                ))
            }
            Err(err) => {
                simulator.abort();
                Err(err)
            }
        }
    }
}
