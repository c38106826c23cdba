use crate::error::{FetchError, FetchState};
use crate::orchestrator::{DownloadResult, DownloadedFile, Orchestrator};
use crate::target::DownloadTarget;
use airscout_common::PartialBatchFailure;
use tokio_util::sync::CancellationToken;

/// One processed target.
#[derive(Debug)]
pub struct BatchEntry {
    pub target: DownloadTarget,
    pub result: DownloadResult,
}

/// Per-target outcomes, in input order, one entry per input target.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&DownloadTarget, &DownloadedFile)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().ok().map(|f| (&e.target, f)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&DownloadTarget, &FetchError)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|err| (&e.target, err)))
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// Collapse into a single `Result`, failing when any target failed.
    #[allow(clippy::type_complexity)]
    pub fn into_result(
        self,
    ) -> Result<
        Vec<(DownloadTarget, DownloadedFile)>,
        PartialBatchFailure<(DownloadTarget, DownloadedFile), (DownloadTarget, FetchError)>,
    > {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for BatchEntry { target, result } in self.entries {
            match result {
                Ok(file) => succeeded.push((target, file)),
                Err(err) => failed.push((target, err)),
            }
        }
        if failed.is_empty() {
            Ok(succeeded)
        } else {
            Err(PartialBatchFailure { succeeded, failed })
        }
    }
}

/// Sequential driver over many targets.
///
/// A failing target is logged and recorded; the batch always moves on to the
/// next one. Nothing is retried here: resubmit `report.failed()` to retry.
pub struct BatchDriver<'o> {
    orchestrator: &'o Orchestrator,
}

impl<'o> BatchDriver<'o> {
    pub fn new(orchestrator: &'o Orchestrator) -> Self {
        Self { orchestrator }
    }

    pub async fn run_batch(&self, targets: Vec<DownloadTarget>) -> BatchReport {
        self.run_batch_cancellable(targets, &CancellationToken::new())
            .await
    }

    /// Once `cancel` fires, the in-flight target stops at its next step
    /// boundary and every remaining target is recorded as cancelled.
    pub async fn run_batch_cancellable(
        &self,
        targets: Vec<DownloadTarget>,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let total = targets.len();
        let mut report = BatchReport {
            entries: Vec::with_capacity(total),
        };
        tracing::info!(target: "fetch.batch", total, "batch.start");

        for (index, target) in targets.into_iter().enumerate() {
            let result = if cancel.is_cancelled() {
                Err(FetchError::Cancelled {
                    state: FetchState::Idle,
                })
            } else {
                self.orchestrator.fetch_cancellable(&target, cancel).await
            };

            match &result {
                Ok(file) => tracing::info!(
                    target: "fetch.batch",
                    index,
                    total,
                    target_label = %target.label(),
                    path = %file.path.display(),
                    "batch.target.ok"
                ),
                Err(err) => tracing::warn!(
                    target: "fetch.batch",
                    index,
                    total,
                    target_label = %target.label(),
                    kind = err.kind(),
                    error = %err,
                    "batch.target.failed"
                ),
            }
            report.entries.push(BatchEntry { target, result });
        }

        tracing::info!(
            target: "fetch.batch",
            total,
            failed = report.failure_count(),
            cancelled = cancel.is_cancelled(),
            "batch.done"
        );
        report
    }
}
