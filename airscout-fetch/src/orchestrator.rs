use crate::adapter::{SiteAdapter, Timeouts};
use crate::error::{FetchError, FetchState, FetchStep};
use crate::target::{DownloadTarget, Site};
use crate::watch::{DownloadWatch, rename_no_clobber};
use airscout_drivers::{BrowserSession, DriverError, SessionProvider};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Outcome of one [`Orchestrator::fetch`].
pub type DownloadResult = Result<DownloadedFile, FetchError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedFile {
    pub path: PathBuf,
    /// Correlates this file with the run's `fetch.state` log events.
    pub run_id: Uuid,
}

/// Drives one download target through the session state machine:
///
/// `Idle -> SessionReady -> Navigated -> TriggerPending -> Downloading -> Completed`,
/// with `Errored` reachable from every non-terminal state.
///
/// Each step runs under its own bound from [`Timeouts`]. The browser session
/// is closed on every exit path, including timeouts and cancellation.
pub struct Orchestrator {
    sessions: Arc<dyn SessionProvider>,
    adapters: HashMap<Site, Arc<dyn SiteAdapter>>,
    timeouts: Timeouts,
}

struct Run<'c> {
    id: Uuid,
    label: String,
    state: FetchState,
    cancel: &'c CancellationToken,
}

impl<'c> Run<'c> {
    fn new(target: &DownloadTarget, cancel: &'c CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: target.label(),
            state: FetchState::Idle,
            cancel,
        }
    }

    fn advance(&mut self, next: FetchState) {
        tracing::info!(
            target: "fetch.orchestrator",
            run = %self.id,
            target_label = %self.label,
            from = %self.state,
            to = %next,
            "fetch.state"
        );
        self.state = next;
    }

    fn fail(&mut self, err: &FetchError) {
        tracing::warn!(
            target: "fetch.orchestrator",
            run = %self.id,
            target_label = %self.label,
            from = %self.state,
            to = %FetchState::Errored,
            kind = err.kind(),
            error = %err,
            "fetch.state"
        );
        self.state = FetchState::Errored;
    }
}

impl Orchestrator {
    pub fn new(sessions: Arc<dyn SessionProvider>, timeouts: Timeouts) -> Self {
        Self {
            sessions,
            adapters: HashMap::new(),
            timeouts,
        }
    }

    /// Register the adapter for its [`Site`], replacing any earlier one.
    pub fn with_adapter(mut self, adapter: Arc<dyn SiteAdapter>) -> Self {
        self.adapters.insert(adapter.site(), adapter);
        self
    }

    pub fn supports(&self, site: Site) -> bool {
        self.adapters.contains_key(&site)
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub async fn fetch(&self, target: &DownloadTarget) -> DownloadResult {
        self.fetch_cancellable(target, &CancellationToken::new()).await
    }

    /// Like [`fetch`](Self::fetch), but stops at the next step boundary once
    /// `cancel` fires and reports [`FetchError::Cancelled`] with the state
    /// the run had reached.
    pub async fn fetch_cancellable(
        &self,
        target: &DownloadTarget,
        cancel: &CancellationToken,
    ) -> DownloadResult {
        let mut run = Run::new(target, cancel);
        let result = self.run(target, &mut run).await;
        match &result {
            Ok(file) => tracing::info!(
                target: "fetch.orchestrator",
                run = %run.id,
                target_label = %run.label,
                path = %file.path.display(),
                "fetch.completed"
            ),
            Err(err) => run.fail(err),
        }
        result
    }

    async fn run(&self, target: &DownloadTarget, run: &mut Run<'_>) -> DownloadResult {
        target.validate()?;
        let adapter = self.adapters.get(&target.site()).cloned().ok_or_else(|| {
            FetchError::InvalidInput(format!("no adapter registered for {} targets", target.site()))
        })?;
        let url = adapter.locate(target)?;
        tokio::fs::create_dir_all(&target.destination)
            .await
            .map_err(|e| FetchError::io(&target.destination, e))?;

        let mut session = bounded(run, &self.timeouts, FetchStep::OpenSession, async {
            self.sessions
                .open(&target.destination)
                .await
                .map_err(driver(FetchStep::OpenSession))
        })
        .await?;
        run.advance(FetchState::SessionReady);

        let outcome = self
            .drive(session.as_mut(), adapter.as_ref(), target, &url, run)
            .await;

        match tokio::time::timeout(self.timeouts.navigate, session.close()).await {
            Ok(Ok(())) => {
                tracing::debug!(target: "fetch.orchestrator", run = %run.id, "session.closed")
            }
            Ok(Err(e)) => tracing::warn!(
                target: "fetch.orchestrator",
                run = %run.id,
                error = %e,
                "session.close_failed"
            ),
            Err(_) => tracing::warn!(
                target: "fetch.orchestrator",
                run = %run.id,
                "session.close_timed_out"
            ),
        }
        outcome
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        adapter: &dyn SiteAdapter,
        target: &DownloadTarget,
        url: &str,
        run: &mut Run<'_>,
    ) -> DownloadResult {
        let t = &self.timeouts;

        bounded(run, t, FetchStep::Navigate, async {
            adapter
                .navigate(&mut *session, url, t)
                .await
                .map_err(driver(FetchStep::Navigate))
        })
        .await?;
        run.advance(FetchState::Navigated);

        bounded(run, t, FetchStep::AwaitInteractive, async {
            adapter
                .wait_interactive(&mut *session, t)
                .await
                .map_err(driver(FetchStep::AwaitInteractive))
        })
        .await?;
        run.advance(FetchState::TriggerPending);

        let watch =
            DownloadWatch::snapshot(&target.destination, adapter.download_pattern().clone()).await?;

        bounded(run, t, FetchStep::TriggerDownload, async {
            adapter
                .trigger_download(&mut *session, t)
                .await
                .map_err(driver(FetchStep::TriggerDownload))
        })
        .await?;
        bounded(run, t, FetchStep::SelectFormat, async {
            adapter
                .select_format(&mut *session, t)
                .await
                .map_err(driver(FetchStep::SelectFormat))
        })
        .await?;
        run.advance(FetchState::Downloading);

        let fresh = bounded(run, t, FetchStep::AwaitFile, watch.wait_for_new(t.poll)).await?;
        let path = match &target.output_name {
            Some(name) => rename_no_clobber(&fresh, &target.destination, name.trim()).await?,
            None => fresh,
        };
        run.advance(FetchState::Completed);

        Ok(DownloadedFile {
            path,
            run_id: run.id,
        })
    }
}

fn driver(step: FetchStep) -> impl FnOnce(DriverError) -> FetchError {
    move |e| FetchError::from_driver(step, e)
}

/// Run `fut` under the bound for `step`, giving up early on cancellation.
async fn bounded<T, F>(
    run: &Run<'_>,
    timeouts: &Timeouts,
    step: FetchStep,
    fut: F,
) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    if run.cancel.is_cancelled() {
        return Err(FetchError::Cancelled { state: run.state });
    }
    let limit = timeouts.for_step(step);
    tokio::select! {
        biased;
        _ = run.cancel.cancelled() => Err(FetchError::Cancelled { state: run.state }),
        res = tokio::time::timeout(limit, fut) => match res {
            Ok(inner) => inner,
            Err(_) => Err(FetchError::Timeout { step, after: limit }),
        },
    }
}
