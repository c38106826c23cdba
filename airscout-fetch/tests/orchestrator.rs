mod common;

use airscout_common::{BoundingBox, Credentials};
use airscout_fetch::{
    ArchiveSite, DownloadTarget, FetchError, FetchState, FetchStep, Orchestrator, PortalSite,
    PortalWindow,
};
use common::{FakeProvider, csv_files, fast_timeouts, init_test_tracing};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn orchestrator(provider: &FakeProvider) -> Orchestrator {
    Orchestrator::new(Arc::new(provider.clone()), fast_timeouts()).with_adapter(Arc::new(
        ArchiveSite::new(ArchiveSite::DEFAULT_BASE).unwrap(),
    ))
}

#[tokio::test]
async fn archive_fetch_renames_download_and_closes_session() {
    init_test_tracing();
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider::new();
    let orch = orchestrator(&provider);

    let file = orch
        .fetch(&DownloadTarget::archive("Beijing", tmp.path()).named("beijing"))
        .await
        .expect("download");

    assert_eq!(file.path, tmp.path().join("beijing.csv"));
    assert_eq!(csv_files(tmp.path()), vec!["beijing.csv"]);
    assert_eq!(provider.probe.opened(), 1);
    assert_eq!(provider.probe.closed(), 1);

    let calls = provider.probe.calls();
    assert_eq!(calls[0], "goto https://aqicn.org/historical/#!city:beijing");
    assert_eq!(
        calls.last().map(String::as_str),
        Some("script_click css:div.histui.ui.large.primary.button")
    );
}

#[tokio::test]
async fn unnamed_download_keeps_browser_file_name() {
    init_test_tracing();
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider::new();

    let file = orchestrator(&provider)
        .fetch(&DownloadTarget::archive("Wuhan", tmp.path()))
        .await
        .unwrap();
    assert_eq!(file.path, tmp.path().join("export-0.csv"));
}

#[tokio::test]
async fn interactive_timeout_names_the_step_and_releases_session() {
    init_test_tracing();
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider::new();

    let err = orchestrator(&provider)
        .fetch(&DownloadTarget::archive("slowtown", tmp.path()))
        .await
        .unwrap_err();

    match err {
        FetchError::Timeout { step, after } => {
            assert_eq!(step, FetchStep::AwaitInteractive);
            assert_eq!(after, Duration::from_millis(200));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(provider.probe.opened(), 1);
    assert_eq!(provider.probe.closed(), 1);
}

#[tokio::test]
async fn missing_control_is_element_not_found() {
    init_test_tracing();
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider::new();

    let err = orchestrator(&provider)
        .fetch(&DownloadTarget::archive("Atlantis", tmp.path()))
        .await
        .unwrap_err();

    match err {
        FetchError::ElementNotFound { step, selector } => {
            assert_eq!(step, FetchStep::AwaitInteractive);
            assert_eq!(selector, "css:div.histui.ui.basic.primary.button");
        }
        other => panic!("expected element_not_found, got {other:?}"),
    }
    assert_eq!(provider.probe.closed(), 1);
}

#[tokio::test]
async fn no_file_appearing_times_out_waiting_for_file() {
    init_test_tracing();
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider {
        silent_downloads: true,
        ..FakeProvider::new()
    };

    let err = orchestrator(&provider)
        .fetch(&DownloadTarget::archive("Beijing", tmp.path()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FetchError::Timeout {
            step: FetchStep::AwaitFile,
            ..
        }
    ));
    assert_eq!(provider.probe.closed(), 1);
}

#[tokio::test]
async fn second_fetch_with_same_name_does_not_clobber() {
    init_test_tracing();
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider::new();
    let orch = orchestrator(&provider);
    let target = DownloadTarget::archive("Beijing", tmp.path()).named("beijing");

    let first = orch.fetch(&target).await.unwrap();
    let err = orch.fetch(&target).await.unwrap_err();

    assert!(matches!(err, FetchError::DestinationExists(ref p) if *p == first.path));
    // The second download stays under the name the browser gave it.
    assert_eq!(csv_files(tmp.path()), vec!["beijing.csv", "export-1.csv"]);
    assert_eq!(provider.probe.opened(), 2);
    assert_eq!(provider.probe.closed(), 2);
}

#[tokio::test]
async fn cancellation_mid_run_releases_session() {
    init_test_tracing();
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider::new();
    let orch = Orchestrator::new(
        Arc::new(provider.clone()),
        airscout_fetch::Timeouts {
            interactive: Duration::from_secs(30),
            ..fast_timeouts()
        },
    )
    .with_adapter(Arc::new(ArchiveSite::new(ArchiveSite::DEFAULT_BASE).unwrap()));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = orch
        .fetch_cancellable(&DownloadTarget::archive("slowtown", tmp.path()), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FetchError::Cancelled {
            state: FetchState::Navigated
        }
    ));
    assert_eq!(provider.probe.closed(), 1);
}

#[tokio::test]
async fn already_cancelled_token_opens_nothing() {
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator(&provider)
        .fetch_cancellable(&DownloadTarget::archive("Beijing", tmp.path()), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FetchError::Cancelled {
            state: FetchState::Idle
        }
    ));
    assert_eq!(provider.probe.opened(), 0);
}

#[tokio::test]
async fn invalid_targets_never_open_a_session() {
    init_test_tracing();
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider::new();
    let orch = orchestrator(&provider);

    let bad_name = DownloadTarget::archive("Beijing", tmp.path()).named("../escape");
    assert!(matches!(
        orch.fetch(&bad_name).await,
        Err(FetchError::InvalidInput(_))
    ));

    // No portal adapter registered.
    let query = PortalWindow::parse("2020-01-01", "2020-12-31", "SO2")
        .unwrap()
        .over(BoundingBox::new(115.42, 39.44, 117.51, 41.06).unwrap());
    assert!(matches!(
        orch.fetch(&DownloadTarget::portal(query, tmp.path())).await,
        Err(FetchError::InvalidInput(_))
    ));

    assert_eq!(provider.probe.opened(), 0);
}

#[tokio::test]
async fn launch_failure_is_a_session_error() {
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider {
        fail_open: true,
        ..FakeProvider::new()
    };

    let err = orchestrator(&provider)
        .fetch(&DownloadTarget::archive("Beijing", tmp.path()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FetchError::Session {
            step: FetchStep::OpenSession,
            ..
        }
    ));
}

#[tokio::test]
async fn portal_fetch_logs_in_then_loads_query() {
    init_test_tracing();
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider::new();
    let portal = PortalSite::new(
        "http://127.0.0.1:9/giovanni/",
        Credentials::new("analyst", "s3cret"),
    )
    .unwrap();
    let orch = Orchestrator::new(Arc::new(provider.clone()), fast_timeouts())
        .with_adapter(Arc::new(portal));

    let query = PortalWindow::parse("2019-01-01", "2019-12-31", "NO2")
        .unwrap()
        .over(BoundingBox::new(120.85, 30.67, 122.12, 31.87).unwrap());
    let file = orch
        .fetch(&DownloadTarget::portal(query, tmp.path()).named("Shanghai"))
        .await
        .unwrap();
    assert_eq!(file.path, tmp.path().join("Shanghai.csv"));

    let calls = provider.probe.calls();
    let pos = |needle: &str| {
        calls
            .iter()
            .position(|c| c.starts_with(needle))
            .unwrap_or_else(|| panic!("missing {needle} in {calls:?}"))
    };
    assert!(pos("goto http://127.0.0.1:9/giovanni/") < pos("click #loginButton"));
    assert!(pos("type #username") < pos("click css:input[value='Log in']"));
    assert!(pos("click css:input[value='Log in']") < pos("goto http://127.0.0.1:9/giovanni/#&service=ArAvTs"));
    assert!(pos("refresh") < pos("click #sessionDataSelToolbarplotBTN-button"));
    assert!(calls.iter().all(|c| !c.contains("s3cret")));
    assert_eq!(provider.probe.closed(), 1);
}
