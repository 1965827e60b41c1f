//! Test: teardown runs exactly once, whichever state failed

use crate::helpers::*;
use bakery::execution::{ErrorKind, OrchestratorEvent, SessionState};

#[tokio::test]
async fn test_execute_failure_stops_infrastructure_before_returning() {
    let harness = Harness::new(MockRunner::new().fail_when(fly("execute"), 2), MockProbe::new());

    let err = harness.orchestrator.execute(&request(false, None)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SubprocessFailure);
    assert_eq!(err.state(), Some(SessionState::Execute));
    assert_eq!(err.exit_code(), Some(2));

    assert_eq!(harness.teardown_count(), 1);
    let execute = harness.position("fly execute").unwrap();
    let stop = harness.timeline().iter().rposition(|e| e.ends_with(" stop")).unwrap();
    assert!(execute < stop);
    assert!(harness.states().contains(&SessionState::Failed));
    assert!(!harness.states().contains(&SessionState::Done));
}

#[tokio::test]
async fn test_every_failing_state_tears_down_once() {
    let cases: Vec<(&str, Harness, SessionState)> = vec![
        (
            "provisioning",
            Harness::new(MockRunner::new().fail_when(is_provisioning, 1), MockProbe::new()),
            SessionState::Provisioning,
        ),
        (
            "control plane",
            Harness::new(MockRunner::new(), MockProbe::new().unreachable("8080")),
            SessionState::AwaitControlPlane,
        ),
        (
            "sync",
            Harness::new(MockRunner::new().fail_when(fly("sync"), 1), MockProbe::new()),
            SessionState::Sync,
        ),
        (
            "login",
            Harness::new(MockRunner::new().fail_when(fly("login"), 1), MockProbe::new()),
            SessionState::Login,
        ),
        (
            "execute",
            Harness::new(MockRunner::new().fail_when(fly("execute"), 1), MockProbe::new()),
            SessionState::Execute,
        ),
    ];

    for (name, harness, state) in cases {
        let err = harness.orchestrator.execute(&request(false, None)).await.unwrap_err();
        assert_eq!(err.state(), Some(state), "{}", name);
        assert_eq!(harness.teardown_count(), 1, "{}", name);
    }
}

#[tokio::test]
async fn test_readiness_timeout_skips_fly_commands() {
    let harness = Harness::new(MockRunner::new(), MockProbe::new().unreachable("api/v1/info"));

    let err = harness.orchestrator.execute(&request(false, None)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ReadinessTimeout);
    assert_eq!(harness.count(|c| c.program() == "fly"), 0);
    assert_eq!(harness.teardown_count(), 1);
}

#[tokio::test]
async fn test_persist_skips_teardown_after_success() {
    let harness = Harness::healthy();
    harness.orchestrator.execute(&request(true, None)).await.unwrap();

    assert_eq!(harness.teardown_count(), 0);
    assert!(harness.events().contains(&OrchestratorEvent::Persisting));
    assert!(!harness.states().contains(&SessionState::Teardown));
}

#[tokio::test]
async fn test_persist_skips_teardown_after_failure() {
    let harness = Harness::new(MockRunner::new().fail_when(fly("execute"), 3), MockProbe::new());

    let err = harness.orchestrator.execute(&request(true, None)).await.unwrap_err();

    assert_eq!(err.exit_code(), Some(3));
    assert_eq!(harness.teardown_count(), 0);
}

#[tokio::test]
async fn test_teardown_failure_does_not_mask_original_error() {
    let runner = MockRunner::new()
        .fail_when(fly("login"), 4)
        .fail_when(is_teardown, 9);
    let harness = Harness::new(runner, MockProbe::new());

    let err = harness.orchestrator.execute(&request(false, None)).await.unwrap_err();

    assert_eq!(err.state(), Some(SessionState::Login));
    assert_eq!(err.exit_code(), Some(4));
    assert!(harness
        .events()
        .iter()
        .any(|e| matches!(e, OrchestratorEvent::TeardownFailed(_))));
}

#[tokio::test]
async fn test_teardown_failure_after_success_is_reported() {
    let harness = Harness::new(MockRunner::new().fail_when(is_teardown, 9), MockProbe::new());

    let err = harness.orchestrator.execute(&request(false, None)).await.unwrap_err();

    assert_eq!(err.state(), Some(SessionState::Teardown));
    assert_eq!(harness.teardown_count(), 1);
    assert_eq!(
        harness.events().last(),
        Some(&OrchestratorEvent::Finished { success: false })
    );
}

#[tokio::test]
async fn test_captured_output_is_surfaced_before_error() {
    let runner = MockRunner::new().fail_with_output(fly("execute"), 1, Some("task failed: missing input"));
    let harness = Harness::new(runner, MockProbe::new());

    let err = harness.orchestrator.execute(&request(false, None)).await.unwrap_err();

    assert_eq!(err.captured_output(), Some("task failed: missing input"));
    assert!(harness
        .events()
        .contains(&OrchestratorEvent::CapturedOutput("task failed: missing input".to_string())));
}

#[tokio::test]
async fn test_unwritable_work_dir_fails_without_provisioning() {
    let work = tempfile::tempdir().unwrap();
    let config = test_config().with_work_dir(work.path().join("missing"));
    let harness = Harness::with_config(MockRunner::new(), MockProbe::new(), config);

    let err = harness.orchestrator.execute(&request(false, None)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SubprocessFailure);
    assert!(harness.calls().is_empty());
    assert_eq!(harness.states(), vec![SessionState::Failed]);
    assert_eq!(
        harness.events().last(),
        Some(&OrchestratorEvent::Finished { success: false })
    );
}

#[tokio::test]
async fn test_cancelled_session_removes_its_files() {
    let work = tempfile::tempdir().unwrap();
    let config = test_config().with_work_dir(work.path());
    let harness = Harness::with_config(MockRunner::new(), MockProbe::new().hanging("8080"), config);

    let cancelled = tokio::time::timeout(
        std::time::Duration::from_millis(100),
        harness.orchestrator.execute(&request(false, None)),
    )
    .await;

    assert!(cancelled.is_err());
    let compose_file = harness.compose_file().unwrap();
    assert!(compose_file.starts_with(&*work.path().to_string_lossy()));
    assert!(!std::path::Path::new(&compose_file).exists());
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
}
