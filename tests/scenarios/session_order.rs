//! Test: a successful session runs every state in order

use crate::helpers::*;
use bakery::execution::{OrchestratorEvent, SessionState};

#[tokio::test]
async fn test_successful_session_command_sequence() {
    let harness = Harness::healthy();
    harness.orchestrator.execute(&request(false, None)).await.unwrap();

    let calls = harness.calls();
    assert_eq!(calls.len(), 5, "unexpected calls: {:?}", harness.timeline());

    assert!(is_provisioning(&calls[0]));
    assert_eq!(calls[1].display(), "fly sync -c http://localhost.localdomain:8080");
    assert_eq!(
        calls[2].display(),
        "fly login -k -t bakery-cli -c http://localhost.localdomain:8080 -u admin -p admin"
    );

    let execute = &calls[3];
    assert_eq!(&execute.arguments()[..5], ["execute", "-t", "bakery-cli", "--include-ignored", "-c"]);
    assert!(execute.arguments()[5].ends_with(".yml"));
    assert_eq!(
        &execute.arguments()[6..],
        [
            "--input=book=/tmp/book".to_string(),
            "--output=fetched-book=/data/col123/fetched-book".to_string(),
        ]
    );
    assert_eq!(execute.environment(), [("COLUMNS".to_string(), COLUMNS.to_string())]);

    assert!(is_teardown(&calls[4]));
}

#[tokio::test]
async fn test_states_are_entered_in_order() {
    let harness = Harness::healthy();
    harness.orchestrator.execute(&request(false, None)).await.unwrap();

    assert_eq!(
        harness.states(),
        vec![
            SessionState::Provisioning,
            SessionState::AwaitControlPlane,
            SessionState::Sync,
            SessionState::Login,
            SessionState::Settle,
            SessionState::Execute,
            SessionState::Teardown,
            SessionState::Done,
        ]
    );
    assert_eq!(
        harness.events().last(),
        Some(&OrchestratorEvent::Finished { success: true })
    );
}

#[tokio::test]
async fn test_control_plane_is_ready_before_first_fly_command() {
    let harness = Harness::healthy();
    harness.orchestrator.execute(&request(false, None)).await.unwrap();

    let provisioned = harness.position("docker-compose").unwrap();
    let ready = harness.position("wait http://localhost:8080/api/v1/info").unwrap();
    let sync = harness.position("fly sync").unwrap();
    let login = harness.position("fly login").unwrap();
    let execute = harness.position("fly execute").unwrap();

    assert!(provisioned < ready);
    assert!(ready < sync);
    assert!(sync < login);
    assert!(login < execute);
}

#[tokio::test]
async fn test_task_definition_and_manifest_are_handed_over_as_files() {
    let harness = Harness::healthy();
    harness.orchestrator.execute(&request(false, None)).await.unwrap();

    let task = harness.file_passed_to(fly("execute")).unwrap();
    assert_eq!(task, "platform: linux\n");

    let manifest = harness.file_passed_to(is_provisioning).unwrap();
    assert!(manifest.contains("concourse/concourse:6.0"));
    assert!(manifest.contains("registry:2"));
}

#[tokio::test]
async fn test_columns_are_omitted_without_a_terminal() {
    let harness = Harness::with_config(MockRunner::new(), MockProbe::new(), test_config().with_columns(None));
    harness.orchestrator.execute(&request(false, None)).await.unwrap();

    let execute = harness.calls().into_iter().find(|c| fly("execute")(c)).unwrap();
    assert!(execute.environment().is_empty());
}
