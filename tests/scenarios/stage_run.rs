//! Test: running a CLI stage end to end against the mocks

use crate::helpers::*;
use bakery::core::{ImageError, TaskDefinition};
use bakery::execution::{ErrorKind, LocalStage, OrchestratorError, StageOptions, TaskSource};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn bake(recipes: &Path) -> LocalStage {
    LocalStage::Bake {
        collection_id: "col123".to_string(),
        recipe: recipes.join("r.css"),
        style: recipes.join("s.css"),
    }
}

fn recipe_files() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("r.css"), "/* recipe */").unwrap();
    fs::write(dir.path().join("s.css"), "/* style */").unwrap();
    dir
}

fn options(data: &Path) -> StageOptions {
    StageOptions {
        data_dir: data.to_path_buf(),
        ..StageOptions::default()
    }
}

#[tokio::test]
async fn test_bake_stage_submits_wired_task() {
    let data = TempDir::new().unwrap();
    let recipes = recipe_files();
    let harness = Harness::healthy();

    harness
        .orchestrator
        .run_stage(&bake(recipes.path()), &TaskSource::Builtin, &options(data.path()))
        .await
        .unwrap();

    let definition = TaskDefinition::from_yaml(&harness.file_passed_to(fly("execute")).unwrap()).unwrap();
    let inputs: Vec<&str> = definition.input_names().collect();
    assert!(inputs.contains(&"assembled-book"));
    assert!(inputs.contains(&"cnx-recipes"));
    assert_eq!(definition.output_names().collect::<Vec<_>>(), vec!["baked-book"]);

    let execute = harness.calls().into_iter().find(|c| fly("execute")(c)).unwrap();
    let artifact_args = &execute.arguments()[6..];
    let book_data = data.path().join("col123");
    assert_eq!(artifact_args.len(), 4);
    assert!(artifact_args[0].starts_with("--input=book="));
    assert_eq!(
        artifact_args[1],
        format!("--input=assembled-book={}", book_data.join("assembled-book").display())
    );
    assert!(artifact_args[2].starts_with("--input=cnx-recipes="));
    assert_eq!(
        artifact_args[3],
        format!("--output=baked-book={}", book_data.join("baked-book").display())
    );
}

#[tokio::test]
async fn test_tag_override_reaches_the_task_image() {
    let data = TempDir::new().unwrap();
    let harness = Harness::healthy();
    let stage = LocalStage::Assemble {
        collection_id: "col123".to_string(),
    };
    let options = StageOptions {
        tag: Some("1.4.0".to_string()),
        ..options(data.path())
    };

    harness
        .orchestrator
        .run_stage(&stage, &TaskSource::Builtin, &options)
        .await
        .unwrap();

    let definition = TaskDefinition::from_yaml(&harness.file_passed_to(fly("execute")).unwrap()).unwrap();
    assert_eq!(definition.config.image_resource.source.tag.as_deref(), Some("1.4.0"));
    assert_eq!(harness.count(is_push), 0);
}

#[tokio::test]
async fn test_local_image_is_pulled_from_cluster_registry() {
    let data = TempDir::new().unwrap();
    let harness = Harness::healthy();
    let stage = LocalStage::Mathify {
        collection_id: "col123".to_string(),
    };
    let options = StageOptions {
        image: Some("localhost.localdomain:5000/mathify:dev".to_string()),
        ..options(data.path())
    };

    harness
        .orchestrator
        .run_stage(&stage, &TaskSource::Builtin, &options)
        .await
        .unwrap();

    let definition = TaskDefinition::from_yaml(&harness.file_passed_to(fly("execute")).unwrap()).unwrap();
    let source = &definition.config.image_resource.source;
    assert_eq!(source.repository, "registry:5000/mathify");
    assert_eq!(source.tag.as_deref(), Some("dev"));
    assert_eq!(source.insecure_registries, vec!["registry:5000".to_string()]);
    assert_eq!(harness.count(is_push), 1);
}

#[tokio::test]
async fn test_conflicting_selectors_fail_before_provisioning() {
    let data = TempDir::new().unwrap();
    let harness = Harness::healthy();
    let stage = LocalStage::Assemble {
        collection_id: "col123".to_string(),
    };
    let options = StageOptions {
        image: Some("localhost.localdomain:5000/nebuchadnezzar".to_string()),
        tag: Some("1.4.0".to_string()),
        ..options(data.path())
    };

    let err = harness
        .orchestrator
        .run_stage(&stage, &TaskSource::Builtin, &options)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(matches!(err, OrchestratorError::Image(ImageError::ConflictingSelectors)));
    assert!(harness.timeline().is_empty());
    assert!(harness.events().is_empty());
}

#[tokio::test]
async fn test_missing_recipe_fails_before_provisioning() {
    let data = TempDir::new().unwrap();
    let empty = TempDir::new().unwrap();
    let harness = Harness::healthy();

    let err = harness
        .orchestrator
        .run_stage(&bake(empty.path()), &TaskSource::Builtin, &options(data.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(harness.calls().is_empty());
}

#[tokio::test]
async fn test_build_tool_renders_the_task() {
    let data = TempDir::new().unwrap();
    let harness = Harness::new(
        MockRunner::new().with_capture_output("task: from build tool\n"),
        MockProbe::new(),
    );
    let stage = LocalStage::BuildPdf {
        collection_id: "col123".to_string(),
    };
    let source = TaskSource::BuildTool {
        cops_dir: "/opt/cops".into(),
    };

    harness
        .orchestrator
        .run_stage(&stage, &source, &options(data.path()))
        .await
        .unwrap();

    let build = &harness.calls()[0];
    assert_eq!(build.program(), "/opt/cops/bakery/build");
    assert_eq!(
        build.arguments(),
        [
            "task".to_string(),
            "build-pdf".to_string(),
            r#"--taskargs={"bucketName":"none"}"#.to_string(),
        ]
    );
    assert_eq!(
        harness.file_passed_to(fly("execute")).as_deref(),
        Some("task: from build tool\n")
    );
}

#[tokio::test]
async fn test_build_tool_failure_is_a_subprocess_failure() {
    let data = TempDir::new().unwrap();
    let harness = Harness::new(
        MockRunner::new().fail_with_output(|c| c.program().ends_with("bakery/build"), 1, Some("unknown task")),
        MockProbe::new(),
    );
    let stage = LocalStage::Jsonify {
        collection_id: "col123".to_string(),
    };
    let source = TaskSource::BuildTool {
        cops_dir: "/opt/cops".into(),
    };

    let err = harness
        .orchestrator
        .run_stage(&stage, &source, &options(data.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SubprocessFailure);
    assert_eq!(err.captured_output(), Some("unknown task"));
    assert_eq!(harness.count(is_provisioning), 0);
}
