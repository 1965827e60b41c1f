//! Test: both plan variants wire every task input to exactly one provider

use bakery::core::{PipelineEnvironment, PipelinePlan, PlanError, Step};
use bakery::pipelines::{self, PipelineKind};

const LOCAL_ENV: &str = r#"
ENV_NAME: local
S3_DIST_BUCKET: dist-bucket
VERSIONED_FILE: feeds/books.json
S3_ACCESS_KEY_ID: AKIAEXAMPLE
S3_SECRET_ACCESS_KEY: example-secret
COPS_TARGET: https://cops.local/api
S3_BUCKET: pdf-bucket
"#;

/// Names produced by the steps before `index`
fn providers(plan: &[Step], index: usize, artifact: &str) -> usize {
    plan[..index]
        .iter()
        .map(|step| match step {
            Step::Get(get) => usize::from(get.get == artifact),
            Step::Task(task) => task.output_names().filter(|name| *name == artifact).count(),
            Step::Put(_) => 0,
        })
        .sum()
}

fn assert_fully_wired(plan: &PipelinePlan) {
    for job in &plan.jobs {
        for (index, step) in job.plan.iter().enumerate() {
            if let Step::Task(task) = step {
                for input in task.input_names() {
                    assert_eq!(
                        providers(&job.plan, index, input),
                        1,
                        "{} input {} in job {}",
                        task.task,
                        input,
                        job.name
                    );
                }
            }
        }
    }
}

#[test]
fn test_every_plan_variant_is_fully_wired() {
    let env = PipelineEnvironment::from_yaml(LOCAL_ENV).unwrap();
    for kind in PipelineKind::ALL {
        let plan = pipelines::assemble(kind, &env).unwrap();
        assert!(!plan.jobs.is_empty(), "{}", kind);
        assert_fully_wired(&plan);
    }
}

#[test]
fn test_plans_survive_yaml_round_trip() {
    let env = PipelineEnvironment::from_yaml(LOCAL_ENV).unwrap();
    for kind in PipelineKind::ALL {
        let plan = pipelines::assemble(kind, &env).unwrap();
        let yaml = plan.to_yaml().unwrap();
        assert_eq!(PipelinePlan::from_yaml(&yaml).unwrap(), plan, "{}", kind);
    }
}

#[test]
fn test_removing_a_stage_leaves_a_dangling_input() {
    let env = PipelineEnvironment::from_yaml(LOCAL_ENV).unwrap();
    let mut plan = pipelines::assemble(PipelineKind::Distribution, &env).unwrap();

    let job = &mut plan.jobs[0];
    let assemble = job
        .plan
        .iter()
        .position(|step| matches!(step, Step::Task(task) if task.task == "assemble book"))
        .unwrap();
    job.plan.remove(assemble);

    assert!(matches!(
        plan.check_artifact_wiring(),
        Err(PlanError::DanglingInput { .. })
    ));
}

#[test]
fn test_deployed_plans_reference_secrets() {
    let env = PipelineEnvironment::from_yaml(LOCAL_ENV)
        .unwrap()
        .with("ENV_NAME", "production");

    for kind in PipelineKind::ALL {
        let yaml = pipelines::assemble(kind, &env).unwrap().to_yaml().unwrap();
        assert!(yaml.contains("((aws-sandbox-secret-key-id))"), "{}", kind);
        assert!(!yaml.contains("example-secret"), "{}", kind);
    }
}

#[test]
fn test_local_plan_without_secret_value_is_rejected() {
    let env = PipelineEnvironment::from_yaml("ENV_NAME: local\nCOPS_TARGET: x\nS3_BUCKET: y\n").unwrap();
    assert_eq!(
        pipelines::assemble(PipelineKind::Pdf, &env),
        Err(PlanError::MissingValue("S3_ACCESS_KEY_ID".to_string()))
    );
}

#[test]
fn test_unknown_pipeline_name() {
    assert_eq!(
        "nightly".parse::<PipelineKind>(),
        Err(PlanError::UnknownPipeline("nightly".to_string()))
    );
}
