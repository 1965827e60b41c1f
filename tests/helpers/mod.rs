//! Test doubles for the local orchestrator
//!
//! Runner and probe write to one shared timeline so tests can assert the
//! relative order of commands and readiness waits.

#![allow(dead_code)]

use async_trait::async_trait;
use bakery::core::ImageSelection;
use bakery::execution::{
    CommandRunner, CommandSpec, Endpoint, ExecutionRequest, LocalOrchestrator, OrchestratorConfig,
    OrchestratorEvent, ProcessError, ReadinessError, ReadinessProbe, SessionState,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Timeline = Arc<Mutex<Vec<String>>>;

type Matcher = Box<dyn Fn(&CommandSpec) -> bool + Send + Sync>;

struct Failure {
    matcher: Matcher,
    code: i32,
    output: Option<String>,
}

/// Records every command; fails the ones matching a configured rule
pub struct MockRunner {
    timeline: Timeline,
    calls: Arc<Mutex<Vec<CommandSpec>>>,
    /// Contents of every existing file passed as an argument, by path
    files: Arc<Mutex<Vec<(String, String)>>>,
    failures: Vec<Failure>,
    capture_output: String,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            timeline: Timeline::default(),
            calls: Arc::default(),
            files: Arc::default(),
            failures: Vec::new(),
            capture_output: String::new(),
        }
    }

    pub fn fail_when<F>(self, matcher: F, code: i32) -> Self
    where
        F: Fn(&CommandSpec) -> bool + Send + Sync + 'static,
    {
        self.fail_with_output(matcher, code, None)
    }

    pub fn fail_with_output<F>(mut self, matcher: F, code: i32, output: Option<&str>) -> Self
    where
        F: Fn(&CommandSpec) -> bool + Send + Sync + 'static,
    {
        self.failures.push(Failure {
            matcher: Box::new(matcher),
            code,
            output: output.map(str::to_string),
        });
        self
    }

    pub fn with_capture_output(mut self, output: &str) -> Self {
        self.capture_output = output.to_string();
        self
    }

    fn record(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        self.timeline.lock().unwrap().push(command.display());
        self.calls.lock().unwrap().push(command.clone());

        for arg in command.arguments() {
            let path = Path::new(arg);
            if path.is_file() {
                if let Ok(contents) = std::fs::read_to_string(path) {
                    self.files.lock().unwrap().push((arg.clone(), contents));
                }
            }
        }

        match self.failures.iter().find(|failure| (failure.matcher)(command)) {
            Some(failure) => Err(ProcessError::Failed {
                program: command.program().to_string(),
                code: failure.code,
                output: failure.output.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        self.record(command)
    }

    async fn capture(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        self.record(command)?;
        Ok(self.capture_output.clone())
    }
}

/// Readiness probe that answers at once, times out, or never answers for chosen endpoints
pub struct MockProbe {
    timeline: Timeline,
    unreachable: Vec<String>,
    hanging: Vec<String>,
}

impl MockProbe {
    pub fn new() -> Self {
        Self {
            timeline: Timeline::default(),
            unreachable: Vec::new(),
            hanging: Vec::new(),
        }
    }

    /// Time out every endpoint whose address contains `fragment`
    pub fn unreachable(mut self, fragment: &str) -> Self {
        self.unreachable.push(fragment.to_string());
        self
    }

    /// Never answer for endpoints whose address contains `fragment`
    pub fn hanging(mut self, fragment: &str) -> Self {
        self.hanging.push(fragment.to_string());
        self
    }
}

#[async_trait]
impl ReadinessProbe for MockProbe {
    async fn wait_until_ready(&self, endpoint: &Endpoint, timeout: Duration) -> Result<(), ReadinessError> {
        let name = endpoint.to_string();
        self.timeline.lock().unwrap().push(format!("wait {}", name));
        if self.unreachable.iter().any(|fragment| name.contains(fragment.as_str())) {
            return Err(ReadinessError::Timeout { endpoint: name, timeout });
        }
        if self.hanging.iter().any(|fragment| name.contains(fragment.as_str())) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// An orchestrator wired to mocks, plus handles on everything they record
pub struct Harness {
    pub orchestrator: LocalOrchestrator<MockRunner, MockProbe>,
    timeline: Timeline,
    calls: Arc<Mutex<Vec<CommandSpec>>>,
    files: Arc<Mutex<Vec<(String, String)>>>,
    events: Arc<Mutex<Vec<OrchestratorEvent>>>,
}

pub const COLUMNS: usize = 120;

pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_settle_delay(Duration::ZERO)
        .with_columns(Some(COLUMNS))
}

impl Harness {
    pub fn new(runner: MockRunner, probe: MockProbe) -> Self {
        Self::with_config(runner, probe, test_config())
    }

    pub fn with_config(mut runner: MockRunner, mut probe: MockProbe, config: OrchestratorConfig) -> Self {
        let timeline = Timeline::default();
        runner.timeline = timeline.clone();
        probe.timeline = timeline.clone();

        let calls = runner.calls.clone();
        let files = runner.files.clone();
        let events: Arc<Mutex<Vec<OrchestratorEvent>>> = Arc::default();

        let mut orchestrator = LocalOrchestrator::new(runner, probe, config);
        let sink = events.clone();
        orchestrator.add_event_handler(move |event| sink.lock().unwrap().push(event.clone()));

        Self {
            orchestrator,
            timeline,
            calls,
            files,
            events,
        }
    }

    pub fn healthy() -> Self {
        Self::new(MockRunner::new(), MockProbe::new())
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn timeline(&self) -> Vec<String> {
        self.timeline.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<OrchestratorEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<SessionState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OrchestratorEvent::StateEntered(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    /// Contents of the file passed to the first command matching `matcher`
    pub fn file_passed_to<F>(&self, matcher: F) -> Option<String>
    where
        F: Fn(&CommandSpec) -> bool,
    {
        let command = self.calls().into_iter().find(|c| matcher(c))?;
        let files = self.files.lock().unwrap();
        command
            .arguments()
            .iter()
            .find_map(|arg| files.iter().find(|(path, _)| path == arg).map(|(_, contents)| contents.clone()))
    }

    /// Compose file handed to the first provisioning command
    pub fn compose_file(&self) -> Option<String> {
        let up = self.calls().into_iter().find(|c| is_provisioning(c))?;
        let args = up.arguments();
        let index = args.iter().position(|arg| arg == "-f")?;
        args.get(index + 1).cloned()
    }

    pub fn teardown_count(&self) -> usize {
        self.calls().iter().filter(|c| is_teardown(c)).count()
    }

    pub fn count(&self, matcher: impl Fn(&CommandSpec) -> bool) -> usize {
        self.calls().iter().filter(|c| matcher(c)).count()
    }

    /// Index of the first timeline entry starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.timeline().iter().position(|entry| entry.starts_with(prefix))
    }
}

pub fn is_teardown(command: &CommandSpec) -> bool {
    command.program() == "docker-compose" && command.arguments().last().map(String::as_str) == Some("stop")
}

pub fn is_provisioning(command: &CommandSpec) -> bool {
    command.program() == "docker-compose" && command.arguments().ends_with(&["up".to_string(), "-d".to_string()])
}

pub fn is_push(command: &CommandSpec) -> bool {
    command.program() == "docker" && command.arguments().first().map(String::as_str) == Some("push")
}

/// Matcher for `fly <subcommand> ...`
pub fn fly(subcommand: &'static str) -> impl Fn(&CommandSpec) -> bool + Send + Sync + 'static {
    move |command| command.program() == "fly" && command.arguments().first().map(String::as_str) == Some(subcommand)
}

pub fn request(persist: bool, image: Option<ImageSelection>) -> ExecutionRequest {
    ExecutionRequest {
        task_definition: "platform: linux\n".to_string(),
        artifact_args: vec![
            "--input=book=/tmp/book".to_string(),
            "--output=fetched-book=/data/col123/fetched-book".to_string(),
        ],
        image,
        persist,
    }
}
