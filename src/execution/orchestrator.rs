//! Local orchestrator: run one stage against a disposable CI instance
//!
//! ```text
//! Provisioning -> [ImagePush] -> AwaitControlPlane -> Sync -> Login
//!     -> Settle -> Execute -> Teardown -> Done
//! ```
//!
//! Any state may fail. Teardown still runs exactly once afterwards unless
//! the caller asked to keep the infrastructure.

use crate::core::image::{ImageError, ImageSelection, LocalRegistry};
use crate::execution::compose::InfrastructureManifest;
use crate::execution::process::{CommandRunner, CommandSpec, ProcessError};
use crate::execution::readiness::{Endpoint, ReadinessError, ReadinessProbe};
use crate::execution::stage::{LocalStage, StageError, TaskSource};
use crate::tasks::TaskArgs;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Provisioning,
    ImagePush,
    AwaitControlPlane,
    Sync,
    Login,
    Settle,
    Execute,
    Teardown,
    Done,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Provisioning => "provisioning",
            SessionState::ImagePush => "image push",
            SessionState::AwaitControlPlane => "waiting for control plane",
            SessionState::Sync => "sync",
            SessionState::Login => "login",
            SessionState::Settle => "settle",
            SessionState::Execute => "execute",
            SessionState::Teardown => "teardown",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a failed invocation is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    SubprocessFailure,
    ReadinessTimeout,
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("{state} failed: {source}")]
    Subprocess {
        state: SessionState,
        #[source]
        source: ProcessError,
    },

    #[error("{state} failed: {source}")]
    Readiness {
        state: SessionState,
        #[source]
        source: ReadinessError,
    },

    #[error("failed to write {what}: {source}")]
    Io {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::Image(_) => ErrorKind::Configuration,
            OrchestratorError::Stage(StageError::BuildTool(_)) => ErrorKind::SubprocessFailure,
            OrchestratorError::Stage(_) => ErrorKind::Configuration,
            OrchestratorError::Subprocess { .. } | OrchestratorError::Io { .. } => {
                ErrorKind::SubprocessFailure
            }
            OrchestratorError::Readiness { .. } => ErrorKind::ReadinessTimeout,
        }
    }

    /// State the session was in when it failed, if it got that far
    pub fn state(&self) -> Option<SessionState> {
        match self {
            OrchestratorError::Subprocess { state, .. } | OrchestratorError::Readiness { state, .. } => {
                Some(*state)
            }
            OrchestratorError::Image(ImageError::MissingLocalPrefix { .. }) => Some(SessionState::ImagePush),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            OrchestratorError::Subprocess { source, .. } => source.exit_code(),
            _ => None,
        }
    }

    pub fn captured_output(&self) -> Option<&str> {
        match self {
            OrchestratorError::Subprocess { source, .. } => source.captured_output(),
            OrchestratorError::Stage(e) => e.captured_output(),
            _ => None,
        }
    }
}

/// Constants of the local environment
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub compose_program: String,
    pub docker_program: String,
    pub fly_program: String,
    pub control_plane_image: String,
    pub control_plane_url: String,
    pub target: String,
    pub username: String,
    pub password: String,
    pub registry: LocalRegistry,
    pub registry_endpoint: Endpoint,
    pub registry_timeout: Duration,
    pub control_plane_endpoint: Endpoint,
    pub control_plane_timeout: Duration,
    pub settle_delay: Duration,
    /// Terminal width forwarded to the submission
    pub columns: Option<usize>,
    /// Where the manifest and task files are written; the system temp dir when unset
    pub work_dir: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            compose_program: "docker-compose".to_string(),
            docker_program: "docker".to_string(),
            fly_program: "fly".to_string(),
            control_plane_image: "concourse/concourse:6.0".to_string(),
            control_plane_url: "http://localhost.localdomain:8080".to_string(),
            target: "bakery-cli".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            registry: LocalRegistry::default(),
            registry_endpoint: Endpoint::Http("http://localhost:5000/v2/_catalog".to_string()),
            registry_timeout: Duration::from_secs(30),
            control_plane_endpoint: Endpoint::Http("http://localhost:8080/api/v1/info".to_string()),
            control_plane_timeout: Duration::from_secs(90),
            settle_delay: Duration::from_secs(5),
            columns: term_size::dimensions().map(|(width, _)| width),
            work_dir: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_columns(mut self, columns: Option<usize>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn with_fly_program(mut self, program: &str) -> Self {
        self.fly_program = program.to_string();
        self
    }

    pub fn with_compose_program(mut self, program: &str) -> Self {
        self.compose_program = program.to_string();
        self
    }

    pub fn with_readiness_timeouts(mut self, registry: Duration, control_plane: Duration) -> Self {
        self.registry_timeout = registry;
        self.control_plane_timeout = control_plane;
        self
    }
}

/// One stage submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Serialized task definition
    pub task_definition: String,
    /// `--input=`/`--output=` arguments
    pub artifact_args: Vec<String>,
    pub image: Option<ImageSelection>,
    /// Keep the infrastructure running afterwards
    pub persist: bool,
}

/// Caller options for a local stage run
#[derive(Debug, Clone, Default)]
pub struct StageOptions {
    pub data_dir: PathBuf,
    pub image: Option<String>,
    pub tag: Option<String>,
    pub persist: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    StateEntered(SessionState),
    WaitingFor { endpoint: String },
    Ready { endpoint: String },
    Pushing { image: String },
    Persisting,
    CapturedOutput(String),
    TeardownFailed(String),
    Finished { success: bool },
}

pub type EventHandler = Arc<dyn Fn(&OrchestratorEvent) + Send + Sync>;

pub struct LocalOrchestrator<R, P> {
    runner: R,
    probe: P,
    config: OrchestratorConfig,
    event_handlers: Vec<EventHandler>,
}

impl<R: CommandRunner, P: ReadinessProbe> LocalOrchestrator<R, P> {
    pub fn new(runner: R, probe: P, config: OrchestratorConfig) -> Self {
        Self {
            runner,
            probe,
            config,
            event_handlers: Vec::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&OrchestratorEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit(&self, event: OrchestratorEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    fn enter(&self, state: SessionState) {
        info!("Entering {}", state);
        self.emit(OrchestratorEvent::StateEntered(state));
    }

    /// Build, prepare and execute one local stage.
    ///
    /// Image selectors are checked before anything is provisioned.
    pub async fn run_stage(
        &self,
        stage: &LocalStage,
        source: &TaskSource,
        options: &StageOptions,
    ) -> Result<(), OrchestratorError> {
        let selection = ImageSelection::from_args(options.image.as_deref(), options.tag.as_deref())?;
        debug!("Image selection: {:?}", selection);

        let mut args = TaskArgs::default();
        if let Some(selection) = &selection {
            args.image = Some(selection.overrides(&self.config.registry));
        }
        let args = stage.task_args(args);

        let task_definition = source.render(stage.task_kind(), &args, &self.runner).await?;
        let prepared = stage.prepare(&options.data_dir)?;

        self.execute(&ExecutionRequest {
            task_definition,
            artifact_args: prepared.artifact_args().to_vec(),
            image: selection,
            persist: options.persist,
        })
        .await
    }

    /// Run a full session for `request`.
    ///
    /// The first error is returned after teardown. A teardown failure only
    /// becomes the result when everything before it succeeded.
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<(), OrchestratorError> {
        let manifest = match InfrastructureManifest::local(&self.config.control_plane_image)
            .materialize_in(&self.config.work_dir())
        {
            Ok(manifest) => manifest,
            Err(source) => {
                // Nothing was provisioned, so there is nothing to tear down
                let e = OrchestratorError::Io {
                    what: "infrastructure manifest",
                    source,
                };
                self.fail(&e);
                self.emit(OrchestratorEvent::Finished { success: false });
                return Err(e);
            }
        };
        let compose_file = manifest.path().display().to_string();

        let result = self.session(&compose_file, request).await;

        if let Err(e) = &result {
            self.fail(e);
        }

        let teardown = if request.persist {
            info!("Persisting containers");
            self.emit(OrchestratorEvent::Persisting);
            Ok(())
        } else {
            self.teardown(&compose_file).await
        };

        let outcome = match (result, teardown) {
            (Ok(()), teardown) => teardown,
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown_error)) => {
                error!("Teardown failed: {}", teardown_error);
                self.emit(OrchestratorEvent::TeardownFailed(teardown_error.to_string()));
                Err(e)
            }
        };

        if outcome.is_ok() {
            self.enter(SessionState::Done);
        }
        self.emit(OrchestratorEvent::Finished {
            success: outcome.is_ok(),
        });
        outcome
    }

    fn fail(&self, e: &OrchestratorError) {
        error!("{}", e);
        self.enter(SessionState::Failed);
        if let Some(output) = e.captured_output() {
            self.emit(OrchestratorEvent::CapturedOutput(output.to_string()));
        }
    }

    async fn session(&self, compose_file: &str, request: &ExecutionRequest) -> Result<(), OrchestratorError> {
        self.enter(SessionState::Provisioning);
        let up = CommandSpec::new(&self.config.compose_program).args(["-f", compose_file, "up", "-d"]);
        self.run(SessionState::Provisioning, &up).await?;

        if let Some(reference) = request.image.as_ref().and_then(ImageSelection::push_reference) {
            self.push_image(reference).await?;
        }

        self.enter(SessionState::AwaitControlPlane);
        self.wait(
            SessionState::AwaitControlPlane,
            &self.config.control_plane_endpoint,
            self.config.control_plane_timeout,
        )
        .await?;

        let url = self.config.control_plane_url.as_str();
        let target = self.config.target.as_str();

        self.enter(SessionState::Sync);
        self.run(SessionState::Sync, &self.fly().args(["sync", "-c", url])).await?;

        self.enter(SessionState::Login);
        let login = self.fly().args([
            "login",
            "-k",
            "-t",
            target,
            "-c",
            url,
            "-u",
            self.config.username.as_str(),
            "-p",
            self.config.password.as_str(),
        ]);
        self.run(SessionState::Login, &login).await?;

        self.enter(SessionState::Settle);
        tokio::time::sleep(self.config.settle_delay).await;

        self.enter(SessionState::Execute);
        let task_file = write_task_file(&request.task_definition, &self.config.work_dir())?;
        let mut execute = self
            .fly()
            .args(["execute", "-t", target, "--include-ignored", "-c"])
            .arg(task_file.path().display().to_string())
            .args(request.artifact_args.iter().cloned());
        if let Some(columns) = self.config.columns {
            execute = execute.env("COLUMNS", columns.to_string());
        }
        info!("Executing: {}", execute.display());
        self.run(SessionState::Execute, &execute).await
    }

    async fn push_image(&self, reference: &str) -> Result<(), OrchestratorError> {
        self.enter(SessionState::ImagePush);
        self.wait(
            SessionState::ImagePush,
            &self.config.registry_endpoint,
            self.config.registry_timeout,
        )
        .await?;

        if self.config.registry.strip(reference).is_none() {
            return Err(ImageError::MissingLocalPrefix {
                image: reference.to_string(),
                prefix: self.config.registry.host_prefix.clone(),
            }
            .into());
        }

        info!("Uploading image: {}", reference);
        self.emit(OrchestratorEvent::Pushing {
            image: reference.to_string(),
        });
        let push = CommandSpec::new(&self.config.docker_program).args(["push", reference]);
        self.run(SessionState::ImagePush, &push).await
    }

    async fn teardown(&self, compose_file: &str) -> Result<(), OrchestratorError> {
        self.enter(SessionState::Teardown);
        let stop = CommandSpec::new(&self.config.compose_program).args(["-f", compose_file, "stop"]);
        self.run(SessionState::Teardown, &stop).await
    }

    fn fly(&self) -> CommandSpec {
        CommandSpec::new(&self.config.fly_program)
    }

    async fn run(&self, state: SessionState, command: &CommandSpec) -> Result<(), OrchestratorError> {
        self.runner
            .run(command)
            .await
            .map_err(|source| OrchestratorError::Subprocess { state, source })
    }

    async fn wait(&self, state: SessionState, endpoint: &Endpoint, timeout: Duration) -> Result<(), OrchestratorError> {
        let name = endpoint.to_string();
        info!("Waiting for {}", name);
        self.emit(OrchestratorEvent::WaitingFor { endpoint: name.clone() });
        self.probe
            .wait_until_ready(endpoint, timeout)
            .await
            .map_err(|source| OrchestratorError::Readiness { state, source })?;
        self.emit(OrchestratorEvent::Ready { endpoint: name });
        Ok(())
    }
}

fn write_task_file(definition: &str, dir: &Path) -> Result<tempfile::NamedTempFile, OrchestratorError> {
    let io_err = |source| OrchestratorError::Io {
        what: "task definition",
        source,
    };
    let mut file = tempfile::Builder::new()
        .prefix("bakery-task-")
        .suffix(".yml")
        .tempfile_in(dir)
        .map_err(io_err)?;
    file.write_all(definition.as_bytes()).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(file)
}
