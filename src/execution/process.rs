//! External command supervision
//!
//! Every spawned child is recorded in a [`ChildRegistry`] until its exit is
//! observed, so an [`ExitHook`] can interrupt whatever is still running when
//! the owning process is about to exit with a failure.

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Errors raised by external commands
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code}")]
    Failed {
        program: String,
        code: i32,
        /// Captured standard output, when the command was captured
        output: Option<String>,
    },

    #[error("{program} was terminated by a signal")]
    Signalled { program: String },
}

impl ProcessError {
    /// Exit code of a command that ran to completion
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::Failed { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn captured_output(&self) -> Option<&str> {
        match self {
            ProcessError::Failed { output, .. } => output.as_deref(),
            _ => None,
        }
    }
}

/// Program, arguments and extra environment of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn environment(&self) -> &[(String, String)] {
        &self.env
    }

    /// `program arg1 arg2...` for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
    }
}

/// Seam between the orchestrator and the operating system
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command with inherited stdio until it exits
    async fn run(&self, command: &CommandSpec) -> Result<(), ProcessError>;

    /// Run a command and return its standard output
    async fn capture(&self, command: &CommandSpec) -> Result<String, ProcessError>;
}

/// Live child processes by pid
#[derive(Debug, Clone, Default)]
pub struct ChildRegistry {
    children: Arc<Mutex<HashMap<u32, String>>>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u32, String>> {
        // A panic while holding the lock leaves the map itself intact
        self.children.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn track(&self, pid: u32, program: &str) {
        self.lock().insert(pid, program.to_string());
    }

    pub fn release(&self, pid: u32) {
        self.lock().remove(&pid);
    }

    /// Snapshot of the children whose exit has not been observed yet
    pub fn live(&self) -> Vec<(u32, String)> {
        let mut live: Vec<_> = self
            .lock()
            .iter()
            .map(|(pid, program)| (*pid, program.clone()))
            .collect();
        live.sort();
        live
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Send SIGINT to every live child; returns how many were signalled
    pub fn interrupt_all(&self) -> usize {
        let live = self.live();
        let mut signalled = 0;
        for (pid, program) in &live {
            if interrupt(*pid) {
                debug!("Sent SIGINT to {} (pid {})", program, pid);
                signalled += 1;
            } else {
                warn!("Could not signal {} (pid {})", program, pid);
            }
        }
        signalled
    }
}

#[cfg(unix)]
fn interrupt(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: kill(2) has no memory-safety preconditions
    unsafe { libc::kill(pid, libc::SIGINT) == 0 }
}

#[cfg(not(unix))]
fn interrupt(_pid: u32) -> bool {
    false
}

/// Cleanup to run just before the owning process exits
#[derive(Debug, Clone)]
pub struct ExitHook {
    registry: ChildRegistry,
}

impl ExitHook {
    pub fn new(registry: ChildRegistry) -> Self {
        Self { registry }
    }

    /// Interrupt live children when exiting with a non-zero code
    pub fn on_exit(&self, code: i32) -> usize {
        if code == 0 {
            return 0;
        }
        let signalled = self.registry.interrupt_all();
        if signalled > 0 {
            warn!("Interrupted {} child process(es) on exit code {}", signalled, code);
        }
        signalled
    }

    pub fn exit(&self, code: i32) -> ! {
        self.on_exit(code);
        std::process::exit(code)
    }
}

/// Spawns children with inherited stdio and tracks them until they exit
#[derive(Debug, Clone, Default)]
pub struct ProcessSupervisor {
    registry: ChildRegistry,
}

impl ProcessSupervisor {
    pub fn new(registry: ChildRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ChildRegistry {
        &self.registry
    }

    pub fn spawn(&self, spec: &CommandSpec) -> Result<ChildHandle, ProcessError> {
        self.spawn_with(spec, Stdio::inherit())
    }

    fn spawn_with(&self, spec: &CommandSpec, stdout: Stdio) -> Result<ChildHandle, ProcessError> {
        debug!("Spawning: {}", spec.display());

        let child = spec
            .command()
            .stdin(Stdio::inherit())
            .stdout(stdout)
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let pid = child.id();
        if let Some(pid) = pid {
            self.registry.track(pid, &spec.program);
        }

        Ok(ChildHandle {
            child,
            pid,
            program: spec.program.clone(),
            registry: self.registry.clone(),
        })
    }
}

/// A spawned child; consumed by awaiting its completion
#[derive(Debug)]
pub struct ChildHandle {
    child: Child,
    pid: Option<u32>,
    program: String,
    registry: ChildRegistry,
}

impl ChildHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Resolve once the child exits: `Ok` on exit code zero.
    ///
    /// There is no timeout; a child that never exits blocks forever.
    pub async fn completion(mut self) -> Result<(), ProcessError> {
        let status = self.child.wait().await;
        self.release();
        let status = status.map_err(|source| ProcessError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        check_status(&self.program, status, None)
    }

    async fn output(self) -> Result<String, ProcessError> {
        let program = self.program.clone();
        let pid = self.pid;
        let registry = self.registry.clone();

        let output = self.child.wait_with_output().await;
        if let Some(pid) = pid {
            registry.release(pid);
        }
        let output = output.map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        check_status(&program, output.status, Some(stdout.clone()))?;
        Ok(stdout)
    }

    fn release(&self) {
        if let Some(pid) = self.pid {
            self.registry.release(pid);
        }
    }
}

fn check_status(program: &str, status: ExitStatus, output: Option<String>) -> Result<(), ProcessError> {
    match status.code() {
        Some(0) => Ok(()),
        Some(code) => {
            warn!("{} exited with code {}", program, code);
            Err(ProcessError::Failed {
                program: program.to_string(),
                code,
                output,
            })
        }
        None => Err(ProcessError::Signalled {
            program: program.to_string(),
        }),
    }
}

#[async_trait]
impl CommandRunner for ProcessSupervisor {
    async fn run(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        self.spawn(command)?.completion().await
    }

    async fn capture(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        self.spawn_with(command, Stdio::piped())?.output().await
    }
}
