use anyhow::{Context, Result};
use bakery::cli::commands::{EntryCommand, ExecuteCommand, PipelineCommand, TaskCommand};
use bakery::cli::output::*;
use bakery::cli::{Cli, Command};
use bakery::core::queue::QueueEntry;
use bakery::core::PipelineEnvironment;
use bakery::execution::signal::{shutdown_signal, INTERRUPTED_EXIT_CODE};
use bakery::execution::{
    ChildRegistry, ExitHook, HttpReadinessWaiter, LocalOrchestrator, OrchestratorConfig, ProcessSupervisor,
};
use bakery::{pipelines, tasks};
use tracing::{error, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Execute(cmd) => {
            let registry = ChildRegistry::new();
            let exit_hook = ExitHook::new(registry.clone());
            // The session and its temporary files are dropped by now
            let code = execute_stage(cmd, registry).await?;
            if code != 0 {
                exit_hook.exit(code);
            }
        }
        Command::Task(cmd) => print_task(cmd)?,
        Command::Pipeline(cmd) => print_pipeline(cmd)?,
        Command::Entry(cmd) => check_entry(cmd)?,
    }

    Ok(())
}

/// Run one stage and return the process exit code
async fn execute_stage(cmd: &ExecuteCommand, registry: ChildRegistry) -> Result<i32> {
    let options = cmd.options()?;
    let mut orchestrator = LocalOrchestrator::new(
        ProcessSupervisor::new(registry),
        HttpReadinessWaiter::default(),
        OrchestratorConfig::default(),
    );
    orchestrator.add_event_handler(console_handler());

    let stage = cmd.stage.to_stage();
    let source = cmd.task_source();
    println!(
        "{} Running {} for {}",
        INFO,
        style(stage.task_kind()).bold(),
        style(stage.collection_id()).cyan()
    );

    let result = tokio::select! {
        result = orchestrator.run_stage(&stage, &source, &options) => result,
        Ok(signal) = shutdown_signal() => {
            warn!("Interrupted by {}", signal);
            println!("\n{} Interrupted", WARN);
            return Ok(INTERRUPTED_EXIT_CODE);
        }
    };

    match result {
        Ok(()) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(stage.task_kind()).bold(),
                style("successfully").green()
            );
            Ok(0)
        }
        Err(e) => {
            println!("\n{} {} {}", CROSS, style(stage.task_kind()).bold(), style("failed").red());
            if let Some(code) = e.exit_code() {
                println!("  exit code: {}", style(code).red());
            }
            error!("{} ({:?})", e, e.kind());
            Ok(1)
        }
    }
}

fn print_task(cmd: &TaskCommand) -> Result<()> {
    let task = tasks::build_task(&cmd.name, cmd.taskargs.as_deref())
        .with_context(|| format!("Failed to build task {}", cmd.name))?;
    print!("{}", task.to_yaml()?);
    Ok(())
}

fn print_pipeline(cmd: &PipelineCommand) -> Result<()> {
    let mut env = PipelineEnvironment::from_file(&cmd.env).context("Failed to load pipeline environment")?;
    for (key, value) in &cmd.set {
        env.set(key, value);
    }
    env.validate()?;

    let plan = pipelines::assemble(cmd.kind, &env)
        .with_context(|| format!("Failed to assemble {} pipeline", cmd.kind))?;
    print!("{}", plan.to_yaml()?);
    Ok(())
}

fn check_entry(cmd: &EntryCommand) -> Result<()> {
    let json = std::fs::read_to_string(&cmd.file)
        .with_context(|| format!("Failed to read {}", cmd.file.display()))?;
    let entry = QueueEntry::from_json(&json).with_context(|| format!("Invalid queue entry {}", cmd.file.display()))?;
    println!("{} {}", CHECK, entry.summary());
    Ok(())
}
