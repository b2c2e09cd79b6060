// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod registry;
pub mod reload;
pub mod runner;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::RealRunBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::registry::TaskRegistry;
use crate::reload::server::spawn_reload_server;
use crate::reload::ReloadHub;
use crate::runner::Runner;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the task registry
/// - a one-shot build of the selected tasks
/// - if a selected task watches: the reload listener, the file watcher,
///   Ctrl-C handling and the runtime loop
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let registry = Arc::new(TaskRegistry::from_config(&cfg)?);

    if args.dry_run {
        print_dry_run(&registry);
        return Ok(());
    }

    let selected = args.selected_tasks();
    for name in &selected {
        // Fail on typos before anything is built.
        registry.execution_order(name)?;
    }

    let base = config_root_dir(&config_path);
    let section = cfg.config_section();
    let source_root = base.join(&section.source_root);
    let dest_root = base.join(&section.dest_root);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let runner = Arc::new(Runner::new(
        Arc::clone(&registry),
        Arc::clone(&fs),
        &source_root,
        &dest_root,
    ));

    let mut failure = None;
    for name in &selected {
        let report = runner.run(name).await?;
        for task in report.executed() {
            debug!(task = %task, invocation = %name, "task finished");
        }
        if let Some((task, e)) = report.first_error() {
            error!(task = %task, error = %e, "task failed");
            if failure.is_none() {
                failure = Some(format!("task '{task}' failed: {e}"));
            }
        } else {
            info!(task = %name, changed = report.changed_paths().len(), "build finished");
        }
    }

    let watching = selected.iter().any(|t| registry.enters_watch_mode(t));
    if !watching {
        return match failure {
            Some(msg) => bail!(msg),
            None => Ok(()),
        };
    }

    let hub = ReloadHub::new();
    let _reload_server = if section.reload_addr.is_empty() {
        info!("reload listener disabled");
        None
    } else {
        Some(spawn_reload_server(&section.reload_addr, hub.clone()).await?)
    };

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let _watcher_handle = crate::watch::spawn_watcher(
        &source_root,
        registry.watch_rules().to_vec(),
        rt_tx.clone(),
        Arc::clone(&fs),
    )?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let backend = RealRunBackend::new(runner, rt_tx);
    let core = CoreRuntime::new(
        section.triggered_while_running_behaviour,
        RuntimeOptions::default(),
    );
    info!(rules = registry.watch_rules().len(), "watching for changes");
    Runtime::new(core, rt_rx, backend, hub).run().await?;
    Ok(())
}

/// Directory that `source_root` and `dest_root` are relative to.
///
/// A bare filename like "Assetdag.toml" (parent = "") means the current
/// working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Dry-run output: tasks in registration order, then watch rules.
fn print_dry_run(registry: &TaskRegistry) {
    println!("assetdag dry-run");
    println!();

    println!("tasks ({}):", registry.tasks().len());
    for task in registry.tasks() {
        match task.help_text() {
            Some(help) => println!("  - {}  ({help})", task.name()),
            None => println!("  - {}", task.name()),
        }
        if !task.deps().is_empty() {
            println!("      after: {:?}", task.deps());
        }
        if !task.is_aggregate() {
            println!("      src: {:?}", task.src_globs());
            println!("      dest: {}", task.dest_dir().display());
            println!("      steps: {}", task.step_names().join(" -> "));
        }
        if task.watches() {
            println!("      watch: true");
        }
    }

    println!();
    println!("watch rules ({}):", registry.watch_rules().len());
    for rule in registry.watch_rules() {
        println!("  - {:?}", rule.globs());
        if !rule.tasks().is_empty() {
            println!("      tasks: {:?}", rule.tasks());
        }
        if rule.reload() {
            println!("      reload: true");
        }
    }

    debug!("dry-run complete (no execution)");
}
