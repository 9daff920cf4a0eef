// src/lib.rs

pub mod capture;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod facade;
pub mod logging;
pub mod notify;
pub mod orders;
pub mod rpc;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile};
use crate::engine::{JobEngine, SystemLauncher};
use crate::facade::Dispatcher;
use crate::logging::LogOptions;
use crate::notify::{spawn_dispatcher, HttpTransport};

/// Connection setup bound for deliveries to the messaging endpoint.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and logging
/// - the notification dispatcher
/// - the job engine and façade
/// - the RPC socket
/// - SIGINT/SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let log_file = if args.console { None } else { cfg.log.file.as_deref() };
    logging::init_logging(LogOptions {
        level: args.requested_level(),
        extended: args.extended_log,
        file: log_file,
    })?;

    let cfg = Arc::new(cfg);

    let transport = HttpTransport::from_config(&cfg.telegram).with_connect_timeout(CONNECT_TIMEOUT)?;
    let (notifier, dispatcher_task) = spawn_dispatcher(transport, cfg.telegram.parse_mode);

    let engine = JobEngine::new(
        notifier.clone(),
        Arc::new(SystemLauncher),
        cfg.limits.max_concurrent_jobs,
    );
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&cfg), engine));

    let socket = cfg.rpc.socket.clone();
    let listener = rpc::bind(&socket)
        .with_context(|| format!("binding rpc socket {}", socket.display()))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commands = cfg.commands.len(),
        max_concurrent_jobs = cfg.limits.max_concurrent_jobs,
        "adminagent started"
    );

    if cfg.telegram.admin_chat != 0 {
        let text = format!("🟢 adminagent {} started", env!("CARGO_PKG_VERSION"));
        if let Err(e) = notifier.send_report(cfg.telegram.admin_chat, text, 0) {
            warn!(error = %e, "failed to queue startup notice");
        }
    }
    drop(notifier);

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    let outcome = tokio::select! {
        res = rpc::serve(listener, Arc::clone(&dispatcher)) => {
            res.context("rpc server failed")
        }
        res = tokio::signal::ctrl_c() => {
            info!("SIGINT received; shutting down");
            res.context("listening for SIGINT")
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received; shutting down");
            Ok(())
        }
    };

    if let Err(e) = std::fs::remove_file(&socket) {
        warn!(socket = %socket.display(), error = %e, "could not remove rpc socket");
    }

    // Jobs still running keep their notifier clones; don't wait for them.
    drop(dispatcher);
    dispatcher_task.abort();

    if let Err(e) = &outcome {
        error!(error = %e, "adminagent stopped with error");
    }
    outcome
}

/// Simple dry-run output: print endpoints, paths and jobs.
fn print_dry_run(cfg: &ConfigFile) {
    println!("adminagent dry-run");
    println!("  telegram.api_base = {}", cfg.telegram.api_base);
    println!("  telegram.admin_chat = {}", cfg.telegram.admin_chat);
    println!("  telegram.parse_mode = {}", cfg.telegram.parse_mode.parse_mode());
    println!("  rpc.socket = {}", cfg.rpc.socket.display());
    println!("  paths.tail_log = {}", cfg.paths.tail_log.display());
    println!("  limits.max_concurrent_jobs = {}", cfg.limits.max_concurrent_jobs);
    println!();

    println!("commands ({}):", cfg.commands.len());
    for (name, command) in cfg.commands.iter() {
        println!("  - {name}");
        if let Some(ref title) = command.title {
            println!("      title: {title}");
        }
        println!("      cmd: {}", cfg.expand(&command.cmd));
        println!("      output: {:?}", command.output);
    }
    println!();

    println!("pull:");
    println!("  cmd: {} (in {})", cfg.expand(&cfg.pull.cmd), cfg.paths.git.display());
    println!("export:");
    println!("  cmd: {}", cfg.expand(&cfg.export.cmd));
    println!("  artifact: {}", cfg.expand(&cfg.export.artifact));
    println!("clear:");
    println!("  cmd: {}", cfg.expand(&cfg.clear.cmd));

    debug!("dry-run complete (no execution)");
}
