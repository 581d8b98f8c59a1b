// src/lib.rs

pub mod buffer;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod logging;
pub mod ops;
pub mod pool;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{BuiltGraph, ConfigFile, build_graph, load_and_validate};
use crate::dag::{Scheduler, SchedulerOptions};
use crate::pool::RayonWorkerPool;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - graph file loading
/// - worker pool + scheduler
/// - forward pass, then (optionally) backward pass
/// - printing every buffer and its gradient
pub fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading graph file {:?}", args.config))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let workers = args.workers.unwrap_or(cfg.config.workers);
    let pool = Arc::new(RayonWorkerPool::new(workers)?);
    let built = build_graph(&cfg)?;
    let scheduler = Scheduler::with_options(pool, scheduler_options(&args, &cfg));

    info!(
        workers,
        nodes = built.graph.len(),
        "running forward pass"
    );
    scheduler.forward_synced(&built.graph)?;

    if !args.forward_only {
        info!("running backward pass");
        scheduler.backward(&built.graph)?;
    }

    print_buffers(&built, !args.forward_only);
    Ok(())
}

/// Graph-file scheduler options with any CLI overrides applied.
pub fn scheduler_options(args: &CliArgs, cfg: &ConfigFile) -> SchedulerOptions {
    let mut options = cfg.scheduler_options();
    if let Some(dispatch) = args.dispatch {
        options.dispatch = dispatch;
    }
    if let Some(policy) = args.backward_readiness {
        options.backward_readiness = policy;
    }
    options
}

fn print_buffers(built: &BuiltGraph, with_grad: bool) {
    for (name, buffer) in built.buffers.iter() {
        println!("{name} = {buffer}");
        if with_grad {
            println!("grad({name}) = {}", buffer.display_grad());
        }
    }
}

/// Simple dry-run output: print buffers, ops and their dependencies.
fn print_dry_run(cfg: &ConfigFile) {
    println!("gradflow dry-run");
    println!("  config.workers = {}", cfg.config.workers);
    println!(
        "  config.backward_readiness = {:?}",
        cfg.config.backward_readiness
    );
    println!("  config.dispatch = {:?}", cfg.config.dispatch);
    println!();

    println!("buffers ({}):", cfg.buffer.len());
    for (name, buffer) in cfg.buffer.iter() {
        println!(
            "  - {name}: {}x{} ({:?})",
            buffer.rows, buffer.cols, buffer.fill
        );
    }
    println!();

    println!("ops ({}):", cfg.op.len());
    for (name, op) in cfg.op.iter() {
        println!("  - {name}");
        println!("      kind: {}", op.kind);
        if !op.inputs.is_empty() {
            println!("      inputs: {:?}", op.inputs);
        }
        println!("      output: {}", op.output);
        if !op.after.is_empty() {
            println!("      after: {:?}", op.after);
        }
    }

    debug!("dry-run complete (no execution)");
}
