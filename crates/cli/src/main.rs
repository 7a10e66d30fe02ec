// crates/cli/src/main.rs
//! PixelForge demo binary.
//!
//! Loads config, builds the generator backend, submits a batch of sample
//! manuscripts to the scheduler and renders their progress until every job
//! is terminal.

mod args;
mod demo;
mod settings;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use pixelforge_core::create_generator;
use pixelforge_observability::{init_metrics, init_tracing, render_metrics, LogFormat};
use pixelforge_server_jobs::{JobEvent, JobId, JobSnapshot, JobState, Priority, TaskManager};
use tokio::sync::broadcast;

use crate::args::Cli;
use crate::settings::AppConfig;

/// How often finished jobs are dropped from the table.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_tracing(format)?;
    if cli.print_metrics {
        init_metrics();
    }

    let mut config =
        AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(n) = cli.max_concurrent {
        config.scheduler.max_concurrent = n;
    }
    if let Some(ms) = cli.mock_delay_ms {
        config.generator.mock_delay_ms = ms;
    }
    config.validate().context("invalid configuration")?;

    let generator = create_generator(&config.generator)
        .with_context(|| format!("cannot use provider {}", config.generator.provider))?;
    let manager = Arc::new(TaskManager::new(config.scheduler.clone(), generator)?);
    let sweeper = manager.spawn_sweeper(SWEEP_INTERVAL);

    eprintln!(
        "\n  pixelforge v{}: generator {}, {} slots, {} jobs\n",
        env!("CARGO_PKG_VERSION"),
        manager.generator_name(),
        config.scheduler.max_concurrent,
        cli.jobs,
    );

    // Subscribe before submitting so no event is missed.
    let events = manager.subscribe();
    let mut jobs = Vec::with_capacity(cli.jobs);
    for i in 0..cli.jobs {
        let priority = demo::priority(i, cli.priority);
        let id = manager.submit(demo::manuscript(i), priority)?;
        jobs.push((id, priority));
    }

    let progress = if cli.quiet || jobs.is_empty() {
        drop(events);
        None
    } else {
        let style = ProgressStyle::with_template(
            "  {prefix:<44} [{bar:30.cyan/blue}] {pos:>3}% {msg}",
        )?
        .progress_chars("=> ");
        Some(tokio::spawn(show_progress(
            Arc::clone(&manager),
            events,
            jobs.clone(),
            style,
        )))
    };

    let mut finished = Vec::with_capacity(jobs.len());
    for (id, _) in &jobs {
        if let Some(snapshot) = manager.wait(id).await {
            finished.push(snapshot);
        }
    }
    if let Some(progress) = progress {
        progress.await?;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&finished)?);
    } else {
        print_summary(&finished);
    }

    let stats = manager.queue_stats();
    let swept = manager.sweep_finished();
    tracing::info!(tracked = stats.total_tracked, swept, "run complete");

    if let Some(text) = render_metrics() {
        println!("{text}");
    }

    manager.shutdown();
    sweeper.await?;
    Ok(())
}

/// One bar per job, driven by scheduler events until every job is terminal.
async fn show_progress(
    manager: Arc<TaskManager>,
    mut events: broadcast::Receiver<JobEvent>,
    jobs: Vec<(JobId, Priority)>,
    style: ProgressStyle,
) {
    let multi = MultiProgress::new();
    let mut bars: HashMap<JobId, ProgressBar> = HashMap::new();
    for (id, priority) in &jobs {
        let bar = multi.add(ProgressBar::new(100));
        bar.set_style(style.clone());
        bar.set_prefix(format!("{id} ({priority})"));
        bar.set_message("queued");
        bars.insert(id.clone(), bar);
    }

    let mut remaining = bars.len();
    while remaining > 0 {
        match events.recv().await {
            Ok(event) => {
                if let Some(bar) = bars.get(&event.job_id) {
                    remaining -= apply(bar, event.state, event.progress);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress display lagged; resyncing");
                remaining = 0;
                for (id, bar) in &bars {
                    if bar.is_finished() {
                        continue;
                    }
                    match manager.status(id) {
                        Some(snapshot) => {
                            if apply(bar, snapshot.state, snapshot.progress) == 0 {
                                remaining += 1;
                            }
                        }
                        None => bar.finish_with_message("swept"),
                    }
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Update a bar; returns 1 if this finished it.
fn apply(bar: &ProgressBar, state: JobState, progress: u8) -> usize {
    if bar.is_finished() {
        return 0;
    }
    bar.set_position(u64::from(progress));
    if state.is_terminal() {
        bar.finish_with_message(state.as_str());
        1
    } else {
        bar.set_message(state.as_str());
        0
    }
}

fn print_summary(finished: &[JobSnapshot]) {
    eprintln!();
    for snap in finished {
        let mark = match snap.state.surface_status() {
            "completed" => "\u{2713}",
            "cancelled" => "-",
            _ => "\u{2717}",
        };
        let took = match (snap.started_at, snap.completed_at) {
            (Some(start), Some(end)) => {
                format!("{:.1}s", (end - start).num_milliseconds() as f64 / 1000.0)
            }
            _ => "-".to_string(),
        };
        let detail = snap
            .result
            .as_ref()
            .and_then(|r| r["gameName"].as_str().map(str::to_string))
            .or_else(|| snap.error_message.clone())
            .unwrap_or_default();
        eprintln!(
            "  {mark} {} {:<8} {:<9} {:>6}  {}",
            snap.id,
            snap.priority.as_str(),
            snap.state.as_str(),
            took,
            detail
        );
    }
    eprintln!();
}
