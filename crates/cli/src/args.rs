// crates/cli/src/args.rs
use std::path::PathBuf;

use clap::Parser;
use pixelforge_server_jobs::Priority;

/// PixelForge - run manuscript-to-prototype jobs through the scheduler
#[derive(Parser, Debug)]
#[command(name = "pixelforge")]
#[command(version)]
#[command(about = "Submit sample generation jobs and watch them run", long_about = None)]
pub struct Cli {
    /// TOML config file with [scheduler] and [generator] tables
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Number of sample jobs to submit
    #[arg(short = 'n', long = "jobs", default_value_t = 5)]
    pub jobs: usize,

    /// Priority for every job (critical, high, normal, low); mixed if omitted
    #[arg(short = 'p', long = "priority", value_parser = parse_priority)]
    pub priority: Option<Priority>,

    /// Override scheduler.max_concurrent
    #[arg(long = "max-concurrent")]
    pub max_concurrent: Option<usize>,

    /// Override generator.mock_delay_ms
    #[arg(long = "mock-delay-ms")]
    pub mock_delay_ms: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long = "json-logs")]
    pub json_logs: bool,

    /// Print final job snapshots as JSON instead of a summary table
    #[arg(long = "json")]
    pub json: bool,

    /// Print Prometheus metrics after the run
    #[arg(long = "print-metrics")]
    pub print_metrics: bool,

    /// Hide progress bars
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    raw.parse().map_err(|e: pixelforge_server_jobs::SchedulerError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["pixelforge"]).unwrap();
        assert_eq!(cli.jobs, 5);
        assert!(cli.priority.is_none());
        assert!(cli.config.is_none());
        assert!(!cli.print_metrics);
    }

    #[test]
    fn test_priority_flag() {
        let cli = Cli::try_parse_from(["pixelforge", "-p", "high", "-n", "2"]).unwrap();
        assert_eq!(cli.priority, Some(Priority::High));
        assert_eq!(cli.jobs, 2);

        assert!(Cli::try_parse_from(["pixelforge", "--priority", "urgent"]).is_err());
    }
}
