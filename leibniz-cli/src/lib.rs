#![warn(missing_docs)]
//! Command-line surface for the leibniz engine.
//!
//! Thin glue around `leibniz-exec`: flag parsing, config layering, backend
//! selection, and the three-line report. Two hidden flags switch the binary
//! into its worker modes: `--queue-worker` for the process backends, and
//! `--start`/`--end` for the remote backend's single-segment workers.

mod config;

pub use config::{DefaultsConfig, LeibnizConfig, RemoteConfig};

use clap::Parser;
use leibniz_core::{partial_sum, reduce, Segment};
use leibniz_exec::{
    run, run_with_remote, Backend, QueueWorkerMain, RunResult, SshRunner,
};
use thiserror::Error;
use tracing::debug;

/// Parallel Leibniz π calculator.
#[derive(Parser, Debug)]
#[command(name = "leibniz")]
#[command(author, version, about = "Approximate π by parallel reduction of the Leibniz series")]
pub struct Cli {
    /// Number of series terms to sum
    #[arg(short, long)]
    pub iterations: Option<u64>,

    /// Worker thread count for the thread backends
    /// (default: available parallelism)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Worker process count for the process-queue backend
    /// (default: half the available parallelism)
    #[arg(short = 'p', long)]
    pub processes: Option<usize>,

    /// Fan out one thread per even-split segment
    #[arg(long)]
    pub fan_out: bool,

    /// Producer-consumer threads over in-process queues
    #[arg(long)]
    pub thread_queue: bool,

    /// Producer-consumer worker processes over framed pipes
    #[arg(long)]
    pub process_queue: bool,

    /// Scatter/gather across a fixed pool of N worker processes
    #[arg(long, value_name = "N")]
    pub pool: Option<usize>,

    /// Comma-separated hosts; one even-split segment per host over ssh
    #[arg(long, value_delimiter = ',')]
    pub hosts: Option<Vec<String>>,

    /// Manual mode: number of sequential segments
    #[arg(short = 's', long)]
    pub segments: Option<u64>,

    /// Manual mode: indices per segment
    #[arg(long)]
    pub seg_size: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Internal: first index of a single-segment worker
    #[arg(long, hide = true)]
    pub start: Option<u64>,

    /// Internal: one past the last index of a single-segment worker
    #[arg(long, hide = true)]
    pub end: Option<u64>,

    /// Internal: run as a queue worker (used by the process backends)
    #[arg(long, hide = true)]
    pub queue_worker: bool,
}

/// Configuration problems reported before any work starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No mode flag and no iteration count.
    #[error("no computation mode selected")]
    NoMode,

    /// More than one mutually-exclusive mode flag.
    #[error("conflicting computation modes: {0} and {1}")]
    ConflictingModes(&'static str, &'static str),

    /// `--hosts` needs an iteration count to partition.
    #[error("--hosts requires --iterations")]
    HostsWithoutIterations,

    /// A mode flag was given without an iteration count.
    #[error("--iterations is required for this mode")]
    MissingIterations,

    /// Zero series terms requested.
    #[error("--iterations must be at least 1")]
    ZeroIterations,

    /// A worker or segment count of zero.
    #[error("{0} must be at least 1")]
    MustBePositive(&'static str),

    /// The host list parsed to nothing.
    #[error("--hosts needs at least one host")]
    NoHosts,

    /// Manual mode needs both of its flags.
    #[error("--segments and --seg-size must be given together")]
    ManualModeIncomplete,
}

/// Resolved inputs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// The selected backend.
    pub backend: Backend,
    /// Series terms to sum (zero only in manual mode, which carries its own
    /// range).
    pub iterations: u64,
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

fn default_processes() -> usize {
    (default_threads() / 2).max(1)
}

fn positive(value: usize, flag: &'static str) -> Result<usize, ConfigError> {
    if value == 0 {
        Err(ConfigError::MustBePositive(flag))
    } else {
        Ok(value)
    }
}

impl Cli {
    /// Pick exactly one backend from the mode flags, layered over `config`
    /// defaults. Absence and conflict are both rejected before any work
    /// starts.
    pub fn resolve_backend(&self, config: &LeibnizConfig) -> Result<RunPlan, ConfigError> {
        let mut modes: Vec<&'static str> = Vec::new();
        if self.fan_out {
            modes.push("--fan-out");
        }
        if self.thread_queue {
            modes.push("--thread-queue");
        }
        if self.process_queue {
            modes.push("--process-queue");
        }
        if self.pool.is_some() {
            modes.push("--pool");
        }
        if self.hosts.is_some() {
            modes.push("--hosts");
        }
        if self.segments.is_some() || self.seg_size.is_some() {
            modes.push("--segments/--seg-size");
        }
        if modes.len() > 1 {
            return Err(ConfigError::ConflictingModes(modes[0], modes[1]));
        }

        if self.iterations == Some(0) {
            return Err(ConfigError::ZeroIterations);
        }

        let plan = if self.fan_out {
            RunPlan {
                backend: Backend::FanOut {
                    threads: self.thread_count(config)?,
                },
                iterations: self.require_iterations()?,
            }
        } else if self.thread_queue {
            RunPlan {
                backend: Backend::ThreadQueue {
                    threads: self.thread_count(config)?,
                },
                iterations: self.require_iterations()?,
            }
        } else if self.process_queue {
            RunPlan {
                backend: Backend::ProcessQueue {
                    processes: self.process_count(config)?,
                },
                iterations: self.require_iterations()?,
            }
        } else if let Some(size) = self.pool {
            RunPlan {
                backend: Backend::Pool {
                    size: positive(size, "--pool")?,
                },
                iterations: self.require_iterations()?,
            }
        } else if let Some(hosts) = &self.hosts {
            let iterations = self
                .iterations
                .ok_or(ConfigError::HostsWithoutIterations)?;
            if hosts.is_empty() {
                return Err(ConfigError::NoHosts);
            }
            RunPlan {
                backend: Backend::Remote {
                    hosts: hosts.clone(),
                },
                iterations,
            }
        } else if self.segments.is_some() || self.seg_size.is_some() {
            let (Some(segments), Some(seg_size)) = (self.segments, self.seg_size) else {
                return Err(ConfigError::ManualModeIncomplete);
            };
            if segments == 0 {
                return Err(ConfigError::MustBePositive("--segments"));
            }
            if seg_size == 0 {
                return Err(ConfigError::MustBePositive("--seg-size"));
            }
            RunPlan {
                backend: Backend::Manual { segments, seg_size },
                iterations: 0,
            }
        } else if self.iterations.is_some() {
            RunPlan {
                backend: Backend::Sequential,
                iterations: self.require_iterations()?,
            }
        } else {
            return Err(ConfigError::NoMode);
        };

        Ok(plan)
    }

    fn require_iterations(&self) -> Result<u64, ConfigError> {
        self.iterations.ok_or(ConfigError::MissingIterations)
    }

    fn thread_count(&self, config: &LeibnizConfig) -> Result<usize, ConfigError> {
        positive(
            self.threads
                .or(config.defaults.threads)
                .unwrap_or_else(default_threads),
            "--threads",
        )
    }

    fn process_count(&self, config: &LeibnizConfig) -> Result<usize, ConfigError> {
        positive(
            self.processes
                .or(config.defaults.processes)
                .unwrap_or_else(default_processes),
            "--processes",
        )
    }
}

/// Entry point used by the `leibniz` binary.
pub fn run_cli() -> anyhow::Result<()> {
    run_with_cli(Cli::parse())
}

/// Run with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Worker modes come first, before logging or config discovery: stdout
    // may be the IPC transport, and a worker must never print the report.
    if cli.queue_worker {
        let mut worker = QueueWorkerMain::new();
        return worker
            .run()
            .map_err(|e| anyhow::anyhow!("queue worker error: {e}"));
    }
    if let (Some(start), Some(end)) = (cli.start, cli.end) {
        return run_segment_worker(start, end);
    }

    init_tracing(cli.verbose);

    let config = LeibnizConfig::discover().unwrap_or_default();
    let plan = cli.resolve_backend(&config)?;
    debug!(backend = ?plan.backend, iterations = plan.iterations, "resolved run plan");

    let result = match &plan.backend {
        Backend::Remote { .. } => {
            let runner = match &config.remote.program {
                Some(program) => SshRunner::new(program),
                None => SshRunner::current_exe()?,
            };
            run_with_remote(&plan.backend, plan.iterations, &runner)?
        }
        _ => run(&plan.backend, plan.iterations)?,
    };

    print!("{}", format_run_result(&result));
    Ok(())
}

/// Single-segment worker used by the remote backend: print one pre-scaled
/// line and exit.
fn run_segment_worker(start: u64, end: u64) -> anyhow::Result<()> {
    if end < start {
        anyhow::bail!("--end must not precede --start");
    }
    let value = reduce([partial_sum(Segment::new(start, end))]);
    println!("π ≈ {value}");
    Ok(())
}

/// The three-line report: approximation, absolute error, elapsed seconds.
pub fn format_run_result(result: &RunResult) -> String {
    format!(
        "π ≈ {}\nError = {}\nTime elapsed: {:.4}s\n",
        result.approximation,
        result.error,
        result.elapsed.as_secs_f64()
    )
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "leibniz_core=debug,leibniz_exec=debug,leibniz_cli=debug"
    } else {
        "leibniz_core=info,leibniz_exec=info,leibniz_cli=info"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
