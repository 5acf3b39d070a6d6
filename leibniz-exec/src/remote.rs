//! Remote-host backend.
//!
//! Each host runs this same program in single-segment worker mode and
//! prints one `π ≈ <value>` line. Unlike every local backend, those partials
//! arrive already scaled by 4, so the final reduction here is a plain sum.
//! Hosts are contacted sequentially in input order; any failure aborts the
//! run with nothing aggregated.

use crate::error::{ExecError, RemoteError};
use leibniz_core::{even_split, Segment};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Prefix of the one line a single-segment worker prints.
pub const WORKER_OUTPUT_PREFIX: &str = "π ≈ ";

/// Transport for running one segment on one host.
///
/// The backend needs exactly this capability, so the concrete transport
/// (a remote shell today) can be swapped without touching the orchestration.
pub trait RemoteSegmentRunner {
    /// Run `[segment.start, segment.end)` on `host`, returning the
    /// pre-scaled partial printed by the remote worker.
    fn run_segment(&self, host: &str, segment: Segment) -> Result<f64, RemoteError>;
}

/// Runs segments through `ssh <host> <program> --start <s> --end <e>`.
pub struct SshRunner {
    program: PathBuf,
}

impl SshRunner {
    /// Use `program` as the worker executable path on the remote side.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use this binary's own path, assuming an identical install remotely.
    pub fn current_exe() -> Result<Self, ExecError> {
        Ok(Self::new(std::env::current_exe().map_err(ExecError::Spawn)?))
    }
}

impl RemoteSegmentRunner for SshRunner {
    fn run_segment(&self, host: &str, segment: Segment) -> Result<f64, RemoteError> {
        debug!(host, %segment, "remote segment");
        let output = Command::new("ssh")
            .arg(host)
            .arg(&self.program)
            .arg("--start")
            .arg(segment.start.to_string())
            .arg("--end")
            .arg(segment.end.to_string())
            .output()
            .map_err(|source| RemoteError::Launch {
                host: host.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(RemoteError::ExitStatus {
                host: host.to_string(),
                status: output.status,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_worker_line(host, stdout.lines().next().unwrap_or(""))
    }
}

/// Parse the first worker output line, `π ≈ <decimal>`.
fn parse_worker_line(host: &str, line: &str) -> Result<f64, RemoteError> {
    line.trim()
        .strip_prefix(WORKER_OUTPUT_PREFIX)
        .and_then(|rest| rest.trim().parse::<f64>().ok())
        .ok_or_else(|| RemoteError::BadOutput {
            host: host.to_string(),
            line: line.to_string(),
        })
}

/// Remote backend: one even-split segment per host, contacted sequentially.
///
/// The returned sum is not multiplied by 4: the remote workers already
/// scaled their partials.
pub fn run_remote(
    runner: &dyn RemoteSegmentRunner,
    hosts: &[String],
    iterations: u64,
) -> Result<f64, ExecError> {
    let segments = even_split(iterations, hosts.len())?;
    let mut total = 0.0;
    for (host, segment) in hosts.iter().zip(&segments) {
        total += runner.run_segment(host, *segment)?;
    }
    Ok(total)
}
