use std::fs;
use std::io::{self, ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use crate::comparator::parse::parse_dockq_report;
use crate::comparator::{ComparatorError, StructuralComparator};
use crate::config::ScorerConfig;
use crate::model::{EvaluationTriple, ScoreFailure, ScoreOutcome};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const PIPE_GRACE: Duration = Duration::from_millis(100);
const STDERR_TAIL: usize = 400;

/// Runs the DockQ executable once per pair:
/// `<program> [leading args] <model> <native> --mapping <m:n> --json <report>`.
#[derive(Debug, Clone)]
pub struct DockQCommand {
    program: PathBuf,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl DockQCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &ScorerConfig) -> Self {
        Self::new(config.program.clone())
            .with_leading_args(config.leading_args.clone())
            .with_timeout(config.timeout)
    }

    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, triple: &EvaluationTriple) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg(&triple.model_path)
            .arg(&triple.native_path)
            .arg("--mapping")
            .arg(triple.mapping.to_string())
            .arg("--json")
            .arg(&triple.report_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        own_process_group(&mut cmd);
        cmd
    }
}

impl StructuralComparator for DockQCommand {
    fn name(&self) -> &str {
        "DockQ"
    }

    fn compare(&self, triple: &EvaluationTriple) -> Result<ScoreOutcome, ComparatorError> {
        let io_err = |source: io::Error| ComparatorError::Io {
            key: triple.key.to_string(),
            source,
        };

        match fs::remove_file(&triple.report_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(e)),
        }

        let mut child = match self.command(triple).spawn() {
            Ok(child) => child,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                return Err(ComparatorError::ProgramUnavailable {
                    program: self.program.clone(),
                    source: e,
                });
            }
            Err(e) => return Ok(ScoreOutcome::Failed(ScoreFailure::Spawn(e.to_string()))),
        };

        let deadline = Instant::now() + self.timeout;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = wait_with_deadline(&mut child, deadline).map_err(io_err)?;

        // Descendants of the scorer may keep the pipes open past its exit.
        let pipe_deadline = deadline.max(Instant::now() + PIPE_GRACE);
        let stdout = collect(stdout, pipe_deadline);
        let stderr = collect(stderr, pipe_deadline);

        if !stdout.trim().is_empty() {
            tracing::debug!("{} stdout: {}", triple.key, stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            tracing::debug!("{} stderr: {}", triple.key, stderr.trim_end());
        }

        let Some(status) = status else {
            tracing::warn!("{} killed after {:?}", triple.key, self.timeout);
            return Ok(ScoreOutcome::Failed(ScoreFailure::TimedOut {
                limit: self.timeout,
            }));
        };
        if !status.success() {
            return Ok(ScoreOutcome::Failed(ScoreFailure::NonZeroExit {
                code: status.code(),
                stderr: tail(&stderr, STDERR_TAIL),
            }));
        }

        let bytes = match fs::read(&triple.report_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(ScoreOutcome::Failed(ScoreFailure::MissingReport(
                    triple.report_path.clone(),
                )));
            }
            Err(e) => return Err(io_err(e)),
        };

        Ok(match parse_dockq_report(&bytes, &triple.mapping) {
            Ok(report) => ScoreOutcome::Scored(report),
            Err(failure) => ScoreOutcome::Failed(failure),
        })
    }
}

/// Waits for `child`, killing its process group at `deadline`. `None` means killed.
fn wait_with_deadline(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            kill_scorer(child)?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

/// Kills the scorer and everything it started. Must run before the child is reaped.
#[cfg(unix)]
fn kill_scorer(child: &mut Child) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(child.id())
        .map_err(|_| io::Error::from(ErrorKind::InvalidInput))?;
    // SAFETY: kill(2) takes no pointers; a negative pid addresses the process group.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
fn kill_scorer(child: &mut Child) -> io::Result<()> {
    match child.kill() {
        Err(e) if e.kind() != ErrorKind::InvalidInput => Err(e),
        _ => Ok(()),
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// Output read by the drain thread, or empty if the pipe is still open at `deadline`.
fn collect(pipe: Option<Receiver<Vec<u8>>>, deadline: Instant) -> String {
    pipe.and_then(|rx| {
        rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .ok()
    })
    .map(|buf| String::from_utf8_lossy(&buf).into_owned())
    .unwrap_or_default()
}

fn tail(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let n = trimmed.chars().count();
    if n <= max_chars {
        return trimmed.to_string();
    }
    let skip = n - max_chars;
    format!("...{}", trimmed.chars().skip(skip).collect::<String>())
}

#[cfg(test)]
#[path = "../../tests/src_inline/comparator/dockq.rs"]
mod tests;
