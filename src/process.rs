//! Subprocess execution with live output relay.
//!
//! Standard output and standard error of the child share a single OS pipe,
//! so lines arrive in the order the child emitted them. Output is consumed
//! incrementally through [`OutputLines`] and is never buffered as a whole.

use crate::error::{BuilderError, Result};
use std::io::{BufRead, BufReader, PipeReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

/// Terminal status of a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatus {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ProcessStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Lazy, finite sequence of combined output lines.
///
/// Line terminators (`\n`, `\r\n`) are stripped and invalid UTF-8 is
/// replaced. The sequence ends when the child closes its output.
pub struct OutputLines {
    reader: Option<BufReader<PipeReader>>,
    buf: Vec<u8>,
}

impl Iterator for OutputLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        self.buf.clear();

        match reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.reader = None;
                None
            }
            Ok(_) => {
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                Some(String::from_utf8_lossy(&self.buf).into_owned())
            }
            Err(e) => {
                warn!("stopped reading process output: {}", e);
                self.reader = None;
                None
            }
        }
    }
}

/// A spawned child whose output has not necessarily been consumed yet.
pub struct RunningProcess {
    child: Child,
    output: Option<BufReader<PipeReader>>,
}

impl RunningProcess {
    /// Take the output line sequence.
    ///
    /// The sequence can only be taken once; later calls return an empty
    /// sequence.
    pub fn lines(&mut self) -> OutputLines {
        OutputLines {
            reader: self.output.take(),
            buf: Vec::new(),
        }
    }

    /// Block until the child exits.
    ///
    /// Unread output is discarded first so a child blocked on a full pipe
    /// can terminate.
    pub fn wait(mut self) -> Result<ProcessStatus> {
        drop(self.output.take());
        let status = self.child.wait().map_err(|e| {
            BuilderError::Io(format!("failed to wait for process: {}", e))
        })?;
        Ok(ProcessStatus {
            code: status.code(),
        })
    }
}

/// Spawn `argv` in `cwd` with combined stdout/stderr.
pub fn spawn(argv: &[String], cwd: &Path) -> Result<RunningProcess> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| BuilderError::Io("cannot run an empty command".to_string()))?;

    let (reader, writer) = std::io::pipe()
        .map_err(|e| BuilderError::Io(format!("failed to create output pipe: {}", e)))?;
    let stderr_writer = writer
        .try_clone()
        .map_err(|e| BuilderError::Io(format!("failed to create output pipe: {}", e)))?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(stderr_writer);

    debug!("spawning {:?} in {}", argv, cwd.display());
    let child = command.spawn().map_err(|e| {
        BuilderError::Io(format!(
            "failed to execute '{}': {}\n\
             Fix: ensure the command is installed and in PATH.",
            program, e
        ))
    })?;
    // The command still owns the write ends; without dropping them the
    // reader never sees end-of-file.
    drop(command);

    Ok(RunningProcess {
        child,
        output: Some(BufReader::new(reader)),
    })
}

/// Run `argv` to completion, handing every output line to `sink` as it
/// arrives.
pub fn run(argv: &[String], cwd: &Path, sink: &mut dyn FnMut(&str)) -> Result<ProcessStatus> {
    let mut process = spawn(argv, cwd)?;
    for line in process.lines() {
        sink(&line);
    }
    process.wait()
}

/// Executes a build argument vector.
pub trait Executor {
    fn execute(
        &self,
        argv: &[String],
        cwd: &Path,
        sink: &mut dyn FnMut(&str),
    ) -> Result<ProcessStatus>;
}

/// [`Executor`] that runs real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl Executor for ProcessRunner {
    fn execute(
        &self,
        argv: &[String],
        cwd: &Path,
        sink: &mut dyn FnMut(&str),
    ) -> Result<ProcessStatus> {
        run(argv, cwd, sink)
    }
}
