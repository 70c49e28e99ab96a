// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Execution of the authority daemon's control programs (`rndc` and
//! `nsupdate`).
//!
//! The [`Executor`] trait is the seam between the orchestrator and the
//! outside world: it runs a program with arguments and a deadline,
//! optionally feeding it standard input, and reports a
//! [`CommandOutcome`]. [`ProcessExecutor`] implements it with real
//! child processes; tests substitute scripted implementations.
//!
//! Executors never retry. An exit status of zero is a success, and
//! anything else (including death by signal) is an
//! [`ExecError::NonZeroExit`] carrying the captured output. If the
//! deadline passes, the child is killed and [`ExecError::Timeout`] is
//! returned.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};

pub mod nsupdate;
pub mod rndc;

////////////////////////////////////////////////////////////////////////
// OUTCOMES                                                           //
////////////////////////////////////////////////////////////////////////

/// The result of running a program to completion.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutcome {
    /// The exit code, or `None` if the program was terminated by a
    /// signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Returns the text that best explains the outcome: standard error
    /// if the program wrote any, or standard output otherwise.
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }

    /// Classifies the outcome: a zero exit status is a success, and
    /// anything else is [`ExecError::NonZeroExit`].
    pub fn classify(self) -> Result<Self, ExecError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ExecError::NonZeroExit(self))
        }
    }
}

////////////////////////////////////////////////////////////////////////
// EXECUTORS                                                          //
////////////////////////////////////////////////////////////////////////

/// A capability to run external programs.
pub trait Executor: Send + Sync + 'static {
    /// Runs `program` with `args`, waiting at most `timeout` for it to
    /// finish. If `input` is given, it is written to the program's
    /// standard input, which is then closed; otherwise standard input is
    /// empty. A successful result always has a zero exit status.
    fn execute(
        &self,
        program: &Path,
        args: &[String],
        input: Option<&str>,
        timeout: Duration,
    ) -> impl Future<Output = Result<CommandOutcome, ExecError>> + Send;
}

/// An [`Executor`] that spawns child processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    async fn execute(
        &self,
        program: &Path,
        args: &[String],
        input: Option<&str>,
        timeout: Duration,
    ) -> Result<CommandOutcome, ExecError> {
        debug!("Running {} {}.", program.display(), args.join(" "));
        if let Some(input) = input {
            debug!("Input to {}:\n{}", program.display(), input.trim_end());
        }
        let stdin = match input {
            Some(_) => Stdio::piped(),
            None => Stdio::null(),
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ExecError::SpawnFailure)?;
        let stdin_pipe = child.stdin.take();
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let collect = async {
            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            let (status, _, _, _) = tokio::try_join!(
                child.wait(),
                write_input(stdin_pipe, input),
                read_pipe(&mut stdout_pipe, &mut stdout),
                read_pipe(&mut stderr_pipe, &mut stderr),
            )?;
            Ok::<_, io::Error>((status, stdout, stderr))
        };
        let result = tokio::time::timeout(timeout, collect).await;

        match result {
            Ok(Ok((status, stdout, stderr))) => {
                let outcome = CommandOutcome {
                    exit_code: status.code(),
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                };
                debug!(
                    "{} exited with {:?}; stdout: {:?}; stderr: {:?}.",
                    program.display(),
                    outcome.exit_code,
                    outcome.stdout,
                    outcome.stderr,
                );
                outcome.classify()
            }
            Ok(Err(e)) => Err(ExecError::SpawnFailure(e)),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(
                        "Failed to kill {} after it timed out: {}.",
                        program.display(),
                        e
                    );
                }
                Err(ExecError::Timeout { timeout })
            }
        }
    }
}

/// Writes `input` to the child's standard input and closes it. A child
/// that exits without reading all of its input is not an error here;
/// its exit status tells the story.
async fn write_input(pipe: Option<ChildStdin>, input: Option<&str>) -> io::Result<()> {
    let (Some(mut pipe), Some(input)) = (pipe, input) else {
        return Ok(());
    };
    match pipe.write_all(input.as_bytes()).await {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
        _ => Ok(()),
    }
}

async fn read_pipe<R>(pipe: &mut Option<R>, buf: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(pipe) => pipe.read_to_end(buf).await,
        None => Ok(0),
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error that occurs when running an external program.
#[derive(Debug)]
pub enum ExecError {
    /// The program exited unsuccessfully.
    NonZeroExit(CommandOutcome),

    /// The program did not finish within the deadline.
    Timeout { timeout: Duration },

    /// The program could not be started or waited on.
    SpawnFailure(io::Error),
}

impl ExecError {
    /// Returns the captured outcome, if the program ran to completion.
    pub fn outcome(&self) -> Option<&CommandOutcome> {
        match self {
            Self::NonZeroExit(outcome) => Some(outcome),
            _ => None,
        }
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NonZeroExit(outcome) => {
                match outcome.exit_code {
                    Some(code) => write!(f, "command exited with status {}", code)?,
                    None => f.write_str("command was terminated by a signal")?,
                }
                let diagnostic = outcome.diagnostic();
                if diagnostic.is_empty() {
                    Ok(())
                } else {
                    write!(f, ": {}", diagnostic)
                }
            }
            Self::Timeout { timeout } => {
                write!(f, "command timed out after {:.1} s", timeout.as_secs_f64())
            }
            Self::SpawnFailure(e) => write!(f, "failed to run command: {}", e),
        }
    }
}

impl std::error::Error for ExecError {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_prefers_stderr() {
        let mut outcome = CommandOutcome {
            exit_code: Some(1),
            stdout: "out\n".into(),
            stderr: "  \n".into(),
        };
        assert_eq!(outcome.diagnostic(), "out");
        outcome.stderr = "rndc: 'addzone' failed: already exists\n".into();
        assert_eq!(outcome.diagnostic(), "rndc: 'addzone' failed: already exists");
    }

    #[test]
    fn classification_follows_exit_code() {
        let ok = CommandOutcome {
            exit_code: Some(0),
            ..Default::default()
        };
        assert!(ok.classify().is_ok());
        for exit_code in [Some(1), None] {
            let failed = CommandOutcome {
                exit_code,
                stderr: "boom".into(),
                ..Default::default()
            };
            assert!(matches!(failed.classify(), Err(ExecError::NonZeroExit(_))));
        }
    }

    #[cfg(unix)]
    mod process {
        use std::time::Instant;

        use super::*;

        fn sh(script: &str) -> Vec<String> {
            vec!["-c".into(), script.into()]
        }

        #[tokio::test]
        async fn success_captures_stdout() {
            let outcome = ProcessExecutor
                .execute(
                    Path::new("/bin/sh"),
                    &sh("echo zone loaded"),
                    None,
                    Duration::from_secs(10),
                )
                .await
                .unwrap();
            assert_eq!(outcome.exit_code, Some(0));
            assert_eq!(outcome.stdout, "zone loaded\n");
        }

        #[tokio::test]
        async fn input_is_written_to_stdin() {
            let outcome = ProcessExecutor
                .execute(
                    Path::new("/bin/sh"),
                    &sh("tr a-z A-Z"),
                    Some("zone example.com\nsend\n"),
                    Duration::from_secs(10),
                )
                .await
                .unwrap();
            assert_eq!(outcome.stdout, "ZONE EXAMPLE.COM\nSEND\n");
        }

        #[tokio::test]
        async fn unread_input_is_not_an_error() {
            let input = "x".repeat(1 << 20);
            let outcome = ProcessExecutor
                .execute(
                    Path::new("/bin/sh"),
                    &sh("exit 0"),
                    Some(&input),
                    Duration::from_secs(10),
                )
                .await
                .unwrap();
            assert!(outcome.success());
        }

        #[tokio::test]
        async fn non_zero_exit_captures_stderr() {
            let error = ProcessExecutor
                .execute(
                    Path::new("/bin/sh"),
                    &sh("echo 'not found' >&2; exit 1"),
                    None,
                    Duration::from_secs(10),
                )
                .await
                .unwrap_err();
            let outcome = error.outcome().unwrap();
            assert_eq!(outcome.exit_code, Some(1));
            assert_eq!(outcome.diagnostic(), "not found");
            assert_eq!(error.to_string(), "command exited with status 1: not found");
        }

        #[tokio::test]
        async fn timeout_kills_the_child() {
            let start = Instant::now();
            let error = ProcessExecutor
                .execute(
                    Path::new("/bin/sh"),
                    &sh("sleep 30"),
                    None,
                    Duration::from_millis(200),
                )
                .await
                .unwrap_err();
            assert!(matches!(error, ExecError::Timeout { .. }));
            assert!(start.elapsed() < Duration::from_secs(10));
        }

        #[tokio::test]
        async fn missing_program_is_a_spawn_failure() {
            let error = ProcessExecutor
                .execute(
                    Path::new("/nonexistent/zonekeeper-rndc"),
                    &[],
                    None,
                    Duration::from_secs(1),
                )
                .await
                .unwrap_err();
            assert!(matches!(error, ExecError::SpawnFailure(_)));
        }
    }
}
