//! External command execution
//!
//! Provisioning scripts and command-backed vault clients go through the
//! `CommandExecutor` trait so they can be exercised without spawning real
//! processes.

use credmount_core::{Error, Result};
use std::io::Write;
use std::process::{Command, Output, Stdio};

/// Trait for executing external commands
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with the given arguments
    fn execute(&self, cmd: &str, args: &[String]) -> Result<Output> {
        self.execute_with(cmd, args, &[], None)
    }

    /// Execute a command with extra environment variables and optional stdin
    fn execute_with(
        &self,
        cmd: &str,
        args: &[String],
        env: &[(String, String)],
        input: Option<&[u8]>,
    ) -> Result<Output>;
}

/// Production implementation that executes real commands
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn execute_with(
        &self,
        cmd: &str,
        args: &[String],
        env: &[(String, String)],
        input: Option<&[u8]>,
    ) -> Result<Output> {
        let spawn_error = |e: std::io::Error| {
            Error::command_execution(
                cmd,
                args.to_vec(),
                format!("failed to execute command: {e}"),
                None,
            )
        };

        let mut child = Command::new(cmd)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let stdin = child.stdin.take();

        // Feed stdin on its own thread while the output pipes drain
        std::thread::scope(|scope| -> Result<Output> {
            let writer = match (stdin, input) {
                (Some(mut stdin), Some(bytes)) => {
                    Some(scope.spawn(move || stdin.write_all(bytes)))
                }
                _ => None,
            };

            let output = child.wait_with_output().map_err(spawn_error)?;

            match writer.map(|handle| handle.join()) {
                None | Some(Ok(Ok(()))) => {}
                Some(Ok(Err(e))) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!(command = cmd, "command exited before reading all of stdin");
                }
                Some(Ok(Err(e))) => return Err(spawn_error(e)),
                Some(Err(_)) => {
                    return Err(Error::command_execution(
                        cmd,
                        args.to_vec(),
                        "stdin writer thread panicked".to_string(),
                        None,
                    ))
                }
            }
            Ok(output)
        })
    }
}

/// Canned response for `TestCommandExecutor`
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status_code: i32,
}

/// One invocation seen by `TestCommandExecutor`
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command: String,
    pub env: Vec<(String, String)>,
    pub input: Option<Vec<u8>>,
}

/// Deterministic executor keyed by the full command line
#[cfg(any(test, feature = "testing"))]
#[derive(Clone, Default)]
pub struct TestCommandExecutor {
    responses: std::sync::Arc<parking_lot::Mutex<std::collections::HashMap<String, TestResponse>>>,
    calls: std::sync::Arc<parking_lot::Mutex<Vec<RecordedCall>>>,
}

#[cfg(any(test, feature = "testing"))]
impl TestCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(cmd: &str, args: &[String]) -> String {
        if args.is_empty() {
            cmd.to_string()
        } else {
            format!("{} {}", cmd, args.join(" "))
        }
    }

    pub fn add_response(&self, cmd: &str, args: &[String], response: TestResponse) {
        self.responses.lock().insert(Self::key(cmd, args), response);
    }

    pub fn add_simple_response(&self, cmd: &str, args: &[String], stdout: &str) {
        self.add_response(
            cmd,
            args,
            TestResponse {
                stdout: stdout.as_bytes().to_vec(),
                stderr: Vec::new(),
                status_code: 0,
            },
        );
    }

    pub fn add_error_response(&self, cmd: &str, args: &[String], stderr: &str, status_code: i32) {
        self.add_response(
            cmd,
            args,
            TestResponse {
                stdout: Vec::new(),
                stderr: stderr.as_bytes().to_vec(),
                status_code,
            },
        );
    }

    /// Every invocation so far, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of invocations of exactly this command line
    pub fn call_count(&self, cmd: &str, args: &[String]) -> usize {
        let key = Self::key(cmd, args);
        self.calls.lock().iter().filter(|c| c.command == key).count()
    }
}

#[cfg(any(test, feature = "testing"))]
impl CommandExecutor for TestCommandExecutor {
    fn execute_with(
        &self,
        cmd: &str,
        args: &[String],
        env: &[(String, String)],
        input: Option<&[u8]>,
    ) -> Result<Output> {
        let key = Self::key(cmd, args);
        self.calls.lock().push(RecordedCall {
            command: key.clone(),
            env: env.to_vec(),
            input: input.map(<[u8]>::to_vec),
        });

        match self.responses.lock().get(&key) {
            Some(response) => Ok(Output {
                status: exit_status::from_code(response.status_code),
                stdout: response.stdout.clone(),
                stderr: response.stderr.clone(),
            }),
            None => Err(Error::command_execution(
                cmd,
                args.to_vec(),
                format!("no test response configured for command: {key}"),
                None,
            )),
        }
    }
}

// Platform-specific construction of an ExitStatus from an exit code
#[cfg(any(test, feature = "testing"))]
mod exit_status {
    #[cfg(unix)]
    pub fn from_code(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    pub fn from_code(code: i32) -> std::process::ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code as u32)
    }
}
