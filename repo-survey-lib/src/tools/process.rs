use crate::Result;
use core::time::Duration;
use ohno::{IntoAppError, bail};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Log target for streamed tool output
const TOOL_LOG_TARGET: &str = "      tool";

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Text describing a failed run: stderr when there is any, stdout otherwise.
    #[must_use]
    pub fn failure_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// An external program invocation.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub program: &'a str,
    pub args: Vec<String>,
    pub cwd: &'a Path,
    pub timeout: Option<Duration>,
}

impl<'a> Invocation<'a> {
    #[must_use]
    pub fn new(program: &'a str, cwd: &'a Path) -> Self {
        Self {
            program,
            args: Vec::new(),
            cwd,
            timeout: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.to_string()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.program);
        let _ = cmd
            .args(&self.args)
            .current_dir(self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run to completion, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Fails only if the program cannot be started or exceeds its timeout; a non-zero
    /// exit is reported through [`ToolOutput::status`].
    pub async fn run_captured(&self) -> Result<ToolOutput> {
        let child = self
            .command()
            .spawn()
            .into_app_err_with(|| format!("could not start '{}'", self.display()))?;

        let output = with_timeout(self, child.wait_with_output()).await?;
        Ok(ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run to completion, logging each stdout line as it arrives while also buffering it.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub async fn run_streaming(&self) -> Result<ToolOutput> {
        let mut child = self
            .command()
            .spawn()
            .into_app_err_with(|| format!("could not start '{}'", self.display()))?;

        let stdout = child.stdout.take().into_app_err("child stdout was not captured")?;
        let stderr = child.stderr.take().into_app_err("child stderr was not captured")?;

        let run = async {
            let (stdout, stderr) = tokio::join!(stream_lines(stdout), read_all(stderr));
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, stdout?, stderr?))
        };

        let (status, stdout, stderr) = with_timeout(self, run).await?;
        Ok(ToolOutput { status, stdout, stderr })
    }
}

async fn with_timeout<T, F>(invocation: &Invocation<'_>, fut: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    let result = match invocation.timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(r) => r,
            Err(_) => bail!("'{}' timed out after {} seconds", invocation.display(), limit.as_secs()),
        },
        None => fut.await,
    };

    result.into_app_err_with(|| format!("'{}' failed to run", invocation.display()))
}

async fn stream_lines<R: AsyncRead + Unpin>(reader: R) -> std::io::Result<String> {
    let mut reader = BufReader::new(reader);
    let mut collected = String::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(collected);
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\r', '\n']);
        log::info!(target: TOOL_LOG_TARGET, "{text}");
        collected.push_str(text);
        collected.push('\n');
    }
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
