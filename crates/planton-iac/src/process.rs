//! Subprocess execution with live output

use crate::error::{IacError, Result};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

pub struct CommandOutput {
    pub status: ExitStatus,
    /// stdout and stderr lines, stdout first
    pub combined: String,
}

/// Spawn `cmd`, echo its output to the terminal and keep a copy
pub async fn run_streaming(binary: &str, mut cmd: Command) -> Result<CommandOutput> {
    cmd.stdin(Stdio::inherit());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IacError::BinaryNotFound(binary.to_string()),
        _ => IacError::Io(e),
    })?;

    let stdout = tokio::spawn(tee(child.stdout.take(), false));
    let stderr = tokio::spawn(tee(child.stderr.take(), true));

    let status = child.wait().await?;
    let mut combined = stdout.await.unwrap_or_default();
    combined.push_str(&stderr.await.unwrap_or_default());

    Ok(CommandOutput { status, combined })
}

async fn tee<R>(reader: Option<R>, to_stderr: bool) -> String
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(reader) = reader else {
        return String::new();
    };

    let mut lines = BufReader::new(reader).lines();
    let mut captured = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        if to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
        captured.push_str(&line);
        captured.push('\n');
    }
    captured
}

pub fn exit_code(status: &ExitStatus) -> String {
    status
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}
