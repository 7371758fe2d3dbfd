//! # Command Execution Module / 命令执行模块
//!
//! Spawns external compiler processes and captures their output, and
//! extracts readable error text from the compiler's JSON message stream.
//!
//! 派生外部编译器进程并捕获其输出，
//! 并从编译器的 JSON 消息流中提取可读的错误文本。

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::warn;

use crate::core::compiler::CompilerMessage;

/// Extracts and formats compiler errors from JSON message output.
/// It filters for compiler messages, extracts error diagnostics, and prefers
/// the "rendered" text if available.
///
/// # Arguments
/// * `raw_output` - The raw string output from a compiler run.
///
/// # Returns
/// A formatted string containing only the error messages, or a snippet of the
/// raw output if no specific errors can be parsed.
///
/// 从编译器的 JSON 输出中提取并格式化错误。
/// 它会筛选编译器消息，提取错误诊断，并优先使用 "rendered" 输出（如果可用）。
pub fn format_error_output(raw_output: &str) -> String {
    let error_messages: Vec<String> = CompilerMessage::parse_lines(raw_output)
        .filter_map(|msg| match msg {
            CompilerMessage::Diagnostic(diag) if diag.level == "error" => {
                Some(diag.rendered.unwrap_or(diag.message))
            }
            _ => None,
        })
        .collect();

    if error_messages.is_empty() {
        // No structured error: fall back to the head of the raw output.
        let snippet = raw_output.lines().take(50).collect::<Vec<_>>().join("\n");
        format!("Could not parse compiler errors, raw output follows:\n\n{}", snippet)
    } else {
        error_messages.join("\n")
    }
}

/// Spawns a command, captures its stdout and stderr.
/// The output streams are read concurrently and combined into a single string.
///
/// # Arguments
/// * `cmd` - The `tokio::process::Command` to execute.
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 输出流被并发读取并合并到一个字符串中。
pub async fn spawn_and_capture(
    mut cmd: tokio::process::Command,
) -> (std::io::Result<std::process::ExitStatus>, String) {
    let mut child = match cmd
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => {
            return (
                Err(std::io::Error::other("Failed to capture compiler stdout")),
                String::new(),
            );
        }
    };
    let stderr = match child.stderr.take() {
        Some(stderr) => stderr,
        None => {
            return (
                Err(std::io::Error::other("Failed to capture compiler stderr")),
                String::new(),
            );
        }
    };

    // Lines from both streams are appended as they arrive.
    // 两个流的行在到达时被追加。
    let output = Arc::new(tokio::sync::Mutex::new(String::new()));

    let stdout_output = Arc::clone(&output);
    let stdout_handle = tokio::spawn(drain_lines(stdout, stdout_output));

    let stderr_output = Arc::clone(&output);
    let stderr_handle = tokio::spawn(drain_lines(stderr, stderr_output));

    let status = child.wait().await;

    if let Err(e) = stdout_handle.await {
        warn!("Failed to join stdout task: {}", e);
    }
    if let Err(e) = stderr_handle.await {
        warn!("Failed to join stderr task: {}", e);
    }

    let captured = output.lock().await.clone();
    (status, captured)
}

/// Reads `stream` to EOF, appending each line to `output`.
///
/// Lines are decoded lossily; the stream is always read to the end.
///
/// 读取 `stream` 直到 EOF，并将每一行追加到 `output`。
async fn drain_lines<R>(stream: R, output: Arc<tokio::sync::Mutex<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let mut output = output.lock().await;
                output.push_str(&String::from_utf8_lossy(&buf));
                output.push('\n');
            }
            Err(e) => {
                warn!("Failed to read compiler output: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_output_prefers_rendered_errors() {
        let raw = concat!(
            "{\"reason\":\"compiler-message\",\"level\":\"warning\",\"message\":\"unused\"}\n",
            "{\"reason\":\"compiler-message\",\"level\":\"error\",\"message\":\"bad\",\"rendered\":\"error: bad at 3:1\"}\n",
            "{\"reason\":\"compiler-message\",\"level\":\"error\",\"message\":\"worse\"}\n",
        );
        assert_eq!(format_error_output(raw), "error: bad at 3:1\nworse");
    }

    #[test]
    fn format_error_output_falls_back_to_raw_snippet() {
        let raw = "javac: something exploded\nsecond line\n";
        let formatted = format_error_output(raw);
        assert!(formatted.starts_with("Could not parse compiler errors"));
        assert!(formatted.contains("something exploded"));
        assert!(formatted.contains("second line"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_and_capture_collects_both_streams() {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err 1>&2; exit 3");
        let (status, output) = spawn_and_capture(cmd).await;
        assert_eq!(status.unwrap().code(), Some(3));
        assert!(output.contains("out\n"));
        assert!(output.contains("err\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_and_capture_keeps_reading_after_invalid_utf8() {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg("printf 'caf\\351\\r\\n'; echo after");
        let (status, output) = spawn_and_capture(cmd).await;
        assert!(status.unwrap().success());
        assert_eq!(output, "caf\u{FFFD}\nafter\n");
    }

    #[tokio::test]
    async fn spawn_and_capture_reports_missing_program() {
        let cmd = tokio::process::Command::new("this_compiler_definitely_does_not_exist_12345");
        let (status, output) = spawn_and_capture(cmd).await;
        assert!(status.is_err());
        assert!(output.is_empty());
    }
}
