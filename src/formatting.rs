use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use a11ysnap_lib::{ErrorOutput, SnapError, SnapOutput, Snapshot};

use crate::cli::OutputFormat;

/// Write a captured snapshot in the requested format.
///
/// JSON output is the persisted snapshot form. Pretty output is a human
/// summary on a terminal and indented JSON everywhere else.
pub fn write_snapshot(
    snapshot: &Snapshot,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), SnapError> {
    match format {
        OutputFormat::Json => emit(&snapshot.to_json()?, output)?,
        OutputFormat::Pretty => {
            if use_human(output) {
                println!("{}", format_snapshot(snapshot, true));
            } else {
                emit(&snapshot.to_json_pretty()?, output)?;
            }
        }
    }
    Ok(())
}

/// Write a report envelope in the requested format.
pub fn write_output(
    body: &SnapOutput,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), SnapError> {
    match format {
        OutputFormat::Json => emit(&serde_json::to_string(body)?, output)?,
        OutputFormat::Pretty => {
            if use_human(output) {
                println!("{}", format_pretty(body, true));
            } else {
                emit(&serde_json::to_string_pretty(body)?, output)?;
            }
        }
    }
    Ok(())
}

/// Render an error and return the appropriate exit code.
///
/// `source` names the page or file the command was working on.
pub fn render_error(
    err: SnapError,
    source: Option<&str>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    tracing::debug!(error = %err, source = ?source, "command failed");
    let mut body = ErrorOutput::new(err.to_payload());
    if let Some(source) = source {
        body = body.with_source(source);
    }
    let payload = SnapOutput::Error(body);

    if let Err(write_err) = write_output(&payload, format, output.as_deref()) {
        eprintln!("Failed to write error output: {}", write_err);
        let fallback =
            serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
        println!("{fallback}");
    }

    ExitCode::from(2)
}

fn use_human(output: Option<&Path>) -> bool {
    output.is_none() && io::stdout().is_terminal()
}

/// Write content to file or stdout.
fn emit(content: &str, output: Option<&Path>) -> io::Result<()> {
    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format a snapshot for human consumption in a terminal.
pub fn format_snapshot(snapshot: &Snapshot, colorize: bool) -> String {
    let mut buf = String::new();
    let header = color("[SNAPSHOT]", "36", colorize);
    writeln!(buf, "{} {}", header, display_or_dash(snapshot.title())).ok();
    writeln!(buf, "URL: {}", snapshot.url()).ok();
    writeln!(buf, "Captured: {}", snapshot.timestamp().to_rfc3339()).ok();

    let summary = snapshot.summary();
    writeln!(
        buf,
        "Accessibility tree: {} nodes, depth {}",
        summary.accessibility_nodes, summary.accessibility_depth
    )
    .ok();
    writeln!(buf, "Interactive elements: {}", summary.element_count).ok();

    for element in snapshot.interactive_elements() {
        let label = if element.text.is_empty() {
            element.aria_label.as_str()
        } else {
            element.text.as_str()
        };
        writeln!(
            buf,
            "- {:10} {:40} {} ({}x{} @ {},{})",
            element.element_type,
            color(&element.selector, "33", colorize),
            display_or_dash(label),
            element.bounds.width,
            element.bounds.height,
            element.bounds.x,
            element.bounds.y
        )
        .ok();
    }
    buf
}

/// Format a report envelope for human consumption in a terminal.
pub fn format_pretty(body: &SnapOutput, colorize: bool) -> String {
    match body {
        SnapOutput::Inspect(out) => {
            let mut buf = String::new();
            let header = color("[INSPECT]", "34", colorize);
            writeln!(buf, "{} {}", header, out.source).ok();
            writeln!(buf, "Title: {}", display_or_dash(&out.title)).ok();
            writeln!(buf, "URL: {}", out.url).ok();
            writeln!(buf, "Captured: {}", out.timestamp.to_rfc3339()).ok();
            writeln!(
                buf,
                "Accessibility tree: {} nodes, depth {}",
                out.summary.accessibility_nodes, out.summary.accessibility_depth
            )
            .ok();
            writeln!(buf, "Interactive elements: {}", out.summary.element_count).ok();
            for (kind, count) in &out.summary.by_type {
                writeln!(buf, "- {:12} {}", kind, count).ok();
            }
            buf
        }
        SnapOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            writeln!(buf, "{} {}", header, out.error.message).ok();
            if let Some(source) = &out.source {
                writeln!(buf, "Source: {}", source).ok();
            }
            if let Some(reason) = out.error.reason {
                let retry = if out.error.retryable {
                    "retryable"
                } else {
                    "not retryable"
                };
                writeln!(buf, "Reason: {} ({})", reason, retry).ok();
            }
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

fn display_or_dash(text: &str) -> &str {
    if text.is_empty() {
        "-"
    } else {
        text
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}
