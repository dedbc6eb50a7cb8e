//! Playwright integration for headless browser automation.
//!
//! This module contains the inline Node.js helper script, error mapping, and
//! availability checks for Node.js and Playwright.
//!
//! The helper opens one page, navigates, prints `{"status":"ready"}` and then
//! answers newline-delimited JSON requests on stdin (`title`, `url`,
//! `accessibility`, `document`, `close`) with one JSON line each on stdout.

use crate::error::{CaptureError, SnapError};
use crate::Result;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Page helper script. Arguments: url, width, height, navigation timeout (ms),
/// network idle timeout (ms), headless flag.
pub(crate) const PAGE_HELPER_SCRIPT: &str = r#"
const [, url, width, height, navTimeout, idleTimeout, headlessFlag] = process.argv;
const readline = require('readline');

function emit(payload) {
  process.stdout.write(JSON.stringify(payload) + '\n');
}

function messageOf(err) {
  return err && err.message ? err.message : String(err);
}

function extractDocument() {
  const elements = [];

  function visit(el, parent) {
    const index = elements.length;
    const record = {
      tag: el.tagName.toLowerCase(),
      attributes: {},
      text: '',
      tabIndex: null,
      boundingBox: null,
      parent,
      children: []
    };
    elements.push(record);

    try {
      for (const attr of el.attributes) {
        record.attributes[attr.name] = attr.value;
      }
      const rendered = typeof el.innerText === 'string' ? el.innerText : el.textContent;
      record.text = rendered || '';
      record.tabIndex = el.hasAttribute('tabindex') ? el.tabIndex : null;
      const rect = el.getBoundingClientRect();
      record.boundingBox = { x: rect.x, y: rect.y, width: rect.width, height: rect.height };
    } catch (err) {
      record.boundingBox = null;
    }

    for (const child of Array.from(el.children)) {
      record.children.push(elements.length);
      visit(child, index);
    }
  }

  if (document.documentElement) {
    visit(document.documentElement, null);
  }
  return { elements };
}

function buildTreeFromCdp(nodes) {
  if (!nodes || nodes.length === 0) return null;
  const byId = new Map(nodes.map((n) => [n.nodeId, n]));

  function convert(node) {
    const children = [];
    for (const id of node.childIds || []) {
      const child = byId.get(id);
      if (!child) continue;
      const converted = convert(child);
      if (child.ignored) {
        children.push(...converted.children);
      } else {
        children.push(converted);
      }
    }
    return {
      role: node.role ? String(node.role.value) : '',
      name: node.name ? String(node.name.value) : '',
      children
    };
  }

  const root = nodes.find((n) => !n.parentId) || nodes[0];
  return convert(root);
}

async function accessibilityTree(page) {
  if (page.accessibility && typeof page.accessibility.snapshot === 'function') {
    return await page.accessibility.snapshot({ interestingOnly: true });
  }
  const client = await page.context().newCDPSession(page);
  try {
    const { nodes } = await client.send('Accessibility.getFullAXTree');
    return buildTreeFromCdp(nodes);
  } finally {
    await client.detach().catch(() => {});
  }
}

async function run() {
  let browser;
  try {
    const { chromium } = require('playwright');
    browser = await chromium.launch({ headless: headlessFlag !== '0' });
    const context = await browser.newContext({
      viewport: {
        width: parseInt(width, 10),
        height: parseInt(height, 10)
      }
    });
    const page = await context.newPage();

    await page.goto(url, { waitUntil: 'load', timeout: parseInt(navTimeout, 10) });
    await page
      .waitForLoadState('networkidle', { timeout: parseInt(idleTimeout, 10) })
      .catch(() => {});
    emit({ status: 'ready' });

    const lines = readline.createInterface({ input: process.stdin, terminal: false });
    for await (const line of lines) {
      if (!line.trim()) continue;
      let request;
      try {
        request = JSON.parse(line);
      } catch (err) {
        continue;
      }
      if (request.op === 'close') {
        emit({ id: request.id, status: 'ok', result: null });
        break;
      }
      try {
        if (page.isClosed()) throw new Error('Target page has been closed');
        let result;
        switch (request.op) {
          case 'title':
            result = await page.title();
            break;
          case 'url':
            result = page.url();
            break;
          case 'accessibility':
            result = await accessibilityTree(page);
            break;
          case 'document':
            result = await page.evaluate(extractDocument);
            break;
          default:
            throw new Error(`unknown op ${request.op}`);
        }
        emit({ id: request.id, status: 'ok', result: result === undefined ? null : result });
      } catch (err) {
        emit({ id: request.id, status: 'error', message: messageOf(err) });
      }
    }
  } catch (err) {
    emit({ status: 'error', message: messageOf(err) });
    process.exitCode = 1;
  } finally {
    if (browser) {
      await browser.close().catch(() => {});
    }
  }
}

run();
"#;

/// Timeout for checking node/playwright availability.
pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Script to check if Playwright is installed.
const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// Error line printed by the helper.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ScriptError {
    pub status: String,
    pub message: String,
}

/// Maps a spawn error to an appropriate SnapError.
pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> SnapError {
    if err.kind() == io::ErrorKind::NotFound {
        SnapError::Config(format!(
            "Unable to spawn Playwright helper; '{}' was not found on PATH",
            command
        ))
    } else {
        SnapError::Io(err)
    }
}

/// Maps helper stderr/stdout output from a failed launch to a SnapError.
pub(crate) fn map_playwright_error(status_text: impl Into<String>, output: &str) -> SnapError {
    if let Ok(error) = serde_json::from_str::<ScriptError>(output.trim()) {
        return map_playwright_status_error(&error.status, error.message);
    }

    let lower = output.to_ascii_lowercase();

    if lower.contains("cannot find module 'playwright'") {
        return SnapError::Config(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        );
    }

    if lower.contains("timeout") {
        return CaptureError::timeout(format!(
            "Playwright timed out loading the page: {}",
            output.trim()
        ))
        .into();
    }

    SnapError::Config(format!(
        "Playwright exited with status {}: {}",
        status_text.into(),
        output.trim()
    ))
}

/// Maps a helper status error to an appropriate SnapError.
pub(crate) fn map_playwright_status_error(status: &str, message: String) -> SnapError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        SnapError::Config(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        )
    } else if lower.contains("timeout") {
        CaptureError::timeout(format!(
            "navigation timed out (status {}): {}",
            status, message
        ))
        .into()
    } else {
        SnapError::Config(format!("Playwright error (status {}): {}", status, message))
    }
}

/// Classifies an error the helper reported for an in-flight page request.
pub(crate) fn classify_page_error(message: &str) -> CaptureError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("has been closed")
        || lower.contains("target closed")
        || lower.contains("detached")
        || lower.contains("execution context was destroyed")
    {
        CaptureError::detached(message)
    } else if lower.contains("timeout") || lower.contains("timed out") {
        CaptureError::timeout(message)
    } else {
        CaptureError::engine_failure(message)
    }
}

/// Ensures Node.js is available on the system.
pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            SnapError::Config(format!(
                "Timed out checking node availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(SnapError::Config(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }

    Ok(())
}

/// Ensures Playwright npm package is installed.
pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            SnapError::Config(format!(
                "Timed out checking Playwright availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_playwright_error(
            format!("{:?}", output.status),
            &stderr,
        ));
    }

    Ok(())
}
