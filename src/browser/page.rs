//! Live page handle backed by a Playwright helper process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, OwnedSemaphorePermit};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use super::dom::{convert_raw_document, RawDocument};
use super::manager::BrowserOptions;
use super::playwright::{
    classify_page_error, map_playwright_error, map_playwright_status_error, map_spawn_error,
    PAGE_HELPER_SCRIPT,
};
use crate::error::{CaptureError, SnapError};
use crate::json::{from_str_unbounded, from_value_unbounded};
use crate::page::{PageHandle, RawAxNode};
use crate::types::DomTree;
use crate::Result;

/// Grace period for the helper to exit after a `close` request.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
struct HelperRequest<'a> {
    id: u64,
    op: &'a str,
}

#[derive(Debug, Deserialize)]
struct HelperResponse {
    #[serde(default)]
    id: Option<u64>,
    status: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

struct HelperSession {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl HelperSession {
    /// Sends one request and waits for the response carrying its id.
    ///
    /// Responses to earlier, abandoned requests are discarded.
    async fn exchange(&mut self, id: u64, op: &str) -> std::result::Result<Value, CaptureError> {
        let mut line = serde_json::to_string(&HelperRequest { id, op })
            .map_err(|err| CaptureError::engine_failure(err.to_string()))?;
        line.push('\n');

        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|err| CaptureError::detached(format!("page helper is gone: {err}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|err| CaptureError::detached(format!("page helper is gone: {err}")))?;

        loop {
            let next = self
                .lines
                .next_line()
                .await
                .map_err(|err| CaptureError::detached(format!("page helper is gone: {err}")))?;
            let Some(raw) = next else {
                return Err(CaptureError::detached("page helper exited"));
            };
            if let Some(reply) = interpret_line(&raw, id, op) {
                return reply;
            }
        }
    }
}

/// Reads one helper output line while waiting for response `id`.
///
/// Returns `None` for lines that are not the awaited response: stale replies
/// and stray output. A line that starts with the awaited id but cannot be
/// decoded is the reply, and fails as an engine failure.
fn interpret_line(raw: &str, id: u64, op: &str) -> Option<std::result::Result<Value, CaptureError>> {
    let line = raw.trim();
    let response: HelperResponse = match from_str_unbounded(line) {
        Ok(response) => response,
        Err(err) if leading_id(line) == Some(id) => {
            return Some(Err(CaptureError::engine_failure(format!(
                "unreadable {op} response from page helper: {err}"
            ))));
        }
        Err(_) => {
            trace!(line = %raw, "ignoring non-protocol helper output");
            return None;
        }
    };
    if response.id != Some(id) {
        trace!(expected = id, got = ?response.id, "discarding stale helper response");
        return None;
    }
    Some(if response.status == "ok" {
        Ok(response.result.unwrap_or(Value::Null))
    } else {
        let message = response
            .message
            .unwrap_or_else(|| format!("{op} failed without a message"));
        Err(classify_page_error(&message))
    })
}

/// The helper writes `id` as the first key of every reply.
fn leading_id(line: &str) -> Option<u64> {
    let rest = line.strip_prefix(r#"{"id":"#)?;
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// A page loaded in a headless browser.
///
/// Requests are serialized over one helper process; concurrent callers wait
/// their turn. Once the helper dies or reports the page gone, every further
/// request fails as detached.
pub struct PlaywrightPage {
    session: Mutex<Option<HelperSession>>,
    closed: AtomicBool,
    request_timeout: Duration,
    _permit: Option<OwnedSemaphorePermit>,
}

impl std::fmt::Debug for PlaywrightPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaywrightPage")
            .field("closed", &self.is_closed())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl PlaywrightPage {
    /// Spawns the helper, navigates to `url` and waits until the page is ready.
    pub(crate) async fn launch(
        options: &BrowserOptions,
        url: &str,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Result<Self> {
        let mut cmd = Command::new(&options.node_command);
        cmd.arg("-e")
            .arg(PAGE_HELPER_SCRIPT)
            .arg(url)
            .arg(options.viewport.width.to_string())
            .arg(options.viewport.height.to_string())
            .arg(options.navigation_timeout.as_millis().to_string())
            .arg(options.network_idle_timeout.as_millis().to_string())
            .arg(if options.headless { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &options.node_command))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill().await;
            return Err(SnapError::Unknown(
                "page helper started without stdio pipes".to_string(),
            ));
        };
        let stderr_task = spawn_stderr_collector(child.stderr.take());

        let mut session = HelperSession {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            next_id: 1,
        };

        let launch_timeout = options.launch_timeout();
        match timeout(launch_timeout, wait_until_ready(&mut session.lines)).await {
            Ok(Ok(())) => {
                debug!(%url, "page helper ready");
                Ok(Self {
                    session: Mutex::new(Some(session)),
                    closed: AtomicBool::new(false),
                    request_timeout: options.request_timeout,
                    _permit: permit,
                })
            }
            Ok(Err(Some(err))) => {
                let _ = session.child.kill().await;
                Err(err)
            }
            Ok(Err(None)) => {
                let status = session.child.wait().await.map_err(SnapError::Io)?;
                let stderr = stderr_task.await.unwrap_or_default();
                Err(map_playwright_error(format!("{status}"), &stderr))
            }
            Err(_) => {
                let _ = session.child.kill().await;
                let _ = session.child.wait().await;
                Err(CaptureError::timeout(format!(
                    "page at {url} was not ready within {launch_timeout:?}"
                ))
                .into())
            }
        }
    }

    /// Shuts the helper down. Later capture attempts fail as detached.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };
        let id = session.next_id;
        let polite = timeout(CLOSE_GRACE, async {
            let _ = session.exchange(id, "close").await;
            session.child.wait().await
        })
        .await;
        if polite.is_err() {
            warn!("page helper did not exit after close; killing it");
            let _ = session.child.kill().await;
        }
    }

    async fn request(&self, op: &str) -> std::result::Result<Value, CaptureError> {
        if self.is_closed() {
            return Err(CaptureError::detached("page is closed"));
        }
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return Err(CaptureError::detached("page is closed"));
        };
        let id = session.next_id;
        session.next_id += 1;

        match timeout(self.request_timeout, session.exchange(id, op)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                if err.reason == crate::error::CaptureReason::Detached {
                    self.closed.store(true, Ordering::SeqCst);
                    if let Some(mut gone) = guard.take() {
                        let _ = gone.child.kill().await;
                    }
                }
                Err(err)
            }
            Err(_) => Err(CaptureError::timeout(format!(
                "page did not answer {op} within {:?}",
                self.request_timeout
            ))),
        }
    }

    async fn request_as<T>(&self, op: &str) -> std::result::Result<T, CaptureError>
    where
        T: serde::de::DeserializeOwned,
    {
        let value = self.request(op).await?;
        from_value_unbounded(value).map_err(|err| {
            CaptureError::engine_failure(format!("unexpected {op} payload from page helper: {err}"))
        })
    }
}

#[async_trait]
impl PageHandle for PlaywrightPage {
    async fn title(&self) -> std::result::Result<String, CaptureError> {
        let title: Option<String> = self.request_as("title").await?;
        Ok(title.unwrap_or_default())
    }

    async fn url(&self) -> std::result::Result<String, CaptureError> {
        let url: Option<String> = self.request_as("url").await?;
        Ok(url.unwrap_or_default())
    }

    async fn accessibility_tree(&self) -> std::result::Result<Option<RawAxNode>, CaptureError> {
        self.request_as("accessibility").await
    }

    async fn document(&self) -> std::result::Result<DomTree, CaptureError> {
        let raw: RawDocument = self.request_as("document").await?;
        convert_raw_document(raw)
            .map_err(|err| CaptureError::engine_failure(format!("malformed document: {err}")))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Reads helper output until the ready line.
///
/// `Err(None)` means the helper exited without saying anything useful on stdout.
async fn wait_until_ready(
    lines: &mut Lines<BufReader<ChildStdout>>,
) -> std::result::Result<(), Option<SnapError>> {
    loop {
        let Some(raw) = lines.next_line().await.map_err(|err| Some(SnapError::Io(err)))? else {
            return Err(None);
        };
        let Ok(response) = serde_json::from_str::<HelperResponse>(raw.trim()) else {
            trace!(line = %raw, "ignoring helper output before ready");
            continue;
        };
        if response.status == "ready" {
            return Ok(());
        }
        let message = response
            .message
            .unwrap_or_else(|| "page helper failed during startup".to_string());
        return Err(Some(map_playwright_status_error(&response.status, message)));
    }
}

fn spawn_stderr_collector(
    stderr: Option<tokio::process::ChildStderr>,
) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr {
            let _ = err.read_to_end(&mut buf).await;
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}
