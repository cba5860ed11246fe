use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

use thiserror::Error;
use tracing::{debug, warn};

use crate::atomic_io::write_text_atomic;

pub const CLIPBOARD_FALLBACK_FILE: &str = "clipboard.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformRequest {
    OpenUrl {
        url: String,
    },
    CopyToClipboard {
        text: String,
        confirmation: Option<String>,
    },
}

impl PlatformRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            PlatformRequest::OpenUrl { .. } => "open_url",
            PlatformRequest::CopyToClipboard { .. } => "copy_to_clipboard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardRoute {
    SystemTool(&'static str),
    FallbackFile(PathBuf),
}

#[derive(Debug)]
pub enum PlatformOutcome {
    Opened {
        url: String,
    },
    Copied {
        route: ClipboardRoute,
        confirmation: Option<String>,
    },
    Failed {
        request: &'static str,
        error: PlatformError,
    },
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to open url '{url}': {source}")]
    OpenUrl {
        url: String,
        #[source]
        source: io::Error,
    },
    #[error("refusing to open url without http(s) scheme: '{0}'")]
    UnsupportedUrl(String),
    #[error("clipboard unavailable and fallback write to {path} failed: {source}")]
    ClipboardFallback {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("platform worker is not running")]
    WorkerStopped,
}

/// Host side effects a scene may request. Implementations run on the platform
/// worker thread, never on the simulation thread.
pub trait HostPlatform: Send + 'static {
    fn open_url(&mut self, url: &str) -> Result<(), PlatformError>;
    fn copy_text(&mut self, text: &str) -> Result<ClipboardRoute, PlatformError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipboardTool {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

#[cfg(target_os = "macos")]
const DEFAULT_CLIPBOARD_TOOLS: &[ClipboardTool] = &[ClipboardTool {
    program: "pbcopy",
    args: &[],
}];

#[cfg(target_os = "windows")]
const DEFAULT_CLIPBOARD_TOOLS: &[ClipboardTool] = &[ClipboardTool {
    program: "clip",
    args: &[],
}];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DEFAULT_CLIPBOARD_TOOLS: &[ClipboardTool] = &[
    ClipboardTool {
        program: "wl-copy",
        args: &[],
    },
    ClipboardTool {
        program: "xclip",
        args: &["-selection", "clipboard"],
    },
    ClipboardTool {
        program: "xsel",
        args: &["--clipboard", "--input"],
    },
];

#[derive(Debug, Clone)]
pub struct NativePlatform {
    clipboard_tools: Vec<ClipboardTool>,
    fallback_path: PathBuf,
}

impl NativePlatform {
    pub fn new(cache_dir: &Path) -> Self {
        Self::with_clipboard_tools(cache_dir, DEFAULT_CLIPBOARD_TOOLS.to_vec())
    }

    pub fn with_clipboard_tools(cache_dir: &Path, clipboard_tools: Vec<ClipboardTool>) -> Self {
        Self {
            clipboard_tools,
            fallback_path: cache_dir.join(CLIPBOARD_FALLBACK_FILE),
        }
    }

    pub fn fallback_path(&self) -> &Path {
        &self.fallback_path
    }
}

impl HostPlatform for NativePlatform {
    fn open_url(&mut self, url: &str) -> Result<(), PlatformError> {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(PlatformError::UnsupportedUrl(url.to_string()));
        }
        webbrowser::open(url).map_err(|source| PlatformError::OpenUrl {
            url: url.to_string(),
            source,
        })
    }

    fn copy_text(&mut self, text: &str) -> Result<ClipboardRoute, PlatformError> {
        for tool in &self.clipboard_tools {
            match pipe_to_tool(tool, text) {
                Ok(()) => return Ok(ClipboardRoute::SystemTool(tool.program)),
                Err(error) => {
                    debug!(tool = tool.program, error = %error, "clipboard_tool_unavailable");
                }
            }
        }

        write_text_atomic(&self.fallback_path, text).map_err(|source| {
            PlatformError::ClipboardFallback {
                path: self.fallback_path.clone(),
                source,
            }
        })?;
        Ok(ClipboardRoute::FallbackFile(self.fallback_path.clone()))
    }
}

fn pipe_to_tool(tool: &ClipboardTool, text: &str) -> io::Result<()> {
    let mut child = Command::new(tool.program)
        .args(tool.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(error) = stdin.write_all(text.as_bytes()) {
            // Reap the child so a tool that stopped reading does not linger.
            drop(stdin);
            let _ = child.kill();
            let _ = child.wait();
            return Err(error);
        }
    }

    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} exited with {status}", tool.program),
        ))
    }
}

pub(crate) fn execute_request(
    platform: &mut dyn HostPlatform,
    request: PlatformRequest,
) -> PlatformOutcome {
    let kind = request.kind();
    match request {
        PlatformRequest::OpenUrl { url } => match platform.open_url(&url) {
            Ok(()) => PlatformOutcome::Opened { url },
            Err(error) => PlatformOutcome::Failed {
                request: kind,
                error,
            },
        },
        PlatformRequest::CopyToClipboard { text, confirmation } => {
            match platform.copy_text(&text) {
                Ok(route) => PlatformOutcome::Copied {
                    route,
                    confirmation,
                },
                Err(error) => PlatformOutcome::Failed {
                    request: kind,
                    error,
                },
            }
        }
    }
}

/// Background thread that executes platform requests in submission order.
pub(crate) struct PlatformWorker {
    tx: Option<mpsc::Sender<PlatformRequest>>,
    rx: mpsc::Receiver<PlatformOutcome>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PlatformWorker {
    pub(crate) fn spawn(mut platform: Box<dyn HostPlatform>) -> io::Result<Self> {
        let (tx, job_rx) = mpsc::channel::<PlatformRequest>();
        let (result_tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("platform".to_string())
            .spawn(move || {
                while let Ok(request) = job_rx.recv() {
                    let outcome = execute_request(platform.as_mut(), request);
                    if result_tx.send(outcome).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            rx,
            handle: Some(handle),
        })
    }

    pub(crate) fn submit(&self, request: PlatformRequest) -> Result<(), PlatformError> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(PlatformError::WorkerStopped);
        };
        tx.send(request).map_err(|_| PlatformError::WorkerStopped)
    }

    pub(crate) fn drain(&self) -> Vec<PlatformOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            outcomes.push(outcome);
        }
        outcomes
    }

    #[cfg(test)]
    fn recv_blocking(&self) -> Option<PlatformOutcome> {
        self.rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .ok()
    }
}

impl Drop for PlatformWorker {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("platform_worker_panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingPlatform {
        opened: Arc<Mutex<Vec<String>>>,
    }

    impl HostPlatform for RecordingPlatform {
        fn open_url(&mut self, url: &str) -> Result<(), PlatformError> {
            self.opened.lock().expect("lock").push(url.to_string());
            Ok(())
        }

        fn copy_text(&mut self, _text: &str) -> Result<ClipboardRoute, PlatformError> {
            Ok(ClipboardRoute::SystemTool("recording"))
        }
    }

    #[test]
    fn copy_without_tools_writes_fallback_file() {
        let temp = tempfile::TempDir::new().expect("temp");
        let mut platform = NativePlatform::with_clipboard_tools(temp.path(), Vec::new());

        let route = platform.copy_text("hello@example.com").expect("copy");

        let expected = temp.path().join(CLIPBOARD_FALLBACK_FILE);
        assert_eq!(route, ClipboardRoute::FallbackFile(expected.clone()));
        assert_eq!(
            fs::read_to_string(expected).expect("read"),
            "hello@example.com"
        );
    }

    #[cfg(unix)]
    #[test]
    fn tool_that_closes_stdin_early_falls_through_to_fallback() {
        let temp = tempfile::TempDir::new().expect("temp");
        let tool = ClipboardTool {
            program: "true",
            args: &[],
        };
        let text = "x".repeat(4 * 1024 * 1024);

        let error = pipe_to_tool(&tool, &text).expect_err("write to exited tool");
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);

        let mut platform = NativePlatform::with_clipboard_tools(temp.path(), vec![tool]);
        let route = platform.copy_text(&text).expect("copy");
        let expected = temp.path().join(CLIPBOARD_FALLBACK_FILE);
        assert_eq!(route, ClipboardRoute::FallbackFile(expected.clone()));
        assert_eq!(fs::read_to_string(expected).expect("read").len(), text.len());
    }

    #[test]
    fn missing_tool_falls_through_to_fallback() {
        let temp = tempfile::TempDir::new().expect("temp");
        let mut platform = NativePlatform::with_clipboard_tools(
            temp.path(),
            vec![ClipboardTool {
                program: "folio-test-no-such-clipboard-tool",
                args: &[],
            }],
        );

        let route = platform.copy_text("x").expect("copy");
        assert!(matches!(route, ClipboardRoute::FallbackFile(_)));
    }

    #[test]
    fn non_http_urls_are_rejected_before_launching_browser() {
        let temp = tempfile::TempDir::new().expect("temp");
        let mut platform = NativePlatform::new(temp.path());
        let error = platform
            .open_url("file:///etc/passwd")
            .expect_err("rejected");
        assert!(matches!(error, PlatformError::UnsupportedUrl(_)));
    }

    #[test]
    fn worker_executes_requests_in_order() {
        let recording = RecordingPlatform::default();
        let opened = Arc::clone(&recording.opened);
        let worker = PlatformWorker::spawn(Box::new(recording)).expect("spawn");

        worker
            .submit(PlatformRequest::OpenUrl {
                url: "https://a.example".to_string(),
            })
            .expect("submit a");
        worker
            .submit(PlatformRequest::CopyToClipboard {
                text: "b".to_string(),
                confirmation: Some("Copied".to_string()),
            })
            .expect("submit b");

        let first = worker.recv_blocking().expect("first outcome");
        let second = worker.recv_blocking().expect("second outcome");
        assert!(matches!(first, PlatformOutcome::Opened { ref url } if url == "https://a.example"));
        assert!(matches!(
            second,
            PlatformOutcome::Copied { confirmation: Some(ref text), .. } if text == "Copied"
        ));
        assert_eq!(
            opened.lock().expect("lock").as_slice(),
            ["https://a.example".to_string()]
        );
        assert!(worker.drain().is_empty());
    }
}
