//! Child process helpers shared by the extraction backends and the supervisor.

use std::io::{self, Read};
use std::process::{Child, ExitStatus};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

/// Upper bound on captured stdout/stderr kept per stream.
pub const MAX_CAPTURE_BYTES: usize = 64 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Time allowed for reaching EOF when the child exits right at the deadline.
const MIN_DRAIN_WAIT: Duration = Duration::from_millis(250);

/// Exit status plus captured (lossy UTF-8, size-bounded) output.
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Wait for child process with timeout.
///
/// Polls `try_wait` since std::process has no native timeout. Stdout and stderr
/// are drained on background threads so a child filling its pipe cannot stall.
/// On timeout the child is killed and reaped, and an error of kind
/// `TimedOut` is returned.
///
/// The whole call, output collection included, ends at the deadline (plus a
/// short drain allowance when the child exits just before it). A
/// descendant that inherited the pipes can keep them open after the child
/// exits; whatever was read by the deadline is returned and the rest dropped.
pub fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<CapturedOutput> {
    let stdout = child.stdout.take().map(Drain::start);
    let stderr = child.stderr.take().map(Drain::start);

    let start = Instant::now();
    let deadline = start + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() >= timeout {
                    // Kill and reap to prevent zombie process
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "Process timed out"));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(e),
        }
    };

    Ok(CapturedOutput {
        status,
        stdout: stdout.map(|d| d.collect(deadline)).unwrap_or_default(),
        stderr: stderr.map(|d| d.collect(deadline)).unwrap_or_default(),
    })
}

/// One pipe being read on a background thread.
struct Drain {
    kept: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

impl Drain {
    fn start<R: Read + Send + 'static>(mut reader: R) -> Self {
        let kept = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let shared = Arc::clone(&kept);
        thread::spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let mut kept = match shared.lock() {
                            Ok(kept) => kept,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        let room = MAX_CAPTURE_BYTES.saturating_sub(kept.len());
                        kept.extend_from_slice(&buf[..n.min(room)]);
                    }
                }
            }
            let _ = tx.send(());
        });
        Self { kept, done }
    }

    /// Wait for EOF until `deadline`, then return what was read so far.
    fn collect(self, deadline: Instant) -> String {
        let remaining = deadline
            .saturating_duration_since(Instant::now())
            .max(MIN_DRAIN_WAIT);
        if self.done.recv_timeout(remaining).is_err() {
            warn!("Output pipe still open at the deadline; keeping partial output");
        }
        let kept = match self.kept.lock() {
            Ok(kept) => kept,
            Err(poisoned) => poisoned.into_inner(),
        };
        String::from_utf8_lossy(&kept).into_owned()
    }
}

/// Truncate captured output for logs and error messages.
///
/// Keeps at most `max_chars` characters and marks the cut with "...".
pub fn truncate_output(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
