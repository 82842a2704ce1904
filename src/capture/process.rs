//! One external capture process: spawn, watch, stop.
//!
//! The process is owned by whoever started it (the session controller).
//! Its stderr is read on a separate tokio task which never touches the
//! owner's state; it can only invoke the `on_failure` callback, and
//! callers make that callback post a message to their own loop.

use super::command::CommandSpec;
use super::monitor::{self, MonitorOptions};
use super::CaptureError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Child;
use tokio::task::JoinHandle;

/// Grace period between the polite terminate and the forced kill.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub monitor: MonitorOptions,
    pub stop_grace: Duration,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            monitor: MonitorOptions::default(),
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }
}

/// How a `stop()` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was running.
    NotRunning,
    /// Exited within the grace period.
    Graceful,
    /// Had to be killed after the grace period expired.
    Killed,
}

pub struct CaptureProcess {
    child: Option<Child>,
    monitor: Option<JoinHandle<()>>,
    program: String,
    stop_grace: Duration,
}

impl CaptureProcess {
    /// Spawns `spec` and starts watching its stderr.
    ///
    /// `on_failure` is called at most once, from the monitor task, with
    /// the offending diagnostic line.
    pub fn start<F>(
        spec: &CommandSpec,
        options: &ProcessOptions,
        on_failure: F,
    ) -> Result<Self, CaptureError>
    where
        F: FnOnce(String) + Send + 'static,
    {
        log::info!("[CAPTURE] Starting: {}", spec);

        let mut child = spec
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let monitor = child.stderr.take().map(|stderr| {
            let monitor_options = options.monitor.clone();
            tokio::spawn(async move {
                let verdict = monitor::watch(stderr, &monitor_options, on_failure).await;
                log::debug!("[CAPTURE] Monitor finished: {:?}", verdict);
            })
        });

        log::info!("[CAPTURE] {} running (pid {:?})", spec.program, child.id());

        Ok(Self {
            child: Some(child),
            monitor,
            program: spec.program.clone(),
            stop_grace: options.stop_grace,
        })
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Terminates the process and waits for it. Safe to call repeatedly.
    ///
    /// Sends a terminate signal so the recorder can finish its container,
    /// waits up to the grace period, then kills. When this returns the
    /// output file is as complete as it is going to get.
    pub async fn stop(&mut self) -> StopOutcome {
        let Some(mut child) = self.child.take() else {
            return StopOutcome::NotRunning;
        };

        let start = std::time::Instant::now();
        request_terminate(&mut child);

        let outcome = match tokio::time::timeout(self.stop_grace, child.wait()).await {
            Ok(Ok(status)) => {
                log::info!(
                    "[CAPTURE] {} exited with {} after {}ms",
                    self.program,
                    status,
                    start.elapsed().as_millis()
                );
                StopOutcome::Graceful
            }
            Ok(Err(e)) => {
                log::warn!("[CAPTURE] Waiting for {} failed: {}", self.program, e);
                StopOutcome::Graceful
            }
            Err(_) => {
                log::warn!(
                    "[CAPTURE] {} did not exit within {}ms, forcing",
                    self.program,
                    self.stop_grace.as_millis()
                );
                if let Err(e) = child.kill().await {
                    log::warn!("[CAPTURE] Killing {} failed: {}", self.program, e);
                }
                StopOutcome::Killed
            }
        };

        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
        outcome
    }
}

impl Drop for CaptureProcess {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
        // `kill_on_drop` takes care of a child that was never stopped.
    }
}

#[cfg(unix)]
fn request_terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };
    // SIGTERM lets ffmpeg write the moov atom before exiting.
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc != 0 {
        log::warn!(
            "[CAPTURE] SIGTERM to pid {} failed: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        log::warn!("[CAPTURE] Terminate request failed: {}", e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").args(["-c", script])
    }

    fn quick_options() -> ProcessOptions {
        ProcessOptions {
            stop_grace: Duration::from_millis(300),
            ..ProcessOptions::default()
        }
    }

    #[tokio::test]
    async fn stop_is_graceful_and_idempotent() {
        let mut process = CaptureProcess::start(&sh("exec sleep 30"), &quick_options(), |_| {})
            .expect("spawn sh");
        assert!(process.is_running());
        assert!(process.pid().is_some());

        assert_eq!(process.stop().await, StopOutcome::Graceful);
        assert!(!process.is_running());
        assert_eq!(process.stop().await, StopOutcome::NotRunning);
    }

    #[tokio::test]
    async fn stubborn_process_is_killed_after_grace() {
        let script = "trap '' TERM; while true; do sleep 0.05; done";
        let mut process =
            CaptureProcess::start(&sh(script), &quick_options(), |_| {}).expect("spawn sh");
        // Give the shell a moment to install its trap.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(process.stop().await, StopOutcome::Killed);
    }

    #[tokio::test]
    async fn failure_marker_is_reported_through_callback() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut process = CaptureProcess::start(
            &sh("echo 'Error opening input device' >&2; exec sleep 30"),
            &quick_options(),
            move |line| {
                let _ = tx.send(line);
            },
        )
        .expect("spawn sh");

        let line = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("failure reported in time");
        assert_eq!(line.as_deref(), Some("Error opening input device"));
        process.stop().await;
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let spec = CommandSpec::new("no-such-capture-tool-xyz");
        let err = CaptureProcess::start(&spec, &quick_options(), |_| {})
            .err()
            .expect("spawn should fail");
        assert!(matches!(err, CaptureError::Spawn { .. }));
    }
}
