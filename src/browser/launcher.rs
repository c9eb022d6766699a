//! Browser launch for both node modes.
//!
//! External mode spawns a Chrome or Edge process with a dedicated debugging
//! port and its own profile directory; internal mode asks the host shell
//! for an embedded surface. Both paths end in a [`LaunchedBrowser`] so the
//! stages after launch are mode-agnostic.
//!
//! The spawned process is owned by a watcher task that distinguishes a
//! deliberate kill from the browser dying on its own; only the latter is
//! reported on the `exited` channel.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::browser::locator::locate_browser;
use crate::browser::surface::{EmbeddedSurface, SurfaceFactory, SurfaceSpec};
use crate::browser::START_PAGE;
use crate::config::CONFIG_DIR_NAME;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Profile directory name under the per-user data path.
const PROFILE_DIR_NAME: &str = "browser-node-profile";

/// How long termination waits for the process watcher to finish.
const KILL_WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Launch Spec
// ============================================================================

/// Everything needed to spawn the external browser process.
#[derive(Debug, Clone)]
pub(crate) struct LaunchSpec {
    /// Browser executable.
    pub binary: PathBuf,
    /// CDP debugging port the browser must listen on.
    pub debug_port: u16,
    /// Dedicated profile directory.
    pub user_data_dir: PathBuf,
}

impl LaunchSpec {
    /// Builds the command line: debugging and profile flags, first-run and
    /// session-restore suppression, relaxed debugger origin checks, and a
    /// blank start page.
    pub(crate) fn to_args(&self) -> Vec<String> {
        vec![
            format!("--remote-debugging-port={}", self.debug_port),
            format!("--user-data-dir={}", self.user_data_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-background-networking".to_string(),
            "--hide-crash-restore-bubble".to_string(),
            "--remote-allow-origins=*".to_string(),
            START_PAGE.to_string(),
        ]
    }
}

/// Returns the default profile directory, creating it on demand.
pub(crate) fn default_profile_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| Error::config("could not determine the user data directory"))?;
    let dir = base.join(CONFIG_DIR_NAME).join(PROFILE_DIR_NAME);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

// ============================================================================
// Browser Process
// ============================================================================

/// Handle to a spawned browser process.
///
/// The child itself lives in a watcher task; this handle carries the kill
/// switch. Dropping the handle still requests the kill.
pub(crate) struct BrowserProcess {
    pid: u32,
    kill_tx: Option<oneshot::Sender<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl BrowserProcess {
    /// Returns the process ID.
    #[inline]
    pub(crate) fn pid(&self) -> u32 {
        self.pid
    }

    /// Kills the process tree and waits for the watcher to confirm.
    pub(crate) async fn terminate(&mut self) {
        if let Some(kill_tx) = self.kill_tx.take() {
            debug!(pid = self.pid, "Requesting browser termination");
            let _ = kill_tx.send(());
        }
        if let Some(watcher) = self.watcher.take()
            && timeout(KILL_WAIT, watcher).await.is_err()
        {
            warn!(pid = self.pid, "Timed out waiting for browser termination");
        }
    }
}

impl Drop for BrowserProcess {
    fn drop(&mut self) {
        if let Some(kill_tx) = self.kill_tx.take() {
            debug!(pid = self.pid, "Requesting browser kill in Drop");
            let _ = kill_tx.send(());
        }
    }
}

/// Spawns the browser and its watcher task.
///
/// The returned receiver fires only when the process ends on its own; a
/// requested kill drops the sender silently.
pub(crate) fn spawn_browser(spec: &LaunchSpec) -> Result<(BrowserProcess, oneshot::Receiver<String>)> {
    let args = spec.to_args();
    debug!(binary = %spec.binary.display(), ?args, "Spawning browser process");

    let child = Command::new(&spec.binary)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(Error::process_launch_failed)?;
    let pid = child.id().unwrap_or(0);
    info!(pid, port = spec.debug_port, "Browser process started");

    let (kill_tx, kill_rx) = oneshot::channel();
    let (exit_tx, exit_rx) = oneshot::channel();
    let watcher = tokio::spawn(watch_process(child, pid, kill_rx, exit_tx));

    Ok((
        BrowserProcess {
            pid,
            kill_tx: Some(kill_tx),
            watcher: Some(watcher),
        },
        exit_rx,
    ))
}

/// Owns the child until it exits or a kill is requested.
///
/// A dropped kill sender counts as a kill request, so an abandoned
/// [`BrowserProcess`] cannot leak the child.
async fn watch_process(
    mut child: Child,
    pid: u32,
    kill_rx: oneshot::Receiver<()>,
    exit_tx: oneshot::Sender<String>,
) {
    tokio::select! {
        status = child.wait() => {
            let reason = match status {
                Ok(status) => format!("browser process exited with {status}"),
                Err(e) => format!("browser process wait failed: {e}"),
            };
            debug!(pid, %reason, "Browser process ended on its own");
            let _ = exit_tx.send(reason);
        }
        _ = kill_rx => {
            terminate_tree(&mut child, pid).await;
        }
    }
}

#[cfg(windows)]
async fn terminate_tree(child: &mut Child, pid: u32) {
    let killed = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = killed {
        debug!(pid, error = %e, "taskkill failed; killing directly");
        if let Err(e) = child.kill().await {
            debug!(pid, error = %e, "Failed to kill browser process");
        }
    }
    if let Err(e) = child.wait().await {
        debug!(pid, error = %e, "Failed to wait for browser process");
    }
    info!(pid, "Browser process terminated");
}

#[cfg(not(windows))]
async fn terminate_tree(child: &mut Child, pid: u32) {
    if let Err(e) = child.kill().await {
        debug!(pid, error = %e, "Failed to kill browser process");
    }
    if let Err(e) = child.wait().await {
        debug!(pid, error = %e, "Failed to wait for browser process");
    }
    info!(pid, "Browser process terminated");
}

// ============================================================================
// Launched Browser
// ============================================================================

/// The acquired browser, whichever mode produced it.
pub(crate) enum BrowserHandle {
    /// External mode: a spawned process.
    Process(BrowserProcess),
    /// Internal mode: a host-provided surface.
    Surface(Box<dyn EmbeddedSurface>),
}

impl BrowserHandle {
    /// Shuts the browser down: process kill or surface destruction.
    pub(crate) async fn shut_down(&mut self) {
        match self {
            Self::Process(process) => process.terminate().await,
            Self::Surface(surface) => surface.destroy().await,
        }
    }

    /// Short label for logs.
    #[inline]
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Process(_) => "external process",
            Self::Surface(_) => "embedded surface",
        }
    }
}

/// Launch result consumed by the controller.
pub(crate) struct LaunchedBrowser {
    /// Handle used at teardown.
    pub handle: BrowserHandle,
    /// Port the CDP endpoint will appear on.
    pub debug_port: u16,
    /// Fires with a reason when the browser ends outside node shutdown.
    pub exited: oneshot::Receiver<String>,
}

impl std::fmt::Debug for LaunchedBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedBrowser")
            .field("handle", &self.handle.describe())
            .field("debug_port", &self.debug_port)
            .finish_non_exhaustive()
    }
}

/// Launches the external browser process.
///
/// # Errors
///
/// Returns [`Error::Config`] when an explicit `binary_override` does not
/// exist, [`Error::BrowserNotFound`] when no installation is located, and
/// [`Error::ProcessLaunchFailed`] when the spawn fails.
pub(crate) async fn launch_external(
    binary_override: Option<&Path>,
    debug_port: u16,
) -> Result<LaunchedBrowser> {
    let binary = match binary_override {
        Some(path) if path.exists() => path.to_path_buf(),
        Some(path) => {
            return Err(Error::config(format!(
                "browser binary not found at {}",
                path.display()
            )));
        }
        None => {
            let located = locate_browser().ok_or(Error::BrowserNotFound)?;
            info!(browser = %located.kind, path = %located.path.display(), "Using located browser");
            located.path
        }
    };

    let spec = LaunchSpec {
        binary,
        debug_port,
        user_data_dir: default_profile_dir()?,
    };
    let (process, exited) = spawn_browser(&spec)?;

    Ok(LaunchedBrowser {
        handle: BrowserHandle::Process(process),
        debug_port,
        exited,
    })
}

/// Acquires an embedded surface from the host.
///
/// # Errors
///
/// Returns [`Error::SurfaceUnavailable`] when no factory is registered or
/// the host fails to create the surface.
pub(crate) async fn launch_internal(
    factory: Option<Arc<dyn SurfaceFactory>>,
) -> Result<LaunchedBrowser> {
    let factory = factory
        .ok_or_else(|| Error::surface_unavailable("no embedded surface factory registered"))?;

    let spec = SurfaceSpec::isolated();
    let created = factory.create(&spec).await?;
    let debug_port = created.surface.debug_port();
    info!(port = debug_port, partition = %spec.partition, "Embedded surface created");

    let (exit_tx, exit_rx) = oneshot::channel();
    if let Some(closed) = created.closed {
        tokio::spawn(async move {
            if closed.await.is_ok() {
                let _ = exit_tx.send("embedded surface was destroyed by the host".to_string());
            }
        });
    }

    Ok(LaunchedBrowser {
        handle: BrowserHandle::Surface(created.surface),
        debug_port,
        exited: exit_rx,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tempfile::TempDir;
    use tokio::sync::oneshot::error::TryRecvError;

    use crate::browser::surface::CreatedSurface;

    #[test]
    fn test_launch_args() {
        let spec = LaunchSpec {
            binary: PathBuf::from("/usr/bin/google-chrome"),
            debug_port: 9223,
            user_data_dir: PathBuf::from("/tmp/profile"),
        };
        let args = spec.to_args();

        assert_eq!(args[0], "--remote-debugging-port=9223");
        assert_eq!(args[1], "--user-data-dir=/tmp/profile");
        assert!(args.contains(&"--no-first-run".to_string()));
        assert!(args.contains(&"--no-default-browser-check".to_string()));
        assert!(args.contains(&"--hide-crash-restore-bubble".to_string()));
        assert!(args.contains(&"--remote-allow-origins=*".to_string()));
        assert_eq!(args.last().unwrap(), "about:blank");
    }

    #[tokio::test]
    async fn test_launch_external_rejects_missing_override() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-browser");

        let err = launch_external(Some(&missing), 9223).await.unwrap_err();
        assert!(err.to_string().contains("no-such-browser"));
    }

    #[cfg(unix)]
    fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_is_silent_on_exit_channel() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "browser.sh", "#!/bin/sh\nsleep 30\n");

        let spec = LaunchSpec {
            binary: script,
            debug_port: 9223,
            user_data_dir: dir.path().to_path_buf(),
        };
        let (mut process, mut exited) = spawn_browser(&spec).unwrap();
        assert!(process.pid() > 0);

        process.terminate().await;
        assert!(matches!(exited.try_recv(), Err(TryRecvError::Closed)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_self_exit_reports_reason() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "browser.sh", "#!/bin/sh\nexit 7\n");

        let spec = LaunchSpec {
            binary: script,
            debug_port: 9223,
            user_data_dir: dir.path().to_path_buf(),
        };
        let (_process, exited) = spawn_browser(&spec).unwrap();

        let reason = exited.await.unwrap();
        assert!(reason.contains("exited"));
    }

    struct FakeSurface {
        port: u16,
        destroyed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl EmbeddedSurface for FakeSurface {
        fn debug_port(&self) -> u16 {
            self.port
        }

        async fn destroy(&mut self) {
            self.destroyed.store(true, Ordering::SeqCst);
        }
    }

    struct FakeFactory {
        port: u16,
        destroyed: Arc<AtomicBool>,
        closed_tx: Mutex<Option<oneshot::Sender<()>>>,
        closed_rx: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl FakeFactory {
        fn new(port: u16) -> Self {
            let (tx, rx) = oneshot::channel();
            Self {
                port,
                destroyed: Arc::new(AtomicBool::new(false)),
                closed_tx: Mutex::new(Some(tx)),
                closed_rx: Mutex::new(Some(rx)),
            }
        }
    }

    #[async_trait]
    impl SurfaceFactory for FakeFactory {
        async fn create(&self, spec: &SurfaceSpec) -> Result<CreatedSurface> {
            assert_eq!(spec.partition, "persist:browser-node");
            Ok(CreatedSurface {
                surface: Box::new(FakeSurface {
                    port: self.port,
                    destroyed: Arc::clone(&self.destroyed),
                }),
                closed: self.closed_rx.lock().take(),
            })
        }
    }

    #[tokio::test]
    async fn test_launch_internal_without_factory() {
        let err = launch_internal(None).await.unwrap_err();
        assert!(matches!(err, Error::SurfaceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_launch_internal_reports_surface_port_and_destroys() {
        let factory = Arc::new(FakeFactory::new(18111));
        let destroyed = Arc::clone(&factory.destroyed);

        let mut launched = launch_internal(Some(factory as Arc<dyn SurfaceFactory>))
            .await
            .unwrap();
        assert_eq!(launched.debug_port, 18111);
        assert_eq!(launched.handle.describe(), "embedded surface");

        launched.handle.shut_down().await;
        assert!(destroyed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_launch_internal_forwards_closed_signal() {
        let factory = Arc::new(FakeFactory::new(18112));
        let launched = launch_internal(Some(Arc::clone(&factory) as Arc<dyn SurfaceFactory>))
            .await
            .unwrap();

        let closed_tx = factory.closed_tx.lock().take().unwrap();
        closed_tx.send(()).unwrap();

        let reason = launched.exited.await.unwrap();
        assert!(reason.contains("destroyed"));
    }
}
