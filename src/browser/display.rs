//! Xvfb virtual display for hosts without a graphical session

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Display numbers probed for a free slot
const DISPLAY_RANGE: std::ops::RangeInclusive<u32> = 99..=199;

/// Time given to Xvfb to fail fast (bad arguments, display already taken)
const STARTUP_GRACE: Duration = Duration::from_millis(300);

/// Result of trying to provide a display for the browser
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayOutcome {
    /// A display is already available or none was requested
    NotNeeded,
    /// A virtual display was started, value is the `DISPLAY` name (e.g. `:99`)
    Started(String),
    /// No virtual display could be started; the browser is launched anyway
    Unavailable(String),
}

/// A running Xvfb server, killed when dropped
#[derive(Debug)]
pub struct VirtualDisplay {
    child: Child,
    display: String,
}

impl VirtualDisplay {
    /// Start Xvfb on the first free display number
    ///
    /// # Errors
    /// Returns a description of the failure if Xvfb is missing, no display number is free,
    /// or the server exits immediately.
    pub async fn start(width: u32, height: u32) -> Result<Self, String> {
        let binary = which::which("Xvfb").map_err(|e| format!("Xvfb not found: {}", e))?;
        let number = DISPLAY_RANGE
            .clone()
            .find(|n| !lock_file(*n).exists())
            .ok_or_else(|| "no free X display number".to_string())?;
        let display = format!(":{}", number);
        let screen = format!("{}x{}x24", width, height);

        let mut child = Command::new(&binary)
            .arg(&display)
            .args(["-screen", "0", screen.as_str()])
            .args(["-nolisten", "tcp"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {}", binary.display(), e))?;

        tokio::time::sleep(STARTUP_GRACE).await;
        match child.try_wait() {
            Ok(Some(status)) => Err(format!("Xvfb exited on {}: {}", display, status)),
            Ok(None) => Ok(Self { child, display }),
            Err(e) => Err(format!("failed to poll Xvfb: {}", e)),
        }
    }

    /// `DISPLAY` value for clients of this server
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Stop the server and reap the process
    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!(display = %self.display, error = %e, "failed to stop Xvfb");
        }
    }
}

fn lock_file(number: u32) -> PathBuf {
    Path::new("/tmp").join(format!(".X{}-lock", number))
}

/// Whether a virtual display should be started
pub fn needs_virtual_display(requested: bool, current_display: Option<&OsStr>) -> bool {
    requested && current_display.is_none_or(|d| d.is_empty())
}

/// Start a virtual display when requested and none is present
///
/// Failure is not an error: it is reported as [`DisplayOutcome::Unavailable`].
pub async fn prepare(
    requested: bool,
    width: u32,
    height: u32,
) -> (Option<VirtualDisplay>, DisplayOutcome) {
    let current = std::env::var_os("DISPLAY");
    if !needs_virtual_display(requested, current.as_deref()) {
        return (None, DisplayOutcome::NotNeeded);
    }

    match VirtualDisplay::start(width, height).await {
        Ok(display) => {
            let name = display.display().to_string();
            (Some(display), DisplayOutcome::Started(name))
        }
        Err(reason) => (None, DisplayOutcome::Unavailable(reason)),
    }
}
