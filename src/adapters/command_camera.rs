//! Command-line camera agent adapter.
//!
//! Implements [`CameraPort`] by running the configured capture command
//! once per request.  The output path is appended as the last argument and
//! the command is expected to write a binary PPM there, e.g.
//!
//! ```text
//!   ["ssh", "cam-node", "capture-ppm"]  +  /var/lib/firewatch/capture-7.ppm
//! ```
//!
//! | Outcome                           | Result                     |
//! |-----------------------------------|----------------------------|
//! | exits 0, PPM decodes              | `Ok(photo)`                |
//! | still running at the timeout      | killed, `Timeout`          |
//! | cannot spawn / non-zero / no file | `Unavailable` (retryable)  |
//! | file present but not a PPM        | `Corrupt`                  |

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use log::{debug, warn};

use crate::app::ports::{CameraPort, CaptureError};
use crate::vision::photo::Photo;

/// How often a running capture is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct CommandCamera {
    argv: Vec<String>,
    scratch_dir: PathBuf,
    counter: AtomicU64,
}

impl CommandCamera {
    pub fn new(argv: Vec<String>, scratch_dir: impl AsRef<Path>) -> Self {
        Self {
            argv,
            scratch_dir: scratch_dir.as_ref().to_path_buf(),
            counter: AtomicU64::new(0),
        }
    }

    fn spawn(&self, out: &Path) -> anyhow::Result<Child> {
        let Some((program, args)) = self.argv.split_first() else {
            bail!("capture command is empty");
        };
        Command::new(program)
            .args(args)
            .arg(out)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawning capture command `{program}`"))
    }

    /// Wait for `child` until `timeout`.  `Ok(None)` means it was killed.
    fn wait(child: &mut Child, timeout: Duration) -> anyhow::Result<Option<bool>> {
        let until = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().context("polling capture command")? {
                return Ok(Some(status.success()));
            }
            let now = Instant::now();
            if now >= until {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL.min(until - now));
        }
    }

    fn capture_into(&self, out: &Path, timeout: Duration) -> Result<Photo, CaptureError> {
        let mut child = self.spawn(out).map_err(|e| {
            warn!("CommandCamera: {e:#}");
            CaptureError::Unavailable
        })?;

        match Self::wait(&mut child, timeout) {
            Ok(Some(true)) => {}
            Ok(Some(false)) => {
                warn!("CommandCamera: capture command failed");
                return Err(CaptureError::Unavailable);
            }
            Ok(None) => return Err(CaptureError::Timeout),
            Err(e) => {
                warn!("CommandCamera: {e:#}");
                return Err(CaptureError::Unavailable);
            }
        }

        let bytes = fs::read(out).map_err(|e| {
            warn!("CommandCamera: no output at {}: {e}", out.display());
            CaptureError::Unavailable
        })?;
        Photo::from_ppm(&bytes).map_err(|e| {
            warn!("CommandCamera: {} bytes did not decode: {e}", bytes.len());
            CaptureError::Corrupt
        })
    }
}

impl CameraPort for CommandCamera {
    fn request_capture(&self, timeout: Duration) -> Result<Photo, CaptureError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let out = self.scratch_dir.join(format!("capture-{n}.ppm"));
        debug!("CommandCamera: capture {n} -> {}", out.display());

        let result = self.capture_into(&out, timeout);
        let _ = fs::remove_file(&out);
        result
    }
}
