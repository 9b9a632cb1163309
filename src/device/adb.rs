use std::{path::PathBuf, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::DeviceController;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

const REMOTE_CAPTURE_PATH: &str = "/sdcard/screenscout_capture.png";

/// Swipe gesture used to advance the list: from (x1, y1) to (x2, y2) over
/// `duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeGeometry {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub duration_ms: u32,
}

impl Default for SwipeGeometry {
    fn default() -> Self {
        Self {
            x1: 540,
            y1: 1600,
            x2: 540,
            y2: 600,
            duration_ms: 500,
        }
    }
}

impl FromStr for SwipeGeometry {
    type Err = anyhow::Error;

    /// Parses `x1,y1,x2,y2,ms`.
    fn from_str(value: &str) -> Result<Self> {
        let parts = value
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u32>()
                    .with_context(|| format!("invalid swipe coordinate '{part}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        let &[x1, y1, x2, y2, duration_ms] = parts.as_slice() else {
            bail!("swipe geometry needs 5 values (x1,y1,x2,y2,ms), got {}", parts.len());
        };

        Ok(Self {
            x1,
            y1,
            x2,
            y2,
            duration_ms,
        })
    }
}

/// Android device reached through the `adb` binary.
#[derive(Debug, Clone)]
pub struct AdbDevice {
    adb_bin: PathBuf,
    serial: String,
    swipe: SwipeGeometry,
    local_capture_path: PathBuf,
}

impl AdbDevice {
    pub fn new(adb_bin: impl Into<PathBuf>, serial: impl Into<String>, swipe: SwipeGeometry) -> Self {
        let serial = serial.into();
        let local_capture_path =
            std::env::temp_dir().join(format!("screenscout-{}.png", sanitize_serial(&serial)));
        Self {
            adb_bin: adb_bin.into(),
            serial,
            swipe,
            local_capture_path,
        }
    }

    fn capture_args(&self) -> Vec<String> {
        self.with_serial(["shell", "screencap", "-p", REMOTE_CAPTURE_PATH])
    }

    fn pull_args(&self) -> Vec<String> {
        let local = self.local_capture_path.to_string_lossy().to_string();
        let mut args = self.with_serial(["pull", REMOTE_CAPTURE_PATH]);
        args.push(local);
        args
    }

    fn swipe_args(&self) -> Vec<String> {
        let SwipeGeometry {
            x1,
            y1,
            x2,
            y2,
            duration_ms,
        } = self.swipe;
        let mut args = self.with_serial(["shell", "input", "swipe"]);
        args.extend([x1, y1, x2, y2, duration_ms].iter().map(u32::to_string));
        args
    }

    fn with_serial<const N: usize>(&self, rest: [&str; N]) -> Vec<String> {
        let mut args = vec!["-s".to_string(), self.serial.clone()];
        args.extend(rest.iter().map(|arg| arg.to_string()));
        args
    }

    async fn run(&self, args: &[String]) -> Result<Vec<u8>> {
        log_debug!("adb {}", args.join(" "));
        let output = Command::new(&self.adb_bin)
            .args(args)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.adb_bin.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "adb {} exited with {}: {}",
                args.get(2).map(String::as_str).unwrap_or_default(),
                output.status,
                stderr.trim()
            ));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl DeviceController for AdbDevice {
    async fn capture_screen(&self) -> Result<Vec<u8>> {
        self.run(&self.capture_args())
            .await
            .context("screencap failed")?;
        self.run(&self.pull_args())
            .await
            .context("screenshot pull failed")?;

        let bytes = tokio::fs::read(&self.local_capture_path)
            .await
            .with_context(|| {
                format!(
                    "failed to read pulled screenshot {}",
                    self.local_capture_path.display()
                )
            })?;

        if bytes.is_empty() {
            bail!("pulled screenshot is empty");
        }
        Ok(bytes)
    }

    async fn scroll_next(&self) -> Result<()> {
        self.run(&self.swipe_args())
            .await
            .context("swipe failed")?;
        Ok(())
    }
}

fn sanitize_serial(serial: &str) -> String {
    serial
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
