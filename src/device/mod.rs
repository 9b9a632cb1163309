//! Device boundary: screen capture and list scrolling.
//!
//! The harvest loop only sees [`DeviceController`]; `adb` is one transport.

mod adb;

use anyhow::Result;
use async_trait::async_trait;

pub use adb::{AdbDevice, SwipeGeometry};

#[async_trait]
pub trait DeviceController: Send + Sync {
    /// Capture the current screen as PNG bytes.
    async fn capture_screen(&self) -> Result<Vec<u8>>;

    /// Scroll the list forward by one page.
    async fn scroll_next(&self) -> Result<()>;
}
