use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::time::Duration;

use crate::device::SwipeGeometry;
use crate::harvest::{HarvestConfig, HarvestLimits};
use crate::vision::GEMINI_BASE_URL;

/// Command line and environment surface. Read once at startup.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "screenscout",
    version,
    about = "Scroll a device contact list and collect contacts with a vision model"
)]
pub struct Cli {
    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// adb serial of the target device.
    #[arg(long, env = "DEVICE_ID")]
    pub device_id: String,

    /// Role recorded for contacts whose title is missing.
    #[arg(long, env = "SEARCH_ROLE", default_value = "Investor")]
    pub search_role: String,

    #[arg(long, env = "MAX_SCROLLS", default_value_t = 200)]
    pub max_scrolls: u32,

    #[arg(long = "output", env = "OUTPUT_FILE", default_value = "contacts.csv")]
    pub output_file: PathBuf,

    #[arg(long, env = "CONTACTS_DB", default_value = "contacts.db")]
    pub db_path: PathBuf,

    /// Consecutive screens without a new contact before stopping.
    #[arg(long, env = "EMPTY_SCREEN_THRESHOLD", default_value_t = 5)]
    pub empty_threshold: u32,

    #[arg(long, env = "SCROLL_DELAY_MS", default_value_t = 2000)]
    pub scroll_delay_ms: u64,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.0-flash")]
    pub model: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = GEMINI_BASE_URL)]
    pub gemini_base_url: String,

    #[arg(long, env = "ADB_BIN", default_value = "adb")]
    pub adb_bin: PathBuf,

    /// Swipe gesture as x1,y1,x2,y2,ms.
    #[arg(long, env = "SWIPE_GEOMETRY", default_value = "540,1600,540,600,500")]
    pub swipe: SwipeGeometry,

    /// Skip the model when a screen is pixel-hash identical to the previous one.
    #[arg(long, env = "SKIP_UNCHANGED")]
    pub skip_unchanged: bool,
}

/// Immutable run configuration passed into the harvest.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub device_id: String,
    pub search_role: String,
    pub max_scrolls: u32,
    pub output_file: PathBuf,
    pub db_path: PathBuf,
    pub empty_threshold: u32,
    pub scroll_delay: Duration,
    pub model: String,
    pub gemini_base_url: String,
    pub adb_bin: PathBuf,
    pub swipe: SwipeGeometry,
    pub skip_unchanged_screens: bool,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let settings = Self {
            api_key: cli.api_key,
            device_id: cli.device_id,
            search_role: cli.search_role,
            max_scrolls: cli.max_scrolls,
            output_file: cli.output_file,
            db_path: cli.db_path,
            empty_threshold: cli.empty_threshold,
            scroll_delay: Duration::from_millis(cli.scroll_delay_ms),
            model: cli.model,
            gemini_base_url: cli.gemini_base_url,
            adb_bin: cli.adb_bin,
            swipe: cli.swipe,
            skip_unchanged_screens: cli.skip_unchanged,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_args() -> Result<Self> {
        Self::from_cli(Cli::parse())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            bail!("GEMINI_API_KEY must not be empty");
        }
        if self.device_id.trim().is_empty() {
            bail!("DEVICE_ID must not be empty");
        }
        if self.max_scrolls == 0 {
            bail!("max scrolls must be at least 1");
        }
        if self.empty_threshold == 0 {
            bail!("empty screen threshold must be at least 1");
        }
        Ok(())
    }

    pub fn harvest_config(&self) -> HarvestConfig {
        HarvestConfig {
            limits: HarvestLimits {
                max_scrolls: self.max_scrolls,
                empty_screen_threshold: self.empty_threshold,
            },
            scroll_delay: self.scroll_delay,
            unchanged_screen_distance: self.skip_unchanged_screens.then_some(0),
        }
    }
}
