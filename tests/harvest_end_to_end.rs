use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use screenscout_lib::contacts::ContactStore;
use screenscout_lib::db::{Database, RunStatus};
use screenscout_lib::device::DeviceController;
use screenscout_lib::harvest::{
    HarvestConfig, HarvestController, HarvestLimits, HarvestReport, HarvestStatus,
};
use screenscout_lib::vision::{VisionError, VisionExtractor, VisionModel};

const EMPTY: &str = r#"{"contacts": []}"#;

/// Device that replays scripted captures, then distinct filler screens.
struct ScriptedDevice {
    captures: Mutex<VecDeque<Result<Vec<u8>>>>,
    capture_calls: AtomicUsize,
    scrolls: AtomicUsize,
}

impl ScriptedDevice {
    fn new(captures: Vec<Result<Vec<u8>>>) -> Self {
        Self {
            captures: Mutex::new(captures.into()),
            capture_calls: AtomicUsize::new(0),
            scrolls: AtomicUsize::new(0),
        }
    }

    fn distinct_screens() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl DeviceController for ScriptedDevice {
    async fn capture_screen(&self) -> Result<Vec<u8>> {
        let call = self.capture_calls.fetch_add(1, Ordering::SeqCst);
        match self.captures.lock().unwrap().pop_front() {
            Some(capture) => capture,
            None => Ok(format!("screen-{call}").into_bytes()),
        }
    }

    async fn scroll_next(&self) -> Result<()> {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Model that replays scripted replies, then reports no people.
struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn describe(
        &self,
        _image: &[u8],
        _mime_type: &str,
        _prompt: &str,
    ) -> Result<String, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| EMPTY.to_string()))
    }
}

/// Lets the extractor own the model while the test keeps a handle to it.
struct SharedModel(Arc<ScriptedModel>);

#[async_trait]
impl VisionModel for SharedModel {
    async fn describe(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, VisionError> {
        self.0.describe(image, mime_type, prompt).await
    }
}

fn contacts_json(names: &[&str]) -> String {
    let entries: Vec<String> = names
        .iter()
        .map(|name| format!(r#"{{"name": "{name}", "title": null, "company": "Acme"}}"#))
        .collect();
    format!("```json\n{{\"contacts\": [{}]}}\n```", entries.join(", "))
}

fn config(max_scrolls: u32, threshold: u32) -> HarvestConfig {
    HarvestConfig {
        limits: HarvestLimits {
            max_scrolls,
            empty_screen_threshold: threshold,
        },
        scroll_delay: Duration::ZERO,
        unchanged_screen_distance: HarvestConfig::default().unchanged_screen_distance,
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    db_path: PathBuf,
    output: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("contacts.db");
        let output = dir.path().join("contacts.csv");
        Self {
            _dir: dir,
            db_path,
            output,
        }
    }

    /// Run one harvest; returns the report, the database and the number of
    /// model calls.
    async fn run(
        &self,
        device: &ScriptedDevice,
        replies: Vec<String>,
        config: HarvestConfig,
    ) -> (HarvestReport, Database, usize) {
        let db = Database::new(self.db_path.clone()).unwrap();
        let store = ContactStore::new(db.clone(), "Investor");
        let refs: Vec<&str> = replies.iter().map(String::as_str).collect();
        let model = Arc::new(ScriptedModel::new(&refs));
        let extractor = VisionExtractor::new(Box::new(SharedModel(Arc::clone(&model))));
        let controller =
            HarvestController::new(db.clone(), store, config, self.output.clone(), "test-device");

        let report = controller.run(device, &extractor).await.unwrap();
        (report, db, model.calls.load(Ordering::SeqCst))
    }
}

fn csv_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn scripted_run_saturates_after_eighth_cycle() {
    let harness = Harness::new();
    let device = ScriptedDevice::distinct_screens();
    let replies = vec![
        contacts_json(&["Ada Lovelace", "Grace Hopper"]),
        EMPTY.to_string(),
        contacts_json(&["Ada Lovelace", "Charles Babbage"]),
    ];

    let (report, db, _) = harness.run(&device, replies, config(200, 5)).await;

    assert_eq!(report.status, HarvestStatus::StoppedSaturated);
    assert_eq!(report.cycles, 8);
    assert_eq!(report.total_extracted, 3);
    assert_eq!(report.exported_rows, 3);
    assert_eq!(device.capture_calls.load(Ordering::SeqCst), 8);
    assert_eq!(device.scrolls.load(Ordering::SeqCst), 7);

    let lines = csv_lines(&harness.output);
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "name,role,company");
    assert!(lines.contains(&"\"Charles Babbage\",\"Investor\",\"Acme\"".to_string()));

    let run = db.get_run(&report.run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Saturated);
    assert_eq!(run.cycles, 8);
    assert_eq!(run.total_extracted, 3);
    assert_eq!(run.exported_rows, Some(3));
}

#[tokio::test]
async fn duplicate_only_screen_counts_as_empty() {
    let harness = Harness::new();
    let device = ScriptedDevice::distinct_screens();
    let replies = vec![
        contacts_json(&["Ada Lovelace", "Grace Hopper"]),
        EMPTY.to_string(),
        contacts_json(&["Ada Lovelace"]),
    ];

    let (report, _db, _) = harness.run(&device, replies, config(200, 5)).await;

    assert_eq!(report.status, HarvestStatus::StoppedSaturated);
    assert_eq!(report.cycles, 6);
    assert_eq!(report.total_extracted, 2);
    assert_eq!(report.exported_rows, 2);
    assert_eq!(device.scrolls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn duplicate_candidates_in_one_screen_store_once() {
    let harness = Harness::new();
    let device = ScriptedDevice::distinct_screens();

    let (report, _db, _) = harness
        .run(&device, vec![contacts_json(&["A", "A"])], config(200, 2))
        .await;

    assert_eq!(report.total_extracted, 1);
    assert_eq!(report.exported_rows, 1);
    assert_eq!(report.cycles, 3);
}

#[tokio::test]
async fn exhausts_when_every_screen_has_someone_new() {
    let harness = Harness::new();
    let device = ScriptedDevice::distinct_screens();
    let replies = (0..10).map(|i| contacts_json(&[format!("Person {i}").as_str()])).collect();

    let (report, _db, _) = harness.run(&device, replies, config(4, 5)).await;

    assert_eq!(report.status, HarvestStatus::StoppedExhausted);
    assert_eq!(report.cycles, 4);
    assert_eq!(report.total_extracted, 4);
    assert_eq!(device.scrolls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn capture_failures_do_not_count_as_empty_screens() {
    let harness = Harness::new();
    let device = ScriptedDevice::new(vec![
        Err(anyhow!("device offline")),
        Err(anyhow!("device offline")),
        Err(anyhow!("device offline")),
    ]);

    let (report, _db, _) = harness
        .run(&device, vec![contacts_json(&["Solo"])], config(200, 2))
        .await;

    // 3 failed captures, 1 productive screen, then 2 empty screens
    assert_eq!(report.status, HarvestStatus::StoppedSaturated);
    assert_eq!(report.cycles, 6);
    assert_eq!(report.total_extracted, 1);
    // failed captures wait and retry without scrolling
    assert_eq!(device.scrolls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rerun_skips_contacts_from_previous_run() {
    let harness = Harness::new();

    let first = ScriptedDevice::distinct_screens();
    let (report, _db, _) = harness
        .run(&first, vec![contacts_json(&["Ada", "Grace"])], config(200, 2))
        .await;
    assert_eq!(report.total_extracted, 2);

    let second = ScriptedDevice::distinct_screens();
    let (report, db, _) = harness
        .run(&second, vec![contacts_json(&["Ada", "Grace"])], config(200, 2))
        .await;

    assert_eq!(report.status, HarvestStatus::StoppedSaturated);
    assert_eq!(report.total_extracted, 0);
    assert_eq!(report.cycles, 2);
    assert_eq!(report.exported_rows, 2);
    assert_eq!(csv_lines(&harness.output).len(), 3);
    assert!(db.get_unfinished_runs().await.unwrap().is_empty());
}

fn gradient_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(32, 32, |x, _| image::Rgb([(x * 8) as u8; 3]));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// A contact-list page: avatar column plus two text lines per row. Only the
/// text lengths depend on `page`.
fn list_page(page: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(270, 600, |x, y| {
        let row = y / 120;
        let in_row = y % 120;
        let avatar = (20..70).contains(&x) && (35..85).contains(&in_row);
        let name_len = 60 + (page * 37 + row * 23) % 120;
        let title_len = 40 + (page * 53 + row * 31) % 100;
        let name = (40..52).contains(&in_row) && (90..90 + name_len).contains(&x);
        let title = (64..72).contains(&in_row) && (90..90 + title_len).contains(&x);
        if avatar {
            image::Rgb([160, 160, 160])
        } else if name || title {
            image::Rgb([30, 30, 30])
        } else {
            image::Rgb([255, 255, 255])
        }
    });
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

#[tokio::test]
async fn same_layout_pages_all_reach_the_model_by_default() {
    let harness = Harness::new();
    let device = ScriptedDevice::new((0..3).map(|page| Ok(list_page(page))).collect());
    let replies = vec![
        contacts_json(&["Page One"]),
        contacts_json(&["Page Two"]),
        contacts_json(&["Page Three"]),
    ];

    let (report, _db, model_calls) = harness.run(&device, replies, config(200, 2)).await;

    assert_eq!(report.status, HarvestStatus::StoppedSaturated);
    assert_eq!(report.total_extracted, 3);
    assert_eq!(report.cycles, 5);
    assert_eq!(model_calls, 5);
}

#[tokio::test]
async fn identical_screens_still_reach_the_model_by_default() {
    let harness = Harness::new();
    let screen = list_page(0);
    let device = ScriptedDevice::new((0..3).map(|_| Ok(screen.clone())).collect());

    let (report, _db, model_calls) = harness
        .run(&device, vec![contacts_json(&["Only Person"])], config(200, 2))
        .await;

    assert_eq!(report.cycles, 3);
    assert_eq!(model_calls, 3);
}

#[tokio::test]
async fn unchanged_screen_skips_the_model_when_enabled() {
    let harness = Harness::new();
    let screen = gradient_png();
    let device = ScriptedDevice::new((0..4).map(|_| Ok(screen.clone())).collect());
    let config = HarvestConfig {
        unchanged_screen_distance: Some(0),
        ..config(200, 3)
    };

    let (report, _db, model_calls) = harness
        .run(&device, vec![contacts_json(&["Only Person"])], config)
        .await;

    assert_eq!(report.status, HarvestStatus::StoppedSaturated);
    assert_eq!(report.cycles, 4);
    assert_eq!(report.total_extracted, 1);
    assert_eq!(model_calls, 1);
}
