// THEORY:
// The `AlertStore` is the engine's only persistent state: an append-only log
// partitioned first by calendar date, then by zone.
//
//     <root>/<YYYY-MM-DD>/<normalized-zone>.log
//
// Key architectural principles:
// 1.  **Lazy, Idempotent Layout**: `ensure_bucket` and `ensure_zone_file` create
//     the date directory and zone file on first use and are no-ops afterwards.
//     Every append goes through them.
// 2.  **Append-Only**: Files are opened in append mode and each record is written
//     as one complete line, so records keep their write order and are never
//     rewritten.
// 3.  **Best-Effort Writes**: Monitoring must never stall on disk trouble. The
//     `AlertSink` entry point reports failures through a `PersistenceReporter`
//     and returns normally. `try_append_at` is the fallible core.
// 4.  **Wall-Clock Buckets**: The date bucket is the local date at the moment of
//     the write, not the capture time of the frame.
// 5.  **Distinct Zones, Distinct Files**: Concurrent sessions on different zones
//     never touch the same file, so no locking is needed.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use tracing::{debug, error, warn};

use crate::core_modules::alert_record::AlertRecord;
use crate::core_modules::detection::HazardSet;
use crate::core_modules::risk_model::{RiskAssessment, RiskLevel};
use crate::core_modules::zone_summary::ZoneSummary;
use crate::error::StoreError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const ZONE_LOG_EXTENSION: &str = "log";

/// Where the frame processor sends qualifying frames.
pub trait AlertSink {
    /// Persists one alert. Implementations must not fail the caller.
    fn record_alert(&self, zone: &str, hazards: &HazardSet, assessment: RiskAssessment);
}

/// The operator-facing channel for persistence failures.
pub trait PersistenceReporter: Send + Sync {
    fn report(&self, zone: &str, error: &StoreError);
}

/// Reports persistence failures as `tracing` error events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl PersistenceReporter for TracingReporter {
    fn report(&self, zone: &str, error: &StoreError) {
        error!(zone, %error, "failed to persist alert");
    }
}

#[derive(Clone)]
pub struct AlertStore {
    root: PathBuf,
    reporter: Arc<dyn PersistenceReporter>,
}

impl AlertStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self {
            root,
            reporter: Arc::new(TracingReporter),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn PersistenceReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The local calendar date, as used for new buckets.
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn parse_date(date: &str) -> Result<NaiveDate, StoreError> {
        NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|_| StoreError::InvalidDate(date.to_string()))
    }

    /// The file name of a zone's log: spaces become underscores and path
    /// separators become hyphens. Normalizing a file stem is a no-op.
    pub fn zone_file_name(zone: &str) -> String {
        let key = zone.replace(' ', "_").replace(['/', '\\'], "-");
        format!("{key}.{ZONE_LOG_EXTENSION}")
    }

    pub fn bucket_path(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format(DATE_FORMAT).to_string())
    }

    pub fn zone_log_path(&self, date: NaiveDate, zone: &str) -> PathBuf {
        self.bucket_path(date).join(Self::zone_file_name(zone))
    }

    pub fn ensure_bucket(&self, date: NaiveDate) -> Result<PathBuf, StoreError> {
        let bucket = self.bucket_path(date);
        fs::create_dir_all(&bucket).map_err(|e| StoreError::io(&bucket, e))?;
        Ok(bucket)
    }

    pub fn ensure_zone_file(&self, date: NaiveDate, zone: &str) -> Result<PathBuf, StoreError> {
        self.ensure_bucket(date)?;
        let path = self.zone_log_path(date, zone);
        if !path.exists() {
            debug!(path = %path.display(), "creating zone log");
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| StoreError::io(&path, e))?;
        }
        Ok(path)
    }

    /// Appends one record stamped with `now`. This is the fallible core of
    /// `append`.
    pub fn try_append_at(
        &self,
        now: NaiveDateTime,
        zone: &str,
        hazards: &[String],
        score: u32,
        level: RiskLevel,
    ) -> Result<AlertRecord, StoreError> {
        // A line break in the zone would split the record across lines.
        if zone.chars().any(char::is_control) {
            return Err(StoreError::InvalidZone(zone.to_string()));
        }
        let path = self.ensure_zone_file(now.date(), zone)?;
        let record = AlertRecord {
            timestamp: now.time().with_nanosecond(0).unwrap_or(now.time()),
            zone: zone.to_string(),
            level,
            score,
            hazards: hazards.to_vec(),
        };

        let line = format!("{record}\n");
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        file.write_all(line.as_bytes()).map_err(|e| StoreError::io(&path, e))?;
        Ok(record)
    }

    /// Best-effort append at the current local time. Failures go to the
    /// reporter and never reach the caller.
    pub fn append(&self, zone: &str, hazards: &[String], score: u32, level: RiskLevel) {
        let now = Local::now().naive_local();
        if let Err(error) = self.try_append_at(now, zone, hazards, score, level) {
            self.reporter.report(zone, &error);
        }
    }

    /// Date buckets present under the root, newest first. Directories whose
    /// name is not a date are ignored.
    pub fn enumerate_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match Self::parse_date(&name) {
                Ok(date) => dates.push(date),
                Err(_) => debug!(name = %name, "ignoring non-date directory in log root"),
            }
        }
        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    /// Zone keys (file stems) logged under `date`, sorted by name.
    pub fn enumerate_zones(&self, date: NaiveDate) -> Result<Vec<String>, StoreError> {
        let bucket = self.bucket_path(date);
        if !bucket.is_dir() {
            return Err(StoreError::UnknownDate(date.format(DATE_FORMAT).to_string()));
        }
        let entries = fs::read_dir(&bucket).map_err(|e| StoreError::io(&bucket, e))?;

        let mut zones = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&bucket, e))?.path();
            let is_log = path.extension().is_some_and(|ext| ext == ZONE_LOG_EXTENSION);
            if let (true, Some(stem)) = (is_log, path.file_stem()) {
                zones.push(stem.to_string_lossy().into_owned());
            }
        }
        zones.sort();
        Ok(zones)
    }

    /// The raw text of a zone log.
    pub fn read_raw(&self, date: NaiveDate, zone: &str) -> Result<String, StoreError> {
        let path = self.zone_log_path(date, zone);
        if !path.is_file() {
            return Err(StoreError::UnknownZone {
                date: date.format(DATE_FORMAT).to_string(),
                zone: zone.to_string(),
            });
        }
        fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))
    }

    /// The records of a zone log in append order. Unparseable lines are
    /// skipped with a warning.
    pub fn read_zone_log(&self, date: NaiveDate, zone: &str) -> Result<Vec<AlertRecord>, StoreError> {
        let text = self.read_raw(date, zone)?;
        let records = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(index, line)| match AlertRecord::parse_line(line) {
                Ok(record) => Some(record),
                Err(error) => {
                    warn!(zone, line = index + 1, %error, "skipping malformed alert line");
                    None
                }
            })
            .collect();
        Ok(records)
    }

    pub fn summarize_zone(&self, date: NaiveDate, zone: &str) -> Result<ZoneSummary, StoreError> {
        Ok(ZoneSummary::from_records(&self.read_zone_log(date, zone)?))
    }
}

impl AlertSink for AlertStore {
    fn record_alert(&self, zone: &str, hazards: &HazardSet, assessment: RiskAssessment) {
        self.append(zone, hazards.labels(), assessment.score, assessment.level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<String>>,
    }

    impl PersistenceReporter for RecordingReporter {
        fn report(&self, zone: &str, error: &StoreError) {
            self.reports.lock().expect("reporter lock").push(format!("{zone}: {error}"));
        }
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").expect("valid datetime")
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn append_then_read_preserves_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AlertStore::open(dir.path()).expect("open store");

        store
            .try_append_at(at("2025-12-09", "10:00:01"), "Dock", &labels(&["person", "person", "truck"]), 12, RiskLevel::High)
            .expect("append");
        store
            .try_append_at(at("2025-12-09", "10:00:02"), "Dock", &labels(&["dog"]), 3, RiskLevel::Medium)
            .expect("append");
        store
            .try_append_at(at("2025-12-09", "09:00:00"), "Dock", &labels(&["car", "cat"]), 4, RiskLevel::Medium)
            .expect("append");

        let date = AlertStore::parse_date("2025-12-09").expect("date");
        let records = store.read_zone_log(date, "Dock").expect("read");
        let scores: Vec<u32> = records.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![12, 3, 4]);
        assert_eq!(records[0].hazards, labels(&["person", "person", "truck"]));
    }

    #[test]
    fn zones_share_a_date_bucket_in_distinct_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AlertStore::open(dir.path()).expect("open store");
        let now = at("2025-12-09", "12:00:00");

        store.try_append_at(now, "North Gate", &labels(&["person"]), 4, RiskLevel::Medium).expect("append");
        store.try_append_at(now, "Hangar/2", &labels(&["truck"]), 4, RiskLevel::Medium).expect("append");

        let bucket = dir.path().join("2025-12-09");
        assert!(bucket.join("North_Gate.log").is_file());
        assert!(bucket.join("Hangar-2.log").is_file());

        let zones = store.enumerate_zones(now.date()).expect("zones");
        assert_eq!(zones, vec!["Hangar-2".to_string(), "North_Gate".to_string()]);
        assert_eq!(store.read_zone_log(now.date(), "North_Gate").expect("read").len(), 1);
        assert_eq!(store.read_zone_log(now.date(), "North Gate").expect("read")[0].zone, "North Gate");
    }

    #[test]
    fn zone_file_name_is_deterministic_and_idempotent() {
        assert_eq!(AlertStore::zone_file_name("North Gate"), "North_Gate.log");
        assert_eq!(AlertStore::zone_file_name("North_Gate"), "North_Gate.log");
        assert_eq!(AlertStore::zone_file_name("a\\b/c d"), "a-b-c_d.log");
    }

    #[test]
    fn dates_are_listed_newest_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AlertStore::open(dir.path()).expect("open store");
        for date in ["2025-12-08", "2025-12-10", "2025-12-09"] {
            store.ensure_bucket(AlertStore::parse_date(date).expect("date")).expect("bucket");
        }
        fs::create_dir(dir.path().join("scratch")).expect("stray dir");
        fs::write(dir.path().join("2025-12-11"), "not a dir").expect("stray file");

        let dates: Vec<String> = store
            .enumerate_dates()
            .expect("dates")
            .iter()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .collect();
        assert_eq!(dates, vec!["2025-12-10", "2025-12-09", "2025-12-08"]);
    }

    #[test]
    fn ensure_operations_are_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AlertStore::open(dir.path()).expect("open store");
        let now = at("2025-12-09", "12:00:00");
        store.try_append_at(now, "Dock", &labels(&["dog"]), 3, RiskLevel::Medium).expect("append");

        let path = store.ensure_zone_file(now.date(), "Dock").expect("ensure");
        store.ensure_bucket(now.date()).expect("ensure bucket");
        assert_eq!(fs::read_to_string(path).expect("read").lines().count(), 1);
    }

    #[test]
    fn unknown_date_and_zone_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AlertStore::open(dir.path()).expect("open store");
        let date = AlertStore::parse_date("2025-01-01").expect("date");

        assert!(matches!(store.enumerate_zones(date), Err(StoreError::UnknownDate(_))));
        store.ensure_bucket(date).expect("bucket");
        assert!(store.enumerate_zones(date).expect("zones").is_empty());
        assert!(matches!(store.read_zone_log(date, "Dock"), Err(StoreError::UnknownZone { .. })));
        assert!(matches!(AlertStore::parse_date("yesterday"), Err(StoreError::InvalidDate(_))));
    }

    #[test]
    fn malformed_lines_are_skipped_on_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AlertStore::open(dir.path()).expect("open store");
        let now = at("2025-12-09", "12:00:00");
        let path = store.ensure_zone_file(now.date(), "Dock").expect("ensure");
        fs::write(
            &path,
            "[12:00:00] ZONE=Dock | NIVEAU=HIGH | SCORE=8 | OBJETS=['person', 'person']\n\
             garbage\n\
             [12:00:05] ZONE=Dock | NIVEAU=ÉLEVÉ | SCORE=6 | OBJETS=['bird', 'dog']\n",
        )
        .expect("seed log");

        let summary = store.summarize_zone(now.date(), "Dock").expect("summary");
        assert_eq!(summary.total, 2);
        assert_eq!(summary.high, 2);
    }

    #[test]
    fn labels_with_quotes_and_commas_read_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AlertStore::open(dir.path()).expect("open store");
        let now = at("2025-12-09", "12:00:00");
        let hazards = labels(&["it's", "a, b", "x | y"]);

        store.try_append_at(now, "Dock", &hazards, 3, RiskLevel::Medium).expect("append");

        let records = store.read_zone_log(now.date(), "Dock").expect("read");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hazards, hazards);
    }

    #[test]
    fn zone_with_line_break_is_rejected_and_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reporter = Arc::new(RecordingReporter::default());
        let store = AlertStore::open(dir.path())
            .expect("open store")
            .with_reporter(reporter.clone());
        let now = at("2025-12-09", "12:00:00");

        assert!(matches!(
            store.try_append_at(now, "Gate\nB", &labels(&["person"]), 4, RiskLevel::Medium),
            Err(StoreError::InvalidZone(_))
        ));
        assert!(!store.bucket_path(now.date()).exists());

        store.append("Gate\nB", &labels(&["person"]), 4, RiskLevel::Medium);
        assert_eq!(reporter.reports.lock().expect("reporter lock").len(), 1);
    }

    #[test]
    fn concurrent_appenders_on_distinct_zones_do_not_interfere() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AlertStore::open(dir.path()).expect("open store");
        let now = at("2025-12-09", "12:00:00");
        const PER_ZONE: u32 = 200;

        let writers: Vec<_> = ["North Gate", "Dock"]
            .into_iter()
            .map(|zone| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for score in 0..PER_ZONE {
                        store
                            .try_append_at(now, zone, &labels(&["person"]), score, RiskLevel::Medium)
                            .expect("append");
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread");
        }

        for zone in ["North Gate", "Dock"] {
            let records = store.read_zone_log(now.date(), zone).expect("read");
            let scores: Vec<u32> = records.iter().map(|r| r.score).collect();
            assert_eq!(scores, (0..PER_ZONE).collect::<Vec<_>>());
            assert!(records.iter().all(|r| r.zone == zone));
        }
    }

    #[test]
    fn append_failures_are_reported_not_raised() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reporter = Arc::new(RecordingReporter::default());
        let store = AlertStore::open(dir.path())
            .expect("open store")
            .with_reporter(reporter.clone());

        // A plain file where today's bucket directory should go.
        fs::write(store.bucket_path(AlertStore::today()), "blocker").expect("blocker");

        store.append("Dock", &labels(&["person"]), 4, RiskLevel::Medium);

        let reports = reporter.reports.lock().expect("reporter lock");
        assert_eq!(reports.len(), 1);
        assert!(reports[0].starts_with("Dock: "));
    }
}
