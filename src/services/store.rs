//! JSON-file tracker store
//!
//! Each tracker lives in `<tracker_dir>/<name>.json` and holds its own
//! category table and records. Readers take a shared lock; writers replace
//! the file atomically (temp file + rename) under an exclusive lock.

use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;
use crate::services::source::{Source, SourceFactory};
use crate::types::{
    Bucket, CategoryFilter, CategoryId, Quantity, Result, TrackerError, Window, DEFAULT_CATEGORY,
};

const TRACKER_EXTENSION: &str = "json";
const DEFAULT_CATEGORY_NAME: &str = "default";

/// A single recorded quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub qty: Quantity,
    pub category: CategoryId,
    /// Calendar date the quantity is booked on
    pub date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

/// On-disk tracker document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerDocument {
    pub name: String,
    pub categories: BTreeMap<CategoryId, String>,
    #[serde(default)]
    pub records: Vec<Record>,
}

impl TrackerDocument {
    fn new(name: &str) -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(DEFAULT_CATEGORY, DEFAULT_CATEGORY_NAME.to_string());
        Self {
            name: name.to_string(),
            categories,
            records: Vec::new(),
        }
    }
}

/// Directory of trackers
pub struct TrackerStore {
    dir: PathBuf,
}

impl TrackerStore {
    pub fn new(config: &Config) -> Self {
        Self::with_dir(config.tracker_dir().to_path_buf())
    }

    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tracker_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, TRACKER_EXTENSION))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.tracker_path(name).is_file()
    }

    /// Create a tracker seeded with the default category
    pub fn create(&self, name: &str) -> Result<Tracker> {
        validate_name(name)?;
        if self.exists(name) {
            return Err(TrackerError::AlreadyExists(name.to_string()));
        }

        let tracker = Tracker {
            path: self.tracker_path(name),
            doc: TrackerDocument::new(name),
        };
        tracker.save()?;
        debug!(tracker = name, path = %tracker.path.display(), "created tracker");
        Ok(tracker)
    }
}

impl SourceFactory for TrackerStore {
    type Source = Tracker;

    fn open(&self, name: &str) -> Result<Tracker> {
        validate_name(name)?;
        let path = self.tracker_path(name);
        if !path.is_file() {
            return Err(TrackerError::SourceNotFound(name.to_string()));
        }
        let doc = read_document(&path)?;
        Ok(Tracker { path, doc })
    }

    fn list(&self) -> Result<Vec<String>> {
        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(&self.dir.to_string_lossy()),
            TRACKER_EXTENSION
        );
        let paths = glob::glob(&pattern).map_err(|e| TrackerError::Config(e.to_string()))?;
        let mut names: Vec<String> = paths
            .filter_map(|e| e.ok())
            .filter(|p| p.is_file())
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }
}

/// An opened tracker; mutations are persisted immediately
#[derive(Debug)]
pub struct Tracker {
    path: PathBuf,
    doc: TrackerDocument,
}

impl Tracker {
    pub fn categories(&self) -> &BTreeMap<CategoryId, String> {
        &self.doc.categories
    }

    pub fn records(&self) -> &[Record] {
        &self.doc.records
    }

    /// Append categories with sequential ids, returning the new ids
    pub fn add_categories<S: AsRef<str>>(&mut self, names: &[S]) -> Result<Vec<CategoryId>> {
        let mut next_id = self
            .doc
            .categories
            .keys()
            .next_back()
            .map_or(DEFAULT_CATEGORY, |last| last + 1);

        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            self.doc
                .categories
                .insert(next_id, name.as_ref().to_string());
            ids.push(next_id);
            next_id += 1;
        }
        self.save()?;
        Ok(ids)
    }

    /// Record `qty` under `category` on `date`
    pub fn add_record(&mut self, qty: Quantity, category: CategoryId, date: NaiveDate) -> Result<()> {
        if !self.doc.categories.contains_key(&category) {
            return Err(TrackerError::CategoryNotFound {
                tracker: self.doc.name.clone(),
                id: category,
            });
        }
        self.doc.records.push(Record {
            qty,
            category,
            date,
            recorded_at: Utc::now(),
        });
        self.save()
    }

    /// Most recently dated record of a category
    pub fn last_record(&self, category: CategoryId) -> Result<&Record> {
        self.doc
            .records
            .iter()
            .filter(|r| r.category == category)
            .max_by_key(|r| (r.date, r.recorded_at))
            .ok_or_else(|| TrackerError::Query {
                tracker: self.doc.name.clone(),
                reason: "no data".into(),
            })
    }

    /// Save using atomic write (temp file + rename) with exclusive lock.
    /// The temp file is removed again if any step fails.
    fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.doc)
            .map_err(|e| TrackerError::Parse(format!("Serialization failed: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        let result = self.replace_with(&temp_path, content.as_bytes());
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn replace_with(&self, temp_path: &Path, content: &[u8]) -> Result<()> {
        {
            let mut file = File::create(temp_path)?;
            file.write_all(content)?;
            file.sync_all()?;
        }

        let target = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        target.lock_exclusive()?;
        fs::rename(temp_path, &self.path)?;
        let _ = target.unlock();
        Ok(())
    }
}

impl Source for Tracker {
    fn name(&self) -> &str {
        &self.doc.name
    }

    fn resolve_category(&self, id: CategoryId) -> Result<String> {
        self.doc
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| TrackerError::CategoryNotFound {
                tracker: self.doc.name.clone(),
                id,
            })
    }

    fn query(&self, window: &Window, filter: &CategoryFilter) -> Result<Vec<Bucket>> {
        let anchor = window.anchor().ordinal();
        let mut grouped: BTreeMap<i64, Bucket> = BTreeMap::new();

        for record in self.doc.records.iter().filter(|r| filter.matches(r.category)) {
            let ordinal = window.period.ordinal(record.date);
            if ordinal < anchor {
                continue;
            }
            grouped
                .entry(ordinal)
                .or_insert_with(|| Bucket::at(record.date, window.period))
                .qty += record.qty;
        }

        Ok(grouped.into_values().collect())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TrackerError::Usage("tracker name required".into()));
    }
    if name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(TrackerError::Usage(format!("invalid tracker name: {}", name)));
    }
    Ok(())
}

/// Read a tracker document under a shared lock
fn read_document(path: &Path) -> Result<TrackerDocument> {
    let file = File::open(path)?;
    file.lock_shared()?;

    let mut content = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut content);
    let _ = file.unlock();
    read?;

    serde_json::from_str(&content)
        .map_err(|e| TrackerError::Parse(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Period;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cents(raw: i64) -> Quantity {
        Quantity::from_hundredths(raw)
    }

    fn create_test_store() -> (TrackerStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = TrackerStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_create_seeds_default_category() {
        let (store, _temp) = create_test_store();
        let tracker = store.create("groceries").unwrap();

        assert!(store.exists("groceries"));
        assert_eq!(tracker.categories().len(), 1);
        assert_eq!(tracker.categories()[&1], "default");
    }

    #[test]
    fn test_create_twice_fails() {
        let (store, _temp) = create_test_store();
        store.create("fuel").unwrap();
        let err = store.create("fuel").unwrap_err();
        assert!(matches!(err, TrackerError::AlreadyExists(_)));
    }

    #[test]
    fn test_open_missing_is_source_not_found() {
        let (store, _temp) = create_test_store();
        let err = store.open("foo").unwrap_err();
        assert!(matches!(err, TrackerError::SourceNotFound(name) if name == "foo"));
    }

    #[test]
    fn test_open_empty_name_is_usage_error() {
        let (store, _temp) = create_test_store();
        assert!(matches!(store.open(""), Err(TrackerError::Usage(_))));
        assert!(matches!(store.open("../etc"), Err(TrackerError::Usage(_))));
    }

    #[test]
    fn test_open_corrupted_document() {
        let (store, _temp) = create_test_store();
        fs::write(store.tracker_path("broken"), "not valid json {{{").unwrap();
        assert!(matches!(store.open("broken"), Err(TrackerError::Parse(_))));
    }

    #[test]
    fn test_list_sorted_and_ignores_other_files() {
        let (store, temp) = create_test_store();
        store.create("test").unwrap();
        store.create("testf").unwrap();
        store.create("alpha").unwrap();
        fs::write(temp.path().join("notes.txt"), "x").unwrap();
        fs::write(temp.path().join("beta.json.tmp"), "x").unwrap();

        assert_eq!(store.list().unwrap(), vec!["alpha", "test", "testf"]);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let store = TrackerStore::with_dir(PathBuf::from("tests/fixtures/nonexistent"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_categories_roundtrip_through_disk() {
        let (store, _temp) = create_test_store();
        let mut tracker = store.create("test").unwrap();

        let ids = tracker.add_categories(&["foo", "bar", "baz"]).unwrap();
        assert_eq!(ids, vec![2, 3, 4]);

        let reopened = store.open("test").unwrap();
        assert_eq!(reopened.categories().len(), 4);
        assert_eq!(reopened.resolve_category(3).unwrap(), "bar");
        assert!(matches!(
            reopened.resolve_category(9),
            Err(TrackerError::CategoryNotFound { id: 9, .. })
        ));
    }

    #[test]
    fn test_add_record_unknown_category() {
        let (store, _temp) = create_test_store();
        let mut tracker = store.create("test").unwrap();
        let err = tracker
            .add_record(cents(1200), 2, date(2026, 10, 16))
            .unwrap_err();
        assert!(matches!(err, TrackerError::CategoryNotFound { id: 2, .. }));
        assert!(tracker.records().is_empty());
    }

    #[test]
    fn test_last_record() {
        let (store, _temp) = create_test_store();
        let mut tracker = store.create("test").unwrap();
        tracker.add_categories(&["foo"]).unwrap();

        let err = tracker.last_record(1).unwrap_err();
        assert_eq!(err.to_string(), "query on tracker test failed: no data");

        tracker.add_record(cents(500), 2, date(2026, 10, 1)).unwrap();
        tracker.add_record(cents(1200), 2, date(2026, 10, 9)).unwrap();
        tracker.add_record(cents(700), 2, date(2026, 10, 3)).unwrap();
        assert_eq!(tracker.last_record(2).unwrap().qty, cents(1200));
    }

    #[test]
    fn test_query_week_sums_per_bucket() {
        let (store, _temp) = create_test_store();
        let mut tracker = store.create("testf").unwrap();
        tracker.add_record(cents(1000), 1, date(2026, 10, 12)).unwrap();
        tracker.add_record(cents(15500), 1, date(2026, 10, 14)).unwrap();
        tracker.add_record(cents(520), 1, date(2026, 10, 16)).unwrap();
        tracker.add_record(cents(300), 1, date(2026, 10, 6)).unwrap();

        let window = Window::new(Period::Week, 0, date(2026, 10, 16));
        let buckets = tracker.query(&window, &CategoryFilter::all()).unwrap();

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key(), "W42 2026");
        assert_eq!(buckets[0].qty, cents(17020));
    }

    #[test]
    fn test_query_category_filter() {
        let (store, _temp) = create_test_store();
        let mut tracker = store.create("test").unwrap();
        tracker.add_categories(&["foo", "bar"]).unwrap();
        tracker.add_record(cents(1200), 2, date(2026, 10, 16)).unwrap();
        tracker.add_record(cents(50), 3, date(2026, 10, 16)).unwrap();
        tracker.add_record(cents(7), 1, date(2026, 10, 16)).unwrap();

        let window = Window::new(Period::Month, 2, date(2026, 10, 16));

        let only_foo: CategoryFilter = [2].into_iter().collect();
        let buckets = tracker.query(&window, &only_foo).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].qty, cents(1200));
        assert_eq!(buckets[0].key(), "2026 October");

        let foo_or_bar: CategoryFilter = [2, 3].into_iter().collect();
        let buckets = tracker.query(&window, &foo_or_bar).unwrap();
        assert_eq!(buckets[0].qty, cents(1250));

        let unused: CategoryFilter = [4].into_iter().collect();
        assert!(tracker.query(&window, &unused).unwrap().is_empty());
    }

    #[test]
    fn test_query_month_window_across_year_boundary() {
        let (store, _temp) = create_test_store();
        let mut tracker = store.create("test").unwrap();
        tracker.add_record(cents(100), 1, date(2026, 10, 31)).unwrap();
        tracker.add_record(cents(200), 1, date(2026, 11, 2)).unwrap();
        tracker.add_record(cents(400), 1, date(2027, 1, 20)).unwrap();

        // Anchor is November 2026: October must be excluded even though
        // its month number (10) is larger than January's (1)
        let window = Window::new(Period::Month, 2, date(2027, 1, 20));
        let buckets = tracker.query(&window, &CategoryFilter::all()).unwrap();
        let keys: Vec<String> = buckets.iter().map(Bucket::key).collect();
        assert_eq!(keys, vec!["2026 November", "2027 January"]);
    }

    #[test]
    fn test_query_year_window() {
        let (store, _temp) = create_test_store();
        let mut tracker = store.create("test").unwrap();
        tracker.add_record(cents(100), 1, date(2023, 6, 1)).unwrap();
        tracker.add_record(cents(200), 1, date(2024, 6, 1)).unwrap();
        tracker.add_record(cents(300), 1, date(2026, 6, 1)).unwrap();

        let window = Window::new(Period::Year, 2, date(2026, 10, 16));
        let buckets = tracker.query(&window, &CategoryFilter::all()).unwrap();
        let keys: Vec<String> = buckets.iter().map(Bucket::key).collect();
        assert_eq!(keys, vec!["2024", "2026"]);
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let (store, _temp) = create_test_store();
        let mut tracker = store.create("test").unwrap();

        // A directory in place of the document makes the final open fail
        let path = store.tracker_path("test");
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(tracker.add_record(cents(100), 1, date(2026, 10, 16)).is_err());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
