//! Concurrent multi-tracker aggregation
//!
//! One worker thread per tracker plus one for bucket labels. Workers only
//! send messages; the calling thread is the single consumer and the only
//! writer of the merged totals.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::mpsc::{self, SyncSender};
use std::thread;
use tracing::{debug, warn};

use crate::services::source::{Source, SourceFactory};
use crate::types::{Bucket, CategoryFilter, Period, Quantity, Result, TrackerError, Window};

/// What to aggregate: `frequency` previous buckets plus the current one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    frequency: u32,
    period: Period,
    categories: CategoryFilter,
    sources: Vec<String>,
}

impl AggregationRequest {
    /// Rejects an empty source list, and a category filter spanning
    /// several trackers (category ids are local to one tracker).
    pub fn new(
        frequency: u32,
        period: Period,
        categories: CategoryFilter,
        sources: Vec<String>,
    ) -> Result<Self> {
        if sources.is_empty() {
            return Err(TrackerError::Usage("at least one tracker required".into()));
        }
        if !categories.is_empty() && sources.len() > 1 {
            return Err(TrackerError::Usage(
                "categories can only be filtered on a single tracker".into(),
            ));
        }
        Ok(Self {
            frequency,
            period,
            categories,
            sources,
        })
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn categories(&self) -> &CategoryFilter {
        &self.categories
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Fails when the lookback reaches past the supported calendar range
    pub fn window(&self, today: NaiveDate) -> Result<Window> {
        Window::try_new(self.period, self.frequency, today)
    }
}

/// Worker → consumer mailbox messages
enum Message {
    Keys(Vec<String>),
    CategoryName(String),
    Samples {
        source: String,
        result: Result<Vec<Bucket>>,
    },
}

/// Fans a request out across trackers and merges the partial sums
pub struct AggregationEngine<'f, F: SourceFactory> {
    request: AggregationRequest,
    factory: &'f F,
    today: NaiveDate,
    results: HashMap<String, Quantity>,
    bucket_keys: Vec<String>,
    category_names: BTreeSet<String>,
    succeeded: usize,
}

impl<'f, F: SourceFactory> AggregationEngine<'f, F> {
    pub fn new(request: AggregationRequest, factory: &'f F) -> Self {
        Self {
            request,
            factory,
            today: Local::now().date_naive(),
            results: HashMap::new(),
            bucket_keys: Vec::new(),
            category_names: BTreeSet::new(),
            succeeded: 0,
        }
    }

    /// Pin "now" to a fixed date
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Query every tracker concurrently and merge what succeeds.
    ///
    /// Blocks until every worker has finished. Returns the first tracker
    /// error seen; the merged results still hold every other tracker.
    pub fn execute(&mut self) -> Result<()> {
        let Self {
            request,
            factory,
            today,
            results,
            bucket_keys,
            category_names,
            succeeded,
        } = self;
        let factory: &F = *factory;

        results.clear();
        bucket_keys.clear();
        category_names.clear();
        *succeeded = 0;

        let window = request.window(*today)?;
        let categories = &request.categories;

        // Every message any worker can send fits, so no send ever blocks
        let capacity = 1 + request.sources.len() * (1 + categories.len());
        let (tx, rx) = mpsc::sync_channel::<Message>(capacity);

        let mut first_error: Option<TrackerError> = None;

        thread::scope(|scope| {
            let keys_tx = tx.clone();
            scope.spawn(move || {
                let _ = keys_tx.send(Message::Keys(window.bucket_keys()));
            });

            for name in &request.sources {
                let tx = tx.clone();
                scope.spawn(move || {
                    debug!(tracker = %name, "querying tracker");
                    let result = fetch_source(factory, name, &window, categories, &tx);
                    let _ = tx.send(Message::Samples {
                        source: name.clone(),
                        result,
                    });
                });
            }

            // Receiving ends once every worker has dropped its sender
            drop(tx);

            for message in rx.iter() {
                match message {
                    Message::Keys(keys) => *bucket_keys = keys,
                    Message::CategoryName(name) => {
                        category_names.insert(name);
                    }
                    Message::Samples {
                        source,
                        result: Ok(buckets),
                    } => {
                        debug!(tracker = %source, buckets = buckets.len(), "merging tracker");
                        *succeeded += 1;
                        for bucket in buckets {
                            *results.entry(bucket.key()).or_default() += bucket.qty;
                        }
                    }
                    Message::Samples {
                        source,
                        result: Err(e),
                    } => {
                        warn!(tracker = %source, error = %e, "tracker skipped");
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
        });

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Merged totals by bucket key; absent keys are zero
    pub fn results(&self) -> &HashMap<String, Quantity> {
        &self.results
    }

    /// `frequency + 1` bucket keys, oldest first
    pub fn bucket_keys(&self) -> &[String] {
        &self.bucket_keys
    }

    /// Trackers merged by the last `execute`, including ones with no data
    /// in the window
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn total(&self) -> Quantity {
        self.results.values().sum()
    }

    /// Names of the filtered categories; empty when unfiltered
    pub fn category_names(&self) -> &BTreeSet<String> {
        &self.category_names
    }

    pub fn title(&self) -> String {
        self.request.sources.join(" & ")
    }

    /// Snapshot of the merged result for renderers. Its total covers the
    /// printed rows only, so buckets past today are left out.
    pub fn report(&self) -> AggregationReport {
        let mut total = Quantity::ZERO;
        let rows = self
            .bucket_keys
            .iter()
            .map(|key| {
                let qty = self.results.get(key).copied().unwrap_or_default();
                total += qty;
                ReportRow {
                    key: key.clone(),
                    value: qty.as_f64(),
                }
            })
            .collect();

        AggregationReport {
            title: self.title(),
            period: self.request.period,
            categories: self.category_names.iter().cloned().collect(),
            rows,
            total: total.as_f64(),
        }
    }
}

/// Open, resolve categories, query. Category names are sent as they resolve.
fn fetch_source<F: SourceFactory>(
    factory: &F,
    name: &str,
    window: &Window,
    categories: &CategoryFilter,
    tx: &SyncSender<Message>,
) -> Result<Vec<Bucket>> {
    let source = factory.open(name)?;
    for id in categories.iter() {
        let category = source.resolve_category(id)?;
        let _ = tx.send(Message::CategoryName(category));
    }
    source.query(window, categories)
}

/// Display-ready aggregation output, one row per bucket key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationReport {
    pub title: String,
    pub period: Period,
    pub categories: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub key: String,
    pub value: f64,
}

impl AggregationReport {
    /// Heading shown above a table or graph
    pub fn heading(&self) -> String {
        if self.categories.is_empty() {
            format!("{} (all categories)", self.title)
        } else {
            format!("{} ({})", self.title, self.categories.join(", "))
        }
    }
}
