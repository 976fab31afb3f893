use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::config::{Config, TRACKER_DIR_ENV};
use crate::render::{GraphLayout, Render, TableView};
use crate::services::{AggregationEngine, AggregationRequest, Source, SourceFactory, TrackerStore};
use crate::types::{CategoryFilter, CategoryId, Period, Quantity, TrackerError, DEFAULT_CATEGORY};

/// Tracker name that expands to every known tracker
const ALL_TRACKERS: &str = "all";

/// Track quantities and aggregate them by day, week, month or year
#[derive(Parser)]
#[command(name = "tallytrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the tracker files
    #[arg(long, global = true, env = TRACKER_DIR_ENV)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the existing trackers
    List,

    /// Create a new tracker
    New { name: String },

    /// Record a quantity in a tracker
    Add {
        name: String,

        /// Amount, up to two decimals
        #[arg(long = "qty", visible_alias = "quantity", allow_negative_numbers = true)]
        qty: Quantity,

        /// Category id
        #[arg(long = "cat", visible_alias = "category", default_value_t = DEFAULT_CATEGORY)]
        category: CategoryId,

        /// Booking date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Manage the categories of a tracker
    #[command(visible_alias = "cat")]
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },

    /// Show the most recent record of a category
    Last {
        name: String,

        #[arg(long = "cat", visible_alias = "category", default_value_t = DEFAULT_CATEGORY)]
        category: CategoryId,
    },

    /// Aggregate one or more trackers by period
    #[command(visible_alias = "agg")]
    Aggregate {
        /// Tracker to include (repeatable), or "all"
        #[arg(short = 't', long = "tracker", required = true)]
        trackers: Vec<String>,

        /// d, w, m or y
        #[arg(short, long, default_value_t = Period::Week)]
        period: Period,

        /// Number of previous periods to include
        #[arg(short, long, default_value_t = 0)]
        frequency: u32,

        /// Category id to filter on (repeatable, single tracker only)
        #[arg(short = 'c', long = "category")]
        categories: Vec<CategoryId>,

        /// Draw an ASCII graph instead of a table
        #[arg(long, conflicts_with = "json")]
        graph: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CategoryCommand {
    /// List categories with their ids
    List { name: String },

    /// Add categories
    Add {
        name: String,

        #[arg(required = true)]
        names: Vec<String>,
    },
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let config = Config::resolve(self.dir)?;
        let store = TrackerStore::new(&config);

        match self.command {
            Commands::List => {
                for name in store.list()? {
                    println!("{}", name);
                }
                Ok(())
            }
            Commands::New { name } => {
                config.ensure_tracker_dir()?;
                store.create(&name)?;
                Ok(())
            }
            Commands::Add {
                name,
                qty,
                category,
                date,
            } => {
                if qty.is_zero() {
                    return Err(TrackerError::Usage("no quantity specified".into()).into());
                }
                let mut tracker = store.open(&name)?;
                let date = date.unwrap_or_else(|| Local::now().date_naive());
                tracker.add_record(qty, category, date)?;
                Ok(())
            }
            Commands::Category {
                action: CategoryCommand::List { name },
            } => {
                let tracker = store.open(&name)?;
                for (id, category) in tracker.categories() {
                    println!("{} {}", id, category);
                }
                Ok(())
            }
            Commands::Category {
                action: CategoryCommand::Add { name, names },
            } => {
                let mut tracker = store.open(&name)?;
                tracker.add_categories(names.as_slice())?;
                Ok(())
            }
            Commands::Last { name, category } => {
                let tracker = store.open(&name)?;
                let record = tracker.last_record(category)?;
                println!(
                    "{}  |  {}  |  {}",
                    record.date,
                    tracker.resolve_category(record.category)?,
                    record.qty
                );
                Ok(())
            }
            Commands::Aggregate {
                trackers,
                period,
                frequency,
                categories,
                graph,
                json,
            } => {
                let trackers = if trackers.len() == 1 && trackers[0] == ALL_TRACKERS {
                    store.list()?
                } else {
                    trackers
                };
                let categories: CategoryFilter = categories.into_iter().collect();
                let request = AggregationRequest::new(frequency, period, categories, trackers)?;

                let mut engine = AggregationEngine::new(request, &store);
                if let Err(e) = engine.execute() {
                    if engine.succeeded() == 0 {
                        return Err(e.into());
                    }
                    warn!(error = %e, "showing partial aggregation");
                }

                let report = engine.report();
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else if graph {
                    println!("{}", report.heading());
                    GraphLayout::from_report(&report).print()?;
                } else {
                    TableView::new(&report).print()?;
                }
                Ok(())
            }
        }
    }
}
