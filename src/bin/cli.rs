//! Syllabus Crawler CLI
//!
//! Local execution entry point for crawling and querying the lecture store.

use std::path::PathBuf;

use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use syllabus_crawler::{
    error::{AppError, Result},
    models::{Config, DayOfWeek, Level, LoggingConfig, SearchQuery, Semester, Slot},
    pipeline,
    storage::SqliteStore,
    utils::cancel::CancelToken,
};

/// Syllabus Crawler - University Course Catalogue Ingestion
#[derive(Parser, Debug)]
#[command(
    name = "syllabus-crawler",
    version,
    about = "Crawls a university syllabus site into SQLite"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the database path from the configuration
    #[arg(long)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one academic year from the top page
    Crawl {
        /// Academic year (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Crawl every year from `crawler.first_year` to the current year
    CrawlAll,

    /// Crawl a single course list page
    CrawlList {
        #[arg(long)]
        url: String,

        /// Base for relative detail links (default: the top page URL)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Crawl a single course detail page
    CrawlDetail {
        #[arg(long)]
        url: String,
    },

    /// Synthesize omitted middle periods in stored timetables
    ExpandTimetables,

    /// Resolve stored related-course codes into links
    MigrateRelated,

    /// Search stored lectures
    Search {
        /// Title substring (primary or English)
        #[arg(long)]
        title: Option<String>,

        /// Teacher name substring
        #[arg(long)]
        teacher: Option<String>,

        /// Room name substring
        #[arg(long)]
        room: Option<String>,

        #[arg(long = "department")]
        departments: Vec<String>,

        #[arg(long = "keyword")]
        keywords: Vec<String>,

        #[arg(long)]
        year: Option<i64>,

        /// spring, summer, fall or winter
        #[arg(long = "semester", value_parser = parse_semester)]
        semesters: Vec<Semester>,

        /// Level 1-6 (bachelor 1-3, master 1-2, doctor)
        #[arg(long = "level", value_parser = parse_level)]
        levels: Vec<Level>,

        /// Day and period such as `mon:3`, `fri` or `:2`
        #[arg(long = "slot", value_parser = parse_slot)]
        slots: Vec<Slot>,

        /// Drop research seminars, theses and similar
        #[arg(long)]
        exclude_research: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one stored lecture as JSON
    Show {
        #[arg(long)]
        id: i64,
    },

    /// Validate configuration file
    Validate,
}

/// Initialize logging; `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn parse_semester(value: &str) -> std::result::Result<Semester, String> {
    Semester::parse(value).ok_or_else(|| format!("unknown semester '{value}'"))
}

fn parse_level(value: &str) -> std::result::Result<Level, String> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(Level::from_i64)
        .ok_or_else(|| format!("level must be 1-6, got '{value}'"))
}

fn parse_slot(value: &str) -> std::result::Result<Slot, String> {
    let (day, period) = value.split_once(':').unwrap_or((value, ""));
    let day_of_week = match day.trim() {
        "" => None,
        d => Some(DayOfWeek::parse(d).ok_or_else(|| format!("unknown day '{d}'"))?),
    };
    let period = match period.trim() {
        "" => None,
        p => Some(p.parse::<u32>().map_err(|_| format!("invalid period '{p}'"))?),
    };
    if day_of_week.is_none() && period.is_none() {
        return Err(format!("empty slot '{value}'"));
    }
    Ok(Slot {
        day_of_week,
        period,
    })
}

/// Stop a running crawl on Ctrl-C.
fn spawn_interrupt_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping crawl...");
            cancel.cancel();
        }
    });
}

/// Range expansion runs before every crawl; a failure there is not fatal.
fn prepare_store(store: &mut SqliteStore) {
    if let Err(e) = pipeline::expand_timetables(store) {
        log::warn!("Expand timetable ranges before crawl: {}", e);
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => LoggingConfig::default().level,
    };
    init_logging(&level);

    log::info!("Syllabus Crawler starting...");

    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });
    if let Some(path) = cli.database {
        config.database.path = path;
    }

    let result = run(cli.command, &config).await;
    match result {
        Err(e) if e.is_cancelled() => {
            log::warn!("Stopped before completion; the current batch was not saved.");
            Ok(())
        }
        Err(e) => {
            log::error!("{}", e);
            Err(e)
        }
        Ok(()) => {
            log::info!("Done!");
            Ok(())
        }
    }
}

async fn run(command: Command, config: &Config) -> Result<()> {
    let open_store = || {
        log::info!("Using database {}", config.database.path.display());
        SqliteStore::open(&config.database.path)
    };
    let current_year = Local::now().year();

    match command {
        Command::Crawl { year } => {
            let mut store = open_store()?;
            prepare_store(&mut store);

            let cancel = CancelToken::new();
            spawn_interrupt_handler(cancel.clone());
            let mut scraper = pipeline::build_scraper(config, store, cancel)?;
            pipeline::run_crawl(&mut scraper, year.unwrap_or(current_year)).await?;
        }

        Command::CrawlAll => {
            let first_year = config.crawler.first_year;
            if first_year > current_year {
                return Err(AppError::config(format!(
                    "crawler.first_year {first_year} is after the current year {current_year}"
                )));
            }

            let mut store = open_store()?;
            prepare_store(&mut store);

            let cancel = CancelToken::new();
            spawn_interrupt_handler(cancel.clone());
            let mut scraper = pipeline::build_scraper(config, store, cancel)?;
            pipeline::run_crawl_all(&mut scraper, first_year, current_year).await?;
        }

        Command::CrawlList { url, base_url } => {
            let mut store = open_store()?;
            prepare_store(&mut store);

            let cancel = CancelToken::new();
            spawn_interrupt_handler(cancel.clone());
            let mut scraper = pipeline::build_scraper(config, store, cancel)?;
            let base_url = base_url.unwrap_or_else(|| config.crawler.top_page_url.clone());
            pipeline::run_crawl_list(&mut scraper, &url, &base_url).await?;
        }

        Command::CrawlDetail { url } => {
            let mut store = open_store()?;
            prepare_store(&mut store);

            let cancel = CancelToken::new();
            spawn_interrupt_handler(cancel.clone());
            let mut scraper = pipeline::build_scraper(config, store, cancel)?;
            pipeline::run_crawl_detail(&mut scraper, &url).await?;
        }

        Command::ExpandTimetables => {
            let mut store = open_store()?;
            pipeline::expand_timetables(&mut store)?;
        }

        Command::MigrateRelated => {
            let mut store = open_store()?;
            pipeline::migrate_related(&mut store)?;
        }

        Command::Search {
            title,
            teacher,
            room,
            departments,
            keywords,
            year,
            semesters,
            levels,
            slots,
            exclude_research,
            json,
        } => {
            let store = open_store()?;
            let query = SearchQuery {
                title: title.unwrap_or_default(),
                keywords,
                departments,
                year: year.unwrap_or(0),
                teacher_name: teacher.unwrap_or_default(),
                room: room.unwrap_or_default(),
                semesters,
                timetables: slots,
                levels,
                exclude_research,
            };
            let results = pipeline::search(&store, &query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            }
        }

        Command::Show { id } => {
            let store = open_store()?;
            match pipeline::show(&store, id)? {
                Some(lecture) => println!("{}", serde_json::to_string_pretty(&lecture)?),
                None => return Err(AppError::config(format!("lecture {id} does not exist"))),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
