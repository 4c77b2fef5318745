use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use forum_scraper::fetch::Fetcher;
use forum_scraper::pipeline::{insert_threads, parse_threads};
use forum_scraper::timestamp::format_iso;
use forum_scraper::{
    parse_thread_ids, run_pipeline, sync_board, AnchorTimestamp, Config, PostTimestamp, Store,
};

/// Archive forum threads into SQLite
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Earliest year a post can be dated to
    #[arg(long, global = true)]
    floor_year: Option<i32>,

    /// Download pages even when a cached copy exists
    #[arg(long, global = true)]
    force_download: bool,

    /// Re-parse pages even when the text file exists
    #[arg(long, global = true)]
    force_parse: bool,

    /// Replace posts already in the database
    #[arg(long, global = true)]
    overwrite: bool,

    /// Default log level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download thread pages into the HTML cache
    Download {
        /// Thread ids or ranges, e.g. 12 40-45
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Reformat cached HTML pages into text files
    Parse {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Load text files into the database
    Insert {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Download, parse and insert
    Pipeline {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Process threads that are new or have new posts on the board index
    Sync,
    /// Create the database and its tables
    InitDb,
    /// Resolve one post timestamp against an anchor
    Resolve {
        /// Page time, e.g. "Mon May 19 16:52:12 2025"
        anchor: String,
        /// Post time, e.g. "Wed Mar 19 14:16:08"
        timestamp: String,
    },
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(floor_year) = self.floor_year {
            config.floor_year = floor_year;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config.force_download |= self.force_download;
        config.force_parse |= self.force_parse;
        config.overwrite |= self.overwrite;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();

    match &cli.command {
        Command::Download { ids } => {
            let ids = parse_thread_ids(ids)?;
            let report = Fetcher::new(&config)?.download_threads(&ids);
            println!(
                "Downloaded {}, cached {}, failed {}",
                report.downloaded.len(),
                report.cached.len(),
                report.failed.len()
            );
        }
        Command::Parse { ids } => {
            let ids = parse_thread_ids(ids)?;
            let report = parse_threads(&config, &ids);
            println!(
                "Parsed {} threads ({} posts skipped), {} without anchor, {} failed",
                report.parsed.len(),
                report.skipped_posts,
                report.missing_anchor.len(),
                report.failed.len()
            );
        }
        Command::Insert { ids } => {
            let ids = parse_thread_ids(ids)?;
            let report = insert_threads(&config, &ids)?;
            println!(
                "Inserted {} posts ({} already present), {} threads failed",
                report.inserted,
                report.ignored,
                report.failed.len()
            );
        }
        Command::Pipeline { ids } => {
            let ids = parse_thread_ids(ids)?;
            let report = run_pipeline(&config, &ids)?;
            println!(
                "Pipeline done: {} downloaded, {} parsed, {} posts inserted",
                report.download.downloaded.len(),
                report.parse.parsed.len(),
                report.insert.inserted
            );
        }
        Command::Sync => match sync_board(&config)? {
            Some(report) => println!(
                "Synced {} threads, {} posts inserted",
                report.parse.parsed.len(),
                report.insert.inserted
            ),
            None => println!("Board is up to date"),
        },
        Command::InitDb => {
            Store::open(&config.db_path)?;
            info!("Initialized database at {}", config.db_path.display());
        }
        Command::Resolve { anchor, timestamp } => {
            let anchor = AnchorTimestamp::parse(anchor)
                .with_context(|| format!("Could not parse anchor {:?}", anchor))?;
            let post = PostTimestamp::assemble(timestamp, &anchor, &config.resolver())?;
            println!("{} -> {}", post.raw, format_iso(&post.resolved));
        }
    }

    Ok(())
}
