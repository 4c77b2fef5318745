use std::fs;

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::config::Config;
use crate::fetch::{DownloadReport, Fetcher};
use crate::store::Store;
use crate::text_format;
use crate::thread_parser::parse_thread_html;
use crate::timestamp::TimestampError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed { posts: usize, skipped_posts: usize },
    /// Text file already there and `force_parse` is off
    UpToDate,
    MissingHtml,
    MissingAnchor,
    NoPosts,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseReport {
    pub parsed: Vec<u32>,
    pub up_to_date: Vec<u32>,
    pub missing_html: Vec<u32>,
    pub missing_anchor: Vec<u32>,
    pub no_posts: Vec<u32>,
    pub failed: Vec<u32>,
    pub skipped_posts: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InsertStageReport {
    pub inserted: usize,
    pub ignored: usize,
    pub missing_text: Vec<u32>,
    pub failed: Vec<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub download: DownloadReport,
    pub parse: ParseReport,
    pub insert: InsertStageReport,
}

/// Download, parse and insert a list of threads.
pub fn run_pipeline(config: &Config, thread_ids: &[u32]) -> Result<PipelineReport> {
    info!("Starting pipeline for {} threads...", thread_ids.len());

    info!("----- STAGE 1: DOWNLOADING -----");
    let download = Fetcher::new(config)?.download_threads(thread_ids);

    info!("----- STAGE 2: PARSING -----");
    let parse = parse_threads(config, thread_ids);

    info!("----- STAGE 3: INSERTING -----");
    let insert = insert_threads(config, thread_ids)?;

    info!("Pipeline complete.");
    Ok(PipelineReport {
        download,
        parse,
        insert,
    })
}

/// Turn a cached HTML page into its text file.
pub fn parse_thread_file(config: &Config, thread_id: u32) -> Result<ParseOutcome> {
    let html_path = config.thread_html_path(thread_id);
    let text_path = config.thread_text_path(thread_id);

    if !html_path.exists() {
        warn!("HTML not found for thread {}", thread_id);
        return Ok(ParseOutcome::MissingHtml);
    }
    if text_path.exists() && !config.force_parse {
        info!("Thread {} already parsed, skipping", thread_id);
        return Ok(ParseOutcome::UpToDate);
    }

    let bytes = fs::read(&html_path)
        .with_context(|| format!("Failed to read HTML file: {}", html_path.display()))?;
    let html = String::from_utf8_lossy(&bytes);

    let thread = match parse_thread_html(&html, thread_id, &config.resolver()) {
        Ok(thread) => thread,
        Err(TimestampError::MissingAnchor) => {
            warn!("Could not find anchor timestamp in thread {}", thread_id);
            return Ok(ParseOutcome::MissingAnchor);
        }
        Err(e) => {
            let context = format!("Failed to parse thread {}", thread_id);
            return Err(anyhow::Error::new(e).context(context));
        }
    };

    for skipped in &thread.skipped {
        warn!(
            "Skipping post {} in thread {} ({:?}): {}",
            skipped.post_number, thread_id, skipped.raw_timestamp, skipped.error
        );
    }

    if thread.posts.is_empty() {
        warn!("No posts found in thread {}", thread_id);
        return Ok(ParseOutcome::NoPosts);
    }

    let path = text_format::write_thread(&config.text_dir, &thread)?;
    info!("Parsed thread {} -> {}", thread_id, path.display());

    Ok(ParseOutcome::Parsed {
        posts: thread.posts.len(),
        skipped_posts: thread.skipped.len(),
    })
}

pub fn parse_threads(config: &Config, thread_ids: &[u32]) -> ParseReport {
    let mut report = ParseReport::default();

    for &thread_id in thread_ids {
        match parse_thread_file(config, thread_id) {
            Ok(ParseOutcome::Parsed { skipped_posts, .. }) => {
                report.parsed.push(thread_id);
                report.skipped_posts += skipped_posts;
            }
            Ok(ParseOutcome::UpToDate) => report.up_to_date.push(thread_id),
            Ok(ParseOutcome::MissingHtml) => report.missing_html.push(thread_id),
            Ok(ParseOutcome::MissingAnchor) => report.missing_anchor.push(thread_id),
            Ok(ParseOutcome::NoPosts) => report.no_posts.push(thread_id),
            Err(e) => {
                error!("Failed to parse thread {}: {:#}", thread_id, e);
                report.failed.push(thread_id);
            }
        }
    }

    report
}

pub fn insert_threads(config: &Config, thread_ids: &[u32]) -> Result<InsertStageReport> {
    let mut store = Store::open(&config.db_path)?;
    Ok(insert_threads_into(&mut store, config, thread_ids))
}

/// Load each thread's text file into `store`, carrying on past bad threads.
pub fn insert_threads_into(
    store: &mut Store,
    config: &Config,
    thread_ids: &[u32],
) -> InsertStageReport {
    let mut report = InsertStageReport::default();

    for &thread_id in thread_ids {
        let path = config.thread_text_path(thread_id);
        if !path.exists() {
            warn!("Thread {} text file not found", thread_id);
            report.missing_text.push(thread_id);
            continue;
        }

        let result = text_format::read_thread(&path, thread_id)
            .and_then(|thread| store.insert_thread(&thread, config.overwrite));
        match result {
            Ok(inserted) => {
                report.inserted += inserted.inserted;
                report.ignored += inserted.ignored;
            }
            Err(e) => {
                error!("Failed to insert thread {}: {:#}", thread_id, e);
                report.failed.push(thread_id);
            }
        }
    }

    report
}
