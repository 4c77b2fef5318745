use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::Result;
use log::{info, warn};
use regex::Regex;
use scraper::{Html, Selector};

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::pipeline::{run_pipeline, PipelineReport};
use crate::store::Store;

static THREAD_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"thread=(\d+)").unwrap());

/// Thread id to post count, as listed on the board index.
pub fn parse_index(html: &str) -> BTreeMap<u32, u32> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr").unwrap();
    let td_selector = Selector::parse("td").unwrap();
    let link_selector = Selector::parse("a[href]").unwrap();

    let mut threads = BTreeMap::new();

    for row in document.select(&row_selector) {
        // header row
        if row.value().classes().any(|class| class == "highlight") {
            continue;
        }

        let cells: Vec<_> = row.select(&td_selector).collect();
        if cells.len() < 2 {
            continue;
        }

        let Some(href) = cells[0]
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        let Some(thread_id) = THREAD_LINK
            .captures(href)
            .and_then(|caps| caps[1].parse::<u32>().ok())
        else {
            continue;
        };

        let count_text: String = cells[1].text().map(str::trim).collect();
        match count_text.parse::<u32>() {
            Ok(count) => {
                threads.insert(thread_id, count);
            }
            Err(_) => warn!(
                "Could not parse post count {:?} for thread {}",
                count_text, thread_id
            ),
        }
    }

    info!("Found {} threads on the index page", threads.len());
    threads
}

/// Threads that are new, or that list more posts online than are stored.
pub fn threads_to_process(
    online: &BTreeMap<u32, u32>,
    existing: &BTreeMap<u32, u32>,
) -> Vec<u32> {
    online
        .iter()
        .filter(|&(thread_id, &online_count)| match existing.get(thread_id) {
            None => {
                info!("New thread found: {}", thread_id);
                true
            }
            Some(&stored) if online_count > stored => {
                info!(
                    "Thread {} has new posts: online {}, stored {}",
                    thread_id, online_count, stored
                );
                true
            }
            Some(_) => false,
        })
        .map(|(&thread_id, _)| thread_id)
        .collect()
}

/// Fetch the board index and run the pipeline over whatever changed.
/// Returns `None` when everything is up to date.
pub fn sync_board(config: &Config) -> Result<Option<PipelineReport>> {
    let fetcher = Fetcher::new(config)?;
    let online = parse_index(&fetcher.fetch_index()?);
    if online.is_empty() {
        warn!("No thread data found on the index page");
        return Ok(None);
    }

    let existing = if config.db_path.exists() {
        Store::open(&config.db_path)?.existing_post_counts()?
    } else {
        info!("Database not found, treating every thread as new");
        BTreeMap::new()
    };

    let pending = threads_to_process(&online, &existing);
    if pending.is_empty() {
        info!("No new or updated threads found on the index page");
        return Ok(None);
    }

    // cached pages and text files are stale for these threads
    let refresh = Config {
        force_download: true,
        force_parse: true,
        ..config.clone()
    };

    info!("Processing {} threads (new or updated)...", pending.len());
    let report = run_pipeline(&refresh, &pending)?;

    let stored = Store::open(&config.db_path)?.existing_post_counts()?;
    for thread_id in threads_still_behind(&online, &stored, &pending) {
        warn!(
            "Thread {} still stores fewer posts than the index lists; \
             its last posts could not be dated and it will be picked again next sync",
            thread_id
        );
    }

    Ok(Some(report))
}

/// Threads just processed that still look updated. Happens when the newest
/// posts of a thread fail to date, since undated posts are never stored.
pub fn threads_still_behind(
    online: &BTreeMap<u32, u32>,
    stored: &BTreeMap<u32, u32>,
    processed: &[u32],
) -> Vec<u32> {
    processed
        .iter()
        .copied()
        .filter(|thread_id| match (online.get(thread_id), stored.get(thread_id)) {
            (Some(&online_count), Some(&stored_count)) => online_count > stored_count,
            _ => false,
        })
        .collect()
}
