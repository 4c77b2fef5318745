use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use scraper::{Html, Selector};

use forum_scraper::fetch::Fetcher;
use forum_scraper::{failure_fixtures_dir, parse_thread_html, AnchorTimestamp, Config};

/// Fetch a thread page and keep it as a regression fixture
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    thread_id: u32,

    /// Fixture name, defaults to thread_<id>
    test_name: Option<String>,

    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let test_name = cli
        .test_name
        .unwrap_or_else(|| format!("thread_{}", cli.thread_id));

    let url = config.thread_url(cli.thread_id);
    println!("Fetching HTML from {}...", url);
    let html = Fetcher::new(&config)?.fetch_html(&url)?;

    let failures_dir = failure_fixtures_dir();
    fs::create_dir_all(&failures_dir).with_context(|| {
        format!(
            "Failed to create failures directory: {}",
            failures_dir.display()
        )
    })?;

    let file_path = failures_dir.join(format!("{}.html", test_name));
    fs::write(&file_path, &html).context("Failed to write HTML file")?;
    println!(
        "Saved HTML to {} for regression testing",
        file_path.display()
    );

    // Check the structural pieces the parser depends on
    let document = Html::parse_document(&html);
    let title_selector = Selector::parse("title").unwrap();
    let has_title = document.select(&title_selector).next().is_some();

    let full_text: String = document.root_element().text().collect();
    let has_anchor = AnchorTimestamp::find(&full_text).is_ok();

    let row_selector = Selector::parse("tr").unwrap();
    let td_selector = Selector::parse("td").unwrap();
    let two_cell_rows = document
        .select(&row_selector)
        .filter(|row| row.select(&td_selector).count() == 2)
        .count();

    println!("HTML analysis results:");
    println!("  - Has title: {}", has_title);
    println!("  - Has anchor timestamp: {}", has_anchor);
    println!("  - Two-cell rows: {}", two_cell_rows);

    match parse_thread_html(&html, cli.thread_id, &config.resolver()) {
        Ok(thread) if thread.skipped.is_empty() && !thread.posts.is_empty() => {
            println!(
                "Parse succeeded with {} posts. This may not be a failure case.",
                thread.posts.len()
            );
        }
        Ok(thread) => {
            println!(
                "Parsed {} posts, skipped {}:",
                thread.posts.len(),
                thread.skipped.len()
            );
            for skipped in &thread.skipped {
                println!(
                    "   post {} {:?}: {}",
                    skipped.post_number, skipped.raw_timestamp, skipped.error
                );
            }
        }
        Err(e) => {
            println!("Parse failed with error: {}", e);
        }
    }

    Ok(())
}
