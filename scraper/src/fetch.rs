use std::fs;
use std::thread;

use anyhow::{Context, Result};
use log::{error, info, warn};
use reqwest::blocking::Client;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    /// A cached copy exists and `force_download` is off
    Cached,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: Vec<u32>,
    pub cached: Vec<u32>,
    pub failed: Vec<u32>,
}

pub struct Fetcher<'a> {
    client: Client,
    config: &'a Config,
}

impl<'a> Fetcher<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("forum-scraper/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Fetcher { client, config })
    }

    pub fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("{} returned status {}", url, status));
        }
        response.text().context("Failed to get response text")
    }

    pub fn fetch_index(&self) -> Result<String> {
        let url = self.config.index_url();
        info!("Fetching index page: {}", url);
        self.fetch_html(url)
    }

    /// Save one thread page under the HTML cache directory.
    pub fn download_thread(&self, thread_id: u32) -> Result<DownloadOutcome> {
        let path = self.config.thread_html_path(thread_id);
        if path.exists() && !self.config.force_download {
            info!(
                "Skipping download for thread {}: {} already exists",
                thread_id,
                path.display()
            );
            return Ok(DownloadOutcome::Cached);
        }

        let html = self.fetch_html(&self.config.thread_url(thread_id))?;

        fs::create_dir_all(&self.config.html_dir).with_context(|| {
            format!(
                "Failed to create directory: {}",
                self.config.html_dir.display()
            )
        })?;
        fs::write(&path, html)
            .with_context(|| format!("Failed to write HTML file: {}", path.display()))?;

        info!("Downloaded thread {}", thread_id);
        Ok(DownloadOutcome::Downloaded)
    }

    /// Download threads one after another, pausing between live requests.
    /// A failed thread is logged and the batch carries on.
    pub fn download_threads(&self, thread_ids: &[u32]) -> DownloadReport {
        info!("Downloading {} threads...", thread_ids.len());
        let mut report = DownloadReport::default();

        for (i, &thread_id) in thread_ids.iter().enumerate() {
            let requested = match self.download_thread(thread_id) {
                Ok(DownloadOutcome::Cached) => {
                    report.cached.push(thread_id);
                    false
                }
                Ok(DownloadOutcome::Downloaded) => {
                    report.downloaded.push(thread_id);
                    true
                }
                Err(e) => {
                    error!("Failed to download thread {}: {:#}", thread_id, e);
                    report.failed.push(thread_id);
                    true
                }
            };

            if needs_pause(requested, i, thread_ids.len()) {
                thread::sleep(self.config.request_delay());
            }
        }

        if !report.failed.is_empty() {
            warn!("{} threads failed to download", report.failed.len());
        }
        info!("Download complete.");
        report
    }
}

/// Pause only after a live request that is followed by another thread.
pub(crate) fn needs_pause(requested: bool, index: usize, total: usize) -> bool {
    requested && index + 1 < total
}
