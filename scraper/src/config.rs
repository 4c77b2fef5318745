use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::timestamp::{YearResolver, FORUM_FOUNDING_YEAR};

/// Everything the pipeline stages need, passed in explicitly.
///
/// Loaded from an optional JSON file; any field left out keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Raw thread pages, `thread_<id>.html`
    pub html_dir: PathBuf,
    /// Reformatted threads, `thread_<id>.txt`
    pub text_dir: PathBuf,
    pub db_path: PathBuf,

    /// Thread page endpoint; the section and thread id are appended as query
    pub forum_base_url: String,
    /// Board listing used by sync
    pub forum_index_url: String,
    pub forum_section: String,

    /// Earliest year a post can be dated to
    pub floor_year: i32,

    pub request_delay_ms: u64,
    pub request_timeout_secs: u64,

    /// Download pages even when a cached copy exists
    pub force_download: bool,
    /// Re-parse pages even when the text file exists
    pub force_parse: bool,
    /// Replace posts already in the database instead of ignoring them
    pub overwrite: bool,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            html_dir: PathBuf::from("html_raw"),
            text_dir: PathBuf::from("text_phrased"),
            db_path: PathBuf::from("database").join("forum.db"),
            forum_base_url: "http://utopiaforums.com/boardthread".to_string(),
            forum_index_url: "http://utopiaforums.com/boardforum?id=politics".to_string(),
            forum_section: "politics".to_string(),
            floor_year: FORUM_FOUNDING_YEAR,
            request_delay_ms: 1000,
            request_timeout_secs: 30,
            force_download: false,
            force_parse: false,
            overwrite: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Read a JSON config file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let Some(path) = path else {
            return Ok(Config::default());
        };

        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))
    }

    pub fn resolver(&self) -> YearResolver {
        YearResolver::new(self.floor_year)
    }

    pub fn thread_url(&self, thread_id: u32) -> String {
        format!(
            "{}?id={}&thread={}",
            self.forum_base_url, self.forum_section, thread_id
        )
    }

    pub fn index_url(&self) -> &str {
        &self.forum_index_url
    }

    pub fn thread_html_path(&self, thread_id: u32) -> PathBuf {
        self.html_dir.join(format!("thread_{}.html", thread_id))
    }

    pub fn thread_text_path(&self, thread_id: u32) -> PathBuf {
        self.text_dir.join(format!("thread_{}.txt", thread_id))
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
