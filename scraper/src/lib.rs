use std::path::{Path, PathBuf};

pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod store;
pub mod sync;
pub mod text_format;
pub mod thread_ids;
pub mod thread_parser;
pub mod timestamp;

// Unit tests and fixtures live under src/tests
#[cfg(test)]
pub mod tests;

// Re-export key types and functions for easier access
pub use crate::config::Config;
pub use crate::pipeline::{run_pipeline, PipelineReport};
pub use crate::store::Store;
pub use crate::sync::sync_board;
pub use crate::thread_ids::parse_thread_ids;
pub use crate::thread_parser::{parse_thread_html, Post, SkippedPost, ThreadDocument};
pub use crate::timestamp::{
    AnchorTimestamp, PostTimestamp, TimestampError, TruncatedTimestamp, YearResolver,
    FORUM_FOUNDING_YEAR,
};

/// Pages saved by `save_scrape_failure`, read back by the regression tests.
/// Anchored to the crate directory so it does not depend on where cargo runs.
pub fn failure_fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src/tests/fixtures/failures")
}
