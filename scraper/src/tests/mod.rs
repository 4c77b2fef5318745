use anyhow::Result;
use std::fs;

pub mod fixtures;
pub mod sync_tests;
pub mod thread_ids_tests;
pub mod timestamp_tests;

/// Helper function to log and save failed HTML for future regression testing
pub fn save_failed_html(html: &str, test_name: &str) -> Result<()> {
    let failures_dir = crate::failure_fixtures_dir();
    fs::create_dir_all(&failures_dir)?;

    // Save the HTML for further analysis
    let file_path = failures_dir.join(format!("{}.html", test_name));
    fs::write(&file_path, html)?;

    println!("Saved failed HTML to {}", file_path.display());
    Ok(())
}
