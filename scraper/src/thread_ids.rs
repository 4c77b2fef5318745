use std::collections::BTreeSet;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThreadIdError {
    #[error("thread ids must be integers or ranges like 1-5, got {0:?}")]
    Invalid(String),
    #[error("range {start}-{end} runs backwards")]
    Reversed { start: u32, end: u32 },
}

/// Turn arguments like `["12", "40-43", "41"]` into sorted, unique ids.
pub fn parse_thread_ids<S: AsRef<str>>(args: &[S]) -> Result<Vec<u32>, ThreadIdError> {
    let mut ids = BTreeSet::new();

    for arg in args {
        let arg = arg.as_ref().trim();
        let invalid = || ThreadIdError::Invalid(arg.to_string());

        match arg.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().map_err(|_| invalid())?;
                let end: u32 = end.trim().parse().map_err(|_| invalid())?;
                if start > end {
                    return Err(ThreadIdError::Reversed { start, end });
                }
                ids.extend(start..=end);
            }
            None => {
                ids.insert(arg.parse().map_err(|_| invalid())?);
            }
        }
    }

    Ok(ids.into_iter().collect())
}
