use std::collections::BTreeMap;

use super::fixtures;
use crate::sync::{parse_index, threads_still_behind, threads_to_process};

#[test]
fn test_parse_index() {
    let html = fixtures::load_html_fixture("sample_index");
    let threads = parse_index(&html);

    // header, unparsable count and rows without a thread link are skipped
    let expected: BTreeMap<u32, u32> = [(101, 12), (102, 3)].into_iter().collect();
    assert_eq!(threads, expected);
}

#[test]
fn test_parse_empty_index() {
    assert!(parse_index("<html><body>maintenance</body></html>").is_empty());
}

#[test]
fn test_threads_to_process() {
    let online: BTreeMap<u32, u32> = [(5, 10), (3, 4), (9, 2), (1, 7)].into_iter().collect();
    let existing: BTreeMap<u32, u32> = [(5, 10), (3, 2), (1, 9), (20, 1)].into_iter().collect();

    // 3 has new posts, 9 is new, 5 is current, 1 has fewer online than stored
    assert_eq!(threads_to_process(&online, &existing), vec![3, 9]);
}

#[test]
fn test_everything_is_new_without_a_database() {
    let online: BTreeMap<u32, u32> = [(2, 1), (1, 1)].into_iter().collect();
    assert_eq!(threads_to_process(&online, &BTreeMap::new()), vec![1, 2]);
}

#[test]
fn test_undated_last_post_keeps_thread_behind() {
    // thread 4's fifth post could not be dated, so only four are stored
    let online: BTreeMap<u32, u32> = [(4, 5), (6, 2), (8, 3)].into_iter().collect();
    let stored: BTreeMap<u32, u32> = [(4, 4), (6, 2)].into_iter().collect();

    assert_eq!(threads_still_behind(&online, &stored, &[4, 6, 8]), vec![4]);
    assert_eq!(threads_to_process(&online, &stored), vec![4, 8]);
}
