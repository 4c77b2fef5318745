use crate::thread_ids::{parse_thread_ids, ThreadIdError};

#[test]
fn test_single_ids_and_ranges() {
    let ids = parse_thread_ids(&["12", "3-5", "4", "1"]).unwrap();
    assert_eq!(ids, vec![1, 3, 4, 5, 12]);
}

#[test]
fn test_single_value_range() {
    assert_eq!(parse_thread_ids(&["7-7"]).unwrap(), vec![7]);
}

#[test]
fn test_invalid_ids() {
    assert_eq!(
        parse_thread_ids(&["abc"]),
        Err(ThreadIdError::Invalid("abc".to_string()))
    );
    assert!(parse_thread_ids(&["1-"]).is_err());
    assert!(parse_thread_ids(&["-3"]).is_err());
    assert!(parse_thread_ids(&["1-2-3"]).is_err());
}

#[test]
fn test_reversed_range() {
    assert_eq!(
        parse_thread_ids(&["9-3"]),
        Err(ThreadIdError::Reversed { start: 9, end: 3 })
    );
}

#[test]
fn test_no_arguments() {
    let none: [&str; 0] = [];
    assert_eq!(parse_thread_ids(&none).unwrap(), Vec::<u32>::new());
}
