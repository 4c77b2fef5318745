use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

use crate::timestamp::{
    AnchorTimestamp, PostTimestamp, TimestampError, TruncatedTimestamp, YearResolver,
};

fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

fn anchor() -> AnchorTimestamp {
    // Mon May 19 16:52:12 2025
    AnchorTimestamp::new(datetime(2025, 5, 19, 16, 52, 12))
}

fn resolve(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    PostTimestamp::assemble(raw, &anchor(), &YearResolver::default()).map(|t| t.resolved)
}

#[test]
fn test_find_anchor_in_page_text() {
    let text = "Politics board\nThe current time is Mon May 19 16:52:12 2025\nPowered by";
    let anchor = AnchorTimestamp::find(text).unwrap();
    assert_eq!(anchor.datetime(), datetime(2025, 5, 19, 16, 52, 12));
    assert_eq!(anchor.year(), 2025);
}

#[test]
fn test_find_anchor_single_digit_day() {
    let anchor = AnchorTimestamp::find("The current time is Sun Jun 1 09:05:00 2025").unwrap();
    assert_eq!(anchor.datetime(), datetime(2025, 6, 1, 9, 5, 0));
}

#[test]
fn test_anchor_weekday_is_ignored() {
    // May 19 2025 was a Monday; the anchor's weekday token is not checked
    let anchor = AnchorTimestamp::find("The current time is Fri May 19 16:52:12 2025").unwrap();
    assert_eq!(anchor.datetime(), datetime(2025, 5, 19, 16, 52, 12));
}

#[test]
fn test_missing_anchor() {
    assert_eq!(
        AnchorTimestamp::find("<html><body>no clock here</body></html>"),
        Err(TimestampError::MissingAnchor)
    );
    assert_eq!(
        AnchorTimestamp::find("The current time is Mon Foo 19 16:52:12 2025"),
        Err(TimestampError::MissingAnchor)
    );
    assert_eq!(
        AnchorTimestamp::find("The current time is Mon Feb 30 16:52:12 2025"),
        Err(TimestampError::MissingAnchor)
    );
}

#[test]
fn test_parse_bare_anchor() {
    let anchor = AnchorTimestamp::parse("Mon May 19 16:52:12 2025").unwrap();
    assert_eq!(anchor.datetime(), datetime(2025, 5, 19, 16, 52, 12));
    assert!(AnchorTimestamp::parse("May 19 2025").is_err());
}

#[test]
fn test_exact_anchor_match_is_inclusive() {
    assert_eq!(
        resolve("Mon May 19 16:52:12"),
        Ok(datetime(2025, 5, 19, 16, 52, 12))
    );
}

#[test]
fn test_one_second_after_anchor_falls_back_to_earlier_year() {
    // May 19 was also a Monday in 2014 and 2008; 2014 is the nearest
    assert_eq!(
        resolve("Mon May 19 16:52:13"),
        Ok(datetime(2014, 5, 19, 16, 52, 13))
    );
}

#[test]
fn test_most_recent_matching_year_wins() {
    // Mar 19 fell on a Wednesday in 2025, 2014 and 2008
    assert_eq!(
        resolve("Wed Mar 19 14:16:08"),
        Ok(datetime(2025, 3, 19, 14, 16, 8))
    );
    assert_eq!(
        resolve("Wed May 19 16:52:12"),
        Ok(datetime(2021, 5, 19, 16, 52, 12))
    );
}

#[test]
fn test_year_rollover() {
    let anchor = AnchorTimestamp::new(datetime(2025, 1, 1, 0, 30, 0));
    let resolver = YearResolver::default();

    let post = PostTimestamp::assemble("Tue Dec 31 23:59:00", &anchor, &resolver).unwrap();
    assert_eq!(post.resolved, datetime(2024, 12, 31, 23, 59, 0));

    // later the same day as the anchor: the previous Wednesday Jan 1 is 2020
    let post = PostTimestamp::assemble("Wed Jan 1 01:00:00", &anchor, &resolver).unwrap();
    assert_eq!(post.resolved, datetime(2020, 1, 1, 1, 0, 0));
}

#[test]
fn test_leap_day() {
    assert_eq!(
        resolve("Sat Feb 29 10:00:00"),
        Ok(datetime(2020, 2, 29, 10, 0, 0))
    );
    assert_eq!(
        resolve("Thu Feb 29 10:00:00"),
        Ok(datetime(2024, 2, 29, 10, 0, 0))
    );
    assert_eq!(
        resolve("Fri Feb 29 10:00:00"),
        Ok(datetime(2008, 2, 29, 10, 0, 0))
    );
}

#[test]
fn test_leap_day_without_match() {
    // no Feb 29 between 2008 and 2025 was a Tuesday
    assert_eq!(
        resolve("Tue Feb 29 10:00:00"),
        Err(TimestampError::NoMatchingYear {
            weekday: Weekday::Tue,
            date: "Feb 29 10:00:00".to_string(),
        })
    );
}

#[test]
fn test_below_floor() {
    // the only Friday Feb 29 in range is 2008
    let resolver = YearResolver::new(2015);
    let truncated = TruncatedTimestamp::parse("Fri", "Feb 29 10:00:00").unwrap();
    let result = resolver.resolve(&anchor(), &truncated);
    assert!(matches!(
        result,
        Err(TimestampError::NoMatchingYear {
            weekday: Weekday::Fri,
            ..
        })
    ));
}

#[test]
fn test_anchor_before_floor_year() {
    let resolver = YearResolver::new(2030);
    let truncated = TruncatedTimestamp::parse("Mon", "May 19 16:52:12").unwrap();
    assert!(resolver.resolve(&anchor(), &truncated).is_err());
}

#[test]
fn test_impossible_calendar_date() {
    let truncated = TruncatedTimestamp::parse("Mon", "Feb 30 10:00:00").unwrap();
    assert_eq!(truncated.day, 30);
    assert!(matches!(
        YearResolver::default().resolve(&anchor(), &truncated),
        Err(TimestampError::NoMatchingYear { .. })
    ));
}

#[test]
fn test_malformed_timestamps() {
    for raw in [
        "Xyz Mar 19 14:16:08",
        "Wed Foo 19 14:16:08",
        "Wed Mar nineteen 14:16:08",
        "Wed Mar 19 25:16:08",
        "Wed Mar 19",
        "Wed Mar 19 14:16:08 2025",
        "Wednesday",
        "",
    ] {
        assert!(
            matches!(resolve(raw), Err(TimestampError::MalformedTimestamp { .. })),
            "expected malformed: {:?}",
            raw
        );
    }
}

#[test]
fn test_names_are_case_insensitive() {
    assert_eq!(
        resolve("wed MAR 19 14:16:08"),
        Ok(datetime(2025, 3, 19, 14, 16, 8))
    );
}

#[test]
fn test_assembler_keeps_raw_and_iso() {
    let post = PostTimestamp::assemble(" Wed Mar 19 14:16:08 ", &anchor(), &YearResolver::default())
        .unwrap();
    assert_eq!(post.raw, "Wed Mar 19 14:16:08");
    assert_eq!(post.iso(), "2025-03-19T14:16:08");
}

#[test]
fn test_truncated_display() {
    let truncated = TruncatedTimestamp::parse("Sun", "Jun 1 09:05:00").unwrap();
    assert_eq!(truncated.to_string(), "Sun Jun 1 09:05:00");
}

#[test]
fn test_resolution_is_deterministic() {
    let truncated = TruncatedTimestamp::parse("Sat", "Feb 29 10:00:00").unwrap();
    let resolver = YearResolver::default();
    let first = resolver.resolve(&anchor(), &truncated);
    for _ in 0..10 {
        assert_eq!(resolver.resolve(&anchor(), &truncated), first);
    }
}

// Every day of the forum's life, displayed the way the board shows it,
// must come back as the most recent date with that weekday, never after the
// anchor.
#[test]
fn test_invariants_over_every_day() {
    let anchor = anchor();
    let resolver = YearResolver::default();
    let mut day = NaiveDate::from_ymd_opt(2008, 1, 1).unwrap();

    while day <= anchor.datetime().date() {
        let raw = day.and_hms_opt(12, 0, 0).unwrap().format("%a %b %-d %H:%M:%S").to_string();
        let resolved = PostTimestamp::assemble(&raw, &anchor, &resolver)
            .unwrap_or_else(|e| panic!("{} failed: {}", raw, e))
            .resolved;

        assert_eq!(resolved.weekday(), day.weekday(), "weekday for {}", raw);
        assert!(resolved <= anchor.datetime(), "{} resolved after anchor", raw);
        assert!(resolved.year() >= day.year(), "{} resolved too early", raw);

        // no later year would also have fit
        for year in resolved.year() + 1..=anchor.year() {
            if let Some(later) = NaiveDate::from_ymd_opt(year, day.month(), day.day()) {
                let later = later.and_hms_opt(12, 0, 0).unwrap();
                assert!(
                    later.weekday() != day.weekday() || later > anchor.datetime(),
                    "{} skipped {}",
                    raw,
                    year
                );
            }
        }

        day = day.succ_opt().unwrap();
    }
}
