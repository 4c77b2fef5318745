//! Anchor-relative date inference for forum post timestamps.
//!
//! Thread pages show each post as `Wed Mar 19 14:16:08`: weekday, month, day
//! and time, but no year. Each page also prints its generation time once,
//! with a year (`The current time is Mon May 19 16:52:12 2025`). That anchor
//! is the reference every post on the page is resolved against.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Month, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;
use thiserror::Error;

/// Year the forum opened. Nothing on the board predates it.
pub const FORUM_FOUNDING_YEAR: i32 = 2008;

static ANCHOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"The current time is (\w{3}) (\w{3}) (\d{1,2}) (\d{2}:\d{2}:\d{2}) (\d{4})")
        .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// The page carries no usable "current time" line. Nothing on it can be dated.
    #[error("anchor timestamp not found in document")]
    MissingAnchor,
    /// No year between the floor and the anchor puts this date on this weekday.
    #[error("no matching year for {weekday}, {date}")]
    NoMatchingYear { weekday: Weekday, date: String },
    #[error("malformed post timestamp: {raw:?}")]
    MalformedTimestamp { raw: String },
}

/// The page generation time. One per document, never shared across documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AnchorTimestamp(NaiveDateTime);

impl AnchorTimestamp {
    pub fn new(datetime: NaiveDateTime) -> Self {
        AnchorTimestamp(datetime)
    }

    /// Locate and parse the "current time" line in document text.
    ///
    /// The weekday token is ignored; the anchor carries its own year.
    pub fn find(text: &str) -> Result<Self, TimestampError> {
        let caps = ANCHOR_PATTERN
            .captures(text)
            .ok_or(TimestampError::MissingAnchor)?;
        Self::from_fields(&caps[2], &caps[3], &caps[4], &caps[5])
    }

    /// Parse a bare `Mon May 19 16:52:12 2025`.
    pub fn parse(text: &str) -> Result<Self, TimestampError> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        match fields.as_slice() {
            [_weekday, month, day, time, year] => Self::from_fields(month, day, time, year),
            _ => Err(TimestampError::MissingAnchor),
        }
    }

    fn from_fields(
        month: &str,
        day: &str,
        time: &str,
        year: &str,
    ) -> Result<Self, TimestampError> {
        let month = Month::from_str(month).map_err(|_| TimestampError::MissingAnchor)?;
        let day: u32 = day.parse().map_err(|_| TimestampError::MissingAnchor)?;
        let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
            .map_err(|_| TimestampError::MissingAnchor)?;
        let year: i32 = year.parse().map_err(|_| TimestampError::MissingAnchor)?;

        let date = NaiveDate::from_ymd_opt(year, month.number_from_month(), day)
            .ok_or(TimestampError::MissingAnchor)?;

        Ok(AnchorTimestamp(date.and_time(time)))
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }
}

/// A post's displayed time: weekday, month, day and time of day, no year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatedTimestamp {
    pub weekday: Weekday,
    pub month: Month,
    pub day: u32,
    pub time: NaiveTime,
}

impl TruncatedTimestamp {
    /// Tokenize `("Wed", "Mar 19 14:16:08")`.
    ///
    /// Only the shape is checked here. `Feb 30` tokenizes fine and is left for
    /// the resolver to reject.
    pub fn parse(weekday: &str, rest: &str) -> Result<Self, TimestampError> {
        let malformed = || TimestampError::MalformedTimestamp {
            raw: format!("{} {}", weekday, rest),
        };

        let weekday = Weekday::from_str(weekday.trim()).map_err(|_| malformed())?;

        let mut parts = rest.split_whitespace();
        let (Some(month), Some(day), Some(time), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let month = Month::from_str(month).map_err(|_| malformed())?;
        let day: u32 = day.parse().map_err(|_| malformed())?;
        let time = NaiveTime::parse_from_str(time, "%H:%M:%S").map_err(|_| malformed())?;

        Ok(TruncatedTimestamp {
            weekday,
            month,
            day,
            time,
        })
    }

    /// The calendar date in `year`, if this month/day exists in it.
    fn date_in(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month.number_from_month(), self.day)
    }

    /// `Mar 19 14:16:08`, the part after the weekday.
    fn date_text(&self) -> String {
        format!(
            "{} {} {}",
            &self.month.name()[..3],
            self.day,
            self.time.format("%H:%M:%S")
        )
    }
}

impl fmt::Display for TruncatedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.weekday, self.date_text())
    }
}

/// Picks the year for truncated timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearResolver {
    floor_year: i32,
}

impl YearResolver {
    pub fn new(floor_year: i32) -> Self {
        YearResolver { floor_year }
    }

    pub fn floor_year(&self) -> i32 {
        self.floor_year
    }

    /// Resolve `post` to the most recent datetime, no later than `anchor`,
    /// whose weekday matches.
    ///
    /// Years are walked from the anchor's year down to the floor. The order
    /// matters: the same weekday/date pair recurs every few years and the
    /// board always means the nearest past one.
    pub fn resolve(
        &self,
        anchor: &AnchorTimestamp,
        post: &TruncatedTimestamp,
    ) -> Result<NaiveDateTime, TimestampError> {
        for year in (self.floor_year..=anchor.year()).rev() {
            // Feb 29 in a common year: not a candidate
            let Some(date) = post.date_in(year) else {
                continue;
            };

            let candidate = date.and_time(post.time);
            if date.weekday() != post.weekday || candidate > anchor.datetime() {
                continue;
            }
            return Ok(candidate);
        }

        Err(TimestampError::NoMatchingYear {
            weekday: post.weekday,
            date: post.date_text(),
        })
    }
}

impl Default for YearResolver {
    fn default() -> Self {
        YearResolver::new(FORUM_FOUNDING_YEAR)
    }
}

/// A post time in both forms that get stored: the raw display string and the
/// resolved absolute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTimestamp {
    pub raw: String,
    pub resolved: NaiveDateTime,
}

impl PostTimestamp {
    /// Split `raw` at its first space into weekday and the rest, then resolve.
    pub fn assemble(
        raw: &str,
        anchor: &AnchorTimestamp,
        resolver: &YearResolver,
    ) -> Result<Self, TimestampError> {
        let raw = raw.trim();
        let (weekday, rest) = raw
            .split_once(' ')
            .ok_or_else(|| TimestampError::MalformedTimestamp {
                raw: raw.to_string(),
            })?;

        let truncated = TruncatedTimestamp::parse(weekday, rest)?;
        let resolved = resolver.resolve(anchor, &truncated)?;

        Ok(PostTimestamp {
            raw: raw.to_string(),
            resolved,
        })
    }

    /// `2025-03-19T14:16:08`
    pub fn iso(&self) -> String {
        format_iso(&self.resolved)
    }
}

pub fn format_iso(datetime: &NaiveDateTime) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
}
