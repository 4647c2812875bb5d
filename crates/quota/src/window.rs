//! Reset-window calendar math in the platform's reference timezone.
//!
//! Window boundaries are wall-clock times in a fixed reference timezone,
//! deliberately not UTC: subscribers think in billing days and billing
//! weeks, and off-by-one timezone handling around these boundaries has
//! bitten this system before. All conversions happen in one place, here.

use time::{Duration, OffsetDateTime, PrimitiveDateTime, Time, Weekday};
use time_tz::{timezones, ToTimezone, Tz};

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
    #[error("invalid weekday {0:?}")]
    InvalidWeekday(String),
    #[error("anchor hour {0} must be within 0..=23")]
    InvalidHour(u8),
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// The two window kinds a counter can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// Calendar day in the reference timezone.
    Daily,
    /// Fixed 7-day period anchored to a weekday and hour in the reference
    /// timezone.
    Weekly,
}

/// Validated window configuration: reference timezone plus the weekly
/// anchor (default Sunday 00:00).
#[derive(Debug, Clone, Copy)]
pub struct Windows {
    tz: &'static Tz,
    anchor_weekday: Weekday,
    anchor_hour: u8,
}

impl Windows {
    pub fn new(timezone: &str, anchor_weekday: &str, anchor_hour: u8) -> Result<Self, WindowError> {
        let tz = timezones::get_by_name(timezone)
            .ok_or_else(|| WindowError::UnknownTimezone(timezone.to_string()))?;
        let anchor_weekday = parse_weekday(anchor_weekday)?;
        if anchor_hour > 23 {
            return Err(WindowError::InvalidHour(anchor_hour));
        }
        Ok(Self {
            tz,
            anchor_weekday,
            anchor_hour,
        })
    }

    /// Start of the window containing `now`, as an instant.
    pub fn window_start(&self, kind: WindowKind, now: OffsetDateTime) -> OffsetDateTime {
        let local = now.to_timezone(self.tz);
        match kind {
            WindowKind::Daily => local.replace_time(Time::MIDNIGHT),
            WindowKind::Weekly => {
                let days_back = i64::from(
                    (7 + days_from_sunday(local.weekday()) - days_from_sunday(self.anchor_weekday))
                        % 7,
                );
                let anchor_time =
                    Time::from_hms(self.anchor_hour, 0, 0).unwrap_or(Time::MIDNIGHT);
                let candidate = (local - Duration::days(days_back)).replace_time(anchor_time);
                if candidate > local {
                    // Same weekday as the anchor but before the anchor hour:
                    // still in the previous week's window.
                    candidate - Duration::weeks(1)
                } else {
                    candidate
                }
            }
        }
    }

    pub fn window_length(&self, kind: WindowKind) -> Duration {
        match kind {
            WindowKind::Daily => Duration::days(1),
            WindowKind::Weekly => Duration::weeks(1),
        }
    }

    /// The next boundary after `now` for the given kind.
    pub fn resets_at(&self, kind: WindowKind, now: OffsetDateTime) -> OffsetDateTime {
        self.window_start(kind, now) + self.window_length(kind)
    }

    /// Parse a `YYYY-MM-DD` literal as **midday** in the reference
    /// timezone. Midnight would shift the calendar day under negative UTC
    /// offsets; midday keeps the operator's intent intact.
    pub fn parse_date_midday(&self, value: &str) -> Result<OffsetDateTime, WindowError> {
        let format = time::macros::format_description!("[year]-[month]-[day]");
        let date = time::Date::parse(value, &format)
            .map_err(|_| WindowError::InvalidDate(value.to_string()))?;
        let naive = PrimitiveDateTime::new(date, Time::from_hms(12, 0, 0).unwrap_or(Time::MIDNIGHT));
        // Resolve the reference timezone's offset near that instant, then
        // re-interpret the naive midday with it.
        let offset = naive.assume_utc().to_timezone(self.tz).offset();
        Ok(naive.assume_offset(offset))
    }
}

fn days_from_sunday(weekday: Weekday) -> i64 {
    match weekday {
        Weekday::Sunday => 0,
        Weekday::Monday => 1,
        Weekday::Tuesday => 2,
        Weekday::Wednesday => 3,
        Weekday::Thursday => 4,
        Weekday::Friday => 5,
        Weekday::Saturday => 6,
    }
}

fn parse_weekday(value: &str) -> Result<Weekday, WindowError> {
    match value.to_ascii_lowercase().as_str() {
        "sunday" => Ok(Weekday::Sunday),
        "monday" => Ok(Weekday::Monday),
        "tuesday" => Ok(Weekday::Tuesday),
        "wednesday" => Ok(Weekday::Wednesday),
        "thursday" => Ok(Weekday::Thursday),
        "friday" => Ok(Weekday::Friday),
        "saturday" => Ok(Weekday::Saturday),
        other => Err(WindowError::InvalidWeekday(other.to_string())),
    }
}
