// ⏰ Temporal Model - Relative day-indices to calendar dates
// The raw data only knows "day 1 .. day 711"; an anchor pins one day-index to
// a calendar date and every other day follows by offset.

use crate::error::ConfigurationError;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

// ============================================================================
// DATE ANCHOR
// ============================================================================

/// DateAnchor - `anchor_day` ↦ `anchor_date`, everything else by offset
///
/// Construction checks that every `u16` day-index lands on a representable
/// date, which keeps `date_for` total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AnchorFields")]
pub struct DateAnchor {
    anchor_day: u16,
    anchor_date: NaiveDate,
}

/// Unchecked wire form; deserialization goes through `DateAnchor::new`
#[derive(Deserialize)]
struct AnchorFields {
    anchor_day: u16,
    anchor_date: NaiveDate,
}

impl TryFrom<AnchorFields> for DateAnchor {
    type Error = ConfigurationError;

    fn try_from(fields: AnchorFields) -> Result<Self, Self::Error> {
        DateAnchor::new(fields.anchor_day, fields.anchor_date)
    }
}

impl DateAnchor {
    pub fn new(anchor_day: u16, anchor_date: NaiveDate) -> Result<Self, ConfigurationError> {
        if anchor_day == 0 {
            return Err(ConfigurationError::new(
                "anchor_day",
                "day-indices are 1-based",
            ));
        }

        let back = Duration::days(i64::from(anchor_day) - 1);
        let forward = Duration::days(i64::from(u16::MAX) - i64::from(anchor_day));
        if anchor_date.checked_sub_signed(back).is_none()
            || anchor_date.checked_add_signed(forward).is_none()
        {
            return Err(ConfigurationError::new(
                "anchor_date",
                format!("{} cannot represent the full day-index range", anchor_date),
            ));
        }

        Ok(DateAnchor {
            anchor_day,
            anchor_date,
        })
    }

    pub fn anchor_day(&self) -> u16 {
        self.anchor_day
    }

    pub fn anchor_date(&self) -> NaiveDate {
        self.anchor_date
    }

    /// Calendar date of a day-index
    pub fn date_for(&self, day: u16) -> NaiveDate {
        // in range by construction
        self.anchor_date + Duration::days(i64::from(day) - i64::from(self.anchor_day))
    }

    /// Inverse of `date_for`; None when the date falls outside 1..=u16::MAX
    pub fn day_for(&self, date: NaiveDate) -> Option<u16> {
        let offset = date.signed_duration_since(self.anchor_date).num_days();
        let day = offset + i64::from(self.anchor_day);

        u16::try_from(day).ok().filter(|d| *d >= 1)
    }
}

impl Default for DateAnchor {
    /// Day 1 ↦ 2024-01-01
    fn default() -> Self {
        DateAnchor {
            anchor_day: 1,
            anchor_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

// ============================================================================
// CLOCK TIME
// ============================================================================

/// HHMM integer (e.g. 1631) to a time of day
pub fn clock_time(hhmm: u16) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(u32::from(hhmm / 100), u32::from(hhmm % 100), 0)
}

// ============================================================================
// CALENDAR DIMENSION
// ============================================================================

/// One row of the date dimension used by reporting tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub day: u16,
    /// 1 = Monday .. 7 = Sunday
    pub day_of_week: u32,
    pub day_name: String,
    pub day_of_month: u32,
    /// ISO week number
    pub week_of_year: u32,
    pub month: u32,
    pub month_name: String,
    pub month_short: String,
    pub quarter: u32,
    pub quarter_name: String,
    pub year: i32,
    pub year_month: String,
    pub is_weekend: bool,
}

impl CalendarDay {
    pub fn new(day: u16, anchor: &DateAnchor) -> Self {
        let date = anchor.date_for(day);
        let quarter = (date.month() - 1) / 3 + 1;

        CalendarDay {
            date,
            day,
            day_of_week: date.weekday().number_from_monday(),
            day_name: date.format("%A").to_string(),
            day_of_month: date.day(),
            week_of_year: date.iso_week().week(),
            month: date.month(),
            month_name: date.format("%B").to_string(),
            month_short: date.format("%b").to_string(),
            quarter,
            quarter_name: format!("Q{}", quarter),
            year: date.year(),
            year_month: date.format("%Y-%m").to_string(),
            is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        }
    }
}

/// Every day from `first` to `last` inclusive; empty when `first > last`
pub fn calendar_dimension(first: u16, last: u16, anchor: &DateAnchor) -> Vec<CalendarDay> {
    (first..=last).map(|day| CalendarDay::new(day, anchor)).collect()
}

// ============================================================================
// TESTS
// ============================================================================
