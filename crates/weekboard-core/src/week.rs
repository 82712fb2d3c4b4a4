//! Calendar helpers for the Monday-first week grid.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WeekboardError};

/// Wire/storage format for task dates. ISO dates sort lexicographically in
/// the same order as chronologically, which the range query relies on.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One Monday..Sunday week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<NaiveDate>,
}

impl WeekRange {
    /// Inclusive bounds formatted for a range query.
    pub fn bounds(&self) -> (String, String) {
        (format_date(self.start), format_date(self.end))
    }
}

/// Position of a week inside its month, as shown in the week navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekInfo {
    pub week_number: u32,
    pub total_weeks: u32,
    pub year: i32,
    pub month: u32,
}

/// The week (Monday first) containing `date`.
///
/// Fails for dates whose week runs past the calendar's representable range.
pub fn week_dates(date: NaiveDate) -> Result<WeekRange> {
    let offset = date.weekday().num_days_from_monday() as u64;
    let start = date
        .checked_sub_days(Days::new(offset))
        .ok_or_else(|| out_of_range(date))?;
    let days = (0..7)
        .map(|i| start.checked_add_days(Days::new(i)))
        .collect::<Option<Vec<NaiveDate>>>()
        .ok_or_else(|| out_of_range(date))?;
    Ok(WeekRange {
        start,
        end: days[6],
        days,
    })
}

/// Same weekday one week later, `None` past the end of the calendar.
pub fn next_week(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(7))
}

pub fn previous_week(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(7))
}

/// `None` for `NaiveDate::MAX`.
pub fn next_day(date: NaiveDate) -> Option<NaiveDate> {
    date.succ_opt()
}

fn out_of_range(date: NaiveDate) -> WeekboardError {
    WeekboardError::InvalidInput(format!("week of {date} is out of range"))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| WeekboardError::InvalidInput(format!("invalid date {s:?}: {e}")))
}

pub fn is_weekend(date: NaiveDate) -> bool {
    date.weekday().num_days_from_monday() >= 5
}

/// Week-of-month numbering used by the navigation header.
///
/// Counts rows of a Sunday-first month calendar: the month's first weekday
/// offsets the day-of-month of the week's Monday.
pub fn week_info(date: NaiveDate) -> Result<WeekInfo> {
    let week_start = week_dates(date)?.start;
    let month_start = date.with_day(1).unwrap_or(date);
    let month_end = last_day_of_month(date);
    let lead = month_start.weekday().num_days_from_sunday();

    Ok(WeekInfo {
        week_number: (week_start.day() + lead).div_ceil(7),
        total_weeks: (month_end.day() + lead).div_ceil(7),
        year: date.year(),
        month: date.month(),
    })
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn week_starts_on_monday() {
        // 2024-03-06 is a Wednesday.
        let week = week_dates(d("2024-03-06")).unwrap();
        assert_eq!(week.start, d("2024-03-04"));
        assert_eq!(week.end, d("2024-03-10"));
        assert_eq!(week.days.len(), 7);
        assert_eq!(
            week.bounds(),
            ("2024-03-04".to_string(), "2024-03-10".to_string())
        );
    }

    #[test]
    fn sunday_belongs_to_previous_monday() {
        let week = week_dates(d("2024-03-10")).unwrap();
        assert_eq!(week.start, d("2024-03-04"));
    }

    #[test]
    fn navigation_moves_by_seven_days() {
        assert_eq!(next_week(d("2024-12-30")), Some(d("2025-01-06")));
        assert_eq!(previous_week(d("2024-03-04")), Some(d("2024-02-26")));
        assert_eq!(next_day(d("2024-02-28")), Some(d("2024-02-29")));
    }

    #[test]
    fn parse_rejects_non_iso() {
        assert!(parse_date("04.03.2024").is_err());
        assert!(parse_date("2024-13-01").is_err());
    }

    #[test]
    fn weekend_detection() {
        assert!(is_weekend(d("2024-03-09")));
        assert!(is_weekend(d("2024-03-10")));
        assert!(!is_weekend(d("2024-03-08")));
    }

    #[test]
    fn week_info_for_march_2024() {
        // March 2024 starts on a Friday (5 days after Sunday), has 31 days.
        let info = week_info(d("2024-03-13")).unwrap();
        assert_eq!(info.week_number, 3);
        assert_eq!(info.total_weeks, 6);
        assert_eq!((info.year, info.month), (2024, 3));
    }

    #[test]
    fn calendar_edges_do_not_panic() {
        assert_eq!(next_day(NaiveDate::MAX), None);
        assert_eq!(next_week(NaiveDate::MAX), None);
        assert_eq!(previous_week(NaiveDate::MIN), None);

        let err = week_dates(NaiveDate::MAX).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }
}
