//! ISO-8601 week arithmetic.
//!
//! All computations work on calendar dates in UTC. Zoned timestamps must go
//! through [`normalize_utc`] first so that callers in different local zones
//! agree on the weekday of a given instant.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Month labels used by the header, indexed by `month0`.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Reduce a zoned timestamp to its calendar date at UTC midnight.
pub fn normalize_utc<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveDate {
    instant.with_timezone(&Utc).date_naive()
}

/// The Thursday of the Monday-based week containing `date`.
fn thursday_of(date: NaiveDate) -> NaiveDate {
    let days_from_monday = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(days_from_monday) + Duration::days(3)
}

/// ISO week-numbering year of `date`: the calendar year of its week's Thursday.
pub fn iso_year(date: NaiveDate) -> i32 {
    thursday_of(date).year()
}

/// ISO week number of `date`, in `1..=53`.
///
/// The first Thursday of a year sits on ordinal 0..=6 and every later
/// Thursday is a whole number of weeks after it, so the week count since the
/// first Thursday is the Thursday's zero-based ordinal divided by seven.
pub fn iso_week(date: NaiveDate) -> u32 {
    1 + thursday_of(date).ordinal0() / 7
}

/// Number of ISO weeks in `year` (52 or 53).
///
/// December 28th always falls in the last ISO week of its own year.
pub fn weeks_in_year(year: i32) -> u32 {
    match NaiveDate::from_ymd_opt(year, 12, 28) {
        Some(dec28) => iso_week(dec28),
        None => 52,
    }
}

fn days_of_month(year: i32, month: u32) -> impl Iterator<Item = NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    first
        .into_iter()
        .flat_map(|first| first.iter_days())
        .take_while(move |d| d.month() == month)
}

/// For each calendar month of `year`, the ordered ISO weeks touched by its days.
///
/// Days whose ISO year differs from `year` are skipped, so the first days of
/// January may contribute nothing and the last days of December may be
/// dropped. A month can end up with an empty set.
pub fn month_week_spans(year: i32) -> Vec<BTreeSet<u32>> {
    (1..=12)
        .map(|month| {
            days_of_month(year, month)
                .filter(|d| iso_year(*d) == year)
                .map(iso_week)
                .collect()
        })
        .collect()
}

/// Weeks belonging to one month of the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSpan {
    /// Zero-based month index.
    pub month0: usize,
    pub weeks: Vec<u32>,
}

impl MonthSpan {
    pub fn label(&self) -> &'static str {
        MONTH_NAMES[self.month0]
    }

    pub fn first_week(&self) -> Option<u32> {
        self.weeks.first().copied()
    }

    pub fn count(&self) -> u32 {
        self.weeks.len() as u32
    }
}

/// Derived calendar data for one displayed year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearView {
    pub year: i32,
    pub weeks_in_year: u32,
    pub month_spans: Vec<MonthSpan>,
}

impl YearView {
    pub fn new(year: i32) -> Self {
        let month_spans = month_week_spans(year)
            .into_iter()
            .enumerate()
            .map(|(month0, weeks)| MonthSpan {
                month0,
                weeks: weeks.into_iter().collect(),
            })
            .collect();

        Self {
            year,
            weeks_in_year: weeks_in_year(year),
            month_spans,
        }
    }

    /// Week column numbers `1..=weeks_in_year`.
    pub fn weeks(&self) -> impl Iterator<Item = u32> {
        1..=self.weeks_in_year
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========== iso_week / iso_year ==========

    #[test]
    fn test_dec_31_2023_is_week_1_of_2024() {
        let d = date(2023, 12, 31);
        assert_eq!(iso_year(d), 2024);
        assert_eq!(iso_week(d), 1);
    }

    #[test]
    fn test_jan_1_2024_is_week_1() {
        let d = date(2024, 1, 1);
        assert_eq!(d.weekday(), Weekday::Mon);
        assert_eq!(iso_year(d), 2024);
        assert_eq!(iso_week(d), 1);
    }

    #[test]
    fn test_jan_1_belongs_to_previous_iso_year() {
        // Friday, week 53 of 2020
        let d = date(2021, 1, 1);
        assert_eq!(iso_year(d), 2020);
        assert_eq!(iso_week(d), 53);

        // Sunday, week 52 of 2022
        let d = date(2023, 1, 1);
        assert_eq!(iso_year(d), 2022);
        assert_eq!(iso_week(d), 52);
    }

    #[test]
    fn test_year_starting_on_thursday() {
        // 2015-01-01 is a Thursday and is the first day of week 1
        let d = date(2015, 1, 1);
        assert_eq!(iso_year(d), 2015);
        assert_eq!(iso_week(d), 1);
        assert_eq!(iso_week(date(2014, 12, 29)), 1);
        assert_eq!(iso_year(date(2014, 12, 29)), 2015);
    }

    #[test]
    fn test_leap_year_end() {
        // 2020 is a leap year starting on Wednesday: 53 weeks
        assert_eq!(iso_week(date(2020, 12, 31)), 53);
        assert_eq!(iso_week(date(2020, 2, 29)), 9);
    }

    #[test]
    fn test_jan_4_is_always_week_1() {
        for year in 1900..=2200 {
            let d = date(year, 1, 4);
            assert_eq!(iso_week(d), 1, "Jan 4 {}", year);
            assert_eq!(iso_year(d), year, "Jan 4 {}", year);
        }
    }

    #[test]
    fn test_matches_chrono_iso_week_for_every_day() {
        let mut d = date(1990, 1, 1);
        let end = date(2060, 12, 31);
        while d <= end {
            let expected = d.iso_week();
            assert_eq!(iso_week(d), expected.week(), "{}", d);
            assert_eq!(iso_year(d), expected.year(), "{}", d);
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_week_and_year_ranges() {
        let mut d = date(1999, 12, 1);
        while d <= date(2031, 1, 31) {
            let week = iso_week(d);
            assert!((1..=53).contains(&week), "{} -> {}", d, week);
            assert!((iso_year(d) - d.year()).abs() <= 1);
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_iso_week_is_deterministic() {
        let d = date(2026, 12, 31);
        assert_eq!(iso_week(d), iso_week(d));
        assert_eq!(iso_year(d), iso_year(d));
    }

    // ========== normalize_utc ==========

    #[test]
    fn test_normalize_utc_uses_utc_calendar_day() {
        // 2024-01-01 01:30 at UTC+3 is still 2023-12-31 in UTC
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let instant = tz.with_ymd_and_hms(2024, 1, 1, 1, 30, 0).unwrap();
        assert_eq!(normalize_utc(&instant), date(2023, 12, 31));

        // 2023-12-31 22:00 at UTC-5 is already 2024-01-01 in UTC
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let instant = tz.with_ymd_and_hms(2023, 12, 31, 22, 0, 0).unwrap();
        assert_eq!(normalize_utc(&instant), date(2024, 1, 1));
    }

    // ========== weeks_in_year ==========

    #[test]
    fn test_weeks_in_year_known_values() {
        assert_eq!(weeks_in_year(2020), 53);
        assert_eq!(weeks_in_year(2021), 52);
        assert_eq!(weeks_in_year(2015), 53);
        assert_eq!(weeks_in_year(2024), 52);
        assert_eq!(weeks_in_year(2026), 53);
    }

    #[test]
    fn test_weeks_in_year_is_52_or_53() {
        for year in 1600..=2400 {
            let weeks = weeks_in_year(year);
            assert!(weeks == 52 || weeks == 53, "{} -> {}", year, weeks);
        }
    }

    // ========== month_week_spans ==========

    #[test]
    fn test_month_week_spans_has_twelve_entries() {
        assert_eq!(month_week_spans(2024).len(), 12);
    }

    #[test]
    fn test_month_week_spans_excludes_other_iso_year() {
        let spans = month_week_spans(2021);
        // Jan 1-3 2021 belong to 2020-W53
        assert!(!spans[0].contains(&53));
        assert_eq!(spans[0].iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);

        let spans = month_week_spans(2024);
        // Dec 30-31 2024 belong to 2025-W01
        assert!(!spans[11].contains(&1));
        assert_eq!(spans[11].iter().copied().max(), Some(52));
    }

    #[test]
    fn test_no_cross_year_contamination() {
        let jan_2021 = &month_week_spans(2021)[0];
        let dec_2020 = &month_week_spans(2020)[11];
        assert!(jan_2021.is_disjoint(dec_2020));
        assert!(dec_2020.contains(&53));
    }

    #[test]
    fn test_month_week_spans_cover_every_week() {
        for year in 2000..=2040 {
            let covered: BTreeSet<u32> = month_week_spans(year).into_iter().flatten().collect();
            let expected: BTreeSet<u32> = (1..=weeks_in_year(year)).collect();
            assert_eq!(covered, expected, "{}", year);
        }
    }

    #[test]
    fn test_month_spans_are_contiguous() {
        for year in 2010..=2030 {
            for weeks in month_week_spans(year) {
                let weeks: Vec<u32> = weeks.into_iter().collect();
                for pair in weeks.windows(2) {
                    assert_eq!(pair[1], pair[0] + 1, "{} {:?}", year, weeks);
                }
            }
        }
    }

    // ========== YearView ==========

    #[test]
    fn test_year_view_2020() {
        let view = YearView::new(2020);
        assert_eq!(view.year, 2020);
        assert_eq!(view.weeks_in_year, 53);
        assert_eq!(view.month_spans.len(), 12);
        assert_eq!(view.month_spans[0].label(), "January");
        assert_eq!(view.month_spans[0].first_week(), Some(1));
        assert_eq!(view.month_spans[11].label(), "December");
        assert_eq!(view.weeks().count(), 53);
    }

    #[test]
    fn test_month_span_count_matches_weeks() {
        let view = YearView::new(2021);
        let january = &view.month_spans[0];
        assert_eq!(january.count(), 4);
        assert_eq!(january.weeks, vec![1, 2, 3, 4]);
    }
}
