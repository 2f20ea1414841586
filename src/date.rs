//! Calendar arithmetic shared by the daily, weekly and monthly views.
//!
//! Every function here is a pure function of its inputs. The only source of
//! "now" is a [`Clock`], so callers can pin the current day in tests.

use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Sunday-first weekday labels, indexed by `num_days_from_sunday`.
pub const WEEKDAY_LABELS: [&str; 7] = ["일", "월", "화", "수", "목", "금", "토"];

/// Number of cells in a month view (6 rows of 7 days).
pub const GRID_CELLS: usize = 42;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("expected a YYYY-MM-DD date, got {0:?}")]
    Malformed(String),
    #[error("no such calendar date: {0}")]
    InvalidDate(String),
    #[error("date arithmetic out of range")]
    OutOfRange,
}

/// Source of the current local date.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock frozen on one day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridCell {
    Blank,
    Day(u32),
}

impl GridCell {
    pub fn in_month(&self) -> bool {
        matches!(self, GridCell::Day(_))
    }

    pub fn day(&self) -> Option<u32> {
        match self {
            GridCell::Day(d) => Some(*d),
            GridCell::Blank => None,
        }
    }
}

/// Sunday-first 6x7 layout of one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub cells: [GridCell; GRID_CELLS],
}

impl MonthGrid {
    pub fn rows(&self) -> impl Iterator<Item = &[GridCell]> {
        self.cells.chunks(7)
    }

    pub fn date_at(&self, idx: usize) -> Option<NaiveDate> {
        let day = self.cells.get(idx)?.day()?;
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }
}

pub fn to_iso(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

pub fn parse_iso(iso: &str) -> Result<NaiveDate, DateError> {
    let malformed = || DateError::Malformed(iso.to_string());
    let mut parts = iso.split('-');
    let (year, month, day) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(y), Some(m), Some(d), None) => (y, m, d),
        _ => return Err(malformed()),
    };
    if !digits(year, 4) || !digits(month, 2) || !digits(day, 2) {
        return Err(malformed());
    }
    let year: i32 = year.parse().map_err(|_| malformed())?;
    let month: u32 = month.parse().map_err(|_| malformed())?;
    let day: u32 = day.parse().map_err(|_| malformed())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| DateError::InvalidDate(iso.to_string()))
}

fn digits(part: &str, width: usize) -> bool {
    part.len() == width && part.bytes().all(|b| b.is_ascii_digit())
}

pub fn today_iso(clock: &impl Clock) -> String {
    to_iso(clock.today())
}

/// First day of the week containing `date`.
///
/// In Monday mode a Sunday belongs to the week that started six days earlier.
/// Assumes `date` is at least a week inside chrono's range, which holds for
/// every date `parse_iso` accepts (years 0000 to 9999).
pub fn start_of_week(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let back = match week_start {
        WeekStart::Monday => date.weekday().num_days_from_monday(),
        WeekStart::Sunday => date.weekday().num_days_from_sunday(),
    };
    date.checked_sub_days(Days::new(u64::from(back)))
        .unwrap_or(date)
}

pub fn start_of_week_iso(iso: &str, week_start: WeekStart) -> Result<String, DateError> {
    let date = parse_iso(iso)?;
    Ok(to_iso(start_of_week(date, week_start)))
}

pub fn add_days(date: NaiveDate, delta: i64) -> Result<NaiveDate, DateError> {
    let shifted = if delta >= 0 {
        date.checked_add_days(Days::new(delta.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(delta.unsigned_abs()))
    };
    shifted.ok_or(DateError::OutOfRange)
}

pub fn add_days_iso(iso: &str, delta: i64) -> Result<String, DateError> {
    let date = parse_iso(iso)?;
    add_days(date, delta).map(to_iso)
}

/// The seven consecutive days from `start`. Same range assumption as
/// [`start_of_week`].
pub fn week_dates(start: NaiveDate) -> [NaiveDate; 7] {
    let mut dates = [start; 7];
    for (offset, slot) in dates.iter_mut().enumerate() {
        *slot = start.checked_add_days(Days::new(offset as u64)).unwrap_or(start);
    }
    dates
}

/// `"2024.06.03 ~ 2024.06.09"` for the week beginning at `start`.
pub fn week_range_label(start: NaiveDate) -> String {
    let end = week_dates(start)[6];
    format!(
        "{} ~ {}",
        start.format("%Y.%m.%d"),
        end.format("%Y.%m.%d")
    )
}

/// `"YYYY-MM"`, the key of the month containing `date`.
pub fn to_month_iso(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn month_label(date: NaiveDate) -> String {
    format!("{}년 {}월", date.year(), date.month())
}

pub fn weekday_label(date: NaiveDate) -> &'static str {
    WEEKDAY_LABELS[date.weekday().num_days_from_sunday() as usize]
}

/// Days in `month` of `year`: the day before the first of the following month.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .filter(|last| last.month() == month)
        .map(|last| last.day())
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn build_month_grid(date: NaiveDate) -> MonthGrid {
    let first = first_of_month(date);
    let first_weekday = first.weekday().num_days_from_sunday() as i64;
    // The last representable month has no successor month to step back from.
    let total_days = days_in_month(first.year(), first.month()).unwrap_or_else(|| {
        (28..=31)
            .rev()
            .find(|d| first.with_day(*d).is_some())
            .unwrap_or(28)
    }) as i64;

    let mut cells = [GridCell::Blank; GRID_CELLS];
    for (idx, cell) in cells.iter_mut().enumerate() {
        let day_number = idx as i64 - first_weekday + 1;
        if (1..=total_days).contains(&day_number) {
            *cell = GridCell::Day(day_number as u32);
        }
    }
    MonthGrid {
        year: first.year(),
        month: first.month(),
        cells,
    }
}

/// Same day-of-month `months` away, clamped to the target month's length.
pub fn shift_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let index = date.year() * 12 + date.month0() as i32 + months;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let last = days_in_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, date.day().min(last))
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn formats_zero_padded() {
        assert_eq!(to_iso(ymd(2024, 2, 29)), "2024-02-29");
        assert_eq!(to_iso(ymd(987, 1, 5)), "0987-01-05");
    }

    #[test]
    fn parse_then_format_is_stable() {
        let mut date = ymd(2023, 12, 20);
        for _ in 0..800 {
            let iso = to_iso(date);
            assert_eq!(parse_iso(&iso).unwrap(), date);
            assert_eq!(to_iso(parse_iso(&iso).unwrap()), iso);
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        for raw in [
            "",
            "2024",
            "2024-1-05",
            "2024-01-5",
            "24-01-05",
            "2024/01/05",
            "2024-01-05-01",
            "2024-0a-05",
            "+024-01-05",
            " 2024-01-05",
        ] {
            assert!(
                matches!(parse_iso(raw), Err(DateError::Malformed(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn parse_rejects_impossible_dates() {
        for raw in ["2024-01-32", "2023-02-29", "2024-13-01", "2024-00-10", "2024-04-31"] {
            assert!(
                matches!(parse_iso(raw), Err(DateError::InvalidDate(_))),
                "accepted {raw:?}"
            );
        }
        assert_eq!(parse_iso("2024-02-29").unwrap(), ymd(2024, 2, 29));
    }

    #[test]
    fn today_comes_from_clock() {
        let clock = FixedClock(ymd(2026, 10, 18));
        assert_eq!(today_iso(&clock), "2026-10-18");
    }

    #[test]
    fn sunday_maps_to_previous_monday() {
        assert_eq!(
            start_of_week_iso("2024-06-09", WeekStart::Monday).unwrap(),
            "2024-06-03"
        );
        assert_eq!(
            start_of_week_iso("2024-06-03", WeekStart::Monday).unwrap(),
            "2024-06-03"
        );
        assert_eq!(
            start_of_week_iso("2024-06-09", WeekStart::Sunday).unwrap(),
            "2024-06-09"
        );
        assert_eq!(
            start_of_week_iso("2024-06-08", WeekStart::Sunday).unwrap(),
            "2024-06-02"
        );
    }

    #[test]
    fn week_start_is_monday_and_contains_anchor() {
        let mut date = ymd(2023, 12, 1);
        for _ in 0..120 {
            let start = start_of_week(date, WeekStart::Monday);
            assert_eq!(start.weekday(), Weekday::Mon);
            assert!(start <= date);
            assert!(date <= start + Days::new(6));
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn weeks_hold_at_the_ends_of_four_digit_years() {
        let first = ymd(0, 1, 1);
        let start = start_of_week(first, WeekStart::Monday);
        assert_eq!(start.weekday(), Weekday::Mon);
        assert!(start <= first);

        let last = ymd(9999, 12, 31);
        let start = start_of_week(last, WeekStart::Monday);
        let dates = week_dates(start);
        assert_eq!(start.weekday(), Weekday::Mon);
        assert!(dates.contains(&last));
        for pair in dates.windows(2) {
            assert_eq!(pair[0].succ_opt(), Some(pair[1]));
        }
    }

    #[test]
    fn add_days_rolls_over_boundaries() {
        assert_eq!(add_days_iso("2024-02-29", 1).unwrap(), "2024-03-01");
        assert_eq!(add_days_iso("2023-02-28", 1).unwrap(), "2023-03-01");
        assert_eq!(add_days_iso("2024-01-01", -1).unwrap(), "2023-12-31");
        assert_eq!(add_days_iso("2024-12-25", 10).unwrap(), "2025-01-04");
        assert_eq!(add_days_iso("2024-03-01", 0).unwrap(), "2024-03-01");
        assert_eq!(add_days(NaiveDate::MAX, 1), Err(DateError::OutOfRange));
        assert!(matches!(
            add_days_iso("2024-02-30", 1),
            Err(DateError::InvalidDate(_))
        ));
    }

    #[test]
    fn labels() {
        assert_eq!(month_label(ymd(2024, 6, 9)), "2024년 6월");
        assert_eq!(to_month_iso(ymd(2024, 6, 9)), "2024-06");
        assert_eq!(to_month_iso(ymd(987, 11, 1)), "0987-11");
        assert_eq!(week_range_label(ymd(2024, 12, 30)), "2024.12.30 ~ 2025.01.05");
        assert_eq!(weekday_label(ymd(2024, 6, 9)), "일");
        assert_eq!(weekday_label(ymd(2024, 6, 10)), "월");
    }

    #[test]
    fn week_dates_are_consecutive() {
        let dates = week_dates(ymd(2024, 2, 26));
        assert_eq!(dates[0], ymd(2024, 2, 26));
        assert_eq!(dates[3], ymd(2024, 2, 29));
        assert_eq!(dates[6], ymd(2024, 3, 3));
    }

    #[test]
    fn month_lengths_follow_calendar() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(1900, 2), Some(28));
        assert_eq!(days_in_month(2000, 2), Some(29));
        assert_eq!(days_in_month(2024, 12), Some(31));
        assert_eq!(days_in_month(2024, 4), Some(30));
        assert_eq!(days_in_month(2024, 13), None);
    }

    #[test]
    fn grid_layout_for_june_2024() {
        // June 1st 2024 is a Saturday.
        let grid = build_month_grid(ymd(2024, 6, 17));
        assert_eq!((grid.year, grid.month), (2024, 6));
        assert!(grid.cells[..6].iter().all(|c| *c == GridCell::Blank));
        assert_eq!(grid.cells[6], GridCell::Day(1));
        assert_eq!(grid.cells[35], GridCell::Day(30));
        assert!(grid.cells[36..].iter().all(|c| !c.in_month()));
        assert_eq!(grid.date_at(6), Some(ymd(2024, 6, 1)));
        assert_eq!(grid.date_at(0), None);
        assert_eq!(grid.rows().count(), 6);
    }

    #[test]
    fn grid_is_complete_for_every_month() {
        for year in [1900, 2000, 2023, 2024, 2100] {
            for month in 1..=12 {
                let first = ymd(year, month, 1);
                let grid = build_month_grid(first);
                let in_month = grid.cells.iter().filter(|c| c.in_month()).count() as u32;
                assert_eq!(in_month, days_in_month(year, month).unwrap());
                let leading = grid.cells.iter().take_while(|c| !c.in_month()).count() as u32;
                assert_eq!(leading, first.weekday().num_days_from_sunday());
            }
        }
        let feb = build_month_grid(ymd(2024, 2, 10));
        assert_eq!(feb.cells.iter().filter(|c| c.in_month()).count(), 29);
    }

    #[test]
    fn shift_months_clamps_day() {
        assert_eq!(shift_months(ymd(2024, 1, 31), 1), Some(ymd(2024, 2, 29)));
        assert_eq!(shift_months(ymd(2024, 1, 15), -1), Some(ymd(2023, 12, 15)));
        assert_eq!(shift_months(ymd(2024, 11, 30), 3), Some(ymd(2025, 2, 28)));
    }

    #[test]
    fn weekend_detection() {
        assert!(is_weekend(ymd(2024, 6, 8)));
        assert!(is_weekend(ymd(2024, 6, 9)));
        assert!(!is_weekend(ymd(2024, 6, 10)));
    }
}
