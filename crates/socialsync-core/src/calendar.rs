use anyhow::anyhow;
use chrono::{
  Datelike,
  Months,
  NaiveDate
};
use tracing::debug;

pub const DAYS_PER_WEEK: usize = 7;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct CalendarDay {
  pub date:             NaiveDate,
  pub is_current_month: bool,
  pub is_today:         bool
}

/// Whole Monday-first weeks covering one
/// month, leading and trailing cells
/// borrowed from the neighbouring months.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
  year:   i32,
  month0: u32,
  first:  NaiveDate,
  days:   Vec<CalendarDay>
}

impl MonthGrid {
  pub fn year(&self) -> i32 {
    self.year
  }

  /// Zero-based month index.
  pub fn month0(&self) -> u32 {
    self.month0
  }

  pub fn first_of_month(
    &self
  ) -> NaiveDate {
    self.first
  }

  pub fn days(&self) -> &[CalendarDay] {
    &self.days
  }

  pub fn weeks(
    &self
  ) -> std::slice::ChunksExact<
    '_,
    CalendarDay
  > {
    self.days.chunks_exact(DAYS_PER_WEEK)
  }

  pub fn week_count(&self) -> usize {
    self.days.len() / DAYS_PER_WEEK
  }
}

#[tracing::instrument(skip(today))]
pub fn build_month_grid(
  year: i32,
  month: u32,
  today: NaiveDate
) -> anyhow::Result<MonthGrid> {
  if month > 11 {
    return Err(anyhow!(
      "month index out of range: \
       {month} (expected 0-11)"
    ));
  }

  let month1 = month + 1;
  let first =
    first_day_of_month(year, month1)?;
  let days_in_current =
    days_in_month(year, month1)?;
  let leading = first
    .weekday()
    .num_days_from_monday();

  let (prev_year, prev_month) =
    previous_month(year, month1);
  let (next_year, next_month) =
    following_month(year, month1);
  let days_in_prev =
    days_in_month(prev_year, prev_month)?;

  let total = (leading + days_in_current)
    .div_ceil(DAYS_PER_WEEK as u32)
    * DAYS_PER_WEEK as u32;
  let mut days =
    Vec::with_capacity(total as usize);

  for offset in 0..leading {
    let day =
      days_in_prev - leading + offset + 1;
    days.push(CalendarDay {
      date:             civil_date(
        prev_year, prev_month, day
      )?,
      is_current_month: false,
      is_today:         false
    });
  }

  for day in 1..=days_in_current {
    let date =
      civil_date(year, month1, day)?;
    days.push(CalendarDay {
      date,
      is_current_month: true,
      is_today: date == today
    });
  }

  let trailing =
    total - leading - days_in_current;
  for day in 1..=trailing {
    days.push(CalendarDay {
      date:             civil_date(
        next_year, next_month, day
      )?,
      is_current_month: false,
      is_today:         false
    });
  }

  debug!(
    year,
    month = month1,
    leading,
    trailing,
    cells = days.len(),
    "built month grid"
  );

  Ok(MonthGrid {
    year,
    month0: month,
    first,
    days
  })
}

/// Day count of a one-based month, taken
/// from the civil calendar.
pub fn days_in_month(
  year: i32,
  month: u32
) -> anyhow::Result<u32> {
  Ok(last_day_of_month(year, month)?.day())
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> anyhow::Result<NaiveDate> {
  civil_date(year, month, 1)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> anyhow::Result<NaiveDate> {
  first_day_of_month(year, month)?
    .checked_add_months(Months::new(1))
    .and_then(|next| next.pred_opt())
    .ok_or_else(|| {
      anyhow!(
        "date out of range: no last \
         day for {year}-{month:02}"
      )
    })
}

/// Moves `date` by whole months, clamping
/// the day to the length of the target
/// month.
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> anyhow::Result<NaiveDate> {
  let step =
    Months::new(months.unsigned_abs());
  let shifted = if months < 0 {
    date.checked_sub_months(step)
  } else {
    date.checked_add_months(step)
  };
  shifted.ok_or_else(|| {
    anyhow!(
      "month shift out of range: \
       {date} {months:+}"
    )
  })
}

fn previous_month(
  year: i32,
  month: u32
) -> (i32, u32) {
  if month <= 1 {
    (year.saturating_sub(1), 12)
  } else {
    (year, month - 1)
  }
}

fn following_month(
  year: i32,
  month: u32
) -> (i32, u32) {
  if month >= 12 {
    (year.saturating_add(1), 1)
  } else {
    (year, month + 1)
  }
}

fn civil_date(
  year: i32,
  month: u32,
  day: u32
) -> anyhow::Result<NaiveDate> {
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .ok_or_else(|| {
    anyhow!(
      "date out of range: \
       {year}-{month:02}-{day:02}"
    )
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ymd(
    year: i32,
    month: u32,
    day: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(
      year, month, day
    )
    .expect("valid date")
  }

  fn add_days(
    date: NaiveDate,
    days: u64
  ) -> NaiveDate {
    date
      .checked_add_days(chrono::Days::new(
        days
      ))
      .expect("valid date")
  }

  #[test]
  fn every_month_fills_whole_weeks() {
    let today = ymd(2024, 6, 15);
    for year in [1999, 2000, 2023, 2024]
    {
      for month in 0..12 {
        let grid = build_month_grid(
          year, month, today
        )
        .expect("grid");
        let expected_days =
          days_in_month(year, month + 1)
            .expect("month length");

        assert_eq!(
          grid.days().len() % 7,
          0
        );
        assert!(
          grid.days().len()
            >= expected_days as usize
        );

        let current: Vec<NaiveDate> =
          grid
            .days()
            .iter()
            .filter(|day| {
              day.is_current_month
            })
            .map(|day| day.date)
            .collect();
        assert_eq!(
          current.len(),
          expected_days as usize
        );
        assert_eq!(
          current[0],
          ymd(year, month + 1, 1)
        );
        assert!(
          current
            .windows(2)
            .all(|pair| {
              pair[1]
                == add_days(pair[0], 1)
            })
        );
      }
    }
  }

  #[test]
  fn cells_are_consecutive_and_start_on_monday(
  ) {
    let grid = build_month_grid(
      2024,
      8,
      ymd(2024, 9, 1)
    )
    .expect("grid");

    assert_eq!(
      grid.days()[0].date.weekday(),
      chrono::Weekday::Mon
    );
    assert!(grid.days().windows(2).all(
      |pair| {
        pair[1].date
          == add_days(pair[0].date, 1)
      }
    ));
    assert!(grid.weeks().all(|week| {
      week.len() == DAYS_PER_WEEK
    }));
  }

  #[test]
  fn leap_february_has_29_current_cells()
  {
    let grid = build_month_grid(
      2024,
      1,
      ymd(2024, 2, 10)
    )
    .expect("grid");

    let current = grid
      .days()
      .iter()
      .filter(|day| day.is_current_month)
      .count();
    assert_eq!(current, 29);
    // 2024-02-01 is a Thursday.
    assert_eq!(
      grid.days()[0].date,
      ymd(2024, 1, 29)
    );
    assert_eq!(grid.week_count(), 5);
  }

  #[test]
  fn january_and_december_wrap_years() {
    let january = build_month_grid(
      2025,
      0,
      ymd(2025, 1, 1)
    )
    .expect("grid");
    assert_eq!(
      january.days()[0].date,
      ymd(2024, 12, 30)
    );

    let december = build_month_grid(
      2025,
      11,
      ymd(2025, 1, 1)
    )
    .expect("grid");
    let last = december
      .days()
      .last()
      .expect("non-empty grid");
    assert_eq!(last.date, ymd(2026, 1, 4));
    assert!(!last.is_current_month);
  }

  #[test]
  fn marks_today_only_inside_the_month() {
    let today = ymd(2024, 3, 2);
    let march =
      build_month_grid(2024, 2, today)
        .expect("grid");
    let marked: Vec<&CalendarDay> = march
      .days()
      .iter()
      .filter(|day| day.is_today)
      .collect();
    assert_eq!(marked.len(), 1);
    assert_eq!(marked[0].date, today);

    // February's trailing cells include
    // March 2nd, which stays unmarked.
    let february =
      build_month_grid(2024, 1, today)
        .expect("grid");
    assert!(
      february
        .days()
        .iter()
        .any(|day| day.date == today)
    );
    assert!(
      february
        .days()
        .iter()
        .all(|day| !day.is_today)
    );
  }

  #[test]
  fn month_starting_on_monday_has_no_leading_cells(
  ) {
    // 2024-07-01 is a Monday.
    let grid = build_month_grid(
      2024,
      6,
      ymd(2024, 1, 1)
    )
    .expect("grid");
    assert_eq!(
      grid.days()[0].date,
      ymd(2024, 7, 1)
    );
    assert!(grid.days()[0].is_current_month);
  }

  #[test]
  fn rejects_month_index_out_of_range() {
    assert!(
      build_month_grid(
        2024,
        12,
        ymd(2024, 1, 1)
      )
      .is_err()
    );
  }

  #[test]
  fn shift_months_clamps_day() {
    assert_eq!(
      shift_months(ymd(2024, 1, 31), 1)
        .expect("shift"),
      ymd(2024, 2, 29)
    );
    assert_eq!(
      shift_months(ymd(2024, 1, 15), -1)
        .expect("shift"),
      ymd(2023, 12, 15)
    );
    assert_eq!(
      shift_months(ymd(2024, 3, 31), -25)
        .expect("shift"),
      ymd(2022, 2, 28)
    );
  }

  #[test]
  fn extreme_month_shifts_are_errors() {
    let start = ymd(2024, 3, 1);
    for months in [
      i32::MAX,
      2_000_000_000,
      i32::MIN
    ] {
      assert!(
        shift_months(start, months)
          .is_err(),
        "{months}"
      );
    }
  }

  #[test]
  fn year_outside_chrono_range_is_an_error(
  ) {
    assert!(
      first_day_of_month(999_999, 1)
        .is_err()
    );
    assert!(
      last_day_of_month(999_999, 1)
        .is_err()
    );
    assert!(
      days_in_month(999_999, 1).is_err()
    );
    let err = build_month_grid(
      999_999,
      0,
      ymd(2024, 1, 1)
    )
    .expect_err("year out of range");
    assert!(
      err.to_string().contains("999999")
    );
  }

  #[test]
  fn month_lengths_follow_leap_rules() {
    for (year, month, expected) in [
      (2024, 2, 29),
      (1900, 2, 28),
      (2000, 2, 29),
      (2023, 4, 30),
      (2023, 12, 31)
    ] {
      assert_eq!(
        days_in_month(year, month)
          .expect("month length"),
        expected,
        "{year}-{month:02}"
      );
    }
    assert_eq!(
      last_day_of_month(2023, 12)
        .expect("last day"),
      ymd(2023, 12, 31)
    );
  }
}
