use std::fmt::{Display, Formatter};

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Identifies an ISO 8601 week. Ordered by year, then week number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeekKey {
    pub year: i32,
    pub week_number: u32,
}

impl WeekKey {
    pub fn new(year: i32, week_number: u32) -> Self {
        Self { year, week_number }
    }
}

impl Display for WeekKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week_number)
    }
}

/// Number of ISO weeks in `year`. December 28 always falls in the last week
/// of its ISO year.
pub fn weeks_in_year(year: i32) -> Result<u32, CalendarError> {
    let december_28 = NaiveDate::from_ymd_opt(year, 12, 28)
        .ok_or_else(|| CalendarError::InvalidInput(format!("year {year} is out of range")))?;
    let weeks = december_28.iso_week().week();
    debug!(year, weeks, "weeks in year");
    Ok(weeks)
}

/// The seven dates of ISO week `week_number` of `year`, Monday first.
pub fn dates_of_week(year: i32, week_number: i32) -> Result<WeekDates, CalendarError> {
    let weeks = weeks_in_year(year)?;
    if week_number < 1 || i64::from(week_number) > i64::from(weeks) {
        return Err(CalendarError::InvalidInput(format!(
            "week {week_number} is outside 1..={weeks} for year {year}"
        )));
    }

    let out_of_range =
        || CalendarError::InvalidInput(format!("week {week_number} of {year} is out of range"));

    let previous_year = year.checked_sub(1).ok_or_else(out_of_range)?;
    let december_28 = NaiveDate::from_ymd_opt(previous_year, 12, 28).ok_or_else(out_of_range)?;

    // the first monday after december 28 opens week 1
    let mut monday_of_first_week = december_28;
    loop {
        monday_of_first_week = monday_of_first_week.succ_opt().ok_or_else(out_of_range)?;
        if monday_of_first_week.weekday() == Weekday::Mon {
            break;
        }
    }

    let weeks_to_add = u64::from(week_number.unsigned_abs() - 1);
    let monday = monday_of_first_week
        .checked_add_days(Days::new(weeks_to_add * 7))
        .ok_or_else(out_of_range)?;
    monday
        .checked_add_days(Days::new(6))
        .ok_or_else(out_of_range)?;

    debug!(year, week_number, %monday, "resolved week");
    Ok(WeekDates { monday, next: 0 })
}

/// Lazy sequence over the seven days of a week. Cloning restarts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekDates {
    monday: NaiveDate,
    next: u64,
}

impl WeekDates {
    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    pub fn sunday(&self) -> NaiveDate {
        self.monday + Days::new(6)
    }

    pub fn date_of(&self, weekday: Weekday) -> NaiveDate {
        self.monday + Days::new(u64::from(weekday.num_days_from_monday()))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.monday <= date && date <= self.sunday()
    }
}

impl Iterator for WeekDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= 7 {
            return None;
        }
        let day = self.monday.checked_add_days(Days::new(self.next))?;
        self.next += 1;
        Some(day)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = 7usize.saturating_sub(self.next as usize);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WeekDates {}

pub fn weekday_of(date: NaiveDate) -> Weekday {
    date.weekday()
}

pub fn iso_week_of(date: NaiveDate) -> WeekKey {
    let week = date.iso_week();
    WeekKey::new(week.year(), week.week())
}

pub fn current_week(today: NaiveDate) -> WeekKey {
    iso_week_of(today)
}

pub fn previous_week(key: WeekKey) -> Result<WeekKey, CalendarError> {
    if key.week_number <= 1 {
        let year = key
            .year
            .checked_sub(1)
            .ok_or_else(|| CalendarError::InvalidInput(format!("no week before {key}")))?;
        Ok(WeekKey::new(year, weeks_in_year(year)?))
    } else {
        Ok(WeekKey::new(key.year, key.week_number - 1))
    }
}

pub fn next_week(key: WeekKey) -> Result<WeekKey, CalendarError> {
    if key.week_number + 1 > weeks_in_year(key.year)? {
        let year = key
            .year
            .checked_add(1)
            .ok_or_else(|| CalendarError::InvalidInput(format!("no week after {key}")))?;
        weeks_in_year(year)?;
        Ok(WeekKey::new(year, 1))
    } else {
        Ok(WeekKey::new(key.year, key.week_number + 1))
    }
}

/// Reads an integer from user input. Decimal input is truncated toward zero.
pub fn parse_year(input: &str) -> Result<i32, CalendarError> {
    parse_integer(input, "year")
}

pub fn parse_week_number(input: &str) -> Result<i32, CalendarError> {
    parse_integer(input, "week number")
}

fn parse_integer(input: &str, what: &str) -> Result<i32, CalendarError> {
    let trimmed = input.trim();
    if let Ok(value) = trimmed.parse::<i32>() {
        return Ok(value);
    }

    match trimmed.parse::<f64>() {
        Ok(value)
            if value.is_finite() && value.trunc() >= f64::from(i32::MIN)
                && value.trunc() <= f64::from(i32::MAX) =>
        {
            Ok(value.trunc() as i32)
        }
        _ => Err(CalendarError::InvalidInput(format!(
            "unable to read {what} from '{input}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Duration, NaiveDate, Weekday};
    use proptest::prelude::*;

    use super::{
        CalendarError, WeekKey, dates_of_week, iso_week_of, next_week, parse_week_number,
        parse_year, previous_week, weekday_of, weeks_in_year,
    };

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn weeks_in_year_matches_known_years() {
        let expected = [
            (2000, 52),
            (2001, 52),
            (2002, 52),
            (2003, 52),
            (2004, 53),
            (2005, 52),
            (2006, 52),
            (2007, 52),
            (2008, 52),
            (2009, 53),
            (2010, 52),
            (2011, 52),
            (2012, 52),
            (2013, 52),
            (2014, 52),
            (2015, 53),
            (2016, 52),
            (2017, 52),
            (2018, 52),
            (2019, 52),
            (2020, 53),
            (2021, 52),
            (2022, 52),
            (2023, 52),
            (2024, 52),
            (2025, 52),
            (2026, 53),
            (2027, 52),
            (2028, 52),
            (2029, 52),
            (2030, 52),
        ];

        for (year, weeks) in expected {
            assert_eq!(weeks_in_year(year), Ok(weeks), "year {year}");
        }
    }

    #[test]
    fn weeks_in_year_rejects_unrepresentable_years() {
        assert!(matches!(
            weeks_in_year(i32::MAX),
            Err(CalendarError::InvalidInput(_))
        ));
    }

    #[test]
    fn resolves_known_mondays() {
        let monday = |year, week| {
            dates_of_week(year, week)
                .expect("week should resolve")
                .monday()
        };
        assert_eq!(monday(2018, 10), date(2018, 3, 5));
        assert_eq!(monday(2018, 52), date(2018, 12, 24));
        assert_eq!(monday(2019, 1), date(2018, 12, 31));
        assert_eq!(monday(2021, 1), date(2021, 1, 4));
        assert_eq!(monday(2020, 53), date(2020, 12, 28));
    }

    #[test]
    fn yields_seven_consecutive_days() {
        let days = dates_of_week(2018, 10)
            .expect("week should resolve")
            .collect::<Vec<_>>();
        let expected = (5..=11).map(|day| date(2018, 3, day)).collect::<Vec<_>>();
        assert_eq!(days, expected);
    }

    #[test]
    fn every_week_is_seven_days_from_a_monday() {
        for year in 2000..=2030 {
            let weeks = weeks_in_year(year).expect("weeks");
            for week in 1..=weeks as i32 {
                let dates = dates_of_week(year, week).expect("week should resolve");
                assert_eq!(dates.len(), 7);
                let days = dates.collect::<Vec<_>>();
                assert_eq!(days[0].weekday(), Weekday::Mon);
                for pair in days.windows(2) {
                    assert_eq!(pair[1] - pair[0], Duration::days(1));
                }
            }
        }
    }

    #[test]
    fn resolving_twice_gives_the_same_dates() {
        let first = dates_of_week(2015, 53).expect("week").collect::<Vec<_>>();
        let second = dates_of_week(2015, 53).expect("week").collect::<Vec<_>>();
        assert_eq!(first, second);

        let dates = dates_of_week(2015, 53).expect("week");
        let restarted = dates.clone();
        assert_eq!(dates.collect::<Vec<_>>(), restarted.collect::<Vec<_>>());
    }

    #[test]
    fn rejects_out_of_range_week_numbers() {
        for week in [0, -1, 53] {
            assert!(
                matches!(dates_of_week(2018, week), Err(CalendarError::InvalidInput(_))),
                "week {week}"
            );
        }
        assert!(dates_of_week(2020, 53).is_ok());
        assert!(dates_of_week(2020, 54).is_err());
    }

    #[test]
    fn weekday_labels_follow_monday_first() {
        let expected = [
            (Weekday::Mon, date(2018, 3, 5)),
            (Weekday::Tue, date(2018, 3, 6)),
            (Weekday::Wed, date(2018, 3, 7)),
            (Weekday::Thu, date(2018, 3, 8)),
            (Weekday::Fri, date(2018, 3, 9)),
            (Weekday::Sat, date(2018, 3, 10)),
            (Weekday::Sun, date(2018, 3, 11)),
        ];
        for (index, (weekday, day)) in expected.into_iter().enumerate() {
            assert_eq!(weekday_of(day), weekday);
            assert_eq!(weekday.num_days_from_monday() as usize, index);
        }
    }

    #[test]
    fn navigation_wraps_across_years() {
        assert_eq!(
            previous_week(WeekKey::new(2021, 1)),
            Ok(WeekKey::new(2020, 53))
        );
        assert_eq!(next_week(WeekKey::new(2020, 53)), Ok(WeekKey::new(2021, 1)));
        assert_eq!(next_week(WeekKey::new(2018, 52)), Ok(WeekKey::new(2019, 1)));
        assert_eq!(next_week(WeekKey::new(2018, 10)), Ok(WeekKey::new(2018, 11)));
    }

    #[test]
    fn parses_integer_like_input() {
        assert_eq!(parse_year("2018"), Ok(2018));
        assert_eq!(parse_year(" 2000.43 "), Ok(2000));
        assert_eq!(parse_week_number("10"), Ok(10));
        assert!(matches!(
            parse_year("a string"),
            Err(CalendarError::InvalidInput(_))
        ));
        assert!(parse_week_number("").is_err());
    }

    #[test]
    fn iso_week_crosses_calendar_year() {
        assert_eq!(iso_week_of(date(2018, 12, 31)), WeekKey::new(2019, 1));
        assert_eq!(iso_week_of(date(2021, 1, 3)), WeekKey::new(2020, 53));
    }

    proptest! {
        #[test]
        fn every_date_sits_at_its_weekday_index(offset in 0i64..40_000) {
            let day = date(1950, 1, 1) + Duration::days(offset);
            let key = iso_week_of(day);
            let days = dates_of_week(key.year, key.week_number as i32)
                .expect("week of a real date should resolve")
                .collect::<Vec<_>>();
            prop_assert_eq!(days[weekday_of(day).num_days_from_monday() as usize], day);
        }
    }
}
