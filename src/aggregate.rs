use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use chrono::NaiveTime;

use crate::calendar::WeekKey;
use crate::domain::{Task, Week};

/// Elapsed minutes from `start` to `end`, fractional part kept.
pub fn minutes_between(start: NaiveTime, end: NaiveTime) -> f64 {
    (end - start).num_seconds() as f64 / 60.0
}

/// Sums the elapsed minutes of every pair that has both endpoints.
pub fn sum_minutes<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (Option<NaiveTime>, Option<NaiveTime>)>,
{
    pairs
        .into_iter()
        .filter_map(|pair| match pair {
            (Some(start), Some(end)) => Some(minutes_between(start, end)),
            _ => None,
        })
        .fold(0.0, |total, minutes| total + minutes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskTotal {
    pub name: String,
    pub minutes: f64,
}

/// Groups fully timed tasks by exact name, largest total first. Equal totals
/// are ordered by name.
pub fn group_by_task_name(tasks: &[Task]) -> Vec<TaskTotal> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for task in tasks {
        if let Some(minutes) = task.duration_minutes() {
            *totals.entry(task.name.as_str()).or_insert(0.0) += minutes;
        }
    }

    let mut rows = totals
        .into_iter()
        .map(|(name, minutes)| TaskTotal {
            name: name.to_string(),
            minutes,
        })
        .collect::<Vec<_>>();
    rows.sort_by(|left, right| {
        right
            .minutes
            .total_cmp(&left.minutes)
            .then_with(|| left.name.cmp(&right.name))
    });
    rows
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManDay {
    Fraction(f64),
    NotComputable,
}

impl Display for ManDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ManDay::Fraction(value) => write!(f, "{value:.2}"),
            ManDay::NotComputable => Ok(()),
        }
    }
}

pub fn man_day_fraction(minutes: f64, man_day_minutes: u32) -> ManDay {
    if man_day_minutes == 0 {
        return ManDay::NotComputable;
    }
    let fraction = minutes / f64::from(man_day_minutes);
    ManDay::Fraction((fraction * 100.0).round() / 100.0)
}

/// Sum of the targets of the weeks in `worked_weeks`. Weeks without any timed
/// task owe nothing.
pub fn total_time_to_work(weeks: &[Week], worked_weeks: &BTreeSet<WeekKey>) -> u64 {
    weeks
        .iter()
        .filter(|week| worked_weeks.contains(&week.key))
        .map(|week| u64::from(week.target_minutes))
        .sum()
}

/// Signed difference between time worked and time owed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatchUp {
    pub minutes: f64,
}

impl CatchUp {
    pub fn new(worked_minutes: f64, to_work_minutes: u64) -> Self {
        Self {
            minutes: worked_minutes - to_work_minutes as f64,
        }
    }

    pub fn is_behind(&self) -> bool {
        self.minutes < 0.0
    }
}

impl Display for CatchUp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.is_behind() { '-' } else { '+' };
        write!(f, "{sign}{}", format_minutes(self.minutes.abs()))
    }
}

/// Whole hours and remaining whole minutes, `None` for negative or
/// non-finite input.
pub fn minutes_to_hours_minutes(minutes: f64) -> Option<(u64, u64)> {
    if !minutes.is_finite() || minutes < 0.0 {
        return None;
    }
    let whole = minutes.trunc() as u64;
    Some((whole / 60, whole % 60))
}

pub fn format_minutes(minutes: f64) -> String {
    match minutes_to_hours_minutes(minutes) {
        Some((hours, minutes)) => format!("{hours:02}:{minutes:02}"),
        None => "--:--".to_string(),
    }
}

/// Share of the weekly target reached so far. A zero target counts as met.
pub fn week_progress(minutes_of_week: f64, target_minutes: u32) -> f64 {
    if target_minutes == 0 {
        return 1.0;
    }
    minutes_of_week / f64::from(target_minutes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub name: String,
    pub minutes: f64,
    pub man_day: ManDay,
}

pub fn summarize(tasks: &[Task], man_day_minutes: u32) -> Vec<SummaryRow> {
    group_by_task_name(tasks)
        .into_iter()
        .map(|total| SummaryRow {
            man_day: man_day_fraction(total.minutes, man_day_minutes),
            name: total.name,
            minutes: total.minutes,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
    }

    fn task(name: &str, start: Option<NaiveTime>, end: Option<NaiveTime>) -> Task {
        Task {
            id: name.to_string(),
            date: NaiveDate::from_ymd_opt(2018, 3, 5).expect("valid date"),
            name: name.to_string(),
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn sums_only_complete_pairs() {
        assert_eq!(sum_minutes(Vec::new()), 0.0);
        assert_eq!(
            sum_minutes(vec![(None, None), (Some(time(9, 0)), Some(time(10, 0)))]),
            60.0
        );
        assert_eq!(
            sum_minutes(vec![(Some(time(9, 0)), None), (None, Some(time(10, 0)))]),
            0.0
        );
    }

    #[test]
    fn keeps_fractional_minutes() {
        let start = NaiveTime::from_hms_opt(9, 0, 30).expect("valid time");
        assert_eq!(minutes_between(start, time(9, 2)), 1.5);
    }

    #[test]
    fn groups_by_name_largest_first() {
        let tasks = vec![
            task("review", Some(time(8, 0)), Some(time(8, 30))),
            task("coding", Some(time(9, 0)), Some(time(10, 0))),
            task("review", Some(time(10, 0)), Some(time(10, 45))),
            task("open", Some(time(11, 0)), None),
        ];
        let totals = group_by_task_name(&tasks);
        assert_eq!(
            totals,
            vec![
                TaskTotal {
                    name: "review".to_string(),
                    minutes: 75.0
                },
                TaskTotal {
                    name: "coding".to_string(),
                    minutes: 60.0
                },
            ]
        );
    }

    #[test]
    fn equal_totals_are_ordered_by_name() {
        let tasks = vec![
            task("zeta", Some(time(8, 0)), Some(time(9, 0))),
            task("alpha", Some(time(9, 0)), Some(time(10, 0))),
        ];
        let names = group_by_task_name(&tasks)
            .into_iter()
            .map(|total| total.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn man_day_fraction_rounds_to_two_decimals() {
        assert_eq!(man_day_fraction(105.0, 420), ManDay::Fraction(0.25));
        assert_eq!(man_day_fraction(140.0, 420), ManDay::Fraction(0.33));
        assert_eq!(man_day_fraction(105.0, 0), ManDay::NotComputable);
        assert_eq!(ManDay::NotComputable.to_string(), "");
        assert_eq!(ManDay::Fraction(0.5).to_string(), "0.50");
    }

    #[test]
    fn only_worked_weeks_are_owed() {
        let weeks = vec![
            Week {
                key: WeekKey::new(2018, 9),
                target_minutes: 2100,
            },
            Week {
                key: WeekKey::new(2018, 10),
                target_minutes: 1800,
            },
        ];
        let worked = BTreeSet::from([WeekKey::new(2018, 10)]);
        assert_eq!(total_time_to_work(&weeks, &worked), 1800);
        assert_eq!(total_time_to_work(&weeks, &BTreeSet::new()), 0);
    }

    #[test]
    fn catch_up_is_signed() {
        assert_eq!(CatchUp::new(1830.0, 1800).to_string(), "+00:30");
        assert_eq!(CatchUp::new(1700.0, 1800).to_string(), "-01:40");
        assert_eq!(CatchUp::new(0.0, 0).to_string(), "+00:00");
        assert!(CatchUp::new(10.0, 20).is_behind());
    }

    #[test]
    fn formats_hours_beyond_a_day() {
        assert_eq!(format_minutes(2100.0), "35:00");
        assert_eq!(format_minutes(59.9), "00:59");
        assert_eq!(format_minutes(-1.0), "--:--");
        assert_eq!(minutes_to_hours_minutes(f64::NAN), None);
    }

    #[test]
    fn progress_treats_zero_target_as_met() {
        assert_eq!(week_progress(1050.0, 2100), 0.5);
        assert_eq!(week_progress(0.0, 0), 1.0);
    }

    #[test]
    fn summary_rows_carry_man_day_share() {
        let tasks = vec![task("coding", Some(time(9, 0)), Some(time(10, 45)))];
        let rows = summarize(&tasks, 420);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].minutes, 105.0);
        assert_eq!(rows[0].man_day, ManDay::Fraction(0.25));
    }
}
