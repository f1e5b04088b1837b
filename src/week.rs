use chrono::{NaiveDate, Weekday};
use tracing::{debug, instrument};

use crate::aggregate::{self, CatchUp, SummaryRow, summarize, week_progress};
use crate::calendar::{CalendarError, WeekDates, WeekKey, dates_of_week, weekday_of};
use crate::day::DayModel;
use crate::settings::default_week_time;
use crate::store::{Store, TaskFilter, get_or_create_week};

/// One ISO week with its seven days guaranteed to exist in the store.
#[derive(Debug, Clone)]
pub struct WeekModel {
    key: WeekKey,
    dates: WeekDates,
    target_minutes: u32,
}

impl WeekModel {
    /// Opens `(year, week_number)`, creating the week and its days on first
    /// use. A new week inherits the target of the most recent week, or the
    /// default week time when there is none.
    #[instrument(skip(store))]
    pub fn open<S: Store + ?Sized>(
        store: &mut S,
        year: i32,
        week_number: i32,
    ) -> Result<Self, CalendarError> {
        let dates = dates_of_week(year, week_number)?;
        let key = WeekKey::new(year, week_number.unsigned_abs());

        let seed = store
            .latest_week_target()
            .unwrap_or_else(|| default_week_time(&*store));
        let week = get_or_create_week(store, key, seed);

        for date in dates.clone() {
            DayModel::open(store, date, key);
        }
        debug!(%key, target = week.target_minutes, "week opened");

        Ok(Self {
            key,
            dates,
            target_minutes: week.target_minutes,
        })
    }

    pub fn key(&self) -> WeekKey {
        self.key
    }

    pub fn dates(&self) -> WeekDates {
        self.dates.clone()
    }

    pub fn day<S: Store + ?Sized>(&self, store: &mut S, weekday: Weekday) -> DayModel {
        DayModel::open(store, self.dates.date_of(weekday), self.key)
    }

    pub fn target_minutes(&self) -> u32 {
        self.target_minutes
    }

    pub fn set_target_minutes<S: Store + ?Sized>(&mut self, store: &mut S, minutes: u32) -> bool {
        let changed = store.set_week_target(self.key, minutes);
        if changed {
            self.target_minutes = minutes;
        }
        changed
    }

    pub fn minutes_of_week<S: Store + ?Sized>(&self, store: &S) -> f64 {
        store
            .sum_duration_minutes(TaskFilter::Week(self.key))
            .unwrap_or(0.0)
    }

    /// Targets summed over every week that has at least one timed task.
    pub fn total_time_to_work<S: Store + ?Sized>(&self, store: &S) -> u64 {
        aggregate::total_time_to_work(&store.weeks(), &store.weeks_with_timed_tasks())
    }

    pub fn total_time_worked<S: Store + ?Sized>(&self, store: &S) -> f64 {
        store.sum_duration_minutes(TaskFilter::All).unwrap_or(0.0)
    }

    pub fn total_annual_worked_minutes<S: Store + ?Sized>(&self, store: &S, year: i32) -> f64 {
        store.sum_duration_minutes(TaskFilter::Year(year)).unwrap_or(0.0)
    }

    pub fn catch_up<S: Store + ?Sized>(&self, store: &S) -> CatchUp {
        CatchUp::new(self.total_time_worked(store), self.total_time_to_work(store))
    }

    pub fn week_summary<S: Store + ?Sized>(&self, store: &S, man_day_minutes: u32) -> Vec<SummaryRow> {
        summarize(&store.tasks_matching(TaskFilter::Week(self.key)), man_day_minutes)
    }

    pub fn daily_summary<S: Store + ?Sized>(
        &self,
        store: &S,
        date: NaiveDate,
        man_day_minutes: u32,
    ) -> Vec<SummaryRow> {
        summarize(&store.tasks_matching(TaskFilter::Day(date)), man_day_minutes)
    }

    /// Today's weekday when today falls in this week, Monday otherwise.
    pub fn default_weekday(&self, today: NaiveDate) -> Weekday {
        if self.dates.contains(today) {
            weekday_of(today)
        } else {
            Weekday::Mon
        }
    }

    pub fn progress<S: Store + ?Sized>(&self, store: &S) -> f64 {
        week_progress(self.minutes_of_week(store), self.target_minutes)
    }
}
