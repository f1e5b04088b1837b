use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::aggregate::sum_minutes;
use crate::calendar::WeekKey;
use crate::domain::{Day, Task, TaskUpdate, Week};

/// How far back the task name suggestions look.
pub const RECENT_TASK_NAMES_DAYS: u64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    Day(NaiveDate),
    Week(WeekKey),
    /// Tasks whose owning week belongs to this ISO year.
    Year(i32),
}

/// Persistence collaborator used by the week and day models. Every call is a
/// synchronous round trip; constraint failures surface as `false`/`None`.
pub trait Store {
    fn find_week(&self, key: WeekKey) -> Option<Week>;

    fn create_week(&mut self, key: WeekKey, target_minutes: u32) -> Week;

    /// Target of the most recent week, ordered by year then week number.
    fn latest_week_target(&self) -> Option<u32>;

    fn set_week_target(&mut self, key: WeekKey, target_minutes: u32) -> bool;

    fn weeks(&self) -> Vec<Week>;

    /// Weeks owning at least one task with both a start and an end time.
    fn weeks_with_timed_tasks(&self) -> BTreeSet<WeekKey>;

    fn find_day(&self, date: NaiveDate) -> Option<Day>;

    fn create_day(&mut self, date: NaiveDate, week: WeekKey) -> Day;

    /// Tasks of a day ordered by start time, tasks without one last.
    fn list_tasks_for_day(&self, date: NaiveDate) -> Vec<Task>;

    fn create_task(&mut self, date: NaiveDate, name: &str) -> Option<String>;

    fn update_task(&mut self, id: &str, update: TaskUpdate) -> bool;

    fn delete_task(&mut self, id: &str) -> bool;

    fn tasks_matching(&self, filter: TaskFilter) -> Vec<Task>;

    /// Distinct task names used on days strictly after `date`, sorted.
    fn task_names_since(&self, date: NaiveDate) -> Vec<String>;

    fn get_setting(&self, name: &str) -> Option<String>;

    fn set_setting(&mut self, name: &str, value: String);

    /// Sum of elapsed minutes of fully timed matching tasks, `None` when
    /// there is none.
    fn sum_duration_minutes(&self, filter: TaskFilter) -> Option<f64> {
        let timed = self
            .tasks_matching(filter)
            .into_iter()
            .filter(Task::is_timed)
            .collect::<Vec<_>>();
        if timed.is_empty() {
            return None;
        }
        Some(sum_minutes(
            timed.iter().map(|task| (task.start_time, task.end_time)),
        ))
    }
}

pub fn get_or_create_week<S: Store + ?Sized>(
    store: &mut S,
    key: WeekKey,
    default_target_minutes: u32,
) -> Week {
    if let Some(week) = store.find_week(key) {
        return week;
    }
    debug!(%key, default_target_minutes, "creating week");
    store.create_week(key, default_target_minutes)
}

pub fn get_or_create_day<S: Store + ?Sized>(store: &mut S, date: NaiveDate, week: WeekKey) -> Day {
    if let Some(day) = store.find_day(date) {
        return day;
    }
    debug!(%date, %week, "creating day");
    store.create_day(date, week)
}

/// Task names used during the last [`RECENT_TASK_NAMES_DAYS`] days.
pub fn recent_task_names<S: Store + ?Sized>(store: &S, today: NaiveDate) -> Vec<String> {
    let since = today
        .checked_sub_days(Days::new(RECENT_TASK_NAMES_DAYS))
        .unwrap_or(NaiveDate::MIN);
    store.task_names_since(since)
}
