use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::minutes_between;
use crate::calendar::{WeekKey, iso_week_of};
use crate::store::{Store, TaskFilter};

const ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub key: WeekKey,
    pub target_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub date: NaiveDate,
    pub week: WeekKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
}

impl Task {
    pub fn is_timed(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_some()
    }

    pub fn duration_minutes(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(minutes_between(start, end)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskUpdate {
    Name(String),
    Start(NaiveTime),
    End(NaiveTime),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalHeader {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub weeks: Vec<Week>,
    #[serde(default)]
    pub days: Vec<Day>,
}

impl JournalHeader {
    pub fn new() -> Self {
        Self {
            schema_version: 1,
            created_at: Utc::now(),
            settings: BTreeMap::new(),
            weeks: Vec::new(),
            days: Vec::new(),
        }
    }
}

/// Weeks, days, tasks and settings of one user, held in memory and written
/// back to disk by [`crate::storage`].
#[derive(Debug, Clone)]
pub struct Journal {
    pub header: JournalHeader,
    pub tasks: Vec<Task>,
}

impl Journal {
    pub fn new() -> Self {
        Self {
            header: JournalHeader::new(),
            tasks: Vec::new(),
        }
    }

    fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    fn week_of_date(&self, date: NaiveDate) -> WeekKey {
        self.header
            .days
            .iter()
            .find(|day| day.date == date)
            .map(|day| day.week)
            .unwrap_or_else(|| iso_week_of(date))
    }

    fn matches(&self, task: &Task, filter: TaskFilter) -> bool {
        match filter {
            TaskFilter::All => true,
            TaskFilter::Day(date) => task.date == date,
            TaskFilter::Week(key) => self.week_of_date(task.date) == key,
            TaskFilter::Year(year) => self.week_of_date(task.date).year == year,
        }
    }
}

impl Store for Journal {
    fn find_week(&self, key: WeekKey) -> Option<Week> {
        self.header.weeks.iter().find(|week| week.key == key).cloned()
    }

    fn create_week(&mut self, key: WeekKey, target_minutes: u32) -> Week {
        if let Some(existing) = self.find_week(key) {
            return existing;
        }
        let week = Week {
            key,
            target_minutes,
        };
        self.header.weeks.push(week.clone());
        self.header.weeks.sort_by_key(|week| week.key);
        week
    }

    fn latest_week_target(&self) -> Option<u32> {
        self.header
            .weeks
            .iter()
            .max_by_key(|week| week.key)
            .map(|week| week.target_minutes)
    }

    fn set_week_target(&mut self, key: WeekKey, target_minutes: u32) -> bool {
        match self.header.weeks.iter_mut().find(|week| week.key == key) {
            Some(week) => {
                week.target_minutes = target_minutes;
                true
            }
            None => false,
        }
    }

    fn weeks(&self) -> Vec<Week> {
        self.header.weeks.clone()
    }

    fn weeks_with_timed_tasks(&self) -> BTreeSet<WeekKey> {
        self.tasks
            .iter()
            .filter(|task| task.is_timed())
            .map(|task| self.week_of_date(task.date))
            .collect()
    }

    fn find_day(&self, date: NaiveDate) -> Option<Day> {
        self.header.days.iter().find(|day| day.date == date).cloned()
    }

    fn create_day(&mut self, date: NaiveDate, week: WeekKey) -> Day {
        if let Some(existing) = self.find_day(date) {
            return existing;
        }
        if iso_week_of(date) != week {
            warn!(%date, %week, "day attached to a week it does not belong to");
        }
        let day = Day { date, week };
        self.header.days.push(day.clone());
        self.header.days.sort_by_key(|day| day.date);
        day
    }

    fn list_tasks_for_day(&self, date: NaiveDate) -> Vec<Task> {
        let mut tasks = self
            .tasks
            .iter()
            .filter(|task| task.date == date)
            .cloned()
            .collect::<Vec<_>>();
        tasks.sort_by_key(|task| (task.start_time.is_none(), task.start_time));
        tasks
    }

    fn create_task(&mut self, date: NaiveDate, name: &str) -> Option<String> {
        if name.trim().is_empty() {
            debug!(%date, "refused task without a name");
            return None;
        }
        self.find_day(date)?;

        let id = generate_id();
        self.tasks.push(Task {
            id: id.clone(),
            date,
            name: name.to_string(),
            start_time: None,
            end_time: None,
        });
        Some(id)
    }

    fn update_task(&mut self, id: &str, update: TaskUpdate) -> bool {
        let Some(task) = self.task_mut(id) else {
            return false;
        };

        match update {
            TaskUpdate::Name(name) => {
                if name.trim().is_empty() {
                    return false;
                }
                task.name = name;
            }
            TaskUpdate::Start(time) => task.start_time = Some(truncate_to_minute(time)),
            TaskUpdate::End(time) => task.end_time = Some(truncate_to_minute(time)),
        }
        true
    }

    fn delete_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    fn tasks_matching(&self, filter: TaskFilter) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| self.matches(task, filter))
            .cloned()
            .collect()
    }

    fn task_names_since(&self, date: NaiveDate) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|task| task.date > date)
            .map(|task| task.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn get_setting(&self, name: &str) -> Option<String> {
        self.header.settings.get(name).cloned()
    }

    fn set_setting(&mut self, name: &str, value: String) {
        self.header.settings.insert(name.to_string(), value);
    }
}

/// Stored task times carry no seconds.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|time| time.with_nanosecond(0))
        .unwrap_or(time)
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{Journal, TaskUpdate};
    use crate::calendar::WeekKey;
    use crate::store::{Store, TaskFilter, get_or_create_day, get_or_create_week, recent_task_names};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
    }

    fn journal_with_day(day: NaiveDate, week: WeekKey) -> Journal {
        let mut journal = Journal::new();
        get_or_create_week(&mut journal, week, 2100);
        get_or_create_day(&mut journal, day, week);
        journal
    }

    #[test]
    fn get_or_create_does_not_duplicate() {
        let mut journal = Journal::new();
        let key = WeekKey::new(2018, 10);
        let first = get_or_create_week(&mut journal, key, 600);
        let second = get_or_create_week(&mut journal, key, 1200);
        assert_eq!(first, second);
        assert_eq!(journal.header.weeks.len(), 1);
        assert_eq!(second.target_minutes, 600);

        let monday = date(2018, 3, 5);
        let day = get_or_create_day(&mut journal, monday, key);
        assert_eq!(get_or_create_day(&mut journal, monday, key), day);
        assert_eq!(journal.header.days.len(), 1);
    }

    #[test]
    fn lists_untimed_tasks_last() {
        let monday = date(2018, 3, 5);
        let mut journal = journal_with_day(monday, WeekKey::new(2018, 10));
        let open = journal.create_task(monday, "reminder").expect("task");
        let late = journal.create_task(monday, "late").expect("task");
        let early = journal.create_task(monday, "early").expect("task");
        assert!(journal.update_task(&late, TaskUpdate::Start(time(14, 0))));
        assert!(journal.update_task(&early, TaskUpdate::Start(time(8, 0))));

        let ids = journal
            .list_tasks_for_day(monday)
            .into_iter()
            .map(|task| task.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![early, late, open]);
    }

    #[test]
    fn refuses_constraint_violations() {
        let monday = date(2018, 3, 5);
        let mut journal = journal_with_day(monday, WeekKey::new(2018, 10));
        assert!(journal.create_task(monday, "").is_none());
        assert!(journal.create_task(date(2018, 3, 12), "unknown day").is_none());

        let id = journal.create_task(monday, "write").expect("task");
        assert!(!journal.update_task(&id, TaskUpdate::Name("  ".to_string())));
        assert!(!journal.update_task("missing", TaskUpdate::Start(time(9, 0))));
        assert!(journal.delete_task(&id));
        assert!(!journal.delete_task(&id));
    }

    #[test]
    fn stores_times_at_minute_precision() {
        let monday = date(2018, 3, 5);
        let mut journal = journal_with_day(monday, WeekKey::new(2018, 10));
        let id = journal.create_task(monday, "write").expect("task");
        let precise = NaiveTime::from_hms_opt(9, 15, 42).expect("valid time");
        assert!(journal.update_task(&id, TaskUpdate::Start(precise)));
        assert_eq!(
            journal
                .tasks
                .iter()
                .find(|task| task.id == id)
                .and_then(|task| task.start_time),
            Some(time(9, 15))
        );
    }

    #[test]
    fn sums_only_timed_tasks_and_reports_none_when_empty() {
        let monday = date(2018, 3, 5);
        let mut journal = journal_with_day(monday, WeekKey::new(2018, 10));
        assert_eq!(journal.sum_duration_minutes(TaskFilter::Day(monday)), None);

        journal.create_task(monday, "open").expect("task");
        assert_eq!(journal.sum_duration_minutes(TaskFilter::Day(monday)), None);

        let id = journal.create_task(monday, "timed").expect("task");
        journal.update_task(&id, TaskUpdate::Start(time(9, 0)));
        journal.update_task(&id, TaskUpdate::End(time(10, 30)));
        assert_eq!(
            journal.sum_duration_minutes(TaskFilter::Day(monday)),
            Some(90.0)
        );
    }

    #[test]
    fn year_filter_follows_the_owning_iso_week() {
        let boundary = date(2018, 12, 31);
        let week = WeekKey::new(2019, 1);
        let mut journal = journal_with_day(boundary, week);
        let id = journal.create_task(boundary, "new year").expect("task");
        journal.update_task(&id, TaskUpdate::Start(time(9, 0)));
        journal.update_task(&id, TaskUpdate::End(time(10, 0)));

        assert_eq!(journal.sum_duration_minutes(TaskFilter::Year(2019)), Some(60.0));
        assert_eq!(journal.sum_duration_minutes(TaskFilter::Year(2018)), None);
        assert!(journal.weeks_with_timed_tasks().contains(&week));
    }

    #[test]
    fn recent_names_cover_the_last_ninety_days() {
        let today = date(2018, 6, 1);
        let old = date(2018, 1, 15);
        let mut journal = journal_with_day(old, WeekKey::new(2018, 3));
        get_or_create_day(&mut journal, today, WeekKey::new(2018, 22));
        journal.create_task(old, "archived").expect("task");
        journal.create_task(today, "review").expect("task");
        journal.create_task(today, "coding").expect("task");
        journal.create_task(today, "review").expect("task");

        assert_eq!(
            recent_task_names(&journal, today),
            vec!["coding".to_string(), "review".to_string()]
        );
    }

    #[test]
    fn latest_target_comes_from_the_newest_week() {
        let mut journal = Journal::new();
        assert_eq!(journal.latest_week_target(), None);
        get_or_create_week(&mut journal, WeekKey::new(2019, 2), 1800);
        get_or_create_week(&mut journal, WeekKey::new(2018, 52), 2400);
        assert_eq!(journal.latest_week_target(), Some(1800));
        assert!(journal.set_week_target(WeekKey::new(2019, 2), 900));
        assert_eq!(journal.latest_week_target(), Some(900));
        assert!(!journal.set_week_target(WeekKey::new(2020, 1), 900));
    }
}
