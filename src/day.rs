use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info};

use crate::calendar::WeekKey;
use crate::domain::{Task, TaskUpdate, truncate_to_minute};
use crate::interval::{Rejection, SiblingInterval, TimeField, check_edit, is_admissible};
use crate::store::{Store, TaskFilter, get_or_create_day};

/// The tasks of one day as an editable table: one row per stored task plus a
/// trailing empty row where new tasks are entered.
#[derive(Debug, Clone)]
pub struct DayModel {
    date: NaiveDate,
    rows: Vec<Task>,
}

impl DayModel {
    pub fn open<S: Store + ?Sized>(store: &mut S, date: NaiveDate, week: WeekKey) -> Self {
        let day = get_or_create_day(store, date, week);
        let mut model = Self {
            date: day.date,
            rows: Vec::new(),
        };
        model.refresh(&*store);
        model
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn rows(&self) -> &[Task] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> Option<&Task> {
        self.rows.get(row)
    }

    /// Stored tasks plus the entry row.
    pub fn row_count(&self) -> usize {
        self.rows.len() + 1
    }

    /// Index of the entry row.
    pub fn last_task_row(&self) -> usize {
        self.row_count() - 1
    }

    /// A row counts as complete when both times are set and ordered.
    pub fn row_is_complete(&self, row: usize) -> bool {
        self.rows.get(row).is_some_and(|task| match (task.start_time, task.end_time) {
            (Some(start), Some(end)) => start < end,
            _ => false,
        })
    }

    pub fn minutes_of_day<S: Store + ?Sized>(&self, store: &S) -> f64 {
        store
            .sum_duration_minutes(TaskFilter::Day(self.date))
            .unwrap_or(0.0)
    }

    /// Renames the task at `row`, or creates one when `row` is the entry row.
    /// An empty name deletes an existing task and is refused on the entry row.
    pub fn set_name<S: Store + ?Sized>(&mut self, store: &mut S, row: usize, name: &str) -> bool {
        let name = name.trim();
        let changed = match self.rows.get(row) {
            Some(task) if name.is_empty() => {
                info!(date = %self.date, task = %task.id, "deleting task");
                store.delete_task(&task.id)
            }
            Some(task) => store.update_task(&task.id, TaskUpdate::Name(name.to_string())),
            None if row == self.last_task_row() && !name.is_empty() => {
                store.create_task(self.date, name).is_some()
            }
            None => false,
        };

        if changed {
            self.refresh(&*store);
        }
        changed
    }

    /// Why a time edit would be refused, if it would be.
    pub fn time_rejection(&self, row: usize, field: TimeField, time: NaiveTime) -> Option<Rejection> {
        let task = self.rows.get(row)?;
        let time = truncate_to_minute(time);
        let siblings = self.rows.iter().map(SiblingInterval::from).collect::<Vec<_>>();
        check_edit(&siblings, &task.id, field, time).err()
    }

    /// Sets the start or end of the task at `row` when the interval check
    /// admits it. The time is checked as it will be stored, to the minute.
    pub fn set_time<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        row: usize,
        field: TimeField,
        time: NaiveTime,
    ) -> bool {
        let Some(task) = self.rows.get(row) else {
            return false;
        };
        let time = truncate_to_minute(time);
        let siblings = self.rows.iter().map(SiblingInterval::from).collect::<Vec<_>>();
        if !is_admissible(&siblings, &task.id, field, time) {
            debug!(date = %self.date, row, %time, "time edit refused");
            return false;
        }

        let update = match field {
            TimeField::Start => TaskUpdate::Start(time),
            TimeField::End => TaskUpdate::End(time),
        };
        let changed = store.update_task(&task.id, update);
        if changed {
            self.refresh(&*store);
        }
        changed
    }

    fn refresh<S: Store + ?Sized>(&mut self, store: &S) {
        self.rows = store.list_tasks_for_day(self.date);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::DayModel;
    use crate::calendar::WeekKey;
    use crate::domain::Journal;
    use crate::interval::{Rejection, TimeField};
    use crate::logging::TEST_LOGGING;
    use crate::store::Store;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
    }

    fn monday() -> (Journal, DayModel) {
        *TEST_LOGGING;
        let mut journal = Journal::new();
        let date = NaiveDate::from_ymd_opt(2018, 3, 5).expect("valid date");
        let day = DayModel::open(&mut journal, date, WeekKey::new(2018, 10));
        (journal, day)
    }

    #[test]
    fn empty_day_has_only_the_entry_row() {
        let (journal, day) = monday();
        assert_eq!(day.row_count(), 1);
        assert_eq!(day.last_task_row(), 0);
        assert_eq!(day.minutes_of_day(&journal), 0.0);
        assert!(journal.find_day(day.date()).is_some());
    }

    #[test]
    fn entry_row_creates_tasks() {
        let (mut journal, mut day) = monday();
        assert!(!day.set_name(&mut journal, 0, "   "));
        assert!(day.set_name(&mut journal, 0, " coding "));
        assert_eq!(day.row_count(), 2);
        assert_eq!(day.rows()[0].name, "coding");
        assert!(!day.set_name(&mut journal, 5, "out of range"));
    }

    #[test]
    fn empty_name_deletes_the_row() {
        let (mut journal, mut day) = monday();
        day.set_name(&mut journal, 0, "coding");
        day.set_name(&mut journal, 1, "review");
        assert!(day.set_name(&mut journal, 0, ""));
        assert_eq!(day.row_count(), 2);
        assert_eq!(day.rows()[0].name, "review");
        assert_eq!(journal.tasks.len(), 1);
    }

    #[test]
    fn time_edits_reorder_rows_and_sum() {
        let (mut journal, mut day) = monday();
        day.set_name(&mut journal, 0, "afternoon");
        day.set_name(&mut journal, 1, "morning");
        assert!(day.set_time(&mut journal, 0, TimeField::Start, time(14, 0)));
        assert!(day.set_time(&mut journal, 0, TimeField::End, time(15, 30)));
        assert!(day.set_time(&mut journal, 1, TimeField::Start, time(9, 0)));

        assert_eq!(day.rows()[0].name, "morning");
        assert!(day.set_time(&mut journal, 0, TimeField::End, time(9, 45)));
        assert!(day.row_is_complete(0));
        assert!(day.row_is_complete(1));
        assert!(!day.row_is_complete(2));
        assert_eq!(day.minutes_of_day(&journal), 135.0);
    }

    #[test]
    fn overlapping_times_leave_the_cache_untouched() {
        let (mut journal, mut day) = monday();
        day.set_name(&mut journal, 0, "meeting");
        day.set_time(&mut journal, 0, TimeField::Start, time(9, 0));
        day.set_time(&mut journal, 0, TimeField::End, time(10, 0));
        day.set_name(&mut journal, 1, "coding");

        let before = day.rows().to_vec();
        assert_eq!(
            day.time_rejection(1, TimeField::Start, time(9, 30)),
            Some(Rejection::InsideSibling {
                task_id: before[0].id.clone()
            })
        );
        assert!(!day.set_time(&mut journal, 1, TimeField::Start, time(9, 30)));
        assert!(!day.set_time(&mut journal, 0, TimeField::End, time(8, 0)));
        assert_eq!(day.rows(), before.as_slice());
        assert!(!day.set_time(&mut journal, 2, TimeField::Start, time(11, 0)));
    }

    #[test]
    fn sub_minute_end_cannot_collapse_the_range() {
        let (mut journal, mut day) = monday();
        day.set_name(&mut journal, 0, "standup");
        assert!(day.set_time(&mut journal, 0, TimeField::Start, time(9, 0)));

        let half_past = NaiveTime::from_hms_opt(9, 0, 30).expect("valid time");
        assert_eq!(
            day.time_rejection(0, TimeField::End, half_past),
            Some(Rejection::NotOrdered)
        );
        assert!(!day.set_time(&mut journal, 0, TimeField::End, half_past));
        assert_eq!(day.rows()[0].end_time, None);

        let later = NaiveTime::from_hms_opt(9, 15, 45).expect("valid time");
        assert!(day.set_time(&mut journal, 0, TimeField::End, later));
        assert_eq!(day.rows()[0].end_time, Some(time(9, 15)));
        assert!(day.row_is_complete(0));
    }

    #[test]
    fn reopening_keeps_a_single_day() {
        let (mut journal, day) = monday();
        let again = DayModel::open(&mut journal, day.date(), WeekKey::new(2018, 10));
        assert_eq!(journal.header.days.len(), 1);
        assert_eq!(again.row_count(), 1);
    }
}
