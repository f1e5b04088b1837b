use std::fmt::{Display, Formatter};

use chrono::NaiveTime;
use tracing::debug;

use crate::domain::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Start,
    End,
}

/// The stored times of one task of a day, as seen by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiblingInterval<'a> {
    pub task_id: &'a str,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl<'a> From<&'a Task> for SiblingInterval<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            task_id: &task.id,
            start: task.start_time,
            end: task.end_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The edit would leave the task with `start >= end`.
    NotOrdered,
    /// The new value falls strictly inside another task.
    InsideSibling { task_id: String },
    /// Another task starts or ends strictly inside the resulting interval.
    CoversSibling { task_id: String },
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::NotOrdered => write!(f, "start must be before end"),
            Rejection::InsideSibling { task_id } => write!(f, "time falls inside task {task_id}"),
            Rejection::CoversSibling { task_id } => write!(f, "range overlaps task {task_id}"),
        }
    }
}

/// Checks a proposed start or end time for `task_id` against every other
/// task of the same day. Touching boundaries are allowed; only strict
/// interior overlap is rejected. Tasks missing either time never conflict.
pub fn check_edit(
    siblings: &[SiblingInterval<'_>],
    task_id: &str,
    field: TimeField,
    candidate: NaiveTime,
) -> Result<(), Rejection> {
    let current = siblings.iter().find(|sibling| sibling.task_id == task_id);
    let (start, end) = match field {
        TimeField::Start => (Some(candidate), current.and_then(|sibling| sibling.end)),
        TimeField::End => (current.and_then(|sibling| sibling.start), Some(candidate)),
    };

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            debug!(task_id, %start, %end, "rejected unordered range");
            return Err(Rejection::NotOrdered);
        }
    }

    for sibling in siblings.iter().filter(|sibling| sibling.task_id != task_id) {
        let (Some(sibling_start), Some(sibling_end)) = (sibling.start, sibling.end) else {
            continue;
        };

        if sibling_start < candidate && candidate < sibling_end {
            debug!(task_id, sibling = sibling.task_id, %candidate, "rejected time inside sibling");
            return Err(Rejection::InsideSibling {
                task_id: sibling.task_id.to_string(),
            });
        }

        if let (Some(start), Some(end)) = (start, end) {
            let covers_start = start < sibling_start && sibling_start < end;
            let covers_end = start < sibling_end && sibling_end < end;
            if covers_start || covers_end {
                debug!(task_id, sibling = sibling.task_id, "rejected range covering sibling");
                return Err(Rejection::CoversSibling {
                    task_id: sibling.task_id.to_string(),
                });
            }
        }
    }

    Ok(())
}

pub fn is_admissible(
    siblings: &[SiblingInterval<'_>],
    task_id: &str,
    field: TimeField,
    candidate: NaiveTime,
) -> bool {
    check_edit(siblings, task_id, field, candidate).is_ok()
}
