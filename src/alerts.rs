use chrono::{DateTime, Utc};

use crate::models::Task;

pub const OVERDUE_TITLE: &str = "Task overdue!";
pub const UPCOMING_TITLE: &str = "Task due soon!";
pub const COMPLETED_TITLE: &str = "Task completed!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
}

impl Alert {
    pub fn overdue(task: &Task) -> Self {
        Self {
            title: OVERDUE_TITLE.to_string(),
            body: format!("Task \"{}\" is overdue, please handle it.", task.title),
        }
    }

    pub fn upcoming(task: &Task, minutes_left: i64) -> Self {
        Self {
            title: UPCOMING_TITLE.to_string(),
            body: format!("Task \"{}\" is due in {} minutes.", task.title, minutes_left),
        }
    }

    pub fn completed(task: &Task) -> Self {
        Self {
            title: COMPLETED_TITLE.to_string(),
            body: format!("Congratulations! You completed \"{}\".", task.title),
        }
    }
}

/// Whole minutes until `task` is due, rounded toward negative infinity.
/// Negative once the due date has passed; 0 when there is no due date.
pub fn minutes_until_due(task: &Task, now: DateTime<Utc>) -> i64 {
    task.due_date
        .map_or(0, |due| (due - now).num_milliseconds().div_euclid(60_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, m, s).unwrap()
    }

    #[test]
    fn templates_match_expected_text() {
        let task = Task::new(1, "Pay rent", None);
        assert_eq!(
            Alert::overdue(&task),
            Alert {
                title: "Task overdue!".into(),
                body: "Task \"Pay rent\" is overdue, please handle it.".into(),
            }
        );
        assert_eq!(
            Alert::upcoming(&task, 10).body,
            "Task \"Pay rent\" is due in 10 minutes."
        );
        assert_eq!(Alert::upcoming(&task, 10).title, "Task due soon!");
        assert_eq!(
            Alert::completed(&task),
            Alert {
                title: "Task completed!".into(),
                body: "Congratulations! You completed \"Pay rent\".".into(),
            }
        );
    }

    #[test]
    fn minutes_are_floored() {
        let now = at(9, 0, 0);
        let task = Task::new(2, "Standup", Some(now + Duration::minutes(10)));
        assert_eq!(minutes_until_due(&task, now), 10);

        let task = Task::new(2, "Standup", Some(at(9, 10, 0)));
        assert_eq!(minutes_until_due(&task, at(9, 0, 1)), 9);
    }

    #[test]
    fn past_due_gives_negative_minutes() {
        let task = Task::new(3, "Late", Some(at(9, 0, 0)));
        assert_eq!(minutes_until_due(&task, at(9, 0, 30)), -1);
        assert_eq!(minutes_until_due(&task, at(9, 5, 0)), -5);
    }

    #[test]
    fn missing_due_date_gives_zero() {
        let task = Task::new(4, "Someday", None);
        assert_eq!(minutes_until_due(&task, at(9, 0, 0)), 0);
    }
}
