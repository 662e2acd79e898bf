use crate::entities::progress;
use crate::models::habit::Habit;

/// Summary of a progress record's parent habit, attached to query results.
#[derive(Clone, Debug)]
pub struct HabitSummary {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub color: String,
    pub target_value: i32,
    pub unit: Option<String>,
}

impl From<&Habit> for HabitSummary {
    fn from(habit: &Habit) -> Self {
        Self {
            id: habit.id,
            name: habit.name.clone(),
            category: habit.category.clone(),
            color: habit.color.clone(),
            target_value: habit.target_value,
            unit: habit.unit.clone(),
        }
    }
}

/// One logged measurement of a habit for a single calendar date,
/// annotated with its parent habit summary.
#[derive(Clone, Debug)]
pub struct ProgressEntry {
    pub id: i32,
    pub habit: HabitSummary,
    pub date: String,
    pub value: f64,
    pub notes: Option<String>,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProgressEntry {
    pub fn from_parts(model: progress::Model, habit: HabitSummary) -> Self {
        Self {
            id: model.id,
            habit,
            date: model.date,
            value: model.value,
            notes: model.notes,
            completed: model.completed,
            completed_at: model.completed_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Today's calendar date in UTC as `YYYY-MM-DD`. Every future-date check
/// and stats window uses this one convention so a client near midnight
/// cannot see a same-day write rejected as future-dated.
#[must_use]
pub fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Zero-padded ISO dates order lexically, so a plain string compare
/// against `today()` is a chronological compare.
#[must_use]
pub fn is_future_date(date: &str) -> bool {
    date > today().as_str()
}

/// The completion rule applied on every rule-based write:
/// completed iff the logged value reaches the habit's target.
#[must_use]
pub fn derive_completion(value: f64, target_value: i32) -> (bool, Option<String>) {
    let completed = value >= f64::from(target_value);
    let completed_at = completed.then(|| chrono::Utc::now().to_rfc3339());
    (completed, completed_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_completion_at_target() {
        let (completed, completed_at) = derive_completion(8.0, 8);
        assert!(completed);
        assert!(completed_at.is_some());
    }

    #[test]
    fn test_derive_completion_below_target() {
        let (completed, completed_at) = derive_completion(3.0, 8);
        assert!(!completed);
        assert!(completed_at.is_none());
    }

    #[test]
    fn test_derive_completion_above_target() {
        let (completed, _) = derive_completion(12.5, 8);
        assert!(completed);
    }

    #[test]
    fn test_today_is_not_future() {
        assert!(!is_future_date(&today()));
    }

    #[test]
    fn test_tomorrow_is_future() {
        let tomorrow = (chrono::Utc::now().date_naive() + chrono::Duration::days(1))
            .format("%Y-%m-%d")
            .to_string();
        assert!(is_future_date(&tomorrow));
    }

    #[test]
    fn test_past_date_is_not_future() {
        assert!(!is_future_date("2020-01-01"));
    }
}
