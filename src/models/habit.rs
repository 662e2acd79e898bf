use serde::{Deserialize, Serialize};

use crate::entities::habits;

/// Categories a habit may belong to. `general` is the default.
pub const CATEGORIES: &[&str] = &[
    "general",
    "health",
    "fitness",
    "productivity",
    "learning",
    "mindfulness",
    "social",
    "finance",
    "creativity",
    "other",
];

/// Logging cadences for a habit and its reminder.
pub const FREQUENCIES: &[&str] = &["daily", "weekly", "monthly"];

pub const DEFAULT_COLOR: &str = "#2196f3";

/// Reminder sub-record, persisted as a JSON column on the habit row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reminder {
    pub enabled: bool,
    pub start_time: String,
    pub end_time: String,
    pub frequency: String,
    pub message: String,
}

impl Default for Reminder {
    fn default() -> Self {
        Self {
            enabled: false,
            start_time: "09:00".to_string(),
            end_time: "21:00".to_string(),
            frequency: "daily".to_string(),
            message: String::new(),
        }
    }
}

/// Domain habit, mapped from the `habits` entity with the reminder decoded.
#[derive(Clone, Debug)]
pub struct Habit {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub frequency: String,
    pub target_value: i32,
    pub unit: Option<String>,
    pub color: String,
    pub reminder: Reminder,
    pub is_active: bool,
    pub start_date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<habits::Model> for Habit {
    fn from(model: habits::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            description: model.description,
            category: model.category,
            frequency: model.frequency,
            target_value: model.target_value,
            unit: model.unit,
            color: model.color,
            reminder: serde_json::from_str(&model.reminder).unwrap_or_default(),
            is_active: model.is_active,
            start_date: model.start_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Validated input for creating a habit.
#[derive(Clone, Debug)]
pub struct HabitDraft {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub frequency: String,
    pub target_value: i32,
    pub unit: Option<String>,
    pub color: String,
    pub reminder: Reminder,
}

/// Partial update: `None` fields leave the stored value unchanged.
#[derive(Clone, Debug, Default)]
pub struct HabitPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub frequency: Option<String>,
    pub target_value: Option<i32>,
    pub unit: Option<String>,
    pub color: Option<String>,
    pub reminder: Option<Reminder>,
    pub is_active: Option<bool>,
}

/// Per-user habit counts for the stats overview.
#[derive(Clone, Debug)]
pub struct HabitStats {
    pub total: u64,
    pub active: u64,
    pub by_category: Vec<(String, i64)>,
}
