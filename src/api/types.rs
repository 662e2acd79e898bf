use serde::Serialize;

use super::error::FieldError;
use crate::db::User;
use crate::models::habit::{Habit, HabitStats, Reminder};
use crate::models::progress::{HabitSummary, ProgressEntry};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            errors: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            errors: None,
        }
    }

    pub fn validation_failure(errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some("Validation failed".to_string()),
            errors: Some(errors),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserDto,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitDto {
    pub id: i32,
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

impl From<Habit> for HabitDto {
    fn from(habit: Habit) -> Self {
        Self {
            id: habit.id,
            name: habit.name,
            description: habit.description,
            category: habit.category,
            frequency: habit.frequency,
            target_value: habit.target_value,
            unit: habit.unit,
            color: habit.color,
            reminder: habit.reminder,
            is_active: habit.is_active,
            start_date: habit.start_date,
            created_at: habit.created_at,
            updated_at: habit.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSummaryDto {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub color: String,
    pub target_value: i32,
    pub unit: Option<String>,
}

impl From<HabitSummary> for HabitSummaryDto {
    fn from(summary: HabitSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            category: summary.category,
            color: summary.color,
            target_value: summary.target_value,
            unit: summary.unit,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDto {
    pub id: i32,
    pub habit: HabitSummaryDto,
    pub date: String,
    pub value: f64,
    pub notes: Option<String>,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProgressEntry> for ProgressDto {
    fn from(entry: ProgressEntry) -> Self {
        Self {
            id: entry.id,
            habit: HabitSummaryDto::from(entry.habit),
            date: entry.date,
            value: entry.value,
            notes: entry.notes,
            completed: entry.completed,
            completed_at: entry.completed_at,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCountDto {
    pub category: String,
    pub count: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStatsDto {
    pub total_habits: u64,
    pub active_habits: u64,
    pub inactive_habits: u64,
    pub by_category: Vec<CategoryCountDto>,
}

impl From<HabitStats> for HabitStatsDto {
    fn from(stats: HabitStats) -> Self {
        Self {
            total_habits: stats.total,
            active_habits: stats.active,
            inactive_habits: stats.total - stats.active,
            by_category: stats
                .by_category
                .into_iter()
                .map(|(category, count)| CategoryCountDto { category, count })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStatsDto {
    pub active_habits: u64,
    pub completed_today: u64,
    pub completed_last7_days: u64,
    pub completed_last30_days: u64,
    pub completed_all_time: u64,
    /// Rates are completed ÷ (active habits × period days), nearest percent.
    pub today_rate: i64,
    pub weekly_rate: i64,
    pub monthly_rate: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub status: String,
    pub database: String,
    pub version: String,
    pub uptime_seconds: u64,
}
