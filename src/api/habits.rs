use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::events::ChangeEvent;
use super::validation::{
    check_category, check_color, check_description, check_frequency, check_name, check_reminder,
    check_target_value, check_unit, validate_habit_id,
};
use super::{ApiError, ApiResponse, AppState, HabitDto, HabitStatsDto};
use crate::models::habit::{DEFAULT_COLOR, HabitDraft, HabitPatch, Reminder};

/// A missing name deserializes to an empty string, which the name check
/// rejects with a field error rather than a body rejection.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHabitRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub frequency: Option<String>,
    pub target_value: Option<i32>,
    pub unit: Option<String>,
    pub color: Option<String>,
    pub reminder: Option<Reminder>,
}

/// Absent fields leave the stored value unchanged.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHabitRequest {
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

/// GET /habits
pub async fn list_habits(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<HabitDto>>>, ApiError> {
    let habits = state.store().list_habits(current.id).await?;
    let dtos = habits.into_iter().map(HabitDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /habits/{id}
pub async fn get_habit(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<HabitDto>>, ApiError> {
    validate_habit_id(id)?;

    let habit = state
        .store()
        .get_habit(current.id, id)
        .await?
        .ok_or_else(|| ApiError::habit_not_found(id))?;

    Ok(Json(ApiResponse::success(HabitDto::from(habit))))
}

/// POST /habits
pub async fn create_habit(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Json(payload): Json<CreateHabitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = payload.category.unwrap_or_else(|| "general".to_string());
    let frequency = payload.frequency.unwrap_or_else(|| "daily".to_string());
    let target_value = payload.target_value.unwrap_or(1);
    let color = payload.color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
    let reminder = payload.reminder.unwrap_or_default();

    let mut errors = Vec::new();
    if let Err(e) = check_name(&payload.name) {
        errors.push(e);
    }
    if let Err(e) = check_description(payload.description.as_deref()) {
        errors.push(e);
    }
    if let Err(e) = check_category(&category) {
        errors.push(e);
    }
    if let Err(e) = check_frequency("frequency", &frequency) {
        errors.push(e);
    }
    if let Err(e) = check_target_value(target_value) {
        errors.push(e);
    }
    if let Err(e) = check_unit(payload.unit.as_deref()) {
        errors.push(e);
    }
    if let Err(e) = check_color(&color) {
        errors.push(e);
    }
    errors.extend(check_reminder(&reminder));
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let draft = HabitDraft {
        name: payload.name.trim().to_string(),
        description: payload.description,
        category,
        frequency,
        target_value,
        unit: payload.unit,
        color,
        reminder,
    };

    let habit = state.store().create_habit(current.id, draft).await?;
    let dto = HabitDto::from(habit);

    state
        .notifier()
        .publish(current.id, ChangeEvent::HabitCreated { habit: dto.clone() });

    Ok((StatusCode::CREATED, Json(ApiResponse::success(dto))))
}

/// PUT /habits/{id}
pub async fn update_habit(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateHabitRequest>,
) -> Result<Json<ApiResponse<HabitDto>>, ApiError> {
    validate_habit_id(id)?;

    let mut errors = Vec::new();
    if let Some(name) = payload.name.as_deref() {
        if let Err(e) = check_name(name) {
            errors.push(e);
        }
    }
    if let Err(e) = check_description(payload.description.as_deref()) {
        errors.push(e);
    }
    if let Some(category) = payload.category.as_deref() {
        if let Err(e) = check_category(category) {
            errors.push(e);
        }
    }
    if let Some(frequency) = payload.frequency.as_deref() {
        if let Err(e) = check_frequency("frequency", frequency) {
            errors.push(e);
        }
    }
    if let Some(target_value) = payload.target_value {
        if let Err(e) = check_target_value(target_value) {
            errors.push(e);
        }
    }
    if let Err(e) = check_unit(payload.unit.as_deref()) {
        errors.push(e);
    }
    if let Some(color) = payload.color.as_deref() {
        if let Err(e) = check_color(color) {
            errors.push(e);
        }
    }
    if let Some(reminder) = payload.reminder.as_ref() {
        errors.extend(check_reminder(reminder));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let patch = HabitPatch {
        name: payload.name.map(|n| n.trim().to_string()),
        description: payload.description,
        category: payload.category,
        frequency: payload.frequency,
        target_value: payload.target_value,
        unit: payload.unit,
        color: payload.color,
        reminder: payload.reminder,
        is_active: payload.is_active,
    };

    let habit = state
        .store()
        .update_habit(current.id, id, patch)
        .await?
        .ok_or_else(|| ApiError::habit_not_found(id))?;
    let dto = HabitDto::from(habit);

    state
        .notifier()
        .publish(current.id, ChangeEvent::HabitUpdated { habit: dto.clone() });

    Ok(Json(ApiResponse::success(dto)))
}

/// DELETE /habits/{id}
///
/// Also removes the habit's progress records so none are left referencing
/// a missing habit.
pub async fn delete_habit(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    validate_habit_id(id)?;

    let deleted = state.store().delete_habit(current.id, id).await?;
    if !deleted {
        return Err(ApiError::habit_not_found(id));
    }

    state
        .notifier()
        .publish(current.id, ChangeEvent::HabitDeleted { id });

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}

/// PATCH /habits/{id}/toggle-status
pub async fn toggle_status(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<HabitDto>>, ApiError> {
    validate_habit_id(id)?;

    let habit = state
        .store()
        .toggle_habit_active(current.id, id)
        .await?
        .ok_or_else(|| ApiError::habit_not_found(id))?;
    let dto = HabitDto::from(habit);

    state
        .notifier()
        .publish(current.id, ChangeEvent::HabitUpdated { habit: dto.clone() });

    Ok(Json(ApiResponse::success(dto)))
}

/// GET /habits/stats/overview
pub async fn stats_overview(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
) -> Result<Json<ApiResponse<HabitStatsDto>>, ApiError> {
    let stats = state.store().habit_stats(current.id).await?;
    Ok(Json(ApiResponse::success(HabitStatsDto::from(stats))))
}
