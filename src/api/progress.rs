use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::events::ChangeEvent;
use super::validation::{
    check_date, check_notes, check_value, validate_date_param, validate_habit_id, validate_limit,
    validate_progress_id,
};
use super::{ApiError, ApiResponse, AppState, ProgressDto, ProgressStatsDto};
use crate::db::ProgressFilter;
use crate::models::progress::{is_future_date, today};

/// Missing required fields fall through to the validators (reported as
/// field errors) instead of rejecting the body outright.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProgressRequest {
    #[serde(default)]
    pub habit_id: i32,
    #[serde(default)]
    pub date: String,
    pub value: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub habit_id: Option<i32>,
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitProgressQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u64>,
}

/// Shape validation shared by the upsert and update-by-id paths; every
/// violated field is reported, not just the first. Returns the validated
/// value.
fn validate_progress_body(req: &UpsertProgressRequest) -> Result<f64, ApiError> {
    let mut errors = Vec::new();

    if req.habit_id <= 0 {
        errors.push(super::error::FieldError::new(
            "habitId",
            "Habit ID must be a positive integer",
        ));
    }
    if let Err(e) = check_date("date", &req.date) {
        errors.push(e);
    }
    match req.value {
        Some(value) => {
            if let Err(e) = check_value(value) {
                errors.push(e);
            }
        }
        None => errors.push(super::error::FieldError::new(
            "value",
            "Value must be a non-negative number",
        )),
    }
    if let Err(e) = check_notes(req.notes.as_deref()) {
        errors.push(e);
    }

    if errors.is_empty() {
        Ok(req.value.unwrap_or_default())
    } else {
        Err(ApiError::Validation(errors))
    }
}

/// POST /progress
///
/// Create-or-update keyed by (habit, date). 201 when a new record was
/// inserted, 200 when an existing one was overwritten. A concurrent
/// insert race on the uniqueness constraint is retried as an update
/// inside the store and never reaches the caller.
pub async fn upsert_progress(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Json(payload): Json<UpsertProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let value = validate_progress_body(&payload)?;

    if is_future_date(&payload.date) {
        return Err(ApiError::FutureDate(
            "Cannot log progress for a future date".to_string(),
        ));
    }

    // Doubles as the ownership check: another user's habit is a 404.
    let habit = state
        .store()
        .get_habit(current.id, payload.habit_id)
        .await?
        .ok_or_else(|| ApiError::habit_not_found(payload.habit_id))?;

    let (entry, created) = state
        .store()
        .upsert_progress(current.id, &habit, &payload.date, value, payload.notes)
        .await?;

    let dto = ProgressDto::from(entry);
    state.notifier().publish(
        current.id,
        ChangeEvent::ProgressSaved {
            progress: dto.clone(),
        },
    );

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::success(dto))))
}

/// PUT /progress/{id}
///
/// Retargeting an existing record must not silently collide with another
/// record already occupying the destination (habit, date) pair.
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpsertProgressRequest>,
) -> Result<Json<ApiResponse<ProgressDto>>, ApiError> {
    validate_progress_id(id)?;
    let value = validate_progress_body(&payload)?;

    if is_future_date(&payload.date) {
        return Err(ApiError::FutureDate(
            "Cannot log progress for a future date".to_string(),
        ));
    }

    let record = state
        .store()
        .get_progress(current.id, id)
        .await?
        .ok_or_else(|| ApiError::progress_not_found(id))?;

    let habit = state
        .store()
        .get_habit(current.id, payload.habit_id)
        .await?
        .ok_or_else(|| ApiError::habit_not_found(payload.habit_id))?;

    if let Some(occupant) = state
        .store()
        .find_progress_by_triple(current.id, payload.habit_id, &payload.date)
        .await?
    {
        if occupant.id != record.id {
            return Err(ApiError::Conflict(
                "Progress already exists for this habit and date".to_string(),
            ));
        }
    }

    let entry = state
        .store()
        .update_progress_by_id(record, &habit, &payload.date, value, payload.notes)
        .await?;

    let dto = ProgressDto::from(entry);
    state.notifier().publish(
        current.id,
        ChangeEvent::ProgressUpdated {
            progress: dto.clone(),
        },
    );

    Ok(Json(ApiResponse::success(dto)))
}

/// PATCH /progress/{id}/toggle-completion
///
/// Manual override: flips `completed` without re-deriving it from the
/// value/target rule, so the flag may diverge from the logged value.
pub async fn toggle_completion(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ProgressDto>>, ApiError> {
    validate_progress_id(id)?;

    let record = state
        .store()
        .toggle_progress_completion(current.id, id)
        .await?
        .ok_or_else(|| ApiError::progress_not_found(id))?;

    let habit = state
        .store()
        .get_habit(current.id, record.habit_id)
        .await?
        .ok_or_else(|| ApiError::habit_not_found(record.habit_id))?;

    let entry = crate::models::progress::ProgressEntry::from_parts(
        record,
        crate::models::progress::HabitSummary::from(&habit),
    );

    let dto = ProgressDto::from(entry);
    state.notifier().publish(
        current.id,
        ChangeEvent::ProgressUpdated {
            progress: dto.clone(),
        },
    );

    Ok(Json(ApiResponse::success(dto)))
}

/// DELETE /progress/{id}
pub async fn delete_progress(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    validate_progress_id(id)?;

    let deleted = state.store().delete_progress(current.id, id).await?;
    if !deleted {
        return Err(ApiError::progress_not_found(id));
    }

    state
        .notifier()
        .publish(current.id, ChangeEvent::ProgressDeleted { id });

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}

/// GET /progress?habitId=&date=&startDate=&endDate=
pub async fn list_progress(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Query(params): Query<ProgressQuery>,
) -> Result<Json<ApiResponse<Vec<ProgressDto>>>, ApiError> {
    if let Some(habit_id) = params.habit_id {
        validate_habit_id(habit_id)?;
    }
    for (field, date) in [
        ("date", params.date.as_deref()),
        ("startDate", params.start_date.as_deref()),
        ("endDate", params.end_date.as_deref()),
    ] {
        if let Some(date) = date {
            check_date(field, date).map_err(|e| ApiError::Validation(vec![e]))?;
        }
    }

    let filter = ProgressFilter {
        habit_id: params.habit_id,
        date: params.date,
        start_date: params.start_date,
        end_date: params.end_date,
        limit: None,
    };

    let entries = state.store().query_progress(current.id, filter).await?;
    let dtos = entries.into_iter().map(ProgressDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /progress/date/{date}
pub async fn list_progress_for_date(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(date): Path<String>,
) -> Result<Json<ApiResponse<Vec<ProgressDto>>>, ApiError> {
    validate_date_param(&date)?;

    let filter = ProgressFilter {
        date: Some(date),
        ..Default::default()
    };

    let entries = state.store().query_progress(current.id, filter).await?;
    let dtos = entries.into_iter().map(ProgressDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /progress/habit/{habit_id}?startDate=&endDate=&limit=
pub async fn list_progress_for_habit(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(habit_id): Path<i32>,
    Query(params): Query<HabitProgressQuery>,
) -> Result<Json<ApiResponse<Vec<ProgressDto>>>, ApiError> {
    validate_habit_id(habit_id)?;
    for (field, date) in [
        ("startDate", params.start_date.as_deref()),
        ("endDate", params.end_date.as_deref()),
    ] {
        if let Some(date) = date {
            check_date(field, date).map_err(|e| ApiError::Validation(vec![e]))?;
        }
    }
    if let Some(limit) = params.limit {
        validate_limit(limit)?;
    }

    state
        .store()
        .get_habit(current.id, habit_id)
        .await?
        .ok_or_else(|| ApiError::habit_not_found(habit_id))?;

    let filter = ProgressFilter {
        habit_id: Some(habit_id),
        date: None,
        start_date: params.start_date,
        end_date: params.end_date,
        limit: params.limit,
    };

    let entries = state.store().query_progress(current.id, filter).await?;
    let dtos = entries.into_iter().map(ProgressDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /progress/stats/overview
pub async fn stats_overview(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ProgressStatsDto>>, ApiError> {
    let today = today();
    let today_date = chrono::NaiveDate::parse_from_str(&today, "%Y-%m-%d")
        .map_err(|e| ApiError::internal(format!("Bad current date: {e}")))?;

    let week_start = (today_date - chrono::Duration::days(6))
        .format("%Y-%m-%d")
        .to_string();
    let month_start = (today_date - chrono::Duration::days(29))
        .format("%Y-%m-%d")
        .to_string();

    let store = state.store();
    let active_habits = store.count_active_habits(current.id).await?;
    let completed_today = store
        .count_completed_between(current.id, &today, &today)
        .await?;
    let completed_week = store
        .count_completed_between(current.id, &week_start, &today)
        .await?;
    let completed_month = store
        .count_completed_between(current.id, &month_start, &today)
        .await?;
    let completed_all_time = store.count_completed_total(current.id).await?;

    Ok(Json(ApiResponse::success(ProgressStatsDto {
        active_habits,
        completed_today,
        completed_last7_days: completed_week,
        completed_last30_days: completed_month,
        completed_all_time,
        today_rate: completion_rate(completed_today, active_habits, 1),
        weekly_rate: completion_rate(completed_week, active_habits, 7),
        monthly_rate: completion_rate(completed_month, active_habits, 30),
    })))
}

/// completed ÷ (active habits × period days), rounded to the nearest
/// percent; 0 when there are no active habits.
fn completion_rate(completed: u64, active_habits: u64, period_days: u64) -> i64 {
    let denominator = active_habits * period_days;
    if denominator == 0 {
        return 0;
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let rate = (completed as f64 / denominator as f64 * 100.0).round() as i64;
    rate
}
