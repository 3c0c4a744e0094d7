use super::{AppError, AppState};
use crate::storage::HabitFields;
use crate::storage::models::{CheckIn, Habit};
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::NaiveDate;
use habitrack_shared::api;
use habitrack_shared::domain::GOAL_RANGE;

fn check_in_dto(c: CheckIn) -> api::CheckInDto {
    api::CheckInDto {
        id: c.id,
        habit_id: c.habit_id,
        date: c.date.to_string(),
        status: c.status,
    }
}

fn habit_dto(h: Habit, checkins: Vec<CheckIn>) -> api::HabitDto {
    api::HabitDto {
        id: h.id,
        name: h.name,
        description: h.description,
        emoji: h.emoji,
        goal: h.goal,
        auto_complete: h.auto_complete,
        checkins: checkins.into_iter().map(check_in_dto).collect(),
    }
}

/// Blank optional text is stored as NULL.
fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

fn habit_fields(body: api::HabitReq) -> Result<HabitFields, AppError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    if !GOAL_RANGE.contains(&body.goal) {
        return Err(AppError::bad_request(format!(
            "goal must be between {} and {} days per week",
            GOAL_RANGE.start(),
            GOAL_RANGE.end()
        )));
    }
    Ok(HabitFields {
        name: name.to_string(),
        description: non_blank(body.description),
        emoji: non_blank(body.emoji),
        goal: body.goal,
        auto_complete: body.auto_complete,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| AppError::bad_request(format!("invalid date {:?}: {}", s, e)))
}

pub(super) async fn api_list_habits(
    State(state): State<AppState>,
) -> Result<Json<Vec<api::HabitDto>>, AppError> {
    let today = state.today();
    let rows = state
        .store
        .list_habits(today, &state.config.backfill)
        .await
        .map_err(AppError::internal)?;
    let items = rows
        .into_iter()
        .map(|(h, checkins)| habit_dto(h, checkins))
        .collect();
    Ok(Json(items))
}

pub(super) async fn api_create_habit(
    State(state): State<AppState>,
    Json(body): Json<api::HabitReq>,
) -> Result<Json<api::HabitDto>, AppError> {
    let fields = habit_fields(body)?;
    let habit = state
        .store
        .create_habit(fields)
        .await
        .map_err(AppError::internal)?;
    tracing::info!(habit_id = habit.id, name = %habit.name, "habit created");
    Ok(Json(habit_dto(habit, Vec::new())))
}

pub(super) async fn api_update_habit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<api::HabitReq>,
) -> Result<Json<api::HabitDto>, AppError> {
    let fields = habit_fields(body)?;
    let Some(habit) = state
        .store
        .update_habit(id, fields)
        .await
        .map_err(AppError::internal)?
    else {
        return Err(AppError::not_found(format!("habit not found: {}", id)));
    };
    let checkins = state
        .store
        .list_check_ins(habit.id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(habit_dto(habit, checkins)))
}

pub(super) async fn api_delete_habit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<api::OkResp>, AppError> {
    let deleted = state
        .store
        .delete_habit(id)
        .await
        .map_err(AppError::internal)?;
    // Deleting an unknown habit still succeeds
    if deleted {
        tracing::info!(habit_id = id, "habit deleted");
    } else {
        tracing::debug!(habit_id = id, "delete: habit did not exist");
    }
    Ok(Json(api::OkResp { ok: true }))
}

pub(super) async fn api_check_in(
    State(state): State<AppState>,
    Json(body): Json<api::CheckInReq>,
) -> Result<Json<api::CheckInDto>, AppError> {
    let date = parse_date(&body.date)?;
    let saved = state
        .store
        .record_check_in(body.habit_id, date, body.status)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("habit not found: {}", body.habit_id)))?;
    Ok(Json(check_in_dto(saved)))
}
