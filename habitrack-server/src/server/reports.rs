use super::{AppError, AppState};
use axum::{Json, extract::State};
use habitrack_shared::api;

pub(super) async fn api_monthly_progress(
    State(state): State<AppState>,
) -> Result<Json<Vec<api::DailySnapshotDto>>, AppError> {
    let today = state.today();
    let days = state
        .store
        .monthly_progress(today)
        .await
        .map_err(AppError::internal)?;
    let items = days
        .into_iter()
        .map(|d| api::DailySnapshotDto {
            date: d.date.to_string(),
            percentage: d.percentage,
            completed: d.completed,
            total: d.total,
        })
        .collect();
    Ok(Json(items))
}

pub(super) async fn api_top_habits(
    State(state): State<AppState>,
) -> Result<Json<Vec<api::TopHabitDto>>, AppError> {
    let rows = state.store.top_habits().await.map_err(AppError::internal)?;
    let items = rows
        .into_iter()
        .map(|t| api::TopHabitDto {
            name: t.name,
            emoji: t.emoji,
            count: t.count,
        })
        .collect();
    Ok(Json(items))
}

pub(super) async fn api_completion_ratio(
    State(state): State<AppState>,
) -> Result<Json<api::CompletionRatioDto>, AppError> {
    let today = state.today();
    let r = state
        .store
        .completion_ratio(today)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::CompletionRatioDto {
        completed: r.completed,
        remaining: r.remaining,
        total: r.total,
    }))
}

pub(super) async fn api_streaks(
    State(state): State<AppState>,
) -> Result<Json<Vec<api::StreakDto>>, AppError> {
    let today = state.today();
    let rows = state
        .store
        .current_streaks(today)
        .await
        .map_err(AppError::internal)?;
    let items = rows
        .into_iter()
        .map(|s| api::StreakDto {
            habit_id: s.habit_id,
            name: s.name,
            emoji: s.emoji,
            current_streak: s.current_streak,
        })
        .collect();
    Ok(Json(items))
}
