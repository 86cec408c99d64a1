use std::sync::Arc;

use arc14_core::Habit;
use arc14_core::habit::{HabitStats, ToggleOutcome};
use arc14_core::input::{HabitPatch, NewHabit, ToggleRequest};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;

use super::{ApiResult, Message};
use crate::error::{OptionalJson, ValidJson};
use crate::{ApiError, AppState, internal_error, open_store};

fn load(state: &AppState, id: &str) -> Result<Habit, ApiError> {
    open_store(state)?
        .get_habit(id)
        .map_err(internal_error)?
        .ok_or(ApiError::NotFound("Habit"))
}

pub(crate) async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Habit>> {
    let today = state.clock.now_local().date();
    let mut habits = open_store(&state)?.list_habits().map_err(internal_error)?;
    for habit in &mut habits {
        habit.refresh_streak(today);
    }
    Ok(Json(habits))
}

pub(crate) async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Habit> {
    let mut habit = load(&state, &id)?;
    habit.refresh_streak(state.clock.now_local().date());
    Ok(Json(habit))
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    ValidJson(input): ValidJson<NewHabit>,
) -> Result<(StatusCode, Json<Habit>), ApiError> {
    let habit = input.into_habit(state.clock.now_utc())?;
    open_store(&state)?
        .insert_habit(&habit)
        .map_err(internal_error)?;
    info!(habit_id = %habit.id, name = %habit.name, "habit created");
    Ok((StatusCode::CREATED, Json(habit)))
}

pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<HabitPatch>,
) -> ApiResult<Habit> {
    let store = open_store(&state)?;
    let mut habit = store
        .get_habit(&id)
        .map_err(internal_error)?
        .ok_or(ApiError::NotFound("Habit"))?;
    patch.apply(&mut habit, state.clock.now_utc())?;
    habit.refresh_streak(state.clock.now_local().date());
    if !store.save_habit(&habit).map_err(internal_error)? {
        return Err(ApiError::NotFound("Habit"));
    }
    Ok(Json(habit))
}

pub(crate) async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Message> {
    if !open_store(&state)?
        .delete_habit(&id)
        .map_err(internal_error)?
    {
        return Err(ApiError::NotFound("Habit"));
    }
    Ok(Message::json("Habit deleted successfully"))
}

pub(crate) async fn toggle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    OptionalJson(request): OptionalJson<ToggleRequest>,
) -> ApiResult<Habit> {
    let store = open_store(&state)?;
    let mut habit = store
        .get_habit(&id)
        .map_err(internal_error)?
        .ok_or(ApiError::NotFound("Habit"))?;
    let now = state.clock.now_utc();
    let at = request.instant(now)?;
    let outcome = habit.toggle_completion(at, state.clock.now_local().date());
    habit.updated_at = now;
    if !store.save_habit(&habit).map_err(internal_error)? {
        return Err(ApiError::NotFound("Habit"));
    }
    info!(
        habit_id = %habit.id,
        completed = outcome == ToggleOutcome::Completed,
        streak = habit.streak,
        "habit toggled"
    );
    Ok(Json(habit))
}

pub(crate) async fn stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<HabitStats> {
    let habit = load(&state, &id)?;
    Ok(Json(
        habit.stats(state.clock.now_utc(), state.clock.now_local().date()),
    ))
}
