use std::sync::Arc;

use arc14_core::input::{DailyLogPatch, NewDailyLog};
use arc14_core::timefmt::parse_timestamp;
use arc14_core::{DailyLog, Mood};
use arc14_store::{LogFilter, MoodStat};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use super::{ApiResult, Message, comma_list, filter};
use crate::error::{ValidJson, ValidQuery};
use crate::{ApiError, AppState, internal_error, open_store};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LogQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    mood: Option<String>,
    tags: Option<String>,
}

impl LogQuery {
    fn into_filter(self) -> Result<LogFilter, ApiError> {
        Ok(LogFilter {
            start: filter(self.start_date.as_deref(), |raw| {
                parse_timestamp("startDate", raw)
            })?,
            end: filter(self.end_date.as_deref(), |raw| parse_timestamp("endDate", raw))?,
            mood: filter(self.mood.as_deref(), Mood::parse)?,
            tags: comma_list(self.tags.as_deref()),
        })
    }
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<LogQuery>,
) -> ApiResult<Vec<DailyLog>> {
    let filter = query.into_filter()?;
    let logs = open_store(&state)?
        .list_logs(&filter)
        .map_err(internal_error)?;
    Ok(Json(logs))
}

pub(crate) async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DailyLog> {
    open_store(&state)?
        .get_log(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or(ApiError::NotFound("Log"))
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    ValidJson(input): ValidJson<NewDailyLog>,
) -> Result<(StatusCode, Json<DailyLog>), ApiError> {
    let log = input.into_log(state.clock.now_utc())?;
    open_store(&state)?.insert_log(&log).map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<DailyLogPatch>,
) -> ApiResult<DailyLog> {
    let store = open_store(&state)?;
    let mut log = store
        .get_log(&id)
        .map_err(internal_error)?
        .ok_or(ApiError::NotFound("Log"))?;
    patch.apply(&mut log, state.clock.now_utc())?;
    if !store.save_log(&log).map_err(internal_error)? {
        return Err(ApiError::NotFound("Log"));
    }
    Ok(Json(log))
}

pub(crate) async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Message> {
    if !open_store(&state)?.delete_log(&id).map_err(internal_error)? {
        return Err(ApiError::NotFound("Log"));
    }
    Ok(Message::json("Log deleted successfully"))
}

pub(crate) async fn mood_stats(State(state): State<Arc<AppState>>) -> ApiResult<Vec<MoodStat>> {
    let stats = open_store(&state)?.mood_stats().map_err(internal_error)?;
    Ok(Json(stats))
}
