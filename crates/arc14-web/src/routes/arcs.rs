use std::sync::Arc;

use arc14_core::input::{ArcCyclePatch, NewArcCycle, NewInsight};
use arc14_core::{ArcCycle, ArcStatus, Insight, Priority, mirror14};
use arc14_store::{ArcFilter, StatusCount};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::info;

use super::mirror::EvaluationResponse;
use super::{ApiResult, Message, filter};
use crate::error::{ValidJson, ValidQuery};
use crate::{ApiError, AppState, internal_error, open_store};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ArcQuery {
    status: Option<String>,
    priority: Option<String>,
}

fn load(state: &AppState, id: &str) -> Result<ArcCycle, ApiError> {
    open_store(state)?
        .get_arc_cycle(id)
        .map_err(internal_error)?
        .ok_or(ApiError::NotFound("ARC cycle"))
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<ArcQuery>,
) -> ApiResult<Vec<ArcCycle>> {
    let criteria = ArcFilter {
        status: filter(query.status.as_deref(), ArcStatus::parse)?,
        priority: filter(query.priority.as_deref(), Priority::parse)?,
    };
    let cycles = open_store(&state)?
        .list_arc_cycles(&criteria)
        .map_err(internal_error)?;
    Ok(Json(cycles))
}

pub(crate) async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ArcCycle> {
    load(&state, &id).map(Json)
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    ValidJson(input): ValidJson<NewArcCycle>,
) -> Result<(StatusCode, Json<ArcCycle>), ApiError> {
    let cycle = input.into_cycle(state.clock.now_utc())?;
    open_store(&state)?
        .insert_arc_cycle(&cycle)
        .map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(cycle)))
}

pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<ArcCyclePatch>,
) -> ApiResult<ArcCycle> {
    let store = open_store(&state)?;
    let mut cycle = store
        .get_arc_cycle(&id)
        .map_err(internal_error)?
        .ok_or(ApiError::NotFound("ARC cycle"))?;
    let before = cycle.status;
    patch.apply(&mut cycle, state.clock.now_utc())?;
    if !store.save_arc_cycle(&cycle).map_err(internal_error)? {
        return Err(ApiError::NotFound("ARC cycle"));
    }
    if before != cycle.status {
        info!(cycle_id = %cycle.id, from = %before, to = %cycle.status, "ARC cycle status changed");
    }
    Ok(Json(cycle))
}

pub(crate) async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Message> {
    if !open_store(&state)?
        .delete_arc_cycle(&id)
        .map_err(internal_error)?
    {
        return Err(ApiError::NotFound("ARC cycle"));
    }
    Ok(Message::json("ARC cycle deleted successfully"))
}

pub(crate) async fn add_insight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<NewInsight>,
) -> ApiResult<ArcCycle> {
    let store = open_store(&state)?;
    let mut cycle = store
        .get_arc_cycle(&id)
        .map_err(internal_error)?
        .ok_or(ApiError::NotFound("ARC cycle"))?;
    let now = state.clock.now_utc();
    cycle.insights.push(Insight {
        text: input.validated_text()?,
        created_at: now,
    });
    cycle.updated_at = now;
    if !store.save_arc_cycle(&cycle).map_err(internal_error)? {
        return Err(ApiError::NotFound("ARC cycle"));
    }
    Ok(Json(cycle))
}

/// Runs Mirror-14 over a stored cycle.
pub(crate) async fn evaluate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<EvaluationResponse> {
    let cycle = load(&state, &id)?;
    let evaluation = mirror14::evaluate(&cycle.action, &cycle.reflection, &cycle.correction);
    Ok(Json(EvaluationResponse::new(
        evaluation,
        state.clock.now_utc(),
    )))
}

pub(crate) async fn status_stats(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<StatusCount>> {
    let counts = open_store(&state)?
        .arc_status_counts()
        .map_err(internal_error)?;
    Ok(Json(counts))
}
