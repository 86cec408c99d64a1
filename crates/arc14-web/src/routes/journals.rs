use std::sync::Arc;

use arc14_core::input::{JournalPatch, NewJournal};
use arc14_core::{Journal, JournalCategory};
use arc14_store::{CategoryCount, JournalFilter};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use super::{ApiResult, Message, comma_list, filter};
use crate::error::{ValidJson, ValidQuery};
use crate::{ApiError, AppState, internal_error, open_store};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct JournalQuery {
    category: Option<String>,
    tags: Option<String>,
    search: Option<String>,
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<JournalQuery>,
) -> ApiResult<Vec<Journal>> {
    let criteria = JournalFilter {
        category: filter(query.category.as_deref(), JournalCategory::parse)?,
        tags: comma_list(query.tags.as_deref()),
        search: query.search.filter(|s| !s.trim().is_empty()),
    };
    let journals = open_store(&state)?
        .list_journals(&criteria)
        .map_err(internal_error)?;
    Ok(Json(journals))
}

pub(crate) async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Journal> {
    open_store(&state)?
        .get_journal(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or(ApiError::NotFound("Journal"))
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    ValidJson(input): ValidJson<NewJournal>,
) -> Result<(StatusCode, Json<Journal>), ApiError> {
    let journal = input.into_journal(state.clock.now_utc())?;
    open_store(&state)?
        .insert_journal(&journal)
        .map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(journal)))
}

pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<JournalPatch>,
) -> ApiResult<Journal> {
    let store = open_store(&state)?;
    let mut journal = store
        .get_journal(&id)
        .map_err(internal_error)?
        .ok_or(ApiError::NotFound("Journal"))?;
    patch.apply(&mut journal, state.clock.now_utc())?;
    if !store.save_journal(&journal).map_err(internal_error)? {
        return Err(ApiError::NotFound("Journal"));
    }
    Ok(Json(journal))
}

pub(crate) async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Message> {
    if !open_store(&state)?
        .delete_journal(&id)
        .map_err(internal_error)?
    {
        return Err(ApiError::NotFound("Journal"));
    }
    Ok(Message::json("Journal deleted successfully"))
}

pub(crate) async fn category_stats(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<CategoryCount>> {
    let counts = open_store(&state)?
        .journal_category_counts()
        .map_err(internal_error)?;
    Ok(Json(counts))
}
