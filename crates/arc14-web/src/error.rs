use arc14_core::{SchedulingError, ValidationError};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, warn};

/// Every failure a handler can return, mapped onto a `{message, ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
    #[error("{message}")]
    Upstream { message: String, detail: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Scheduling(_) => StatusCode::FORBIDDEN,
            Self::Upstream { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::Scheduling(SchedulingError::WindowClosed {
                cutoff_hour,
                current_time,
                ..
            }) => json!({
                "message": self.to_string(),
                "schedulingCutoff": format!("{cutoff_hour}:00"),
                "currentTime": current_time,
            }),
            Self::Scheduling(SchedulingError::DateLocked {
                minimum_date,
                attempted_date,
            }) => json!({
                "message": self.to_string(),
                "minimumDate": minimum_date.format("%Y-%m-%d").to_string(),
                "attemptedDate": attempted_date.format("%Y-%m-%d").to_string(),
            }),
            Self::Upstream { message, detail } => json!({
                "message": message,
                "error": detail,
            }),
            Self::Internal(_) => json!({ "message": "Internal server error" }),
            _ => json!({ "message": self.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(detail) => error!(error = %detail, "request failed"),
            Self::Scheduling(err) => warn!(reason = %err, "task mutation blocked"),
            _ => {}
        }
        (self.status(), Json(self.body())).into_response()
    }
}

pub fn internal_error(err: impl std::fmt::Display) -> ApiError {
    ApiError::Internal(err.to_string())
}

/// JSON body extractor whose rejections use the API's error body.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string extractor whose rejections use the API's error body.
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Optional JSON body: an empty body yields `T::default()`.
pub struct OptionalJson<T>(pub T);

impl<S, T> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }
        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|err| ApiError::BadRequest(format!("Failed to parse the request body as JSON: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use arc14_core::{SchedulingError, TaskMutation};
    use axum::http::StatusCode;
    use chrono::NaiveDate;

    use super::ApiError;

    #[test]
    fn window_closed_carries_cutoff_details() {
        let err = ApiError::from(SchedulingError::WindowClosed {
            mutation: TaskMutation::Create,
            cutoff_hour: 21,
            current_time: "21:05:00".to_string(),
        });
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        let body = err.body();
        assert_eq!(body["schedulingCutoff"], "21:00");
        assert_eq!(body["currentTime"], "21:05:00");
        assert_eq!(
            body["message"],
            "Tasks can only be created before 21:00. Scheduling closes for the day!"
        );
    }

    #[test]
    fn date_locked_reports_both_dates() {
        let err = ApiError::from(SchedulingError::DateLocked {
            minimum_date: NaiveDate::from_ymd_opt(2026, 10, 18).expect("date"),
            attempted_date: NaiveDate::from_ymd_opt(2026, 10, 17).expect("date"),
        });
        let body = err.body();
        assert_eq!(body["minimumDate"], "2026-10-18");
        assert_eq!(body["attemptedDate"], "2026-10-17");
    }

    #[test]
    fn internal_errors_hide_their_detail() {
        let err = ApiError::Internal("disk I/O error".to_string());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body()["message"], "Internal server error");
    }
}
