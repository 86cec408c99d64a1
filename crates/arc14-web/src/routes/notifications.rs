use std::sync::Arc;

use arc14_notify::{Delivery, test_message};
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ApiResult;
use crate::error::OptionalJson;
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EmailRequest {
    email: Option<String>,
}

impl EmailRequest {
    /// The requested address, falling back to the configured recipient.
    pub(crate) fn recipient(&self, state: &AppState) -> Result<String, ApiError> {
        self.email
            .as_deref()
            .or(state.notifications.recipient.as_deref())
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SendOutcome {
    message: &'static str,
    details: Delivery,
}

impl SendOutcome {
    pub(crate) fn new(message: &'static str, details: Delivery) -> Self {
        Self { message, details }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NotificationView {
    provider: String,
    configured: bool,
    enabled: bool,
    scan_schedule: String,
    lead_minutes: i64,
    sender: Option<String>,
    recipient: Option<String>,
}

pub(crate) async fn config(State(state): State<Arc<AppState>>) -> Json<NotificationView> {
    let notifications = &state.notifications;
    Json(NotificationView {
        provider: state.notifier.name().to_string(),
        configured: state.notifier.is_configured(),
        enabled: notifications.enabled,
        scan_schedule: notifications.scan_schedule.clone(),
        lead_minutes: notifications.lead_minutes,
        sender: notifications.sender.clone(),
        recipient: notifications.recipient.clone(),
    })
}

pub(crate) async fn test_send(
    State(state): State<Arc<AppState>>,
    OptionalJson(request): OptionalJson<EmailRequest>,
) -> ApiResult<SendOutcome> {
    let recipient = request.recipient(&state)?;
    match state.notifier.send(&test_message(&recipient)).await {
        Ok(delivery) => {
            info!(recipient = %recipient, "test email sent");
            Ok(Json(SendOutcome::new("Test email sent successfully!", delivery)))
        }
        Err(err) => {
            warn!(recipient = %recipient, error = %err, "test email failed");
            Err(ApiError::Upstream {
                message: "Failed to send test email".to_string(),
                detail: err.to_string(),
            })
        }
    }
}
