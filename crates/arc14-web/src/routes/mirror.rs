use std::sync::Arc;

use arc14_core::input::EvaluationRequest;
use arc14_core::mirror14::{self, Evaluation, Rule};
use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ApiResult;
use crate::AppState;
use crate::error::ValidJson;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvaluationResponse {
    #[serde(flatten)]
    evaluation: Evaluation,
    evaluated_at: DateTime<Utc>,
}

impl EvaluationResponse {
    pub(crate) fn new(evaluation: Evaluation, evaluated_at: DateTime<Utc>) -> Self {
        Self {
            evaluation,
            evaluated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct RuleView {
    id: u8,
    name: &'static str,
    description: &'static str,
    weight: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct RuleBook {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    rules: Vec<RuleView>,
}

pub(crate) async fn evaluate(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<EvaluationRequest>,
) -> ApiResult<EvaluationResponse> {
    let (action, reflection, correction) = request.parts()?;
    let evaluation = mirror14::evaluate(&action, &reflection, &correction);
    Ok(Json(EvaluationResponse::new(
        evaluation,
        state.clock.now_utc(),
    )))
}

pub(crate) async fn rules() -> Json<RuleBook> {
    Json(RuleBook {
        name: "Mirror-14 Rule Engine",
        version: "1.0",
        description: "Simple rule-based evaluation system for ARC cycles",
        rules: Rule::all()
            .iter()
            .map(|rule| RuleView {
                id: rule.id(),
                name: rule.name(),
                description: rule.description(),
                weight: rule.weight(),
            })
            .collect(),
    })
}
