//! Chat endpoint handlers

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::run_with_deadline;
use crate::api::{
    error::{ApiError, ApiResult},
    models::{DataChatRequest, QgisChatRequest},
    routes::AppState,
};
use crate::export::ExportRecommendation;
use crate::history::ChatHistory;
use crate::project::ProjectDescription;
use crate::protocol::InvocationResult;

/// Turn a user message into a QGIS function call
///
/// POST /api/chat/qgis
pub async fn qgis_chat(
    State(app_state): State<AppState>,
    payload: Result<Json<QgisChatRequest>, JsonRejection>,
) -> ApiResult<Json<InvocationResult>> {
    let Json(req) = payload?;
    req.validate()?;

    let request_id = Uuid::new_v4();
    let span = info_span!("qgis_chat", %request_id);

    async move {
        info!(history_len = req.chat_history.len(), "Handling QGIS chat request");

        let history = ChatHistory::from_entries(
            req.chat_history,
            app_state.history_limit,
            app_state.history_policy,
        );
        let project = ProjectDescription::new(req.project_description);
        let cancel = CancellationToken::new();

        let result = run_with_deadline(
            app_state.request_timeout,
            &cancel,
            app_state
                .orchestrator
                .handle(&req.text_input, &project, &history, &cancel),
        )
        .await?;

        info!(function = %result.function_name, "QGIS chat request completed");
        Ok::<_, ApiError>(Json(result))
    }
    .instrument(span)
    .await
}

/// Recommend a data source and export formats
///
/// POST /api/chat/data
pub async fn data_chat(
    State(app_state): State<AppState>,
    payload: Result<Json<DataChatRequest>, JsonRejection>,
) -> ApiResult<Json<ExportRecommendation>> {
    let Json(req) = payload?;
    req.validate()?;

    let request_id = Uuid::new_v4();
    let span = info_span!("data_chat", %request_id);

    async move {
        let cancel = CancellationToken::new();
        let recommendation = run_with_deadline(
            app_state.request_timeout,
            &cancel,
            app_state.advisor.advise(&req.text_input, &cancel),
        )
        .await?;

        info!(data_source = recommendation.data_source.as_str(), "Data chat request completed");
        Ok::<_, ApiError>(Json(recommendation))
    }
    .instrument(span)
    .await
}
