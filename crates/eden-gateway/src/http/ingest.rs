//! Alert ingress endpoint — POST /api/alert.
//!
//! Anchor nodes post one alert per request. The alert is validated,
//! normalized and fanned out to every connected viewer before the producer
//! gets its acknowledgment. The ack means "accepted and dispatch attempted";
//! it says nothing about how many viewers received it.
//!
//! Request:  `{"node_id": "...", "location": {"lat": 0, "lon": 0}, "confidence": 0.9, "evidence_image": "..."}`
//! Response: `{"status": "success", "message": "Alert received and broadcasted."}`
//! Error:    `{"status": "error", "code": "...", "message": "...", "errors": [{"field": "...", "reason": "..."}]}`

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use eden_core::ValidationError;
use eden_protocol::{AlertPayload, ErrorBody, IngestAck};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;

type Rejection = (StatusCode, Json<ErrorBody>);

/// POST /api/alert
///
/// 200 + ack on success, 422 with per-field reasons on validation failure,
/// 400/415 when the body isn't a JSON object.
pub async fn ingest_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AlertPayload>, JsonRejection>,
) -> Result<Json<IngestAck>, Rejection> {
    let Json(payload) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "unreadable alert body");
        (
            rejection.status(),
            Json(ErrorBody::new("INVALID_BODY", rejection.body_text())),
        )
    })?;

    let alert = payload
        .into_raw()
        .and_then(|raw| state.transformer.transform(raw))
        .map_err(validation_error)?;

    info!(
        node_id = %alert.node_id,
        alert_id = %alert.alert_id,
        confidence = alert.confidence,
        "alert received"
    );

    let report = state.dispatcher.dispatch(&alert).await;
    info!(
        alert_id = %alert.alert_id,
        recipients = report.recipients,
        delivered = report.delivered,
        failed = report.failed,
        "alert broadcast"
    );

    Ok(Json(IngestAck::accepted()))
}

fn validation_error(err: ValidationError) -> Rejection {
    warn!(reason = %err, "alert rejected");
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorBody::validation(err)),
    )
}
