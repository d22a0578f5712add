use axum::{extract::State, Json};
use eden_core::DeviceRecord;
use std::sync::Arc;

use crate::app::AppState;

/// GET /api/devices — the full static catalog, no filtering.
pub async fn devices_handler(State(state): State<Arc<AppState>>) -> Json<Vec<DeviceRecord>> {
    Json(state.catalog.devices().to_vec())
}

#[cfg(test)]
mod tests {
    use crate::app::build_router;
    use crate::app::tests::{body_json, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use eden_core::EdenConfig;
    use tower::ServiceExt;

    #[tokio::test]
    async fn lists_configured_devices() {
        let config = EdenConfig::from_toml_str(
            r#"
            [[devices]]
            node_id = "Anchor-1"
            type = "Anchor"
            location = { lat = 34.68, lon = 33.04 }
            status = "Offline"

            [[devices]]
            node_id = "Cam-1"
            type = "Camera"
            location = { lat = 34.69, lon = 33.05 }
            "#,
        )
        .unwrap();

        let resp = build_router(test_state(config))
            .oneshot(Request::get("/api/devices").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let devices = json.as_array().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0]["type"], "Anchor");
        assert_eq!(devices[0]["status"], "Offline");
        assert_eq!(devices[1]["status"], "Monitoring");
        assert_eq!(devices[1]["location"]["lon"], 33.05);
    }
}
