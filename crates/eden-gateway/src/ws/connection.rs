use axum::{
    body::Bytes,
    extract::{
        ws::rejection::WebSocketUpgradeRejection,
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eden_broadcast::{Frame, Membership};
use eden_protocol::ErrorBody;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::ws::send;

/// Axum handler — upgrades HTTP to WebSocket at GET /ws.
///
/// Membership is taken before the upgrade so a full registry is refused
/// with 503 instead of an accepted socket that never gets alerts.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let cfg = &state.config.broadcast;
    let (outbox, inbox) = mpsc::channel(cfg.outbound_queue);

    let membership = match state.registry.join(outbox) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "viewer refused");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody::new(e.code(), e.to_string())),
            )
                .into_response();
        }
    };

    // dropping `membership` here releases the slot
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let max_frame = cfg.max_frame_bytes;
    ws.max_message_size(max_frame)
        .max_frame_size(max_frame)
        .on_upgrade(move |socket| run_connection(socket, membership, inbox, state))
}

/// Per-connection event loop — lives for the entire WS session.
///
/// Forwards queued alert frames, discards whatever the viewer sends, and
/// pings on a fixed cadence so dead peers are noticed even when no alerts
/// flow. Registry membership ends with this function on every path.
async fn run_connection(
    socket: WebSocket,
    membership: Membership,
    mut inbox: mpsc::Receiver<Frame>,
    state: Arc<AppState>,
) {
    let conn_id = membership.id().clone();
    info!(conn_id = %conn_id, viewers = state.registry.len(), "viewer connected");

    let (mut tx, mut rx) = socket.split();
    let send_timeout = state.config.broadcast.send_timeout();
    let mut shutdown = state.shutdown_signal();

    let heartbeat_every = Duration::from_secs(state.config.broadcast.heartbeat_secs);
    let mut heartbeat =
        tokio::time::interval_at(tokio::time::Instant::now() + heartbeat_every, heartbeat_every);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let reason = loop {
        if *shutdown.borrow() {
            let _ = send::bounded(&mut tx, Message::Close(None), send_timeout).await;
            break "server shutting down";
        }

        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!(conn_id = %conn_id, size = text.len(), "viewer frame ignored");
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!(conn_id = %conn_id, size = data.len(), "viewer frame ignored");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if send::bounded(&mut tx, Message::Pong(data), send_timeout).await.is_err() {
                            break "pong failed";
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break "peer closed",
                    Some(Err(e)) => {
                        debug!(conn_id = %conn_id, error = %e, "read failed");
                        break "read failed";
                    }
                }
            }

            frame = inbox.recv() => {
                match frame {
                    Some(_) if !membership.is_registered() => break "evicted",
                    Some(frame) => {
                        let msg = Message::Text(frame.to_string().into());
                        if let Err(e) = send::bounded(&mut tx, msg, send_timeout).await {
                            debug!(conn_id = %conn_id, error = %e, "write failed");
                            break "write failed";
                        }
                    }
                    None => break "evicted",
                }
            }

            // eviction closes the socket without draining queued frames
            _ = membership.evicted() => break "evicted",

            _ = heartbeat.tick() => {
                if send::bounded(&mut tx, Message::Ping(Bytes::new()), send_timeout).await.is_err() {
                    break "heartbeat failed";
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() {
                    break "server shutting down";
                }
            }
        }
    };

    drop(membership);
    info!(conn_id = %conn_id, reason, viewers = state.registry.len(), "viewer disconnected");
}

#[cfg(test)]
mod tests {
    use crate::app::tests::{body_json, test_state};
    use crate::app::{build_router, AppState};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use eden_core::EdenConfig;
    use futures_util::{SinkExt, StreamExt};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
    use tower::ServiceExt;

    type Viewer = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn spawn_gateway(state: Arc<AppState>) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(state);
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        addr
    }

    async fn connect(addr: SocketAddr) -> Viewer {
        let (viewer, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        viewer
    }

    async fn wait_for_viewers(state: &AppState, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while state.registry.len() != n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("registry stuck at {} viewers, wanted {n}", state.registry.len()));
    }

    async fn next_text(viewer: &mut Viewer) -> String {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), viewer.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let WsMessage::Text(text) = msg {
                return text.to_string();
            }
        }
    }

    /// Waits for a Close frame or the end of the stream.
    async fn wait_for_close(viewer: &mut Viewer) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match viewer.next().await {
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn live_viewers_receive_identical_alert_frames() {
        let state = test_state(EdenConfig::default());
        let addr = spawn_gateway(Arc::clone(&state)).await;

        let mut a = connect(addr).await;
        let mut b = connect(addr).await;
        wait_for_viewers(&state, 2).await;

        // inbound viewer frames are discarded, the connection stays up
        a.send(WsMessage::Text("hello gateway".into())).await.unwrap();
        a.send(WsMessage::Binary(vec![1, 2, 3].into())).await.unwrap();

        let resp = reqwest::Client::new()
            .post(format!("http://{addr}/api/alert"))
            .json(&serde_json::json!({
                "node_id": "CAM_1",
                "location": {"lat": 34.7, "lon": 32.9},
                "confidence": 0.9,
                "evidence_image": "data:image/gif;base64,AAAA"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);

        let frame_a = next_text(&mut a).await;
        let frame_b = next_text(&mut b).await;
        assert_eq!(frame_a, frame_b);

        let alert: serde_json::Value = serde_json::from_str(&frame_a).unwrap();
        assert_eq!(alert["node_id"], "CAM_1");
        assert_eq!(alert["status"], "Unconfirmed");
        assert!(alert["alert_id"].as_str().unwrap().starts_with("eden-alert-"));
        assert_eq!(state.registry.len(), 2);

        a.close(None).await.unwrap();
        wait_for_viewers(&state, 1).await;

        drop(b);
        wait_for_viewers(&state, 0).await;
    }

    #[tokio::test]
    async fn evicted_viewer_is_disconnected() {
        let state = test_state(EdenConfig::default());
        let addr = spawn_gateway(Arc::clone(&state)).await;

        let mut viewer = connect(addr).await;
        wait_for_viewers(&state, 1).await;

        let id = state.registry.snapshot()[0].id.clone();
        assert!(state.registry.remove(&id));
        wait_for_close(&mut viewer).await;
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn shutdown_closes_viewers() {
        let state = test_state(EdenConfig::default());
        let addr = spawn_gateway(Arc::clone(&state)).await;

        let mut viewer = connect(addr).await;
        wait_for_viewers(&state, 1).await;

        state.begin_shutdown();
        wait_for_close(&mut viewer).await;
        wait_for_viewers(&state, 0).await;
    }

    #[tokio::test]
    async fn full_registry_refuses_subscribe() {
        let config = EdenConfig::from_toml_str("[broadcast]\nmax_connections = 1").unwrap();
        let state = test_state(config);
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        state.registry.add(tx).unwrap();

        let resp = build_router(state.clone())
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(resp).await;
        assert_eq!(json["code"], "REGISTRY_FULL");
        assert_eq!(state.registry.len(), 1);
    }

    #[tokio::test]
    async fn failed_upgrade_releases_membership() {
        let state = test_state(EdenConfig::default());

        let resp = build_router(state.clone())
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(resp.status().is_client_error());
        assert!(state.registry.is_empty());
    }
}
