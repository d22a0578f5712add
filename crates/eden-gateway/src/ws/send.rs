use axum::extract::ws::{Message, WebSocket};
use eden_broadcast::BroadcastError;
use futures_util::SinkExt;
use std::time::Duration;

pub type WsSink = futures_util::stream::SplitSink<WebSocket, Message>;

/// Write one message, giving up after `limit` so a stalled peer can't pin
/// the connection task.
pub async fn bounded(tx: &mut WsSink, msg: Message, limit: Duration) -> Result<(), BroadcastError> {
    match tokio::time::timeout(limit, tx.send(msg)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(BroadcastError::Closed),
        Err(_) => Err(BroadcastError::Timeout {
            ms: limit.as_millis() as u64,
        }),
    }
}
