//! Outbound WebSocket connection management (§4.5): connect, reconnect with
//! backoff, per-connection FIFO send, request/response correlation via the
//! `echo` field, and broadcast of unsolicited downstream traffic.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::OutboundError;
use crate::model::ConnectionConfig;
use crate::onebot::lifecycle_connect_event;
use crate::utils::prelude::*;

/// Lifecycle state of one outbound connection. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Stopped,
}

/// A point-in-time snapshot of one connection, as surfaced by `/status`.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub id: String,
    pub name: String,
    pub state: ConnectionState,
    pub last_err: Option<String>,
}

type MessageHandler = Arc<dyn Fn(String, Value) + Send + Sync>;

/// One outbound link: its own receive loop, its own writer, its own
/// reconnect task. Sends are serialized per connection by the single
/// `write_tx` channel; no per-connection ordering is promised across
/// connections.
pub struct OutboundConnection {
    id: String,
    cfg: ConnectionConfig,
    state: RwLock<ConnectionState>,
    last_err: RwLock<Option<String>>,
    write_tx: Mutex<Option<mpsc::UnboundedSender<WsMessage>>>,
    pending: Mutex<HashMap<String, oneshot::Sender<Value>>>,
    handler: MessageHandler,
    stopped: AtomicBool,
    reconnecting: AtomicBool,
    receive_task: Mutex<Option<JoinHandle<()>>>,
}

impl OutboundConnection {
    pub fn new(cfg: ConnectionConfig, handler: MessageHandler) -> Arc<Self> {
        Arc::new(Self {
            id: cfg.id.clone(),
            cfg,
            state: RwLock::new(ConnectionState::Idle),
            last_err: RwLock::new(None),
            write_tx: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            handler,
            stopped: AtomicBool::new(false),
            reconnecting: AtomicBool::new(false),
            receive_task: Mutex::new(None),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            id: self.id.clone(),
            name: self.cfg.name.clone(),
            state: self.state().await,
            last_err: self.last_err.read().await.clone(),
        }
    }

    /// Open the WebSocket, emit the lifecycle-connect event, and start the
    /// receive loop. On failure, schedules a reconnect if configured to.
    pub async fn connect(self: &Arc<Self>) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }

        *self.state.write().await = ConnectionState::Connecting;

        if let Err(e) = url::Url::parse(&self.cfg.url) {
            self.mark_closed_and_maybe_reconnect(format!("invalid url: {e}")).await;
            return;
        }

        let mut request = match self.cfg.url.as_str().into_client_request() {
            Ok(r) => r,
            Err(e) => {
                self.mark_closed_and_maybe_reconnect(e.to_string()).await;
                return;
            }
        };

        let headers = request.headers_mut();
        headers.insert("User-Agent", HeaderValue::from_static("dispatch-gateway"));
        headers.insert("X-Self-ID", HeaderValue::from_static("0"));
        headers.insert("X-Client-Role", HeaderValue::from_static("Universal"));
        if let Some(token) = &self.cfg.token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert("Authorization", value);
            }
        }

        match tokio_tungstenite::connect_async(request).await {
            Ok((stream, _response)) => {
                let (mut write, mut read) = stream.split();
                let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

                *self.write_tx.lock().await = Some(tx);
                *self.state.write().await = ConnectionState::Open;
                *self.last_err.write().await = None;

                let lifecycle = lifecycle_connect_event(0, unix_now());
                let _ = write
                    .send(WsMessage::Text(lifecycle.to_string()))
                    .await
                    .map_err(|e| warn!("lifecycle send failed on {}: {e}", self.id));

                tokio::spawn(async move {
                    while let Some(msg) = rx.recv().await {
                        if write.send(msg).await.is_err() {
                            break;
                        }
                    }
                });

                let this = Arc::clone(self);
                let task = tokio::spawn(async move {
                    while let Some(frame) = read.next().await {
                        match frame {
                            Ok(WsMessage::Text(text)) => this.on_frame(&text).await,
                            Ok(WsMessage::Close(_)) => break,
                            Ok(_) => {}
                            Err(e) => {
                                debug!("receive error on {}: {e}", this.id);
                                break;
                            }
                        }
                    }
                    this.mark_closed_and_maybe_reconnect("connection closed".to_string()).await;
                });
                *self.receive_task.lock().await = Some(task);
            }
            Err(e) => {
                self.mark_closed_and_maybe_reconnect(e.to_string()).await;
            }
        }
    }

    async fn on_frame(&self, text: &str) {
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            debug!("dropping malformed frame on {}", self.id);
            return;
        };

        if let Some(echo) = value.get("echo").and_then(Value::as_str) {
            let mut pending = self.pending.lock().await;
            if let Some(tx) = pending.remove(echo) {
                let _ = tx.send(value.clone());
            }
        }

        (self.handler)(self.id.clone(), value);
    }

    async fn mark_closed_and_maybe_reconnect(self: &Arc<Self>, err: String) {
        *self.write_tx.lock().await = None;
        *self.last_err.write().await = Some(err);

        if self.stopped.load(Ordering::SeqCst) {
            *self.state.write().await = ConnectionState::Stopped;
            return;
        }

        *self.state.write().await = ConnectionState::Closed;

        if self.cfg.auto_reconnect {
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        if self.reconnecting.swap(true, Ordering::SeqCst) {
            return; // a reconnect task is already in flight.
        }

        let this = Arc::clone(self);
        let interval = Duration::from_secs(self.cfg.reconnect_interval.max(1));
        tokio::spawn(async move {
            loop {
                if this.stopped.load(Ordering::SeqCst) {
                    break;
                }
                tokio::time::sleep(interval).await;
                if this.stopped.load(Ordering::SeqCst) {
                    break;
                }
                this.connect().await;
                if matches!(this.state().await, ConnectionState::Open) {
                    break;
                }
            }
            this.reconnecting.store(false, Ordering::SeqCst);
        });
    }

    /// Enqueue a text frame. Fails if the connection is not open.
    pub async fn send(&self, frame: &Value) -> Result<(), OutboundError> {
        let guard = self.write_tx.lock().await;
        let tx = guard.as_ref().ok_or_else(|| OutboundError::NotOpen(self.id.clone()))?;
        tx.send(WsMessage::Text(frame.to_string()))
            .map_err(|_| OutboundError::NotOpen(self.id.clone()))
    }

    /// Enqueue `frame` and await the matching response, or time out. If
    /// `frame` doesn't already carry an `echo`, one is generated so the
    /// caller never has to invent its own correlation id. Stale entries from
    /// a previous call with the same echo are naturally superseded since
    /// each call installs its own oneshot keyed by its own echo value.
    pub async fn send_and_wait(&self, frame: &Value, timeout: Duration) -> Result<Value, OutboundError> {
        let echo = match frame.get("echo").and_then(Value::as_str) {
            Some(echo) => echo.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        let mut frame = frame.clone();
        if let Value::Object(map) = &mut frame {
            map.insert("echo".to_string(), Value::String(echo.clone()));
        }

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(echo.clone(), tx);
        }

        if let Err(e) = self.send(&frame).await {
            self.pending.lock().await.remove(&echo);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(OutboundError::Timeout(self.id.clone())),
            Err(_) => {
                self.pending.lock().await.remove(&echo);
                Err(OutboundError::Timeout(self.id.clone()))
            }
        }
    }

    /// Operator-initiated shutdown. Terminal: no further reconnect attempts.
    pub async fn disconnect(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        *self.write_tx.lock().await = None;
        if let Some(task) = self.receive_task.lock().await.take() {
            task.abort();
        }
        *self.state.write().await = ConnectionState::Stopped;
    }
}

fn unix_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Owns every configured outbound connection and the single process-wide
/// message handler (§4.5).
pub struct OutboundPool {
    connections: RwLock<HashMap<String, Arc<OutboundConnection>>>,
    handler: Arc<RwLock<Option<MessageHandler>>>,
}

impl OutboundPool {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            handler: Arc::new(RwLock::new(None)),
        }
    }

    /// Install the process-wide handler invoked for every received frame on
    /// any connection, in addition to `send_and_wait`'s response channel.
    pub async fn set_message_handler<F>(&self, handler: F)
    where
        F: Fn(String, Value) + Send + Sync + 'static,
    {
        *self.handler.write().await = Some(Arc::new(handler));
    }

    /// Register a connection and start connecting it.
    pub async fn add(&self, cfg: ConnectionConfig) {
        let handler_slot = Arc::clone(&self.handler);
        let dispatch: MessageHandler = Arc::new(move |id, frame| {
            if let Ok(guard) = handler_slot.try_read() {
                if let Some(handler) = guard.as_ref() {
                    handler(id, frame);
                }
            }
        });

        let conn = OutboundConnection::new(cfg, dispatch);
        self.connections.write().await.insert(conn.id.clone(), Arc::clone(&conn));
        conn.connect().await;
    }

    /// Stop and remove a connection.
    pub async fn remove(&self, id: &str) -> Result<(), OutboundError> {
        let conn = self
            .connections
            .write()
            .await
            .remove(id)
            .ok_or_else(|| OutboundError::UnknownConnection(id.to_string()))?;
        conn.disconnect().await;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Arc<OutboundConnection>> {
        self.connections.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<String> {
        self.connections.read().await.keys().cloned().collect()
    }

    pub async fn status(&self) -> Vec<ConnectionStatus> {
        let mut out = Vec::new();
        for conn in self.connections.read().await.values() {
            out.push(conn.status().await);
        }
        out
    }

    pub async fn send(&self, id: &str, frame: &Value) -> Result<(), OutboundError> {
        let conn = self.get(id).await.ok_or_else(|| OutboundError::UnknownConnection(id.to_string()))?;
        conn.send(frame).await
    }

    pub async fn send_and_wait(&self, id: &str, frame: &Value, timeout: Duration) -> Result<Value, OutboundError> {
        let conn = self.get(id).await.ok_or_else(|| OutboundError::UnknownConnection(id.to_string()))?;
        conn.send_and_wait(frame, timeout).await
    }
}

impl Default for OutboundPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(id: &str) -> ConnectionConfig {
        ConnectionConfig {
            id: id.to_string(),
            name: id.to_string(),
            url: "ws://127.0.0.1:1/not-there".to_string(),
            token: None,
            auto_reconnect: false,
            reconnect_interval: 1,
            allow_forward: true,
        }
    }

    #[tokio::test]
    async fn send_without_connection_fails() {
        let conn = OutboundConnection::new(cfg("botA"), Arc::new(|_, _| {}));
        let result = conn.send(&serde_json::json!({"x": 1})).await;
        assert!(matches!(result, Err(OutboundError::NotOpen(_))));
    }

    #[tokio::test]
    async fn pool_remove_unknown_connection_errors() {
        let pool = OutboundPool::new();
        let result = pool.remove("missing").await;
        assert!(matches!(result, Err(OutboundError::UnknownConnection(_))));
    }

    #[tokio::test]
    async fn send_and_wait_times_out_without_response() {
        let conn = OutboundConnection::new(cfg("botA"), Arc::new(|_, _| {}));
        // Force state open with a writer that just discards frames, so send()
        // succeeds and we exercise the timeout path rather than NotOpen.
        let (tx, mut rx) = mpsc::unbounded_channel();
        *conn.write_tx.lock().await = Some(tx);
        tokio::spawn(async move { while rx.recv().await.is_some() {} });

        let frame = serde_json::json!({"echo": "reply_1"});
        let result = conn.send_and_wait(&frame, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(OutboundError::Timeout(_))));
    }
}
