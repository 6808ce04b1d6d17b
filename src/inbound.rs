//! Accepts the chat-adapter WebSocket, decodes OneBot v11 events, drives the
//! router, and replies using the OneBot action schema (§4.6).
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::onebot::{decode_event, InboundEvent, ReplyAction};
use crate::router::Router;
use crate::store::{AuditSink, LogStatus, MessageLogEntry};
use crate::utils::prelude::*;

type ClientId = u64;

/// Accepts inbound WebSocket clients (the chat adapter) and fans router
/// results back to them; also the `broadcast` target for unsolicited
/// downstream traffic.
pub struct InboundServer {
    router: Arc<Router>,
    audit: Arc<dyn AuditSink>,
    clients: RwLock<HashMap<ClientId, mpsc::UnboundedSender<WsMessage>>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl InboundServer {
    pub fn new(router: Arc<Router>, audit: Arc<dyn AuditSink>) -> Arc<Self> {
        Arc::new(Self {
            router,
            audit,
            clients: RwLock::new(HashMap::new()),
            next_id: std::sync::atomic::AtomicU64::new(0),
        })
    }

    /// Bind `addr` and accept connections until the process shuts down.
    pub async fn serve(self: Arc<Self>, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("inbound server listening on {addr}");

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept failed: {e}");
                    continue;
                }
            };

            let this = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = this.handle_client(stream).await {
                    debug!("client {peer} disconnected: {e}");
                }
            });
        }
    }

    async fn handle_client(self: Arc<Self>, stream: TcpStream) -> anyhow::Result<()> {
        let ws = tokio_tungstenite::accept_async(stream).await?;
        let (mut write, mut read) = ws.split();

        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
        self.clients.write().await.insert(id, tx);

        let writer_task = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
        });

        while let Some(frame) = read.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => self.handle_frame(id, &text).await,
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("read error: {e}");
                    break;
                }
            }
        }

        self.clients.write().await.remove(&id);
        writer_task.abort();
        Ok(())
    }

    async fn handle_frame(&self, client_id: ClientId, text: &str) {
        let Ok(raw) = serde_json::from_str::<Value>(text) else {
            debug!("dropping malformed inbound frame");
            return;
        };

        match decode_event(raw) {
            InboundEvent::Message { fields, raw } => self.handle_message(client_id, fields, raw).await,
            InboundEvent::MetaEvent { fields, .. } => {
                if fields.meta_event_type != "heartbeat" {
                    debug!("lifecycle event: {} / {}", fields.meta_event_type, fields.sub_type);
                }
            }
            InboundEvent::Notice { .. } | InboundEvent::Request { .. } | InboundEvent::Unknown { .. } => {}
        }
    }

    async fn handle_message(&self, client_id: ClientId, fields: crate::onebot::MessageEventFields, raw: Value) {
        let result = self
            .router
            .route(
                &fields.raw_message,
                fields.user_id,
                fields.group_id,
                &fields.sender.nickname,
                Some(&raw),
            )
            .await;

        let status = if result.success {
            LogStatus::Success
        } else if result.is_system_command {
            LogStatus::Rejected
        } else {
            LogStatus::Rejected
        };

        if let Err(e) = self
            .audit
            .log(MessageLogEntry {
                user_id: fields.user_id,
                group_id: fields.group_id,
                command: fields.raw_message.clone(),
                command_set_id: result.command_set.clone(),
                target_ws: result.target_ws.clone(),
                status,
                error_message: result.audit_detail.clone().or_else(|| result.error_message.clone()),
                timestamp: chrono::Utc::now(),
            })
            .await
        {
            warn!("audit log write failed: {e}");
        }

        let reply_text = result.response.or(result.error_message);
        if let Some(message) = reply_text {
            if message.is_empty() {
                return;
            }
            let reply = ReplyAction::new(fields.message_id, fields.user_id, fields.group_id, message);
            if let Ok(frame) = serde_json::to_value(&reply) {
                self.send_to(client_id, WsMessage::Text(frame.to_string())).await;
            }
        }
    }

    /// Send a frame to the single client that sent the triggering message —
    /// replies never fan out to other connected adapters (§4.6).
    async fn send_to(&self, client_id: ClientId, msg: WsMessage) {
        let clients = self.clients.read().await;
        if let Some(tx) = clients.get(&client_id) {
            let _ = tx.send(msg);
        }
    }

    /// Send a frame to every connected inbound client — the "fan-back" path
    /// for unsolicited downstream traffic (§4.6).
    pub async fn broadcast(&self, frame: &Value) {
        let msg = WsMessage::Text(frame.to_string());
        let clients = self.clients.read().await;
        for tx in clients.values() {
            let _ = tx.send(msg.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogHandle};
    use crate::config::ConfigManager;
    use crate::model::AppConfig;
    use crate::outbound::OutboundPool;
    use crate::store::InMemoryUserStore;

    fn test_server() -> Arc<InboundServer> {
        let catalog = Catalog::rebuild(&AppConfig::default()).unwrap();
        let handle = Arc::new(CatalogHandle::new(catalog));
        let outbound = Arc::new(OutboundPool::new());
        let users = Arc::new(InMemoryUserStore::new());
        let config = Arc::new(ConfigManager::new(std::env::temp_dir().join("dispatch-gateway-inbound-test-unused.yaml")));
        let router = Arc::new(Router::new(handle, outbound, users, config));
        let audit: Arc<dyn AuditSink> = Arc::new(crate::store::InMemoryAuditSink::default());
        InboundServer::new(router, audit)
    }

    #[tokio::test]
    async fn malformed_frame_is_dropped_silently() {
        let server = test_server();
        server.handle_frame(0, "not json").await;
    }

    #[tokio::test]
    async fn heartbeat_meta_event_is_ignored() {
        let server = test_server();
        server
            .handle_frame(0, r#"{"post_type":"meta_event","meta_event_type":"heartbeat","sub_type":""}"#)
            .await;
    }

    #[tokio::test]
    async fn message_event_routes_and_audits() {
        let server = test_server();
        server
            .handle_frame(
                0,
                r#"{"post_type":"message","message_type":"private","sub_type":"friend",
                    "message_id":1,"user_id":100,"raw_message":"hello",
                    "sender":{"nickname":"alice"},"self_id":0}"#,
            )
            .await;
        // Default final rule is now reject-with-message ("未知指令"), but
        // since no client with id 0 is registered in `self.clients` here,
        // the reply is silently dropped by `send_to` — only the audit sink
        // (one row) observes this call.
    }

    #[tokio::test]
    async fn reply_is_sent_only_to_the_originating_client() {
        let server = test_server();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        server.clients.write().await.insert(1, tx_a);
        server.clients.write().await.insert(2, tx_b);

        server
            .handle_frame(
                1,
                r#"{"post_type":"message","message_type":"private","sub_type":"friend",
                    "message_id":1,"user_id":100,"raw_message":"hello",
                    "sender":{"nickname":"alice"},"self_id":0}"#,
            )
            .await;

        assert!(rx_a.try_recv().is_ok(), "originating client should receive the reply");
        assert!(rx_b.try_recv().is_err(), "other connected clients must not see the reply");
    }
}
