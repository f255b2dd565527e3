//! Lighter WebSocket stream
//!
//! Protocol handling is kept in [`StreamState`], which turns inbound messages
//! into [`StreamEvent`]s without touching the socket. [`LighterWsClient`]
//! drives it over a live [`MonoioWebSocket`].

use crate::errors::Result;
use crate::traits::OrderUpdateHandler;
use crate::websocket::MonoioWebSocket;
use serde_json::{Value, json};
use tracing::{debug, error, info, trace, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Message to send back on the socket
    Reply(String),
    /// Every subscription has been acknowledged
    Ready,
    /// Account snapshot or update for the order handler
    AccountUpdate(Value),
}

/// Subscription bookkeeping for one orderbook and one account
#[derive(Debug)]
pub struct StreamState {
    channels: Vec<String>,
    pending: Vec<String>,
    subscribed: bool,
    ready: bool,
}

impl StreamState {
    pub fn new(orderbook_id: u32, account_index: u64) -> Self {
        let channels = vec![
            format!("order_book/{orderbook_id}"),
            format!("account_all/{account_index}"),
        ];
        Self {
            pending: channels.clone(),
            channels,
            subscribed: false,
            ready: false,
        }
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn subscribe_messages(&self) -> Vec<String> {
        self.channels
            .iter()
            .map(|channel| json!({"type": "subscribe", "channel": channel}).to_string())
            .collect()
    }

    pub fn handle(&mut self, message: &Value) -> Vec<StreamEvent> {
        let kind = message.get("type").and_then(Value::as_str).unwrap_or_default();
        let mut events = Vec::new();

        match kind {
            "connected" => {
                if !self.subscribed {
                    self.subscribed = true;
                    events.extend(self.subscribe_messages().into_iter().map(StreamEvent::Reply));
                }
            }
            "subscribed/order_book" | "subscribed/account_all" => {
                self.acknowledge(kind, message);
                if kind == "subscribed/account_all" {
                    events.push(StreamEvent::AccountUpdate(message.clone()));
                }
                if self.pending.is_empty() && !self.ready {
                    self.ready = true;
                    events.push(StreamEvent::Ready);
                }
            }
            "update/account_all" => events.push(StreamEvent::AccountUpdate(message.clone())),
            "update/order_book" => trace!("Order book update"),
            "ping" => events.push(StreamEvent::Reply(json!({"type": "pong"}).to_string())),
            other => debug!("Ignoring stream message type {:?}", other),
        }

        events
    }

    /// Acks name the channel as `order_book:0`; fall back to the family in the type
    fn acknowledge(&mut self, kind: &str, message: &Value) {
        let channel = message
            .get("channel")
            .and_then(Value::as_str)
            .map(|c| c.replace(':', "/"));

        if let Some(channel) = channel {
            if let Some(pos) = self.pending.iter().position(|p| *p == channel) {
                self.pending.remove(pos);
                return;
            }
        }

        let family = kind.trim_start_matches("subscribed/");
        self.pending
            .retain(|p| p.split('/').next() != Some(family));
    }
}

/// Socket client bound to one orderbook and one account
pub struct LighterWsClient {
    url: Url,
    state: StreamState,
    handler: Option<OrderUpdateHandler>,
}

impl LighterWsClient {
    pub fn new(url: Url, orderbook_id: u32, account_index: u64, handler: Option<OrderUpdateHandler>) -> Self {
        Self {
            url,
            state: StreamState::new(orderbook_id, account_index),
            handler,
        }
    }

    /// Run until the peer closes the socket or `shutdown` fires.
    ///
    /// `ready` receives one message once all subscriptions are acknowledged.
    /// It is dropped when this returns, which the caller sees as a closed channel.
    pub async fn run(mut self, ready: flume::Sender<()>, shutdown: flume::Receiver<()>) -> Result<()> {
        let mut socket = MonoioWebSocket::connect(&self.url).await?;
        info!("🔗 Lighter stream connected, channels {:?}", self.state.channels());

        loop {
            let received = monoio::select! {
                _ = shutdown.recv_async() => None,
                message = socket.receive_text() => Some(message),
            };

            let text = match received {
                None => {
                    info!("🔌 Closing Lighter stream");
                    let _ = socket.close(1000, "client disconnect").await;
                    return Ok(());
                }
                Some(Ok(Some(text))) => text,
                Some(Ok(None)) => {
                    warn!("⚠️ Lighter stream closed by server");
                    return Ok(());
                }
                Some(Err(e)) => return Err(e),
            };

            let message: Value = match serde_json::from_str(&text) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Unparseable stream message: {}", e);
                    continue;
                }
            };

            for event in self.state.handle(&message) {
                match event {
                    StreamEvent::Reply(reply) => socket.send_text(reply).await?,
                    StreamEvent::Ready => {
                        info!("✅ Lighter subscriptions acknowledged");
                        let _ = ready.try_send(());
                    }
                    StreamEvent::AccountUpdate(update) => self.dispatch(&update),
                }
            }
        }
    }

    fn dispatch(&self, update: &Value) {
        let Some(handler) = &self.handler else {
            return;
        };
        if let Err(e) = handler(update) {
            error!("❌ Order update handler failed: {}", e);
        }
    }
}
