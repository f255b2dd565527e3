//! Lifecycle of the background stream task
//!
//! One socket per adapter. There is no automatic reconnection: a dropped
//! socket stays down until `connect` is called again.

use crate::errors::{ExchangeError, Result};
use crate::lighter::stream::LighterWsClient;
use crate::traits::OrderUpdateHandler;
use crate::types::ConnectionStatus;
use dexbridge_core::PerfTimer;
use std::cell::Cell;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

struct ActiveSocket {
    orderbook_id: u32,
    /// Dropping or sending on this stops the task
    shutdown: flume::Sender<()>,
    ready: flume::Receiver<()>,
    acknowledged: Cell<bool>,
}

impl ActiveSocket {
    /// The task owns the receiver, so a disconnected sender means it has exited
    fn is_running(&self) -> bool {
        !self.shutdown.is_disconnected()
    }

    /// An ack that lands after `connect` gave up is picked up here
    fn is_acknowledged(&self) -> bool {
        if !self.acknowledged.get() && self.ready.try_recv().is_ok() {
            self.acknowledged.set(true);
        }
        self.acknowledged.get()
    }
}

pub struct ConnectionManager {
    ws_url: String,
    account_index: u64,
    ready_timeout: Duration,
    active: Option<ActiveSocket>,
}

impl ConnectionManager {
    pub fn new(ws_url: impl Into<String>, account_index: u64, ready_timeout: Duration) -> Self {
        Self {
            ws_url: ws_url.into(),
            account_index,
            ready_timeout,
            active: None,
        }
    }

    /// Start streaming `orderbook_id` and the account, waiting for the
    /// subscription acknowledgement.
    ///
    /// On `Timeout` the task keeps running and may still become ready.
    pub async fn connect(&mut self, orderbook_id: u32, handler: Option<OrderUpdateHandler>) -> Result<()> {
        let url = Url::parse(&self.ws_url)?;
        let account_index = self.account_index;

        self.launch(orderbook_id, move |ready, shutdown| {
            LighterWsClient::new(url, orderbook_id, account_index, handler).run(ready, shutdown)
        })
        .await
    }

    /// Spawn `run` as the stream task and wait for it to signal `ready`.
    ///
    /// The task must hold the shutdown receiver for as long as it is alive.
    async fn launch<F, Fut>(&mut self, orderbook_id: u32, run: F) -> Result<()>
    where
        F: FnOnce(flume::Sender<()>, flume::Receiver<()>) -> Fut,
        Fut: Future<Output = Result<()>> + 'static,
    {
        if let Some(active) = &self.active {
            if active.is_running() && active.orderbook_id == orderbook_id {
                debug!("Stream for orderbook {} already running", orderbook_id);
                return Ok(());
            }
            self.disconnect().await?;
        }

        let (ready_tx, ready_rx) = flume::bounded(1);
        let (shutdown_tx, shutdown_rx) = flume::bounded(1);

        info!("🔗 Connecting Lighter stream for orderbook {}", orderbook_id);
        let timer = PerfTimer::start("lighter_stream_connect");

        let task = run(ready_tx, shutdown_rx);
        monoio::spawn(async move {
            if let Err(e) = task.await {
                error!("❌ Lighter stream stopped: {}", e);
            }
        });

        let waiter = ready_rx.clone();
        self.active = Some(ActiveSocket {
            orderbook_id,
            shutdown: shutdown_tx,
            ready: ready_rx,
            acknowledged: Cell::new(false),
        });

        match monoio::time::timeout(self.ready_timeout, waiter.recv_async()).await {
            Ok(Ok(())) => {
                if let Some(active) = &self.active {
                    active.acknowledged.set(true);
                }
                timer.log_elapsed();
                Ok(())
            }
            Ok(Err(_)) => {
                self.active = None;
                Err(ExchangeError::ConnectionFailed(format!(
                    "stream for orderbook {orderbook_id} exited before subscribing"
                )))
            }
            Err(_) => {
                warn!(
                    "⚠️ No subscription ack within {:?}, stream left running",
                    self.ready_timeout
                );
                Err(ExchangeError::Timeout(format!(
                    "subscription ack for orderbook {orderbook_id}"
                )))
            }
        }
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(active) = self.active.take() {
            let _ = active.shutdown.try_send(());
            info!("🔌 Lighter stream for orderbook {} disconnected", active.orderbook_id);
        }
        Ok(())
    }

    /// True once the stream task is alive and its subscriptions are acknowledged
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn status(&self) -> ConnectionStatus {
        match &self.active {
            Some(active) if active.is_running() && active.is_acknowledged() => ConnectionStatus::Connected,
            Some(active) if active.is_running() => ConnectionStatus::Connecting,
            _ => ConnectionStatus::Disconnected,
        }
    }

    pub fn orderbook_id(&self) -> Option<u32> {
        self.active.as_ref().map(|a| a.orderbook_id)
    }
}
