//! Push channel: one WebSocket per session delivering notification events.
//!
//! The connection is owned by a background task that forwards parsed
//! frames to the session over an mpsc channel. Closing (or dropping) the
//! [`PushSubscription`] shuts the task down and sends a close frame.
//!
//! Without a reconnect policy a dropped connection simply ends the stream
//! and the session falls back to fetch-only mode. With one, the task
//! reconnects using exponential backoff and emits [`PushSignal::Resync`]
//! after every successful reconnect so the session can re-fetch whatever
//! it missed.

use std::time::Duration;

use futures::StreamExt;
use rand::Rng;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::errors::{NotifyError, Result};
use crate::models::event::PushEvent;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SIGNAL_BUFFER: usize = 256;

/// What the push task hands to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum PushSignal {
    Event(PushEvent),
    /// The connection was re-established; events may have been missed.
    Resync,
}

/// `ws://host/ws/notifications/?token=<token>`
pub fn push_url(ws_base: &Url, token: &str) -> String {
    format!(
        "{}/ws/notifications/?token={}",
        ws_base.as_str().trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

/// Strip the query string so tokens never reach the logs.
fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

pub fn parse_frame(text: &str) -> std::result::Result<PushEvent, serde_json::Error> {
    serde_json::from_str(text)
}

// ── Reconnect policy ──────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter_ms: u64,
    /// Upper bound on one connect attempt, handshake included.
    pub connect_timeout_ms: u64,
}

impl ReconnectPolicy {
    /// Connection loss ends live updates.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            base_backoff_ms: 500,
            max_backoff_ms: 30_000,
            jitter_ms: 250,
            connect_timeout_ms: 10_000,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn exponential(max_backoff: Duration) -> Self {
        Self {
            enabled: true,
            max_backoff_ms: max_backoff.as_millis() as u64,
            ..Self::disabled()
        }
    }

    /// base * 2^(attempt - 1), capped, plus random jitter. `attempt` starts at 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        let raw = self.base_backoff_ms.saturating_mul(1u64 << exp);
        let capped = raw.min(self.max_backoff_ms);
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(capped + jitter)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

// ── Subscription ──────────────────────────────────────────────

/// Handle to a live push connection. Dropping it closes the connection.
pub struct PushSubscription {
    signals: mpsc::Receiver<PushSignal>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PushSubscription {
    /// Open the channel. The first connection attempt happens here so the
    /// caller learns immediately whether live updates are available.
    pub async fn open(url: String, policy: ReconnectPolicy) -> Result<Self> {
        let ws = connect(&url, policy.connect_timeout()).await.map_err(|e| {
            tracing::warn!(url = %redact(&url), error = %e, "push channel connect failed");
            e
        })?;
        tracing::info!(url = %redact(&url), "push channel connected");

        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(supervise(url, policy, ws, tx, shutdown_rx));

        Ok(Self {
            signals: rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Next signal, or `None` once the connection is gone for good.
    pub async fn recv(&mut self) -> Option<PushSignal> {
        self.signals.recv().await
    }

    /// Close the connection and wait for the background task to finish.
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        // Dropping the sender also wakes the task, which then closes the socket.
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

// ── Background task ───────────────────────────────────────────

async fn connect(url: &str, limit: Duration) -> Result<WsStream> {
    match tokio::time::timeout(limit, connect_async(url)).await {
        Ok(Ok((ws, _resp))) => Ok(ws),
        Ok(Err(e)) => Err(NotifyError::from(e)),
        Err(_) => Err(NotifyError::Channel(format!(
            "handshake timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

enum PumpExit {
    Shutdown,
    ReceiverGone,
    Disconnected(Option<String>),
}

async fn supervise(
    url: String,
    policy: ReconnectPolicy,
    first: WsStream,
    tx: mpsc::Sender<PushSignal>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ws = first;

    loop {
        match pump(&mut ws, &tx, &mut shutdown).await {
            PumpExit::Shutdown => {
                tracing::debug!(url = %redact(&url), "push channel closed by owner");
                return;
            }
            PumpExit::ReceiverGone => {
                let _ = ws.close(None).await;
                return;
            }
            PumpExit::Disconnected(reason) => {
                if !policy.enabled {
                    tracing::warn!(
                        url = %redact(&url),
                        reason = reason.as_deref().unwrap_or("closed by server"),
                        "push channel lost; live updates stopped"
                    );
                    return;
                }
                tracing::warn!(
                    url = %redact(&url),
                    reason = reason.as_deref().unwrap_or("closed by server"),
                    "push channel lost; reconnecting"
                );
            }
        }

        let mut attempt: u32 = 0;
        ws = loop {
            attempt += 1;
            let delay = policy.backoff(attempt);
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "push reconnect scheduled");

            tokio::select! {
                _ = &mut shutdown => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let attempted = tokio::select! {
                _ = &mut shutdown => return,
                result = connect(&url, policy.connect_timeout()) => result,
            };

            match attempted {
                Ok(stream) => {
                    tracing::info!(url = %redact(&url), attempt, "push channel reconnected");
                    break stream;
                }
                Err(e) => {
                    tracing::warn!(url = %redact(&url), attempt, error = %e, "push reconnect failed");
                }
            }
        };

        if tx.send(PushSignal::Resync).await.is_err() {
            let _ = ws.close(None).await;
            return;
        }
    }
}

async fn pump(
    ws: &mut WsStream,
    tx: &mpsc::Sender<PushSignal>,
    shutdown: &mut oneshot::Receiver<()>,
) -> PumpExit {
    loop {
        let frame = tokio::select! {
            _ = &mut *shutdown => {
                let _ = ws.close(None).await;
                return PumpExit::Shutdown;
            }
            frame = ws.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                Ok(PushEvent::Unknown) => {
                    tracing::debug!("ignoring push frame of unknown type");
                }
                Ok(event) => {
                    tracing::debug!(kind = event.kind(), "push event received");
                    if tx.send(PushSignal::Event(event)).await.is_err() {
                        return PumpExit::ReceiverGone;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed push frame");
                }
            },
            Some(Ok(Message::Close(frame))) => {
                return PumpExit::Disconnected(frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty()));
            }
            // ping/pong are answered by tungstenite itself
            Some(Ok(_)) => {}
            Some(Err(e)) => return PumpExit::Disconnected(Some(e.to_string())),
            None => return PumpExit::Disconnected(None),
        }
    }
}
