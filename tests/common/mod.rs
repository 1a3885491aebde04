#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

// ---------------------------------------------------------------------------
// In-process push endpoint
// ---------------------------------------------------------------------------

enum ServerCmd {
    Send(String),
    /// Close the current connection and go back to accepting.
    Drop,
}

/// A WebSocket server standing in for the backend's push endpoint.
///
/// Frames queued before a client connects are delivered once it does.
pub struct PushServer {
    pub url: Url,
    cmds: mpsc::UnboundedSender<ServerCmd>,
    connections: Arc<AtomicUsize>,
    disconnects: Arc<AtomicUsize>,
    uris: Arc<Mutex<Vec<String>>>,
}

impl PushServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel::<ServerCmd>();
        let connections = Arc::new(AtomicUsize::new(0));
        let disconnects = Arc::new(AtomicUsize::new(0));
        let uris = Arc::new(Mutex::new(Vec::new()));

        let (conn_count, disc_count, seen) = (connections.clone(), disconnects.clone(), uris.clone());
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let seen = seen.clone();
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    seen.lock().unwrap().push(req.uri().to_string());
                    Ok(resp)
                };
                let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
                    continue;
                };
                conn_count.fetch_add(1, Ordering::SeqCst);

                loop {
                    tokio::select! {
                        cmd = rx.recv() => match cmd {
                            Some(ServerCmd::Send(text)) => {
                                if ws.send(Message::Text(text)).await.is_err() {
                                    break;
                                }
                            }
                            Some(ServerCmd::Drop) => {
                                let _ = ws.close(None).await;
                                break;
                            }
                            None => return,
                        },
                        incoming = ws.next() => match incoming {
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                            Some(Ok(_)) => {}
                        },
                    }
                }
                disc_count.fetch_add(1, Ordering::SeqCst);
            }
        });

        Self {
            url: Url::parse(&format!("ws://{}", addr)).unwrap(),
            cmds: tx,
            connections,
            disconnects,
            uris,
        }
    }

    pub fn send_json(&self, frame: Value) {
        self.send_text(frame.to_string());
    }

    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.cmds.send(ServerCmd::Send(text.into()));
    }

    pub fn drop_connection(&self) {
        let _ = self.cmds.send(ServerCmd::Drop);
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn request_uris(&self) -> Vec<String> {
        self.uris.lock().unwrap().clone()
    }
}

/// A ws:// URL nothing is listening on.
pub async fn dead_push_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("ws://{}", addr)).unwrap()
}

/// A ws:// URL whose listener accepts TCP and then never answers the upgrade.
pub async fn stalled_push_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    Url::parse(&format!("ws://{}", addr)).unwrap()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Poll `cond` until it holds or two seconds pass.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out waiting for future")
}
