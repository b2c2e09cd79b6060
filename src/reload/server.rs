// src/reload/server.rs

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ReloadHub, ReloadMessage};

/// Running reload listener. Dropping the handle stops accepting new
/// connections.
#[derive(Debug)]
pub struct ReloadServerHandle {
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

impl ReloadServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for ReloadServerHandle {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Bind `addr` and serve reload messages from `hub` to every client.
pub async fn spawn_reload_server(addr: &str, hub: ReloadHub) -> Result<ReloadServerHandle> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding reload listener on {addr}"))?;
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "reload listener started");

    let accept_task = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "reload client connected");
                    // Subscribe before spawning so no batch is missed between
                    // accept and the client task starting.
                    let rx = hub.subscribe();
                    tokio::spawn(serve_client(stream, peer, rx));
                }
                Err(e) => {
                    warn!(error = %e, "failed to accept reload client");
                }
            }
        }
    });

    Ok(ReloadServerHandle {
        local_addr,
        accept_task,
    })
}

async fn serve_client(mut stream: TcpStream, peer: SocketAddr, mut rx: broadcast::Receiver<ReloadMessage>) {
    if let Err(e) = write_message(&mut stream, &ReloadMessage::hello()).await {
        debug!(%peer, error = %e, "reload client went away before hello");
        return;
    }

    loop {
        match rx.recv().await {
            Ok(msg) => {
                if let Err(e) = write_message(&mut stream, &msg).await {
                    debug!(%peer, error = %e, "reload client disconnected");
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(%peer, skipped = n, "reload client lagged behind; skipping missed batches");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(%peer, "reload hub closed");
                return;
            }
        }
    }
}

async fn write_message(stream: &mut TcpStream, msg: &ReloadMessage) -> Result<()> {
    let line = msg.to_line()?;
    stream.write_all(line.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}
