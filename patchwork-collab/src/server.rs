//! TCP accept loop feeding the room.
//!
//! ```text
//! Client A ──┐                     ┌── participant 0 ── Pipeline ──┐
//!             ├── TcpListener ─────┤                                ├── Room
//! Client B ──┘                     └── participant 1 ── Pipeline ──┘
//! ```
//!
//! Every accepted stream gets the next participant ID, joins the room with
//! an empty image, runs its pipeline until it closes, then leaves. There is
//! no reconnection: a returning client is a new participant.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

use patchwork_core::SharedImage;

use crate::connection::{ConnectionError, Pipeline};
use crate::protocol::MAX_BODY_LEN;
use crate::room::Room;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: String,
    /// Largest body accepted from a participant
    pub max_body_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_body_len: MAX_BODY_LEN,
        }
    }
}

pub struct PatchworkServer {
    config: ServerConfig,
    listener: TcpListener,
    room: Arc<Room>,
}

impl PatchworkServer {
    pub async fn bind(config: ServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        Ok(Self {
            config,
            listener,
            room: Arc::new(Room::new()),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle for the operator's command surface.
    pub fn room(&self) -> Arc<Room> {
        self.room.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept connections forever.
    pub async fn run(self) -> std::io::Result<()> {
        log::info!("patchwork server listening on {}", self.local_addr()?);

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Usually transient (descriptor exhaustion); keep serving.
                    log::error!("accept failed: {e}");
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    continue;
                }
            };
            log::debug!("new TCP connection from {addr}");

            let room = self.room.clone();
            let max_body_len = self.config.max_body_len;
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, room, max_body_len).await {
                    log::warn!("connection from {addr} ended with error: {e}");
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    room: Arc<Room>,
    max_body_len: usize,
) -> Result<(), ConnectionError> {
    let _ = stream.set_nodelay(true);

    let id = room.allocate_id();
    let image = SharedImage::default();
    let pipeline = Pipeline::new(format!("participant {id} ({addr})"), image.clone(), max_body_len);
    room.join(id, image, pipeline.outbox()).await;

    let result = pipeline.run(stream).await;

    room.leave(id).await;
    log::info!("connection closed from {addr}");
    result
}
