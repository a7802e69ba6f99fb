//! Participant side of the exchange.
//!
//! The client owns a local [`SharedImage`] and one pipeline to the server.
//! The operator edits the image through the command surface; the server can
//! replace it (image frames) or ask for it (`GET`) at any time.

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use patchwork_core::SharedImage;

use crate::connection::{CloseHandle, ConnectionError, ConnectionState, Outbox, Pipeline};
use crate::protocol::{Frame, MAX_BODY_LEN};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address
    pub server_addr: String,
    /// Largest body accepted from the server
    pub max_body_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".to_string(),
            max_body_len: MAX_BODY_LEN,
        }
    }
}

pub struct PatchworkClient {
    image: SharedImage,
    outbox: Outbox,
    state: watch::Receiver<ConnectionState>,
    closer: CloseHandle,
    task: JoinHandle<Result<(), ConnectionError>>,
}

impl PatchworkClient {
    /// Connect and start the pipeline on `image`.
    pub async fn connect(config: &ClientConfig, image: SharedImage) -> Result<Self, ConnectionError> {
        let label = format!("server {}", config.server_addr);
        let pipeline = Pipeline::new(label, image.clone(), config.max_body_len);
        let state = pipeline.state();
        let closer = pipeline.close_handle();
        let outbox = pipeline.outbox();

        let stream = match TcpStream::connect(&config.server_addr).await {
            Ok(stream) => stream,
            Err(e) => {
                log::error!("failed to connect to {}: {e}", config.server_addr);
                closer.close();
                return Err(e.into());
            }
        };
        let _ = stream.set_nodelay(true);
        log::info!("connected to {}", config.server_addr);

        let task = tokio::spawn(pipeline.run(stream));
        Ok(Self {
            image,
            outbox,
            state,
            closer,
            task,
        })
    }

    pub fn image(&self) -> &SharedImage {
        &self.image
    }

    /// Serialize the local image and queue it for the server.
    pub fn send_image(&self) -> Result<(), ConnectionError> {
        self.outbox.enqueue_image(&self.image)
    }

    pub fn ping(&self) -> Result<(), ConnectionError> {
        self.outbox.enqueue(Frame::ping())
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Close the connection after queued frames are written.
    pub async fn close(self) -> Result<(), ConnectionError> {
        self.closer.close();
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ConnectionError::Io(std::io::Error::other(e))),
        }
    }
}
