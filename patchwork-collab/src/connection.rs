//! Per-connection pipeline: a header→body read loop and a FIFO write queue.
//!
//! ```text
//!             connect ok           valid header
//! Connecting ───────────► ReadingHeader ───────► ReadingBody
//!     │                     ▲     │                  │
//!     │ fail                │     │ EOF/invalid      │ body applied
//!     ▼                     │     ▼                  │
//!   Closed ◄────────────────┼── Closed ◄── I/O error ┤
//!                           └────────────────────────┘
//! ```
//!
//! Both sides of a link run the same pipeline. A received body is applied to
//! the local [`SharedImage`]: `GET` frames the current image and queues it,
//! `PING` queues `PONG`, and anything else replaces the image. Frames are
//! written in the order they were queued; there is one write in flight at a
//! time.
//!
//! Closing is cooperative. Once the state reaches `Closed` the reader stops
//! at its next await point and the writer flushes what is already queued
//! before shutting the stream down.

use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};

use patchwork_core::{ImageError, SharedImage};

use crate::protocol::{decode_header, Body, Frame, FrameError, HEADER_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    ReadingHeader,
    ReadingBody,
    Closed,
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("framing error: {0}")]
    Frame(#[from] FrameError),
    #[error("image error: {0}")]
    Image(#[from] ImageError),
    #[error("connection closed")]
    Closed,
}

/// Sending half of a connection's write queue.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Frame>,
    max_body_len: usize,
}

impl Outbox {
    /// Queue `frame` behind everything already queued.
    pub fn enqueue(&self, frame: Frame) -> Result<(), ConnectionError> {
        self.tx.send(frame).map_err(|_| ConnectionError::Closed)
    }

    /// Serialize `image` and queue it as one frame, under the connection's
    /// body limit.
    pub fn enqueue_image(&self, image: &SharedImage) -> Result<(), ConnectionError> {
        let payload = image.serialize_for_send()?;
        self.enqueue(Frame::with_limit(payload, self.max_body_len)?)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Moves a connection to `Closed` from outside the pipeline.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    state: Arc<watch::Sender<ConnectionState>>,
}

impl CloseHandle {
    pub fn close(&self) {
        transition(&self.state, ConnectionState::Closed);
    }
}

/// Move to `next` unless already closed. Returns false once closed.
fn transition(state: &watch::Sender<ConnectionState>, next: ConnectionState) -> bool {
    let mut open = true;
    state.send_if_modified(|current| {
        if *current == ConnectionState::Closed {
            open = false;
            return false;
        }
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
    open
}

async fn wait_closed(rx: &mut watch::Receiver<ConnectionState>) {
    // An error means the sender is gone, which only happens at teardown.
    let _ = rx.wait_for(|s| *s == ConnectionState::Closed).await;
}

pub struct Pipeline {
    label: String,
    image: SharedImage,
    max_body_len: usize,
    outbox: Outbox,
    queue: mpsc::UnboundedReceiver<Frame>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl Pipeline {
    /// `label` names the peer in log lines. `max_body_len` bounds bodies in
    /// both directions.
    pub fn new(label: impl Into<String>, image: SharedImage, max_body_len: usize) -> Self {
        let (tx, queue) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            label: label.into(),
            image,
            max_body_len,
            outbox: Outbox { tx, max_body_len },
            queue,
            state: Arc::new(state),
        }
    }

    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            state: self.state.clone(),
        }
    }

    /// Drive the connection until either side closes it.
    ///
    /// Returns `Ok` on a clean close (peer EOF at a frame boundary or a local
    /// close) and the first error otherwise. The state is `Closed` on return.
    pub async fn run<S>(self, stream: S) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let Pipeline {
            label,
            image,
            max_body_len,
            outbox,
            queue,
            state,
        } = self;

        // Closed before the first poll: the loops below see `Closed` at once
        // and the writer still flushes whatever was queued.
        if transition(&state, ConnectionState::ReadingHeader) {
            log::debug!("{label}: pipeline started");
        } else {
            log::debug!("{label}: closed before start");
        }

        let (reader, writer) = tokio::io::split(stream);
        let reading = ReadLoop {
            label: &label,
            image: &image,
            max_body_len,
            outbox: &outbox,
            state: &state,
        };

        let (read_result, write_result) = tokio::join!(
            async {
                let r = reading.run(reader).await;
                transition(&state, ConnectionState::Closed);
                r
            },
            async {
                let r = write_loop(&label, writer, queue, state.subscribe()).await;
                transition(&state, ConnectionState::Closed);
                r
            }
        );

        match &read_result {
            Ok(()) => log::debug!("{label}: reader finished"),
            Err(e) => log::warn!("{label}: read failed: {e}"),
        }
        if let Err(e) = &write_result {
            log::warn!("{label}: write failed: {e}");
        }
        read_result.and(write_result)
    }
}

struct ReadLoop<'a> {
    label: &'a str,
    image: &'a SharedImage,
    max_body_len: usize,
    outbox: &'a Outbox,
    state: &'a watch::Sender<ConnectionState>,
}

impl ReadLoop<'_> {
    async fn run<R: AsyncRead + Unpin>(&self, mut reader: R) -> Result<(), ConnectionError> {
        let mut closed = self.state.subscribe();
        loop {
            let mut header = [0u8; HEADER_LEN];
            tokio::select! {
                biased;
                _ = wait_closed(&mut closed) => return Ok(()),
                read = reader.read_exact(&mut header) => match read {
                    Ok(_) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                        log::info!("{}: peer closed the connection", self.label);
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                },
            }

            // An oversized or malformed header ends the connection before
            // any body byte is read.
            let len = decode_header(&header, self.max_body_len)?;
            if !transition(self.state, ConnectionState::ReadingBody) {
                return Ok(());
            }

            let mut body = vec![0u8; len];
            tokio::select! {
                biased;
                _ = wait_closed(&mut closed) => return Ok(()),
                read = reader.read_exact(&mut body) => { read?; }
            }
            self.apply(&body)?;

            if !transition(self.state, ConnectionState::ReadingHeader) {
                return Ok(());
            }
        }
    }

    fn apply(&self, body: &[u8]) -> Result<(), ConnectionError> {
        let label = self.label;
        match Body::parse(body) {
            Ok(Body::Request) => {
                log::debug!("{label}: image requested");
                match self.outbox.enqueue_image(self.image) {
                    Err(ConnectionError::Closed) => return Err(ConnectionError::Closed),
                    Err(e) => log::error!("{label}: cannot send image back: {e}"),
                    Ok(()) => {}
                }
            }
            Ok(Body::Ping) => self.outbox.enqueue(Frame::pong())?,
            Ok(Body::Pong) => log::trace!("{label}: pong"),
            Ok(Body::Image(payload)) => match self.image.apply_received_payload(payload) {
                Ok(n) => log::debug!("{label}: image replaced ({n} shapes)"),
                Err(e) => log::warn!("{label}: partially applied image: {e}"),
            },
            Err(e) => log::warn!("{label}: dropping {} byte body: {e}", body.len()),
        }
        Ok(())
    }
}

async fn write_loop<W: AsyncWrite + Unpin>(
    label: &str,
    mut writer: W,
    mut queue: mpsc::UnboundedReceiver<Frame>,
    mut closed: watch::Receiver<ConnectionState>,
) -> Result<(), ConnectionError> {
    loop {
        let frame = tokio::select! {
            biased;
            _ = wait_closed(&mut closed) => break,
            frame = queue.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await?;
    }

    // Flush frames queued before the close.
    let mut flushed = 0usize;
    while let Ok(frame) = queue.try_recv() {
        writer.write_all(frame.as_bytes()).await?;
        flushed += 1;
    }
    if flushed > 0 {
        log::debug!("{label}: flushed {flushed} queued frames on close");
    }
    writer.flush().await?;
    // The peer may already be gone.
    let _ = writer.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwork_core::{Circle, Color, Image, Transformable, Vec2};
    use std::time::Duration;
    use tokio::io::{duplex, DuplexStream};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn sample_image() -> Image {
        let mut img = Image::new();
        img.add_component(Circle::new(Vec2::new(1.0, 2.0), 3.0, Color::new(4, 5, 6)));
        img.annotate("sample");
        img
    }

    async fn read_frame(peer: &mut DuplexStream) -> Vec<u8> {
        let mut header = [0u8; HEADER_LEN];
        peer.read_exact(&mut header).await.unwrap();
        let len = decode_header(&header, usize::MAX).unwrap();
        let mut body = vec![0u8; len];
        peer.read_exact(&mut body).await.unwrap();
        body
    }

    fn spawn_pipeline(
        image: SharedImage,
        max_body_len: usize,
    ) -> (
        DuplexStream,
        Outbox,
        watch::Receiver<ConnectionState>,
        CloseHandle,
        tokio::task::JoinHandle<Result<(), ConnectionError>>,
    ) {
        let (local, peer) = duplex(64 * 1024);
        let pipeline = Pipeline::new("test", image, max_body_len);
        let outbox = pipeline.outbox();
        let state = pipeline.state();
        let closer = pipeline.close_handle();
        let task = tokio::spawn(pipeline.run(local));
        (peer, outbox, state, closer, task)
    }

    #[tokio::test]
    async fn test_request_sends_back_image() {
        let image = SharedImage::new(sample_image());
        let (mut peer, _outbox, _state, _closer, _task) = spawn_pipeline(image, 1024);

        peer.write_all(Frame::request().as_bytes()).await.unwrap();
        let body = timeout(WAIT, read_frame(&mut peer)).await.unwrap();
        assert_eq!(body, sample_image().to_payload().into_bytes());
    }

    #[tokio::test]
    async fn test_ping_is_answered() {
        let (mut peer, _outbox, _state, _closer, _task) =
            spawn_pipeline(SharedImage::default(), 1024);

        peer.write_all(Frame::ping().as_bytes()).await.unwrap();
        let body = timeout(WAIT, read_frame(&mut peer)).await.unwrap();
        assert_eq!(body, b"PONG");
    }

    #[tokio::test]
    async fn test_bodies_applied_in_order() {
        let image = SharedImage::default();
        let (mut peer, _outbox, _state, _closer, _task) = spawn_pipeline(image.clone(), 1024);

        for x in 0..5 {
            let mut img = Image::new();
            img.add_component(Circle::new(Vec2::new(x as f32, 0.0), 1.0, Color::BLACK));
            peer.write_all(Frame::image(&img).unwrap().as_bytes())
                .await
                .unwrap();
        }
        // The request is processed after every earlier body.
        peer.write_all(Frame::request().as_bytes()).await.unwrap();
        let body = timeout(WAIT, read_frame(&mut peer)).await.unwrap();
        let received = patchwork_core::decode(std::str::from_utf8(&body).unwrap()).unwrap();
        assert_eq!(received.bounding_box().center(), Vec2::new(4.0, 0.0));
        assert_eq!(image.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_writes_keep_fifo_order() {
        let (mut peer, outbox, _state, _closer, _task) =
            spawn_pipeline(SharedImage::default(), 1024);

        for i in 0..20 {
            outbox.enqueue(Frame::new(format!("msg {i}")).unwrap()).unwrap();
        }
        for i in 0..20 {
            let body = timeout(WAIT, read_frame(&mut peer)).await.unwrap();
            assert_eq!(body, format!("msg {i}").into_bytes());
        }
    }

    #[tokio::test]
    async fn test_oversized_header_closes_without_body_read() {
        let image = SharedImage::new(sample_image());
        let (mut peer, _outbox, state, _closer, task) = spawn_pipeline(image.clone(), 16);

        peer.write_all(b"00000017").await.unwrap();
        let result = timeout(WAIT, task).await.unwrap().unwrap();
        assert!(matches!(
            result,
            Err(ConnectionError::Frame(FrameError::BodyTooLarge { len: 17, max: 16 }))
        ));
        assert_eq!(*state.borrow(), ConnectionState::Closed);
        assert_eq!(image.snapshot().unwrap(), sample_image());
    }

    #[tokio::test]
    async fn test_malformed_header_closes() {
        let (mut peer, _outbox, _state, _closer, task) =
            spawn_pipeline(SharedImage::default(), 1024);

        peer.write_all(b"12ab5678").await.unwrap();
        let result = timeout(WAIT, task).await.unwrap().unwrap();
        assert!(matches!(
            result,
            Err(ConnectionError::Frame(FrameError::InvalidHeader(_)))
        ));
    }

    #[tokio::test]
    async fn test_peer_eof_is_clean_close() {
        let (peer, outbox, mut state, _closer, task) =
            spawn_pipeline(SharedImage::default(), 1024);

        drop(peer);
        assert!(timeout(WAIT, task).await.unwrap().unwrap().is_ok());
        state
            .wait_for(|s| *s == ConnectionState::Closed)
            .await
            .unwrap();
        assert!(outbox.enqueue(Frame::ping()).is_err());
    }

    #[tokio::test]
    async fn test_close_flushes_queued_frames() {
        let (mut peer, outbox, _state, closer, task) =
            spawn_pipeline(SharedImage::default(), 1024);

        outbox.enqueue(Frame::new("last words").unwrap()).unwrap();
        closer.close();
        assert!(timeout(WAIT, task).await.unwrap().unwrap().is_ok());

        let mut rest = Vec::new();
        peer.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"00000010last words");
    }

    #[tokio::test]
    async fn test_close_before_start_still_flushes() {
        let (local, mut peer) = duplex(1024);
        let pipeline = Pipeline::new("test", SharedImage::default(), 1024);
        let outbox = pipeline.outbox();
        let state = pipeline.state();
        outbox.enqueue(Frame::new("early").unwrap()).unwrap();
        pipeline.close_handle().close();

        assert!(timeout(WAIT, pipeline.run(local)).await.unwrap().is_ok());
        assert_eq!(*state.borrow(), ConnectionState::Closed);

        let mut rest = Vec::new();
        peer.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"00000005early");
    }

    #[tokio::test]
    async fn test_image_limit_follows_connection() {
        let mut img = Image::new();
        img.annotate("x".repeat(64));
        let image = SharedImage::new(img);

        let small = Pipeline::new("small", image.clone(), 16).outbox();
        assert!(matches!(
            small.enqueue_image(&image),
            Err(ConnectionError::Frame(FrameError::BodyTooLarge { max: 16, .. }))
        ));

        let (mut peer, outbox, _state, _closer, _task) = spawn_pipeline(image.clone(), 1024);
        outbox.enqueue_image(&image).unwrap();
        let body = timeout(WAIT, read_frame(&mut peer)).await.unwrap();
        assert_eq!(body, image.serialize_for_send().unwrap().into_bytes());
    }

    #[tokio::test]
    async fn test_undecodable_body_keeps_connection() {
        let image = SharedImage::default();
        let (mut peer, _outbox, state, _closer, _task) = spawn_pipeline(image.clone(), 1024);

        peer.write_all(Frame::new([0xffu8, 0xfe]).unwrap().as_bytes())
            .await
            .unwrap();
        peer.write_all(Frame::new("circle 0 0 oops 0 0 0").unwrap().as_bytes())
            .await
            .unwrap();
        peer.write_all(Frame::ping().as_bytes()).await.unwrap();

        let body = timeout(WAIT, read_frame(&mut peer)).await.unwrap();
        assert_eq!(body, b"PONG");
        assert_ne!(*state.borrow(), ConnectionState::Closed);
        assert!(image.is_empty().unwrap());
    }
}
