//! Participant registry and fan-out.
//!
//! ```text
//!                    ┌──────────── Room ────────────┐
//! connection 0 ──►   │ 0 → SharedImage + Outbox      │ ──► broadcast
//! connection 1 ──►   │ 1 → SharedImage + Outbox      │ ──► send_back_images
//! connection 2 ──►   │ 2 → SharedImage + Outbox      │ ──► stats / patchwork
//!                    └──────────────────────────────┘
//! ```
//!
//! The room owns one image per participant from `join` until `leave`. The
//! participant map sits behind one coarse `RwLock`: `join`/`leave` take it
//! for writing, everything else iterates under a read lock.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

use patchwork_core::{Image, ImageError, ShapeTally, SharedImage, Transformable, Vec2};

use crate::connection::Outbox;
use crate::protocol::Frame;

/// Participant ID, assigned in ascending order at accept time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug)]
pub enum RoomError {
    #[error("no participant with id {0}")]
    UnknownParticipant(ParticipantId),
    #[error("no participants connected")]
    Empty,
    #[error(transparent)]
    Image(#[from] ImageError),
}

struct Participant {
    image: SharedImage,
    outbox: Outbox,
}

/// One row of the participant listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    pub components: usize,
    pub annotation: String,
}

/// Aggregate statistics over every participant's image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoomStats {
    pub participants: usize,
    pub shapes: ShapeTally,
}

#[derive(Default)]
pub struct Room {
    participants: RwLock<BTreeMap<ParticipantId, Participant>>,
    next_id: AtomicU64,
}

impl Room {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&self) -> ParticipantId {
        ParticipantId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub async fn join(&self, id: ParticipantId, image: SharedImage, outbox: Outbox) {
        let mut participants = self.participants.write().await;
        participants.insert(id, Participant { image, outbox });
        log::info!("participant {id} joined ({} connected)", participants.len());
    }

    /// Remove `id` and drop its image. Returns false if it was not present.
    pub async fn leave(&self, id: ParticipantId) -> bool {
        let mut participants = self.participants.write().await;
        let removed = participants.remove(&id).is_some();
        if removed {
            log::info!("participant {id} left ({} connected)", participants.len());
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.participants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.participants.read().await.is_empty()
    }

    pub async fn contains(&self, id: ParticipantId) -> bool {
        self.participants.read().await.contains_key(&id)
    }

    /// Queue `frame` on every participant. A closed outbox is skipped and
    /// does not affect the others. Returns the number of queues reached.
    pub async fn broadcast(&self, frame: &Frame) -> usize {
        let participants = self.participants.read().await;
        let mut delivered = 0;
        for (id, p) in participants.iter() {
            match p.outbox.enqueue(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => log::debug!("broadcast skipped participant {id}: {e}"),
            }
        }
        log::debug!(
            "broadcast {} bytes to {delivered}/{} participants",
            frame.wire_len(),
            participants.len()
        );
        delivered
    }

    /// Ask every participant to send its image back.
    pub async fn request_images(&self) -> Result<usize, RoomError> {
        if self.is_empty().await {
            return Err(RoomError::Empty);
        }
        Ok(self.broadcast(&Frame::request()).await)
    }

    /// Send each participant the image the room holds for it.
    pub async fn send_back_images(&self) -> Result<usize, RoomError> {
        let participants = self.participants.read().await;
        if participants.is_empty() {
            return Err(RoomError::Empty);
        }
        let mut sent = 0;
        for (id, p) in participants.iter() {
            match p.outbox.enqueue_image(&p.image) {
                Ok(()) => sent += 1,
                Err(e) => log::warn!("could not send image back to participant {id}: {e}"),
            }
        }
        Ok(sent)
    }

    pub async fn annotate(&self, id: ParticipantId, text: &str) -> Result<(), RoomError> {
        let participants = self.participants.read().await;
        let p = participants
            .get(&id)
            .ok_or(RoomError::UnknownParticipant(id))?;
        p.image.annotate(text)?;
        log::debug!("annotated participant {id}");
        Ok(())
    }

    /// Listing in ascending ID order.
    pub async fn participants(&self) -> Result<Vec<ParticipantInfo>, RoomError> {
        let participants = self.participants.read().await;
        let mut rows = Vec::with_capacity(participants.len());
        for (id, p) in participants.iter() {
            let (components, annotation) = p
                .image
                .with(|img| (img.len(), img.annotation().to_string()))?;
            rows.push(ParticipantInfo {
                id: *id,
                components,
                annotation,
            });
        }
        Ok(rows)
    }

    /// Snapshot of one participant's image.
    pub async fn image(&self, id: ParticipantId) -> Result<Image, RoomError> {
        let participants = self.participants.read().await;
        let p = participants
            .get(&id)
            .ok_or(RoomError::UnknownParticipant(id))?;
        Ok(p.image.snapshot()?)
    }

    pub async fn stats(&self) -> Result<RoomStats, RoomError> {
        let participants = self.participants.read().await;
        let mut stats = RoomStats {
            participants: participants.len(),
            shapes: ShapeTally::new(),
        };
        for p in participants.values() {
            p.image.with(|img| stats.shapes.record_image(img))?;
        }
        Ok(stats)
    }

    /// Lay every participant's image side by side, in ascending ID order.
    ///
    /// The first non-empty image stays in place. Each later one is shifted
    /// horizontally so that its left edge meets the right edge of the
    /// previous one. The result holds one nested image per participant.
    pub async fn patchwork(&self) -> Result<Image, RoomError> {
        let participants = self.participants.read().await;
        if participants.is_empty() {
            return Err(RoomError::Empty);
        }

        let mut composite = Image::new();
        let mut cursor: Option<f32> = None;
        for p in participants.values() {
            let mut img = p.image.snapshot()?;
            let bb = img.bounding_box();
            if !bb.is_empty() {
                match cursor {
                    None => cursor = Some(bb.x_max),
                    Some(x) => {
                        img.translate(Vec2::new(x - bb.x_min, 0.0));
                        cursor = Some(x + bb.width());
                    }
                }
            }
            composite.add_component(img);
        }
        composite.annotate(format!("patchwork of {} images", participants.len()));
        Ok(composite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Pipeline;
    use crate::protocol::MAX_BODY_LEN;
    use patchwork_core::{BoundingBox, Circle, Color, Polygon, Shape, ShapeKind};
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    /// A participant whose pipeline is not running: frames pile up in the
    /// queue until someone calls `run`.
    fn idle_participant(image: Image) -> (SharedImage, Pipeline) {
        let shared = SharedImage::new(image);
        let pipeline = Pipeline::new("idle", shared.clone(), MAX_BODY_LEN);
        (shared, pipeline)
    }

    fn square(x: f32, size: f32, color: Color) -> Polygon {
        Polygon::new(
            vec![
                Vec2::new(x, 0.0),
                Vec2::new(x + size, 0.0),
                Vec2::new(x + size, size),
                Vec2::new(x, size),
            ],
            color,
        )
    }

    async fn room_with(images: Vec<Image>) -> (Room, Vec<Pipeline>) {
        let room = Room::new();
        let mut pipelines = Vec::new();
        for img in images {
            let (shared, pipeline) = idle_participant(img);
            room.join(room.allocate_id(), shared, pipeline.outbox()).await;
            pipelines.push(pipeline);
        }
        (room, pipelines)
    }

    #[tokio::test]
    async fn test_join_leave_counts() {
        let (room, _pipelines) = room_with(vec![Image::new(), Image::new(), Image::new()]).await;
        assert_eq!(room.len().await, 3);

        assert!(room.leave(ParticipantId(1)).await);
        assert!(!room.leave(ParticipantId(1)).await);
        assert_eq!(room.len().await, 2);

        let ids: Vec<_> = room
            .participants()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![ParticipantId(0), ParticipantId(2)]);
    }

    #[tokio::test]
    async fn test_ids_ascend() {
        let room = Room::new();
        assert_eq!(room.allocate_id(), ParticipantId(0));
        assert_eq!(room.allocate_id(), ParticipantId(1));
        assert_eq!(room.allocate_id(), ParticipantId(2));
    }

    #[tokio::test]
    async fn test_broadcast_one_identical_frame_each() {
        let room = Room::new();
        let mut peers = Vec::new();
        let mut closers = Vec::new();
        let mut tasks = Vec::new();
        for _ in 0..3 {
            let (local, peer) = duplex(1024);
            let (shared, pipeline) = idle_participant(Image::new());
            room.join(room.allocate_id(), shared, pipeline.outbox()).await;
            closers.push(pipeline.close_handle());
            tasks.push(tokio::spawn(pipeline.run(local)));
            peers.push(peer);
        }

        let frame = Frame::new("circle 0 0 1 0 0 0").unwrap();
        assert_eq!(room.broadcast(&frame).await, 3);

        // Closing flushes the queue, so each stream ends right after what
        // the broadcast put on it.
        for closer in &closers {
            closer.close();
        }
        for task in tasks {
            timeout(WAIT, task).await.unwrap().unwrap().unwrap();
        }
        for mut peer in peers {
            let mut received = Vec::new();
            timeout(WAIT, peer.read_to_end(&mut received))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(received, frame.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_broadcast_skips_closed_participant() {
        let (room, mut pipelines) = room_with(vec![Image::new(), Image::new()]).await;
        // Dropping a pipeline drops its receiving queue.
        pipelines.remove(0);
        assert_eq!(room.broadcast(&Frame::ping()).await, 1);
    }

    #[tokio::test]
    async fn test_empty_room_errors() {
        let room = Room::new();
        assert!(matches!(room.request_images().await, Err(RoomError::Empty)));
        assert!(matches!(room.send_back_images().await, Err(RoomError::Empty)));
        assert!(matches!(room.patchwork().await, Err(RoomError::Empty)));
        assert_eq!(room.broadcast(&Frame::ping()).await, 0);
    }

    #[tokio::test]
    async fn test_annotate_unknown_participant() {
        let (room, _pipelines) = room_with(vec![Image::new()]).await;
        room.annotate(ParticipantId(0), "hello").await.unwrap();
        assert_eq!(room.image(ParticipantId(0)).await.unwrap().annotation(), "hello");

        assert!(matches!(
            room.annotate(ParticipantId(7), "nope").await,
            Err(RoomError::UnknownParticipant(ParticipantId(7)))
        ));
    }

    #[tokio::test]
    async fn test_stats_sum_over_participants() {
        let red = Color::new(255, 0, 0);
        let blue = Color::new(0, 0, 255);

        let mut a = Image::new();
        a.add_component(Circle::new(Vec2::ZERO, 1.0, red));
        a.add_component(square(0.0, 1.0, blue));

        let mut nested = Image::new();
        nested.add_component(Circle::new(Vec2::ZERO, 2.0, red));
        let mut b = Image::new();
        b.add_component(nested);
        b.add_component(square(5.0, 1.0, red));

        let (room, _pipelines) = room_with(vec![a, b]).await;
        let stats = room.stats().await.unwrap();

        assert_eq!(stats.participants, 2);
        assert_eq!(stats.shapes.kinds[&ShapeKind::Circle], 2);
        assert_eq!(stats.shapes.kinds[&ShapeKind::Polygon], 2);
        assert_eq!(stats.shapes.kinds[&ShapeKind::Image], 1);
        assert_eq!(stats.shapes.colors[&red], 3);
        assert_eq!(stats.shapes.colors[&blue], 1);
    }

    #[tokio::test]
    async fn test_patchwork_lays_out_left_to_right() {
        let mut a = Image::new();
        a.add_component(square(0.0, 10.0, Color::BLACK));
        let mut b = Image::new();
        b.add_component(square(100.0, 5.0, Color::BLACK));
        let mut c = Image::new();
        c.add_component(square(-50.0, 2.0, Color::BLACK));

        let (room, _pipelines) = room_with(vec![a, Image::new(), b, c]).await;
        let composite = room.patchwork().await.unwrap();
        assert_eq!(composite.len(), 4);

        let boxes: Vec<BoundingBox> = composite
            .components()
            .iter()
            .map(Shape::bounding_box)
            .collect();
        assert_eq!(boxes[0], BoundingBox::new(0.0, 10.0, 0.0, 10.0));
        assert!(boxes[1].is_empty());
        assert_eq!(boxes[2], BoundingBox::new(10.0, 15.0, 0.0, 5.0));
        assert_eq!(boxes[3], BoundingBox::new(15.0, 17.0, 0.0, 2.0));

        // Participants' own images are untouched.
        let original = room.image(ParticipantId(2)).await.unwrap();
        assert_eq!(original.bounding_box().x_min, 100.0);
    }

    #[tokio::test]
    async fn test_send_back_images_queues_each_own_image() {
        let mut a = Image::new();
        a.add_component(Circle::new(Vec2::ZERO, 1.0, Color::BLACK));
        let (room, _pipelines) = room_with(vec![a, Image::new()]).await;
        assert_eq!(room.send_back_images().await.unwrap(), 2);
        assert_eq!(room.request_images().await.unwrap(), 2);
    }
}
