//! # patchwork-collab: networking layer for the patchwork drawing exchange
//!
//! A central server keeps one image per connected participant and can pull,
//! push, annotate and composite them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   8-digit header    ┌──────────────────┐
//! │ PatchworkClient  │ ◄─────────────────► │ PatchworkServer  │
//! │ (per participant)│   + text body       │ (central)        │
//! └────────┬─────────┘                     └────────┬─────────┘
//!          │                                        │
//!          ▼                                        ▼
//! ┌──────────────────┐                     ┌──────────────────┐
//! │ Pipeline         │                     │ Room             │
//! │ SharedImage      │                     │ id → image+outbox│
//! └──────────────────┘                     └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: frame header codec and reserved bodies
//! - [`connection`]: per-connection read loop and FIFO write queue
//! - [`room`]: participant registry, broadcast, stats and patchwork layout
//! - [`server`]: TCP accept loop
//! - [`client`]: participant connection

pub mod client;
pub mod connection;
pub mod protocol;
pub mod room;
pub mod server;

pub use client::{ClientConfig, PatchworkClient};
pub use connection::{CloseHandle, ConnectionError, ConnectionState, Outbox, Pipeline};
pub use protocol::{Body, Frame, FrameError, HEADER_LEN, MAX_BODY_LEN, PROTOCOL_VERSION};
pub use room::{ParticipantId, ParticipantInfo, Room, RoomError, RoomStats};
pub use server::{PatchworkServer, ServerConfig};
