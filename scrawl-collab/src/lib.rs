//! # scrawl-collab — real-time collaboration server for Scrawl
//!
//! Keeps one authoritative copy of every open document and converges all
//! connected editors onto it, whatever order their edits arrive in.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  WebSocket   ┌────────┐        ┌──────────┐
//! │ editor A │ ◄──────────► │ driver │──┐     │ Registry │
//! └──────────┘  JSON frames └────────┘  │     │ (striped)│
//! ┌──────────┐              ┌────────┐  ├───► ├──────────┤      ┌─────────┐
//! │ editor B │ ◄──────────► │ driver │──┘     │ Session  │ ◄──► │ Archive │
//! └──────────┘              └────────┘        │ log+OT   │ seed │ (JSON)  │
//!                                             └──────────┘      └─────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] — tagged JSON frames shared with the editor widget
//! - [`session`] — per-document revision log, rebase, presence, broadcast
//! - [`registry`] — document id → session, lifecycle, janitor
//! - [`driver`] — one select loop per connection
//! - [`server`] — axum router and HTTP surface
//! - [`archive`] — durable JSON snapshots and the persister
//!
//! The operation algebra itself lives in the `scrawl-ot` crate.

pub mod archive;
pub mod driver;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use archive::{ArchiveConfig, ArchiveError, ArchiveStore, PersistedDocument};
pub use protocol::{ClientMessage, CursorData, ServerMessage, UserInfo, UserOperation};
pub use registry::{Registry, RegistryStats};
pub use server::{app, ServerConfig};
pub use session::{Session, SessionError, SessionStats, Watermark};
