//! Real-time presence and notification fan-out.
//!
//! This crate keeps track of which users currently hold a live connection
//! (WebSocket or SSE) and pushes events to them, falling back to an
//! out-of-band channel such as email when a direct recipient is unreachable.
//!
//! # Architecture
//!
//! - **One connection per user**: A newer connection for the same user
//!   supersedes the older one in the registry (last writer wins). The older
//!   handle is not closed; it fails on its own and its teardown is a no-op.
//! - **Compare-and-remove**: Deregistration only removes the entry if it still
//!   holds the exact connection being torn down, so a stale teardown can never
//!   evict a fresh connection.
//! - **No I/O under lock**: The registry hands out `Arc<Connection>` clones;
//!   sends happen after the shard lock is released.
//! - **Bounded, non-blocking sends**: Each connection owns a bounded outbound
//!   queue. A full or closed queue is a send failure, and the connection is
//!   evicted rather than waited on.
//! - **Try-then-fallback**: The send attempt itself decides whether the
//!   fallback gateway is used. There is no separate presence check.
//!
//! # Message Flow
//!
//! 1. A transport authenticates the client and calls `Manager::connect`
//! 2. The connection is registered, activated and (optionally) announced
//!    to everyone else with `chat.user.online`
//! 3. A producer submits an event, directly or through `DispatchEventHandler`
//! 4. The `Dispatcher` routes it by audience:
//!    - Direct: lookup, push, and hand the fallback job to the
//!      `NotificationGateway` if the push did not happen
//!    - Broadcast: push to a snapshot of everyone but the originator
//! 5. The transport task drains the receiver and writes frames in order
//! 6. On any exit path the transport calls `Manager::disconnect`
//!
//! # Modules
//!
//! - `connection`: Connection handle with its outbound queue and close signal
//! - `lifecycle`: Atomic Connecting → Active → Closing → Closed state machine
//! - `registry`: User id → live connection map
//! - `dispatcher`: SendDirect, Broadcast and RouteWithFallback
//! - `presence`: Who is online
//! - `fallback`: The notification gateway seam
//! - `manager`: Connection lifecycle coordinator used by transports
//! - `message`: Frames the core builds or reads itself
//! - `event_handler`: `events::EventHandler` adapter for in-process producers

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod event_handler;
pub mod fallback;
pub mod lifecycle;
pub mod manager;
pub mod message;
pub mod presence;
pub mod registry;

pub use connection::{Connection, ConnectionId, SendError, UserId};
pub use dispatcher::{BroadcastReport, DeliveryOutcome, Dispatched, Dispatcher};
pub use error::{Error, RealtimeErrorKind};
pub use event_handler::DispatchEventHandler;
pub use fallback::{NoopGateway, NotificationGateway};
pub use lifecycle::ConnectionState;
pub use manager::{Manager, ManagerConfig};
pub use presence::Presence;
pub use registry::ConnectionRegistry;
