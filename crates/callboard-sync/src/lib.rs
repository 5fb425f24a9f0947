//! # callboard-sync
//!
//! Keeps a local cache of calls and conversations consistent with the
//! server.
//!
//! - [`CallStore`] holds the entity cache, focus, filters and stats. REST
//!   snapshots and real-time events both write through it.
//! - [`RealtimeSync`] runs the event-stream connection: authenticated
//!   handshake, bounded reconnection, room subscriptions, and event
//!   application with non-blocking [notifications](notify).
//! - [`SessionGate`] opens and closes the connection as the session comes
//!   and goes.
//! - [`RefreshScheduler`] re-fetches the lists on an interval.

#![deny(unsafe_code)]

pub mod errors;
pub mod gate;
pub mod notify;
pub mod protocol;
pub mod realtime;
pub mod scheduler;
pub mod session;
pub mod status;
pub mod store;
pub mod transport;

pub use errors::{ProtocolError, SyncError, TransportError};
pub use gate::SessionGate;
pub use notify::{Notification, NotificationCenter, NotificationLevel, Notifier};
pub use protocol::{Frame, InboundEvent, OutboundMessage};
pub use realtime::{RealtimeConfig, RealtimeSync};
pub use scheduler::RefreshScheduler;
pub use session::{Credentials, SessionHandle};
pub use status::{ConnectionState, ConnectionStatus};
pub use store::{CacheState, CallStore, Collection, FetchOutcome, StatsSlot};
pub use transport::{Connector, Transport, WsConnector, WsTransport};
