//! Buffered TCP stream clients bound to a shared slot registry.
//!
//! A [`BufferedSocketClient`] is either connected outward with
//! [`connect`](BufferedSocketClient::connect) or handed out by a
//! [`SlotListener`] after an accept. Either way it owns one entry in a
//! [`SocketRegistry`] until it is stopped, and reads are served from one
//! fixed-size receive buffer that is refilled lazily.

pub mod client;
pub mod registry;
pub mod resolve;
pub mod socket;
pub mod transport;
mod addr;
mod error;

pub use self::error::{IoError, SocketError, errno};
pub use self::addr::{Domain, Ipv4, SocketAddrV4};
pub use self::client::{BufferedSocketClient, ClientConfig, WritePolicy, DEFAULT_RX_CAPACITY};
pub use self::registry::{Slot, SlotEntry, SlotRole, SlotTable, SocketRegistry, DEFAULT_SLOT_COUNT};
pub use self::resolve::{Resolver, SystemResolver};
pub use self::socket::{LibcTransport, SlotListener};
pub use self::transport::{RawHandle, RecvResult, Transport};
