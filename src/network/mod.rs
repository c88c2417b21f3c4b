//! A network abstraction layer for callback-driven embedded stacks
//!
//! The stacks this crate targets never block: a lookup, a connect or a
//! receive is started with one call and completes later through a callback.
//! The traits below are the primitives the engine needs from such a stack,
//! and [`Event`] is the tagged form of every callback it can deliver back.
//!

#![allow(missing_docs)]
#![deny(unsafe_code)]

use core::net::IpAddr;

/// Common error types for network operations
pub mod error;

/// Fixed-capacity byte storage with truncate-on-overflow semantics
pub mod buffer;

/// Secure channel adapter and handshake driver
pub mod tls;

/// Application protocol engine and service clients
pub mod application;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Clock, Close, Connect, Resolve, Transport, UdpSocket, Write};
}

/// Identifies one transport connection handed out by [`Connect::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u16);

/// A callback delivered by the network stack, in transport order.
///
/// Stacks must not deliver a new event for a client while the previous one
/// is still being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    /// A pending lookup completed.
    Resolved(IpAddr),
    /// A pending lookup failed.
    ResolveFailed,
    /// The connection finished opening.
    Connected(ConnectionId),
    /// The connection could not be opened.
    ConnectFailed(ConnectionId),
    /// Bytes arrived on the connection.
    DataArrived(ConnectionId, &'a [u8]),
    /// The stack reported a receive error on the connection.
    ReceiveFailed(ConnectionId),
    /// The remote end closed the connection.
    Closed(ConnectionId),
    /// The stack reported a fatal error and already released the connection.
    Error(ConnectionId),
    /// A datagram arrived on the client's socket.
    Datagram(&'a [u8]),
    /// Periodic servicing with nothing else to report.
    Tick,
}

// Core traits

/// Monotonic time source.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed point.
    fn now_ms(&self) -> u64;
}

pub trait Resolve {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Start resolving `host`.
    ///
    /// Returns `Ok(Some(addr))` when the answer is already cached, and
    /// `Ok(None)` when a lookup is in flight and an [`Event::Resolved`] or
    /// [`Event::ResolveFailed`] will follow.
    fn resolve(&mut self, host: &str) -> Result<Option<IpAddr>, Self::Error>;
}

pub trait Connect {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Start opening a connection; completion arrives as an event.
    fn connect(&mut self, addr: IpAddr, port: u16) -> Result<ConnectionId, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Queue bytes for transmission, returning how many were accepted.
    fn write(&mut self, conn: ConnectionId, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Push queued bytes onto the wire.
    fn flush(&mut self, conn: ConnectionId) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection gracefully.
    fn close(&mut self, conn: ConnectionId) -> Result<(), Self::Error>;
    /// Tear the connection down immediately. Never fails.
    fn abort(&mut self, conn: ConnectionId);
}

/// A stream transport: everything the HTTP engine drives.
pub trait Transport: Clock + Resolve + Connect + Write + Close {}

/// A datagram transport, used by the time-sync client.
pub trait UdpSocket: Clock + Resolve {
    /// Associated error type
    type SendError: core::fmt::Debug;
    /// Send one datagram.
    fn send_to(&mut self, addr: IpAddr, port: u16, buf: &[u8]) -> Result<(), Self::SendError>;
}
