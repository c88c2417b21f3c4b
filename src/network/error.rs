//! Common error types for network operations

/// A common error type for network operations.
///
/// Every failure the engine or a service client can detect maps to one of
/// these variants. Callers never receive them directly: a client converts
/// the error into its terminal [`State::Error`](crate::network::application::status::State::Error)
/// together with [`Error::message`], and the caller polls for it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// A request was issued while another one is still in flight.
    Busy,
    /// The hostname could not be resolved.
    ResolveError,
    /// The transport connection could not be opened.
    ConnectError,
    /// The secure channel handshake failed.
    HandshakeError,
    /// An error occurred during a write operation.
    WriteError,
    /// An error occurred during a read operation.
    ReadError,
    /// The transport reported an error and dropped the connection.
    NetworkError,
    /// The connection was closed before a usable response arrived.
    ConnectionClosed,
    /// A phase did not complete within its configured limit.
    Timeout,
    /// The outgoing request does not fit in the request buffer.
    RequestTooLarge,
    /// The response did not have the expected shape.
    ProtocolError,
    /// A fixed-capacity buffer was exhausted.
    CapacityExceeded,
    /// The remote service reported a failure.
    RemoteError,
}

impl Error {
    /// Fixed human-readable message surfaced through a client's status.
    pub fn message(&self) -> &'static str {
        match self {
            Error::Busy => "Request already in progress",
            Error::ResolveError => "DNS lookup failed",
            Error::ConnectError => "Connection failed",
            Error::HandshakeError => "TLS handshake failed",
            Error::WriteError => "Failed to send request",
            Error::ReadError => "Receive error",
            Error::NetworkError => "Network error",
            Error::ConnectionClosed => "Empty response",
            Error::Timeout => "Request timed out",
            Error::RequestTooLarge => "Request too large",
            Error::ProtocolError => "Invalid response",
            Error::CapacityExceeded => "Buffer capacity exceeded",
            Error::RemoteError => "API error",
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Busy => defmt::write!(f, "Busy"),
            Error::ResolveError => defmt::write!(f, "ResolveError"),
            Error::ConnectError => defmt::write!(f, "ConnectError"),
            Error::HandshakeError => defmt::write!(f, "HandshakeError"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::NetworkError => defmt::write!(f, "NetworkError"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::RequestTooLarge => defmt::write!(f, "RequestTooLarge"),
            Error::ProtocolError => defmt::write!(f, "ProtocolError"),
            Error::CapacityExceeded => defmt::write!(f, "CapacityExceeded"),
            Error::RemoteError => defmt::write!(f, "RemoteError"),
        }
    }
}
