//! Secure channel adapter and handshake driver.
//!
//! Encryption engines are written against a synchronous "send N bytes /
//! receive N bytes" model, while the transports this crate drives only ever
//! hand over bytes in arbitrarily sized chunks from a callback. The bridge
//! is a pair of primitives the engine calls instead of a socket:
//!
//! * **push** hands ciphertext to the transport's write path and reports
//!   how much was accepted.
//! * **pull** pops ciphertext from a local staging buffer that the receive
//!   callback fills, and reports [`TlsError::WantRead`] when it is empty.
//!
//! Neither primitive blocks. The handshake is simply re-entered every time
//! more ciphertext has been staged, until it completes or fails.

use super::buffer::BoundedBuffer;
use super::{ConnectionId, Transport};

/// Result codes an engine reports from any of its operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsError {
    /// More ciphertext must arrive before the operation can progress.
    WantRead,
    /// The transport did not take all outgoing ciphertext yet.
    WantWrite,
    /// Unrecoverable failure, carrying the engine's own code.
    Fatal(i32),
}

impl TlsError {
    /// Whether the operation can be retried after more I/O.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TlsError::WantRead | TlsError::WantWrite)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TlsError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            TlsError::WantRead => defmt::write!(f, "WantRead"),
            TlsError::WantWrite => defmt::write!(f, "WantWrite"),
            TlsError::Fatal(code) => defmt::write!(f, "Fatal({=i32})", code),
        }
    }
}

/// Whether the engine must verify the remote endpoint's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerVerification {
    /// Verify the certificate chain and the server name.
    #[default]
    Required,
    /// Accept any peer. Confidentiality only, no authentication.
    Disabled,
}

/// Secure channel policy handed to the engine at every reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
pub struct TlsPolicy {
    #[serde(default)]
    pub verify_peer: PeerVerification,
}

/// The two I/O primitives an engine is given in place of a socket.
pub trait BioIo {
    /// Hand ciphertext to the transport, returning the number of bytes taken.
    fn push(&mut self, ciphertext: &[u8]) -> Result<usize, TlsError>;
    /// Take staged ciphertext, or report [`TlsError::WantRead`] if none is staged.
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize, TlsError>;
}

/// A synchronous-style encryption engine.
///
/// Implementations keep all record-layer state internally and perform I/O
/// only through the [`BioIo`] they are handed.
pub trait SecureEngine {
    /// Prepare for a new connection to `server_name`, discarding any
    /// previous session state while keeping configuration.
    fn reset(&mut self, server_name: &str, policy: &TlsPolicy) -> Result<(), TlsError>;
    /// Advance the handshake. `Ok(())` means it is complete.
    fn handshake<B: BioIo>(&mut self, io: &mut B) -> Result<(), TlsError>;
    /// Encrypt and push `plaintext`, returning how much of it was consumed.
    fn write<B: BioIo>(&mut self, io: &mut B, plaintext: &[u8]) -> Result<usize, TlsError>;
    /// Decrypt into `buf`. `Ok(0)` signals the peer closed the channel.
    fn read<B: BioIo>(&mut self, io: &mut B, buf: &mut [u8]) -> Result<usize, TlsError>;
}

/// Engine for clients that are configured for plain transport only.
///
/// Any attempt to use it fails fatally.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainOnly;

/// Code reported by [`PlainOnly`] for every operation.
pub const PLAIN_ONLY_CODE: i32 = -1;

impl SecureEngine for PlainOnly {
    fn reset(&mut self, _server_name: &str, _policy: &TlsPolicy) -> Result<(), TlsError> {
        Err(TlsError::Fatal(PLAIN_ONLY_CODE))
    }

    fn handshake<B: BioIo>(&mut self, _io: &mut B) -> Result<(), TlsError> {
        Err(TlsError::Fatal(PLAIN_ONLY_CODE))
    }

    fn write<B: BioIo>(&mut self, _io: &mut B, _plaintext: &[u8]) -> Result<usize, TlsError> {
        Err(TlsError::Fatal(PLAIN_ONLY_CODE))
    }

    fn read<B: BioIo>(&mut self, _io: &mut B, _buf: &mut [u8]) -> Result<usize, TlsError> {
        Err(TlsError::Fatal(PLAIN_ONLY_CODE))
    }
}

/// Bridges an engine onto one transport connection and its staging buffer.
pub struct ChannelIo<'a, T: Transport, const N: usize> {
    transport: &'a mut T,
    conn: ConnectionId,
    staging: &'a mut BoundedBuffer<N>,
}

impl<'a, T: Transport, const N: usize> ChannelIo<'a, T, N> {
    pub fn new(transport: &'a mut T, conn: ConnectionId, staging: &'a mut BoundedBuffer<N>) -> Self {
        Self {
            transport,
            conn,
            staging,
        }
    }
}

impl<T: Transport, const N: usize> core::fmt::Debug for ChannelIo<'_, T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChannelIo")
            .field("conn", &self.conn)
            .field("staged", &self.staging.len())
            .finish()
    }
}

impl<T: Transport, const N: usize> BioIo for ChannelIo<'_, T, N> {
    fn push(&mut self, ciphertext: &[u8]) -> Result<usize, TlsError> {
        let n = self
            .transport
            .write(self.conn, ciphertext)
            .map_err(|_| TlsError::Fatal(PUSH_FAILED))?;
        if n == 0 && !ciphertext.is_empty() {
            return Err(TlsError::WantWrite);
        }
        self.transport
            .flush(self.conn)
            .map_err(|_| TlsError::Fatal(PUSH_FAILED))?;
        Ok(n)
    }

    fn pull(&mut self, buf: &mut [u8]) -> Result<usize, TlsError> {
        if self.staging.is_empty() {
            return Err(TlsError::WantRead);
        }
        Ok(self.staging.pop_front(buf))
    }
}

/// Code reported through [`TlsError::Fatal`] when the transport rejects a push.
pub const PUSH_FAILED: i32 = -0x4E;

/// Outcome of one handshake step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    /// The channel is ready for application data.
    Complete,
    /// The engine needs more I/O; wait for the next arrival.
    InProgress,
    /// The handshake cannot succeed.
    Failed(i32),
}

/// An engine handle plus the per-connection handshake flag.
///
/// The same session is reused for every request a client makes; it is reset,
/// never recreated, when a new connection opens.
#[derive(Debug)]
pub struct SecureSession<E: SecureEngine> {
    engine: E,
    policy: TlsPolicy,
    handshake_done: bool,
}

impl<E: SecureEngine> SecureSession<E> {
    pub fn new(engine: E, policy: TlsPolicy) -> Self {
        Self {
            engine,
            policy,
            handshake_done: false,
        }
    }

    /// Reset engine state for a new connection to `server_name`.
    pub fn begin(&mut self, server_name: &str) -> Result<(), TlsError> {
        self.handshake_done = false;
        self.engine.reset(server_name, &self.policy)
    }

    /// Run the engine's handshake routine once.
    pub fn step<B: BioIo>(&mut self, io: &mut B) -> HandshakeStep {
        if self.handshake_done {
            return HandshakeStep::Complete;
        }
        match self.engine.handshake(io) {
            Ok(()) => {
                self.handshake_done = true;
                HandshakeStep::Complete
            }
            Err(TlsError::WantRead | TlsError::WantWrite) => HandshakeStep::InProgress,
            Err(TlsError::Fatal(code)) => HandshakeStep::Failed(code),
        }
    }

    /// Encrypt and push all of `plaintext`.
    pub fn write_all<B: BioIo>(&mut self, io: &mut B, mut plaintext: &[u8]) -> Result<usize, TlsError> {
        let total = plaintext.len();
        while !plaintext.is_empty() {
            let n = self.engine.write(io, plaintext)?;
            if n == 0 {
                return Err(TlsError::WantWrite);
            }
            plaintext = &plaintext[n..];
        }
        Ok(total)
    }

    /// Decrypt into `buf`.
    pub fn read<B: BioIo>(&mut self, io: &mut B, buf: &mut [u8]) -> Result<usize, TlsError> {
        self.engine.read(io, buf)
    }

    pub fn is_handshake_done(&self) -> bool {
        self.handshake_done
    }

    /// Forget the handshake so the next connection starts over.
    pub fn end(&mut self) {
        self.handshake_done = false;
    }

    pub fn policy(&self) -> &TlsPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: TlsPolicy) {
        self.policy = policy;
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}
