//! Event-driven HTTP(S) request engine.
//!
//! One [`HttpEngine`] carries one request at a time through
//! resolve → connect → (handshake) → transmit → receive, advancing only when
//! the caller hands it an [`Event`] through [`HttpEngine::drive`]. It never
//! blocks and never spawns anything; every byte of state lives inside it.

use super::request::{Request, Target};
use super::response::{Frame, Response};
use crate::network::buffer::BoundedBuffer;
use crate::network::error::Error;
use crate::network::tls::{ChannelIo, HandshakeStep, SecureEngine, SecureSession, TlsError, TlsPolicy};
use crate::network::{ConnectionId, Event, Transport};
use core::net::IpAddr;
use heapless::{String, Vec};

/// Ciphertext held between arrival and decryption.
pub const STAGING_CAPACITY: usize = 4096;

/// Longest hostname an engine can target.
pub const MAX_HOST_LEN: usize = 64;

const DECRYPT_CHUNK: usize = 512;

/// Per-phase time limits in milliseconds. Zero disables a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub resolve_ms: u32,
    pub connect_ms: u32,
    pub handshake_ms: u32,
    pub receive_ms: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            resolve_ms: 5_000,
            connect_ms: 10_000,
            handshake_ms: 15_000,
            receive_ms: 30_000,
        }
    }
}

impl Timeouts {
    /// No phase ever expires.
    pub const fn disabled() -> Self {
        Self {
            resolve_ms: 0,
            connect_ms: 0,
            handshake_ms: 0,
            receive_ms: 0,
        }
    }

    fn limit(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Resolving => self.resolve_ms,
            Phase::Connecting => self.connect_ms,
            Phase::Handshaking => self.handshake_ms,
            Phase::Receiving => self.receive_ms,
            Phase::Idle | Phase::Done => 0,
        }
    }
}

/// Where the current request is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Resolving,
    Connecting,
    Handshaking,
    Receiving,
    Done,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Phase {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Phase::Idle => defmt::write!(f, "Idle"),
            Phase::Resolving => defmt::write!(f, "Resolving"),
            Phase::Connecting => defmt::write!(f, "Connecting"),
            Phase::Handshaking => defmt::write!(f, "Handshaking"),
            Phase::Receiving => defmt::write!(f, "Receiving"),
            Phase::Done => defmt::write!(f, "Done"),
        }
    }
}

/// What one call to [`HttpEngine::drive`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing for the caller yet.
    Pending,
    /// The connection closed with data; read it with [`HttpEngine::response`].
    Response,
    /// The request ended with an error. The connection is already released.
    Failed(Error),
}

/// An HTTP(S) client engine with a request buffer of `REQ` bytes and a
/// response buffer of `RESP` bytes.
#[derive(Debug)]
pub struct HttpEngine<E: SecureEngine, const REQ: usize, const RESP: usize> {
    session: SecureSession<E>,
    timeouts: Timeouts,
    phase: Phase,
    phase_started: u64,
    conn: Option<ConnectionId>,
    host: String<MAX_HOST_LEN>,
    port: u16,
    secure: bool,
    request: Vec<u8, REQ>,
    staging: BoundedBuffer<STAGING_CAPACITY>,
    response: BoundedBuffer<RESP>,
    frame: Option<Result<Frame, Error>>,
}

impl<E: SecureEngine, const REQ: usize, const RESP: usize> HttpEngine<E, REQ, RESP> {
    pub fn new(engine: E, policy: TlsPolicy) -> Self {
        Self {
            session: SecureSession::new(engine, policy),
            timeouts: Timeouts::default(),
            phase: Phase::Idle,
            phase_started: 0,
            conn: None,
            host: String::new(),
            port: 0,
            secure: false,
            request: Vec::new(),
            staging: BoundedBuffer::new(),
            response: BoundedBuffer::new(),
            frame: None,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn session(&self) -> &SecureSession<E> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SecureSession<E> {
        &mut self.session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether a request is between [`start`](Self::start) and its outcome.
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle | Phase::Done)
    }

    /// The live connection, if any.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.conn
    }

    /// Begin a new request.
    ///
    /// Any connection still open from a previous request is aborted first.
    /// On error the engine is left finished and holds no connection.
    pub fn start<T: Transport>(
        &mut self,
        transport: &mut T,
        target: &Target<'_>,
        request: &Request<'_>,
    ) -> Result<(), Error> {
        if let Some(prior) = self.conn.take() {
            warn!("http: aborting prior connection {=u16}", prior.0);
            transport.abort(prior);
        }
        self.session.end();
        self.staging.clear();
        self.response.clear();
        self.frame = None;
        self.phase = Phase::Done;

        self.host.clear();
        self.host
            .push_str(target.host)
            .map_err(|_| Error::RequestTooLarge)?;
        self.port = target.port;
        self.secure = target.is_secure();
        request.encode(target.host, &mut self.request)?;

        debug!(
            "http: {=str}:{=u16} request of {=usize} bytes",
            target.host,
            target.port,
            self.request.len()
        );

        self.enter(transport, Phase::Resolving);
        let started = match transport.resolve(target.host) {
            Ok(Some(addr)) => self.connect(transport, addr),
            Ok(None) => Ok(()),
            Err(_) => Err(Error::ResolveError),
        };
        if let Err(err) = started {
            error!("http: request to {=str} could not start: {}", target.host, err);
            self.fail(transport, err);
        }
        started
    }

    /// Feed one event from the stack.
    pub fn drive<T: Transport>(&mut self, transport: &mut T, event: Event<'_>) -> Step {
        if !self.is_active() {
            return Step::Pending;
        }
        if let Some(conn) = event_connection(&event) {
            if Some(conn) != self.conn {
                trace!("http: ignoring event for stale connection {=u16}", conn.0);
                return Step::Pending;
            }
        }

        if self.expired(transport.now_ms()) {
            warn!("http: {} timed out", self.phase);
            return self.fail(transport, Error::Timeout);
        }

        match self.handle(transport, event) {
            Ok(step) => step,
            Err(err) => self.fail(transport, err),
        }
    }

    /// The response framed when the connection closed.
    ///
    /// Fails with [`Error::ProtocolError`] until [`drive`](Self::drive) has
    /// returned [`Step::Response`]. Repeated calls see the same contents.
    pub fn response(&self) -> Result<Response<'_>, Error> {
        let frame = self.frame.ok_or(Error::ProtocolError)??;
        Response::view(self.response.as_slice(), frame)
    }

    /// Raw bytes accumulated so far.
    pub fn raw_response(&self) -> &[u8] {
        self.response.as_slice()
    }

    /// Whether the response overflowed its buffer.
    pub fn is_truncated(&self) -> bool {
        self.response.is_truncated()
    }

    /// Tear down any live connection and return to idle.
    pub fn abort<T: Transport>(&mut self, transport: &mut T) {
        if let Some(conn) = self.conn.take() {
            transport.abort(conn);
        }
        self.session.end();
        self.staging.clear();
        self.phase = Phase::Idle;
    }

    fn handle<T: Transport>(&mut self, transport: &mut T, event: Event<'_>) -> Result<Step, Error> {
        match (self.phase, event) {
            (Phase::Resolving, Event::Resolved(addr)) => {
                self.connect(transport, addr)?;
                Ok(Step::Pending)
            }
            (Phase::Resolving, Event::ResolveFailed) => {
                error!("http: lookup for {=str} failed", self.host.as_str());
                Err(Error::ResolveError)
            }
            (Phase::Connecting, Event::Connected(_)) => {
                self.on_connected(transport)?;
                Ok(Step::Pending)
            }
            (_, Event::ConnectFailed(_)) => {
                self.conn = None;
                Err(Error::ConnectError)
            }
            (Phase::Handshaking | Phase::Receiving, Event::DataArrived(_, bytes)) => {
                self.on_data(transport, bytes)?;
                Ok(Step::Pending)
            }
            (_, Event::ReceiveFailed(_)) => Err(Error::ReadError),
            (_, Event::Closed(conn)) => {
                self.conn = None;
                if transport.close(conn).is_err() {
                    transport.abort(conn);
                }
                self.on_closed()
            }
            (_, Event::Error(_)) => {
                // The stack already released the connection.
                self.conn = None;
                Err(Error::NetworkError)
            }
            _ => Ok(Step::Pending),
        }
    }

    fn connect<T: Transport>(&mut self, transport: &mut T, addr: IpAddr) -> Result<(), Error> {
        let conn = transport
            .connect(addr, self.port)
            .map_err(|_| Error::ConnectError)?;
        debug!("http: connecting as {=u16}", conn.0);
        self.conn = Some(conn);
        self.enter(transport, Phase::Connecting);
        Ok(())
    }

    fn on_connected<T: Transport>(&mut self, transport: &mut T) -> Result<(), Error> {
        if !self.secure {
            return self.transmit(transport);
        }
        self.session.begin(&self.host).map_err(|_| Error::HandshakeError)?;
        self.enter(transport, Phase::Handshaking);
        self.advance_handshake(transport)
    }

    fn advance_handshake<T: Transport>(&mut self, transport: &mut T) -> Result<(), Error> {
        let conn = self.conn.ok_or(Error::ConnectionClosed)?;
        let mut io = ChannelIo::new(transport, conn, &mut self.staging);
        match self.session.step(&mut io) {
            HandshakeStep::Complete => {
                debug!("http: handshake complete");
                self.transmit(transport)
            }
            HandshakeStep::InProgress => Ok(()),
            HandshakeStep::Failed(code) => {
                error!("http: handshake failed with {=i32}", code);
                Err(Error::HandshakeError)
            }
        }
    }

    fn transmit<T: Transport>(&mut self, transport: &mut T) -> Result<(), Error> {
        let conn = self.conn.ok_or(Error::ConnectionClosed)?;
        if self.secure {
            let mut io = ChannelIo::new(transport, conn, &mut self.staging);
            self.session
                .write_all(&mut io, &self.request)
                .map_err(|_| Error::WriteError)?;
        } else {
            let mut rest = self.request.as_slice();
            while !rest.is_empty() {
                let n = transport.write(conn, rest).map_err(|_| Error::WriteError)?;
                if n == 0 {
                    return Err(Error::WriteError);
                }
                rest = &rest[n..];
            }
            transport.flush(conn).map_err(|_| Error::WriteError)?;
        }
        debug!("http: sent {=usize} bytes", self.request.len());
        self.enter(transport, Phase::Receiving);
        Ok(())
    }

    fn on_data<T: Transport>(&mut self, transport: &mut T, bytes: &[u8]) -> Result<(), Error> {
        if !self.secure {
            self.store_plaintext(bytes);
            return Ok(());
        }

        let mut rest = bytes;
        while !rest.is_empty() {
            let room = self.staging.capacity() - self.staging.len();
            if room == 0 {
                error!("http: ciphertext staging full");
                return Err(Error::CapacityExceeded);
            }
            let (now, later) = rest.split_at(room.min(rest.len()));
            self.staging.append(now);
            rest = later;

            if self.phase == Phase::Handshaking {
                self.advance_handshake(transport)?;
            }
            if self.phase == Phase::Receiving {
                self.decrypt(transport)?;
            }
        }
        Ok(())
    }

    fn decrypt<T: Transport>(&mut self, transport: &mut T) -> Result<(), Error> {
        let conn = self.conn.ok_or(Error::ConnectionClosed)?;
        let mut plain = [0u8; DECRYPT_CHUNK];
        loop {
            let mut io = ChannelIo::new(transport, conn, &mut self.staging);
            match self.session.read(&mut io, &mut plain) {
                Ok(0) => return Ok(()),
                Ok(n) => self.store_plaintext(&plain[..n]),
                Err(TlsError::WantRead | TlsError::WantWrite) => return Ok(()),
                Err(TlsError::Fatal(code)) => {
                    error!("http: decrypt failed with {=i32}", code);
                    return Err(Error::ReadError);
                }
            }
        }
    }

    fn store_plaintext(&mut self, bytes: &[u8]) {
        let taken = self.response.append(bytes);
        if taken < bytes.len() {
            warn!(
                "http: response buffer full, dropped {=usize} bytes",
                bytes.len() - taken
            );
        }
    }

    fn on_closed(&mut self) -> Result<Step, Error> {
        self.session.end();
        self.staging.clear();
        if self.phase != Phase::Receiving || self.response.is_empty() {
            warn!("http: closed in {} with no response", self.phase);
            return Err(Error::ConnectionClosed);
        }
        info!(
            "http: response complete, {=usize} bytes",
            self.response.len()
        );
        self.frame = Some(Frame::locate(self.response.as_mut_slice()));
        self.phase = Phase::Done;
        Ok(Step::Response)
    }

    fn fail<T: Transport>(&mut self, transport: &mut T, err: Error) -> Step {
        if let Some(conn) = self.conn.take() {
            transport.abort(conn);
        }
        self.session.end();
        self.staging.clear();
        self.phase = Phase::Done;
        Step::Failed(err)
    }

    fn enter<T: Transport>(&mut self, transport: &T, phase: Phase) {
        trace!("http: {} -> {}", self.phase, phase);
        self.phase = phase;
        self.phase_started = transport.now_ms();
    }

    fn expired(&self, now: u64) -> bool {
        let limit = self.timeouts.limit(self.phase);
        limit != 0 && now.saturating_sub(self.phase_started) >= u64::from(limit)
    }
}

fn event_connection(event: &Event<'_>) -> Option<ConnectionId> {
    match *event {
        Event::Connected(conn)
        | Event::ConnectFailed(conn)
        | Event::DataArrived(conn, _)
        | Event::ReceiveFailed(conn)
        | Event::Closed(conn)
        | Event::Error(conn) => Some(conn),
        Event::Resolved(_) | Event::ResolveFailed | Event::Datagram(_) | Event::Tick => None,
    }
}
