//! Scripted network stack and a toy secure engine for driving clients in tests

use core::net::{IpAddr, Ipv4Addr};
use libcloudlink::network::tls::{BioIo, SecureEngine, TlsError, TlsPolicy};
use libcloudlink::network::*;

pub const SERVER_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    Refused,
}

/// Records every call a client makes and answers from a script.
#[derive(Debug, Default)]
pub struct MockStack {
    pub now: u64,
    /// Answer lookups immediately instead of through an event.
    pub cached: Option<IpAddr>,
    pub refuse_lookup: bool,
    pub refuse_connect: bool,
    pub refuse_send: bool,
    /// Largest chunk one `write` call accepts.
    pub write_limit: Option<usize>,
    pub lookups: Vec<String>,
    pub connects: Vec<(IpAddr, u16, ConnectionId)>,
    pub written: Vec<u8>,
    pub flushes: usize,
    pub closed: Vec<ConnectionId>,
    pub aborted: Vec<ConnectionId>,
    pub datagrams: Vec<(IpAddr, u16, Vec<u8>)>,
    next_conn: u16,
}

impl MockStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack whose lookups are answered from cache.
    pub fn cached() -> Self {
        Self {
            cached: Some(SERVER_IP),
            ..Self::default()
        }
    }

    /// The most recently opened connection.
    pub fn last_conn(&self) -> ConnectionId {
        self.connects.last().map(|c| c.2).expect("no connection opened")
    }

    /// Everything written as text.
    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }
}

impl Clock for MockStack {
    fn now_ms(&self) -> u64 {
        self.now
    }
}

impl Resolve for MockStack {
    type Error = StackError;

    fn resolve(&mut self, host: &str) -> Result<Option<IpAddr>, Self::Error> {
        self.lookups.push(host.to_string());
        if self.refuse_lookup {
            return Err(StackError::Refused);
        }
        Ok(self.cached)
    }
}

impl Connect for MockStack {
    type Error = StackError;

    fn connect(&mut self, addr: IpAddr, port: u16) -> Result<ConnectionId, Self::Error> {
        if self.refuse_connect {
            return Err(StackError::Refused);
        }
        self.next_conn += 1;
        let conn = ConnectionId(self.next_conn);
        self.connects.push((addr, port, conn));
        Ok(conn)
    }
}

impl Write for MockStack {
    type Error = StackError;

    fn write(&mut self, _conn: ConnectionId, buf: &[u8]) -> Result<usize, Self::Error> {
        let n = self.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self, _conn: ConnectionId) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}

impl Close for MockStack {
    type Error = StackError;

    fn close(&mut self, conn: ConnectionId) -> Result<(), Self::Error> {
        self.closed.push(conn);
        Ok(())
    }

    fn abort(&mut self, conn: ConnectionId) {
        self.aborted.push(conn);
    }
}

impl Transport for MockStack {}

impl UdpSocket for MockStack {
    type SendError = StackError;

    fn send_to(&mut self, addr: IpAddr, port: u16, buf: &[u8]) -> Result<(), Self::SendError> {
        if self.refuse_send {
            return Err(StackError::Refused);
        }
        self.datagrams.push((addr, port, buf.to_vec()));
        Ok(())
    }
}

/// What the toy engine sends to open a handshake.
pub const CLIENT_HELLO: &[u8] = b"HELLO";
/// What a server sends back to complete it.
pub const SERVER_HELLO: &[u8] = b"SERVER";
/// A byte that makes the toy handshake fail.
pub const ALERT: u8 = b'!';
pub const ALERT_CODE: i32 = -0x7200;

const KEY: u8 = 0x5A;

/// XOR "cipher" with a byte-counting handshake.
#[derive(Debug, Default)]
pub struct ToyTls {
    /// Never finish the handshake and never consume input.
    pub stall: bool,
    pub resets: usize,
    pub last_server_name: String,
    pub(crate) hello_sent: bool,
    pub(crate) seen: usize,
}

impl SecureEngine for ToyTls {
    fn reset(&mut self, server_name: &str, _policy: &TlsPolicy) -> Result<(), TlsError> {
        self.resets += 1;
        self.last_server_name = server_name.to_string();
        self.hello_sent = false;
        self.seen = 0;
        Ok(())
    }

    fn handshake<B: BioIo>(&mut self, io: &mut B) -> Result<(), TlsError> {
        if !self.hello_sent {
            io.push(CLIENT_HELLO)?;
            self.hello_sent = true;
        }
        if self.stall {
            return Err(TlsError::WantRead);
        }
        let mut byte = [0u8; 1];
        while self.seen < SERVER_HELLO.len() {
            io.pull(&mut byte)?;
            if byte[0] == ALERT {
                return Err(TlsError::Fatal(ALERT_CODE));
            }
            self.seen += 1;
        }
        Ok(())
    }

    fn write<B: BioIo>(&mut self, io: &mut B, plaintext: &[u8]) -> Result<usize, TlsError> {
        let mut record = [0u8; 16];
        let n = plaintext.len().min(record.len());
        for (out, byte) in record.iter_mut().zip(&plaintext[..n]) {
            *out = byte ^ KEY;
        }
        io.push(&record[..n])
    }

    fn read<B: BioIo>(&mut self, io: &mut B, buf: &mut [u8]) -> Result<usize, TlsError> {
        let n = io.pull(buf)?;
        for byte in &mut buf[..n] {
            *byte ^= KEY;
        }
        Ok(n)
    }
}

/// Encrypt or decrypt for the toy engine.
pub fn seal(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|b| b ^ KEY).collect()
}

/// Plaintext of everything the toy engine wrote after its hello.
pub fn opened_request(stack: &MockStack) -> String {
    let sealed = stack
        .written
        .strip_prefix(CLIENT_HELLO)
        .expect("handshake did not start with a hello");
    String::from_utf8(seal(sealed)).expect("request is not text")
}

/// Answer the open connection over plain transport.
pub fn serve_plain<F>(stack: &mut MockStack, response: &[u8], mut drive: F)
where
    F: FnMut(&mut MockStack, Event<'_>),
{
    let conn = stack.last_conn();
    drive(stack, Event::Connected(conn));
    drive(stack, Event::DataArrived(conn, response));
    drive(stack, Event::Closed(conn));
}

/// Answer the open connection through the toy engine.
pub fn serve_secure<F>(stack: &mut MockStack, response: &[u8], mut drive: F)
where
    F: FnMut(&mut MockStack, Event<'_>),
{
    let conn = stack.last_conn();
    drive(stack, Event::Connected(conn));
    drive(stack, Event::DataArrived(conn, SERVER_HELLO));
    let sealed = seal(response);
    drive(stack, Event::DataArrived(conn, &sealed));
    drive(stack, Event::Closed(conn));
}

/// A `200 OK` response with a length-framed body.
pub fn ok_response(body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}
