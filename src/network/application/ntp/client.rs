use super::{DateTime, parse_reply, request_packet};
use crate::config::NtpConfig;
use crate::network::error::Error;
use crate::network::{Event, UdpSocket};
use core::net::IpAddr;

/// Where the client is in its sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Requesting,
    Synced,
    Error,
}

#[cfg(feature = "defmt")]
impl defmt::Format for SyncState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            SyncState::Idle => defmt::write!(f, "Idle"),
            SyncState::Requesting => defmt::write!(f, "Requesting"),
            SyncState::Synced => defmt::write!(f, "Synced"),
            SyncState::Error => defmt::write!(f, "Error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Waiting {
    Lookup,
    Reply,
}

/// Called with `true` on sync and `false` on failure.
pub type SyncCallback = fn(bool);

/// One-shot SNTP client.
#[derive(Debug)]
pub struct SntpClient {
    config: NtpConfig,
    state: SyncState,
    waiting: Waiting,
    started_ms: u64,
    sync_unix: u64,
    sync_at_ms: u64,
    last_error: Option<Error>,
    on_sync: Option<SyncCallback>,
}

impl SntpClient {
    pub fn new(config: NtpConfig) -> Self {
        Self {
            config,
            state: SyncState::Idle,
            waiting: Waiting::Lookup,
            started_ms: 0,
            sync_unix: 0,
            sync_at_ms: 0,
            last_error: None,
            on_sync: None,
        }
    }

    /// Register a function to call when a request finishes.
    pub fn set_callback(&mut self, callback: SyncCallback) {
        self.on_sync = Some(callback);
    }

    /// Request the time from the configured server.
    pub fn request<U: UdpSocket>(&mut self, socket: &mut U) {
        let server = self.config.server.clone();
        self.request_server(socket, &server);
    }

    /// Request the time from `server`. Does nothing while a request is in flight.
    pub fn request_server<U: UdpSocket>(&mut self, socket: &mut U, server: &str) {
        if self.state == SyncState::Requesting {
            debug!("ntp: request already in progress");
            return;
        }
        info!("ntp: requesting time from {=str}", server);
        self.state = SyncState::Requesting;
        self.waiting = Waiting::Lookup;
        self.started_ms = socket.now_ms();
        self.last_error = None;

        match socket.resolve(server) {
            Ok(Some(addr)) => self.send(socket, addr),
            Ok(None) => {}
            Err(_) => self.finish(Err(Error::ResolveError)),
        }
    }

    /// Feed one network event to the client.
    pub fn drive<U: UdpSocket>(&mut self, socket: &mut U, event: Event<'_>) {
        if self.state != SyncState::Requesting {
            return;
        }
        let limit = u64::from(self.config.timeout_ms);
        if limit != 0 && socket.now_ms().saturating_sub(self.started_ms) >= limit {
            warn!("ntp: request timed out");
            self.finish(Err(Error::Timeout));
            return;
        }

        match (self.waiting, event) {
            (Waiting::Lookup, Event::Resolved(addr)) => self.send(socket, addr),
            (Waiting::Lookup, Event::ResolveFailed) => self.finish(Err(Error::ResolveError)),
            (Waiting::Reply, Event::Datagram(bytes)) => match parse_reply(bytes) {
                Some(unix) => {
                    self.sync_unix = unix;
                    self.sync_at_ms = socket.now_ms();
                    info!("ntp: synced at unix {=u64}", unix);
                    self.finish(Ok(()));
                }
                None => trace!("ntp: ignoring {=usize} byte datagram", bytes.len()),
            },
            _ => {}
        }
    }

    fn send<U: UdpSocket>(&mut self, socket: &mut U, addr: IpAddr) {
        match socket.send_to(addr, self.config.port, &request_packet()) {
            Ok(()) => {
                debug!("ntp: request sent");
                self.waiting = Waiting::Reply;
            }
            Err(_) => self.finish(Err(Error::WriteError)),
        }
    }

    fn finish(&mut self, outcome: Result<(), Error>) {
        let synced = outcome.is_ok();
        match outcome {
            Ok(()) => self.state = SyncState::Synced,
            Err(err) => {
                error!("ntp: {}", err);
                self.state = SyncState::Error;
                self.last_error = Some(err);
            }
        }
        if let Some(callback) = self.on_sync {
            callback(synced);
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Why the last request failed.
    pub fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    /// Current Unix time, given the local clock reading `now_ms`.
    pub fn timestamp(&self, now_ms: u64) -> Option<u64> {
        if self.state != SyncState::Synced {
            return None;
        }
        Some(self.sync_unix + now_ms.saturating_sub(self.sync_at_ms) / 1_000)
    }

    /// Current UTC civil time, given the local clock reading `now_ms`.
    pub fn date_time(&self, now_ms: u64) -> Option<DateTime> {
        self.timestamp(now_ms).map(DateTime::from_unix)
    }
}
