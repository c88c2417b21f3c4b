use crate::mock::*;
use libcloudlink::config::NtpConfig;
use libcloudlink::network::application::ntp::{NTP_UNIX_DELTA, PACKET_LEN, SntpClient, SyncState};
use libcloudlink::network::error::Error;
use libcloudlink::network::Event;
use std::sync::atomic::{AtomicUsize, Ordering};

fn reply(unix: u64) -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = 0x24;
    packet[40..44].copy_from_slice(&((unix + NTP_UNIX_DELTA) as u32).to_be_bytes());
    packet
}

#[test]
fn test_sync_and_derive_time() {
    let mut stack = MockStack::new();
    stack.now = 1_000;
    let mut client = SntpClient::new(NtpConfig::default());

    client.request(&mut stack);
    assert_eq!(client.state(), SyncState::Requesting);
    assert_eq!(stack.lookups, ["pool.ntp.org"]);
    assert!(stack.datagrams.is_empty());
    assert_eq!(client.timestamp(stack.now), None);

    client.drive(&mut stack, Event::Resolved(SERVER_IP));
    let (addr, port, packet) = &stack.datagrams[0];
    assert_eq!((*addr, *port), (SERVER_IP, 123));
    assert_eq!(packet.len(), PACKET_LEN);
    assert_eq!(packet[0], 0x23);

    // Runt datagrams are ignored.
    client.drive(&mut stack, Event::Datagram(&[0x24; 12]));
    assert_eq!(client.state(), SyncState::Requesting);

    stack.now = 1_500;
    client.drive(&mut stack, Event::Datagram(&reply(1_700_000_000)));
    assert_eq!(client.state(), SyncState::Synced);
    assert_eq!(client.timestamp(1_500), Some(1_700_000_000));
    assert_eq!(client.timestamp(4_499), Some(1_700_000_002));

    let now = client.date_time(1_500).unwrap();
    assert_eq!((now.year, now.month, now.day), (2023, 11, 14));
    assert_eq!((now.hour, now.minute, now.second), (22, 13, 20));
}

#[test]
fn test_cached_server_sends_immediately() {
    let mut stack = MockStack::cached();
    let mut client = SntpClient::new(NtpConfig::default());

    client.request_server(&mut stack, "time.example.org");
    assert_eq!(stack.lookups, ["time.example.org"]);
    assert_eq!(stack.datagrams.len(), 1);

    // A second request while one is pending is ignored.
    client.request(&mut stack);
    assert_eq!(stack.datagrams.len(), 1);
}

static SYNCED: AtomicUsize = AtomicUsize::new(0);
static FAILED: AtomicUsize = AtomicUsize::new(0);

fn on_sync(ok: bool) {
    if ok {
        SYNCED.fetch_add(1, Ordering::SeqCst);
    } else {
        FAILED.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_callback_and_timeout() {
    let mut stack = MockStack::cached();
    let mut client = SntpClient::new(NtpConfig {
        timeout_ms: 2_000,
        ..NtpConfig::default()
    });
    client.set_callback(on_sync);

    client.request(&mut stack);
    stack.now = 1_999;
    client.drive(&mut stack, Event::Tick);
    assert_eq!(client.state(), SyncState::Requesting);
    stack.now = 2_000;
    client.drive(&mut stack, Event::Tick);
    assert_eq!(client.state(), SyncState::Error);
    assert_eq!(client.last_error(), Some(Error::Timeout));
    assert_eq!(client.timestamp(stack.now), None);
    assert_eq!(FAILED.load(Ordering::SeqCst), 1);

    // Late replies after the timeout change nothing.
    client.drive(&mut stack, Event::Datagram(&reply(1_700_000_000)));
    assert_eq!(client.state(), SyncState::Error);

    client.request(&mut stack);
    client.drive(&mut stack, Event::Datagram(&reply(1_700_000_000)));
    assert_eq!(client.state(), SyncState::Synced);
    assert_eq!(client.last_error(), None);
    assert_eq!(SYNCED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_lookup_and_send_failures() {
    let mut stack = MockStack::new();
    let mut client = SntpClient::new(NtpConfig::default());

    client.request(&mut stack);
    client.drive(&mut stack, Event::ResolveFailed);
    assert_eq!(client.state(), SyncState::Error);
    assert_eq!(client.last_error(), Some(Error::ResolveError));

    let mut stack = MockStack::cached();
    stack.refuse_send = true;
    client.request(&mut stack);
    assert_eq!(client.state(), SyncState::Error);
    assert_eq!(client.last_error(), Some(Error::WriteError));

    let mut stack = MockStack::new();
    stack.refuse_lookup = true;
    client.request(&mut stack);
    assert_eq!(client.last_error(), Some(Error::ResolveError));
}

#[test]
fn test_zero_timestamp_is_ignored() {
    let mut stack = MockStack::cached();
    let mut client = SntpClient::new(NtpConfig::default());

    client.request(&mut stack);
    client.drive(&mut stack, Event::Datagram(&[0u8; PACKET_LEN]));
    assert_eq!(client.state(), SyncState::Requesting);
}
