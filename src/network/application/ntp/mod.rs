//! SNTP time synchronisation.
//!
//! Sends one client packet and converts the server's transmit timestamp to
//! Unix time. Afterwards the current time is derived from the local
//! monotonic clock, so no further network traffic is needed.

pub mod client;

pub use client::{SntpClient, SyncState};

/// Size of an SNTP packet.
pub const PACKET_LEN: usize = 48;
/// Seconds between the NTP era (1900) and the Unix epoch (1970).
pub const NTP_UNIX_DELTA: u64 = 2_208_988_800;
/// Leap indicator 0, version 4, mode 3 (client).
pub const CLIENT_MODE_V4: u8 = 0x23;

const TRANSMIT_SECONDS: usize = 40;

/// A zeroed client request packet.
pub fn request_packet() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = CLIENT_MODE_V4;
    packet
}

/// Unix seconds from a server reply.
///
/// `None` for short datagrams and for replies with a zero transmit timestamp.
pub fn parse_reply(datagram: &[u8]) -> Option<u64> {
    if datagram.len() < PACKET_LEN {
        return None;
    }
    let bytes: [u8; 4] = datagram[TRANSMIT_SECONDS..TRANSMIT_SECONDS + 4]
        .try_into()
        .ok()?;
    let ntp_seconds = u64::from(u32::from_be_bytes(bytes));
    if ntp_seconds == 0 {
        return None;
    }
    // Era 0 ends in 2036; later values have wrapped into era 1.
    let ntp_seconds = if ntp_seconds < NTP_UNIX_DELTA {
        ntp_seconds + (1 << 32)
    } else {
        ntp_seconds
    };
    Some(ntp_seconds - NTP_UNIX_DELTA)
}

/// Broken-down UTC time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: i32,
    /// 1 to 12.
    pub month: u8,
    /// 1 to 31.
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 0 is Sunday.
    pub weekday: u8,
}

#[cfg(feature = "defmt")]
impl defmt::Format for DateTime {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{=i32}-{=u8}-{=u8} {=u8}:{=u8}:{=u8} UTC",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second
        )
    }
}

impl DateTime {
    /// Civil UTC time for `unix` seconds.
    pub fn from_unix(unix: u64) -> Self {
        let days = (unix / 86_400) as i64;
        let secs = unix % 86_400;

        // Days-to-civil over 400-year eras, starting each year in March.
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z.rem_euclid(146_097);
        let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = doy - (153 * mp + 2) / 5 + 1;
        let month = if mp < 10 { mp + 3 } else { mp - 9 };
        let year = yoe + era * 400 + i64::from(month <= 2);

        Self {
            year: year as i32,
            month: month as u8,
            day: day as u8,
            hour: (secs / 3_600) as u8,
            minute: (secs % 3_600 / 60) as u8,
            second: (secs % 60) as u8,
            // 1970-01-01 was a Thursday.
            weekday: ((days + 4).rem_euclid(7)) as u8,
        }
    }
}
