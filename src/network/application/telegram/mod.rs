//! Message bot client: send text to a chat and long-poll for new messages.
//!
//! Always runs over HTTPS. Polling tracks the highest update id seen so the
//! next poll only asks for newer updates.

use super::http::scan;
use super::status::{Message, message};
use heapless::{String, Vec};

pub mod client;

pub use client::{RequestKind, TelegramClient};

/// Most messages kept from one poll.
pub const MAX_MESSAGES: usize = 15;
pub const TEXT_CAPACITY: usize = 256;
pub const USERNAME_CAPACITY: usize = 32;

/// One received chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatMessage {
    pub message_id: i64,
    pub chat_id: i64,
    pub username: String<USERNAME_CAPACITY>,
    pub text: String<TEXT_CAPACITY>,
    /// Unix seconds.
    pub timestamp: i64,
}

const OK_FALSE: &[u8] = b"\"ok\":false";
const DESCRIPTION_KEY: &[u8] = b"\"description\":\"";

fn service_error(body: &[u8]) -> Option<Message> {
    scan::remote_error(body, OK_FALSE, DESCRIPTION_KEY, "API error")
}

/// Interpret the reply to a send.
pub fn check_sent(body: &[u8]) -> Result<(), Message> {
    if let Some(msg) = service_error(body) {
        return Err(msg);
    }
    if scan::contains(body, b"\"ok\":true") {
        Ok(())
    } else {
        Err(message("Failed to send message"))
    }
}

/// Pull messages out of an update poll into `out`, replacing its contents.
///
/// `last_seen_id` is raised to the highest update id scanned, whether or not
/// that update carried usable text. Scanning stops once `out` is full, so
/// later updates are fetched again by the next poll. A reply without a
/// result array is an empty poll, not an error.
pub fn extract_updates(
    body: &[u8],
    last_seen_id: &mut i64,
    out: &mut Vec<ChatMessage, MAX_MESSAGES>,
) -> Result<usize, Message> {
    out.clear();

    if let Some(msg) = service_error(body) {
        return Err(msg);
    }

    let Some(result_at) = scan::find(body, b"\"result\":[") else {
        debug!("telegram: no result array");
        return Ok(0);
    };

    for update in scan::records(&body[result_at..], b"\"update_id\":") {
        if out.is_full() {
            break;
        }

        let update_id = scan::parse_i64(update);
        if update_id > *last_seen_id {
            *last_seen_id = update_id;
        }

        let Some(msg_at) = scan::find(update, b"\"message\":{") else {
            continue;
        };
        let msg = &update[msg_at..];

        let Some(message_id) = scan::int_field(msg, b"\"message_id\":") else {
            continue;
        };
        let Some(chat_id) = scan::int_field(msg, b"\"chat\":{\"id\":") else {
            continue;
        };
        let text: String<TEXT_CAPACITY> = scan::string_field(msg, b"\"text\":\"")
            .map(|(s, _)| s)
            .unwrap_or_default();
        if text.is_empty() {
            continue;
        }

        // Bounded by `is_full` above.
        let _ = out.push(ChatMessage {
            message_id,
            chat_id,
            username: scan::string_field(msg, b"\"username\":\"")
                .map(|(s, _)| s)
                .unwrap_or_default(),
            text,
            timestamp: scan::int_field(msg, b"\"date\":").unwrap_or(0),
        });
    }

    debug!(
        "telegram: parsed {=usize} messages, last update {=i64}",
        out.len(),
        *last_seen_id
    );
    Ok(out.len())
}
