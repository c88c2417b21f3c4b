//! Top-headlines client for a news aggregation service.
//!
//! Fetches the current headlines for a country over plain HTTP (or HTTPS
//! when configured) and keeps up to [`MAX_ARTICLES`] of them.

use super::http::scan;
use super::status::{Message, message};
use heapless::{String, Vec};

pub mod client;

pub use client::HeadlineClient;

/// Most articles kept from one response.
pub const MAX_ARTICLES: usize = 10;
pub const TITLE_CAPACITY: usize = 128;
pub const SOURCE_CAPACITY: usize = 64;
pub const DESCRIPTION_CAPACITY: usize = 256;

/// How the API key travels with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialPlacement {
    /// `apiKey=` query parameter.
    #[default]
    Query,
    /// `X-Api-Key` request header, kept out of the request line.
    Header,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    pub title: String<TITLE_CAPACITY>,
    pub source: String<SOURCE_CAPACITY>,
    pub description: String<DESCRIPTION_CAPACITY>,
}

const TITLE_KEY: &[u8] = b"\"title\":\"";
const NAME_KEY: &[u8] = b"\"name\":\"";
const DESCRIPTION_KEY: &[u8] = b"\"description\":\"";

/// Pull articles out of a response body into `out`, replacing its contents.
///
/// Each title is paired with the source name found between it and the
/// previous article (where the service nests it), falling back to one later
/// in the same article object. The description is the first one after the
/// title. Neither lookup crosses into a neighbouring article.
pub fn extract_headlines(body: &[u8], out: &mut Vec<Article, MAX_ARTICLES>) -> Result<usize, Message> {
    out.clear();

    if let Some(msg) = scan::remote_error(body, b"\"status\":\"error\"", b"\"message\":\"", "API error") {
        return Err(msg);
    }

    let mut prev_end = 0;
    let mut pos = 0;
    while !out.is_full() {
        let Some(key_at) = scan::find_from(body, pos, TITLE_KEY) else {
            break;
        };
        let start = key_at + TITLE_KEY.len();
        let Some(end) = scan::string_end(body, start) else {
            break;
        };
        let next = scan::find_from(body, end + 1, TITLE_KEY).unwrap_or(body.len());
        let article_end = scan::object_end(body, end + 1).min(next);

        let before = &body[prev_end.min(key_at)..key_at];
        let after = &body[end + 1..article_end];

        let source = scan::find_last(before, NAME_KEY)
            .and_then(|at| scan::string_field(&before[at..], NAME_KEY))
            .or_else(|| scan::string_field(after, NAME_KEY))
            .map(|(s, _)| s)
            .unwrap_or_default();
        let description = scan::string_field(after, DESCRIPTION_KEY)
            .map(|(s, _)| s)
            .unwrap_or_default();

        // Bounded by `is_full` above.
        let _ = out.push(Article {
            title: scan::decode_escaped(&body[start..end]),
            source,
            description,
        });

        prev_end = article_end;
        pos = end + 1;
    }

    debug!("headlines: parsed {=usize} articles", out.len());
    if out.is_empty() {
        return Err(message("No articles found"));
    }
    Ok(out.len())
}
