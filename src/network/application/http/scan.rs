//! Byte-level scanning helpers for loosely structured response bodies.
//!
//! Service payloads are located by key, not parsed as a document: every
//! helper here takes a byte slice and returns positions or bounded values,
//! so extractors stay pure and a truncated body can never overrun a field.

use crate::network::buffer::truncate_utf8;
use heapless::{String, Vec};

/// Finds the first occurrence of a slice in another slice and returns its starting position.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Like [`find`], starting at `from` and returning an absolute position.
pub fn find_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    find(&haystack[from..], needle).map(|pos| pos + from)
}

/// Position of the last occurrence of `needle`.
pub fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(haystack.len());
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Position of the closing quote of a string value whose first content
/// byte is at `start`, skipping backslash-escaped characters.
pub fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Position of the `}` that closes the object enclosing `from`, or the end
/// of `bytes` if it never closes. Braces inside string values are skipped.
pub fn object_end(bytes: &[u8], from: usize) -> usize {
    let mut depth = 0usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => match string_end(bytes, i + 1) {
                Some(end) => i = end,
                None => return bytes.len(),
            },
            b'{' | b'[' => depth += 1,
            b'}' | b']' if depth == 0 => return i,
            b'}' | b']' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Decode `\"`, `\\`, `\/` and `\n` into a bounded string.
///
/// Other escape sequences are copied verbatim. Output stops at the
/// capacity and at any invalid UTF-8.
pub fn decode_escaped<const N: usize>(raw: &[u8]) -> String<N> {
    let mut out: Vec<u8, N> = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        let byte = raw[i];
        let decoded = if byte == b'\\' && i + 1 < raw.len() {
            match raw[i + 1] {
                b'"' | b'\\' | b'/' => {
                    i += 1;
                    raw[i]
                }
                b'n' => {
                    i += 1;
                    b'\n'
                }
                _ => byte,
            }
        } else {
            byte
        };
        if out.push(decoded).is_err() {
            break;
        }
        i += 1;
    }
    truncate_utf8(&out)
}

/// Extract the string value that follows `key` (which must include the
/// opening quote of the value, e.g. `"title":"`).
///
/// Returns the decoded value and the position just past its closing
/// quote, or `None` when the key is absent or the value is unterminated.
pub fn string_field<const N: usize>(bytes: &[u8], key: &[u8]) -> Option<(String<N>, usize)> {
    let start = find(bytes, key)? + key.len();
    let end = string_end(bytes, start)?;
    Some((decode_escaped(&bytes[start..end]), end + 1))
}

/// Integer value that follows `key` (e.g. `"date":`).
pub fn int_field(bytes: &[u8], key: &[u8]) -> Option<i64> {
    let start = find(bytes, key)? + key.len();
    Some(parse_i64(&bytes[start..]))
}

/// Numeric value that follows `key` (e.g. `"temp":`).
pub fn float_field(bytes: &[u8], key: &[u8]) -> Option<f32> {
    let start = find(bytes, key)? + key.len();
    Some(parse_f32(&bytes[start..]))
}

/// Leading integer of `bytes`, after optional blanks and sign.
///
/// Stops at the first non-digit; an empty digit run yields zero.
pub fn parse_i64(bytes: &[u8]) -> i64 {
    let mut i = skip_blanks(bytes, 0);
    let mut negative = false;
    match bytes.get(i) {
        Some(b'-') => {
            negative = true;
            i += 1;
        }
        Some(b'+') => i += 1,
        _ => {}
    }
    let mut value: i64 = 0;
    while let Some(d) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add(i64::from(d - b'0'));
        i += 1;
    }
    if negative { -value } else { value }
}

/// Leading decimal number of `bytes`, accepting a fraction and exponent.
pub fn parse_f32(bytes: &[u8]) -> f32 {
    let mut i = skip_blanks(bytes, 0);
    let mut negative = false;
    match bytes.get(i) {
        Some(b'-') => {
            negative = true;
            i += 1;
        }
        Some(b'+') => i += 1,
        _ => {}
    }

    let mut value: f64 = 0.0;
    while let Some(d) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
        value = value * 10.0 + f64::from(d - b'0');
        i += 1;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let mut scale = 0.1;
        while let Some(d) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
            value += f64::from(d - b'0') * scale;
            scale /= 10.0;
            i += 1;
        }
    }
    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        let exponent = parse_i64(&bytes[i + 1..]).clamp(-38, 38);
        let factor = if exponent < 0 { 0.1 } else { 10.0 };
        for _ in 0..exponent.unsigned_abs() {
            value *= factor;
        }
    }

    let value = value as f32;
    if negative { -value } else { value }
}

fn skip_blanks(bytes: &[u8], mut i: usize) -> usize {
    while matches!(bytes.get(i), Some(b' ') | Some(b'\t')) {
        i += 1;
    }
    i
}

/// Form-encode `input`: unreserved characters are kept, spaces become `+`
/// and every other byte becomes `%XX`.
///
/// Encoding stops before the first unit that would not fit.
pub fn url_encode<const N: usize>(input: &str) -> String<N> {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::new();
    for &byte in input.as_bytes() {
        let fits = match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char).is_ok()
            }
            b' ' => out.push('+').is_ok(),
            _ => {
                if N - out.len() < 3 {
                    false
                } else {
                    // Capacity was checked above.
                    let _ = out.push('%');
                    let _ = out.push(HEX[usize::from(byte >> 4)] as char);
                    let _ = out.push(HEX[usize::from(byte & 0x0F)] as char);
                    true
                }
            }
        };
        if !fits {
            break;
        }
    }
    out
}

/// Service-reported failure detection.
///
/// When `sentinel` occurs in `body`, returns the string under `message_key`
/// if present, otherwise `fallback`. Returns `None` when there is no sentinel.
pub fn remote_error<const N: usize>(
    body: &[u8],
    sentinel: &[u8],
    message_key: &[u8],
    fallback: &str,
) -> Option<String<N>> {
    if !contains(body, sentinel) {
        return None;
    }
    match string_field::<N>(body, message_key) {
        Some((message, _)) => Some(message),
        None => Some(crate::network::buffer::truncate_str(fallback)),
    }
}

/// Iterator over the records of a flat array, split at each `marker`.
///
/// Each item starts right after one occurrence of the marker and ends at the
/// next occurrence (or the end of input), so lookups inside a record never
/// bleed into its neighbour.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    bytes: &'a [u8],
    marker: &'a [u8],
    next: Option<usize>,
}

pub fn records<'a>(bytes: &'a [u8], marker: &'a [u8]) -> Records<'a> {
    Records {
        bytes,
        marker,
        next: find(bytes, marker),
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next? + self.marker.len();
        self.next = find_from(self.bytes, start, self.marker);
        let end = self.next.unwrap_or(self.bytes.len());
        Some(&self.bytes[start..end])
    }
}
