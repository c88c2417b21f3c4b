use super::scan;
use crate::network::error::Error;

/// A parsed view over an accumulated response.
#[derive(Debug)]
pub struct Response<'a> {
    pub status_code: u16,
    head: &'a str,
    pub body: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Length(usize),
    Chunked,
    UntilClose,
}

/// Where the parts of a framed response sit in its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub status_code: u16,
    head_end: usize,
    body_len: usize,
}

impl Frame {
    /// Locate status, headers and body in `data`.
    ///
    /// A chunked body is de-chunked in place, so `data` is modified and must
    /// afterwards only be read through [`Response::view`]. The body is
    /// trimmed to `Content-Length` when the header is present. A body cut
    /// short by buffer truncation is kept as far as it goes.
    pub fn locate(data: &mut [u8]) -> Result<Frame, Error> {
        let head_end = scan::find(data, b"\r\n\r\n").ok_or(Error::ProtocolError)?;
        let body_start = head_end + 4;

        let (status_code, framing) = {
            let head = core::str::from_utf8(&data[..head_end]).map_err(|_| Error::ProtocolError)?;
            (parse_status_line(head)?, framing(head))
        };

        let available = data.len() - body_start;
        let body_len = match framing {
            Framing::Length(len) => len.min(available),
            Framing::Chunked => dechunk(&mut data[body_start..]),
            Framing::UntilClose => available,
        };
        Ok(Frame {
            status_code,
            head_end,
            body_len,
        })
    }
}

impl<'a> Response<'a> {
    /// Split `data` into status, headers and body in one pass.
    ///
    /// Equivalent to [`Frame::locate`] followed by [`Response::view`].
    pub fn parse(data: &'a mut [u8]) -> Result<Response<'a>, Error> {
        let frame = Frame::locate(data)?;
        Response::view(data, frame)
    }

    /// A read-only view over a buffer already processed by [`Frame::locate`].
    pub fn view(data: &'a [u8], frame: Frame) -> Result<Response<'a>, Error> {
        let body_start = frame.head_end + 4;
        let body = data
            .get(body_start..body_start + frame.body_len)
            .ok_or(Error::ProtocolError)?;
        let head = core::str::from_utf8(&data[..frame.head_end]).map_err(|_| Error::ProtocolError)?;
        Ok(Response {
            status_code: frame.status_code,
            head,
            body,
        })
    }

    /// Value of the first header called `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&'a str> {
        header_lines(self.head).find_map(|(n, v)| n.eq_ignore_ascii_case(name).then_some(v))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

fn parse_status_line(head: &str) -> Result<u16, Error> {
    let status_line = head.lines().next().ok_or(Error::ProtocolError)?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().ok_or(Error::ProtocolError)?;
    if !version.starts_with("HTTP/") {
        return Err(Error::ProtocolError);
    }
    parts
        .next()
        .ok_or(Error::ProtocolError)?
        .parse::<u16>()
        .map_err(|_| Error::ProtocolError)
}

fn header_lines(head: &str) -> impl Iterator<Item = (&str, &str)> {
    head.lines().skip(1).filter_map(|line| {
        let (name, value) = line.split_once(':')?;
        Some((name.trim(), value.trim()))
    })
}

fn framing(head: &str) -> Framing {
    let mut length = None;
    for (name, value) in header_lines(head) {
        if name.eq_ignore_ascii_case("Transfer-Encoding")
            && value
                .split(',')
                .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
        {
            return Framing::Chunked;
        }
        if name.eq_ignore_ascii_case("Content-Length") {
            length = value.parse::<usize>().ok();
        }
    }
    length.map_or(Framing::UntilClose, Framing::Length)
}

/// Remove chunk framing from `buf` in place, returning the payload length.
///
/// Stops at the terminating zero-size chunk or wherever the data runs out.
fn dechunk(buf: &mut [u8]) -> usize {
    let mut read = 0;
    let mut written = 0;
    loop {
        let Some(line_end) = scan::find_from(buf, read, b"\r\n") else {
            break;
        };
        let Some(size) = chunk_size(&buf[read..line_end]) else {
            break;
        };
        if size == 0 {
            break;
        }
        read = line_end + 2;
        let take = size.min(buf.len() - read);
        buf.copy_within(read..read + take, written);
        written += take;
        read += take;
        if take < size {
            break;
        }
        // CRLF after the chunk data
        read += 2;
        if read > buf.len() {
            break;
        }
    }
    written
}

fn chunk_size(line: &[u8]) -> Option<usize> {
    let mut size: usize = 0;
    let mut digits = 0;
    for &b in line {
        let d = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => break,
        };
        size = size.checked_mul(16)?.checked_add(usize::from(d))?;
        digits += 1;
    }
    (digits > 0).then_some(size)
}
