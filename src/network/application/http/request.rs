use crate::network::error::Error;
use core::fmt::Write;
use heapless::{String, Vec};

/// Sent when the caller does not supply a `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = "libcloudlink/0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Whether the connection is wrapped in a secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target<'a> {
    pub host: &'a str,
    pub port: u16,
    pub scheme: Scheme,
}

impl<'a> Target<'a> {
    pub fn http(host: &'a str) -> Self {
        Self {
            host,
            port: Scheme::Http.default_port(),
            scheme: Scheme::Http,
        }
    }

    pub fn https(host: &'a str) -> Self {
        Self {
            host,
            port: Scheme::Https.default_port(),
            scheme: Scheme::Https,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::Https
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Header<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

impl<'a> Header<'a> {
    pub const fn new(name: &'a str, value: &'a str) -> Self {
        Self { name, value }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub method: Method,
    pub path: &'a str,
    pub headers: &'a [Header<'a>],
    pub body: Option<&'a [u8]>,
}

impl<'a> Request<'a> {
    pub fn get(path: &'a str) -> Self {
        Self {
            method: Method::Get,
            path,
            headers: &[],
            body: None,
        }
    }

    pub fn post(path: &'a str, body: &'a [u8]) -> Self {
        Self {
            method: Method::Post,
            path,
            headers: &[],
            body: Some(body),
        }
    }

    pub fn with_headers(mut self, headers: &'a [Header<'a>]) -> Self {
        self.headers = headers;
        self
    }

    /// Serialise the request for `host` into `out`, replacing its contents.
    ///
    /// Fails with [`Error::RequestTooLarge`] when the text does not fit.
    pub fn encode<const N: usize>(&self, host: &str, out: &mut Vec<u8, N>) -> Result<(), Error> {
        out.clear();

        // Request line
        put(out, self.method.as_str().as_bytes())?;
        put(out, b" ")?;
        put(out, self.path.as_bytes())?;
        put(out, b" HTTP/1.1\r\n")?;

        put_header(out, "Host", host)?;

        let mut has_user_agent = false;
        for header in self.headers {
            if header.name.eq_ignore_ascii_case("User-Agent") {
                has_user_agent = true;
            }
            put_header(out, header.name, header.value)?;
        }
        if !has_user_agent {
            put_header(out, "User-Agent", DEFAULT_USER_AGENT)?;
        }
        put_header(out, "Connection", "close")?;

        if let Some(body) = self.body {
            let mut len_str: String<20> = String::new();
            write!(len_str, "{}", body.len()).map_err(|_| Error::RequestTooLarge)?;
            put_header(out, "Content-Length", &len_str)?;
            put(out, b"\r\n")?;
            put(out, body)?;
        } else {
            put(out, b"\r\n")?;
        }
        Ok(())
    }
}

fn put<const N: usize>(out: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    out.extend_from_slice(bytes)
        .map_err(|_| Error::RequestTooLarge)
}

fn put_header<const N: usize>(out: &mut Vec<u8, N>, name: &str, value: &str) -> Result<(), Error> {
    put(out, name.as_bytes())?;
    put(out, b": ")?;
    put(out, value.as_bytes())?;
    put(out, b"\r\n")
}
