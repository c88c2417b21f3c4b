//! HTTP/1.1 over a callback-driven transport.
//!
//! This module provides the request engine every service client is built on,
//! designed for `no_std` environments where the network stack reports
//! progress through callbacks instead of blocking calls.
//!
//! # Features
//!
//! - Plain and secure connections through any [`SecureEngine`](crate::network::tls::SecureEngine)
//! - Fixed-size request, staging and response buffers
//! - `Content-Length` and chunked body framing
//! - Per-phase timeouts
//!
//! # Usage
//!
//! ```rust,no_run
//! use libcloudlink::network::application::http::{HttpEngine, Request, Step, Target};
//! use libcloudlink::network::tls::{PlainOnly, TlsPolicy};
//! # use libcloudlink::network::*;
//! # use core::net::IpAddr;
//! # struct Stack;
//! # impl Clock for Stack { fn now_ms(&self) -> u64 { 0 } }
//! # impl Resolve for Stack {
//! #     type Error = ();
//! #     fn resolve(&mut self, _host: &str) -> Result<Option<IpAddr>, ()> { Ok(None) }
//! # }
//! # impl Connect for Stack {
//! #     type Error = ();
//! #     fn connect(&mut self, _a: IpAddr, _p: u16) -> Result<ConnectionId, ()> { Ok(ConnectionId(1)) }
//! # }
//! # impl Write for Stack {
//! #     type Error = ();
//! #     fn write(&mut self, _c: ConnectionId, b: &[u8]) -> Result<usize, ()> { Ok(b.len()) }
//! #     fn flush(&mut self, _c: ConnectionId) -> Result<(), ()> { Ok(()) }
//! # }
//! # impl Close for Stack {
//! #     type Error = ();
//! #     fn close(&mut self, _c: ConnectionId) -> Result<(), ()> { Ok(()) }
//! #     fn abort(&mut self, _c: ConnectionId) {}
//! # }
//! # impl Transport for Stack {}
//! # let mut stack = Stack;
//! # let event = Event::Tick;
//! let mut engine: HttpEngine<PlainOnly, 512, 2048> = HttpEngine::new(PlainOnly, TlsPolicy::default());
//! engine.start(&mut stack, &Target::http("example.org"), &Request::get("/status")).ok();
//!
//! // From the network stack's callback:
//! if let Step::Response = engine.drive(&mut stack, event) {
//!     let response = engine.response();
//! }
//! ```

pub mod engine;
pub mod request;
pub mod response;
pub mod scan;

pub use engine::{HttpEngine, Phase, Step, Timeouts};
pub use request::{Header, Method, Request, Scheme, Target};
pub use response::{Frame, Response};
