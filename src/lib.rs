//! # libcloudlink - cloud service clients for callback-driven network stacks
//!
//! An HTTP(S) client engine and a set of service clients for small devices
//! whose network stack never blocks: every lookup, connect and receive
//! completes later through a callback. This library is designed for embedded
//! systems and supports `no_std` environments without an allocator.
//!
//! ## Features
//!
//! ### Engine
//! - **HTTP engine**: resolve, connect, optional secure handshake, request,
//!   and response assembly driven one [`network::Event`] at a time
//! - **Secure channel adapter**: plug in any TLS implementation through
//!   [`network::tls::SecureEngine`]
//! - **Per-phase timeouts** measured against the stack's clock
//!
//! ### Service Clients
//! - **Headlines**: top news articles by country
//! - **Telegram**: send messages and long-poll for updates
//! - **Weather**: multi-day forecast plus a temperature map tile
//! - **NTP**: one-shot SNTP time synchronisation
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libcloudlink = "0.1.0"
//! ```
//!
//! ### Headlines Example
//!
//! ```rust,no_run
//! use libcloudlink::config::Config;
//! use libcloudlink::network::application::headlines::HeadlineClient;
//! use libcloudlink::network::application::status::State;
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
//!
//! let config = Config::from_json(r#"{"news":{"api_key":"secret"}}"#).unwrap();
//! let mut client = HeadlineClient::plain(config.news);
//! client.fetch_headlines(&mut stack, "us");
//!
//! // From the network stack's callbacks:
//! client.drive(&mut stack, event);
//! if client.state() == State::Success {
//!     for article in client.articles() {
//!         let _ = (&article.title, &article.source);
//!     }
//! }
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers with a callback-style TCP/IP stack
//! - Hosts, for testing against scripted transports
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Network abstraction layer, request engine and service clients.
///
/// This module contains the transport traits a network stack implements,
/// the HTTP engine built on them, and the clients for each cloud service.
pub mod network;

/// Configuration for every client, loadable from JSON.
#[allow(missing_docs)]
pub mod config;
