//! # Application Layer Clients
//!
//! This module contains the HTTP engine and the cloud service clients built
//! on it. Every client follows the same pattern:
//!
//! 1. Build the client from its configuration section
//! 2. Start an operation (`fetch_headlines`, `send_message`, ...)
//! 3. Hand every network callback to the client's `drive` method
//! 4. Read the results once its [`State`](status::State) is `Success` or `Error`
//!
//! ## Available Clients
//!
//! - **[`headlines`]**: top headlines over plain HTTP or HTTPS
//! - **[`telegram`]**: message bot over HTTPS
//! - **[`weather`]**: forecast and map tile over HTTPS
//! - **[`ntp`]**: SNTP time sync over UDP
//!
//! Only one operation per client is in flight at a time; clients are
//! independent of each other and may run concurrently.

/// HTTP/1.1 request engine.
///
/// Drives one request at a time through lookup, connect, optional secure
/// handshake, transmission and response assembly.
pub mod http;

/// Client lifecycle state shared by the service clients.
pub mod status;

/// Top headlines client.
pub mod headlines;

/// Message bot client.
pub mod telegram;

/// Forecast and map tile client.
pub mod weather;

/// SNTP time sync client.
pub mod ntp;
