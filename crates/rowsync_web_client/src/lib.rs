//! # Rowsync Web Client
//!
//! HTTP transport for rowsync sessions.
//!
//! This crate provides:
//! - `ClientConfig` for the service URI, serializer, batch size and extra headers
//! - `HttpRequestHandler`, which sends one request and decodes the response
//! - Session cookie capture and replay
//! - Cancellation through a `CancellationToken`
//! - `TransportError`, separating retryable faults from remote sync errors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rowsync_web_client::{ClientConfig, HttpRequestHandler, SyncRequest};
//!
//! let handler = HttpRequestHandler::new(ClientConfig::new("https://sync.example.com/api"))?;
//! let request = SyncRequest::encode(HttpStep::EnsureScopes, session_id, &message, Format::Json)?;
//! let reply: ScopeReply = handler.send(&request, &cancel).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod handler;
mod request;
mod state;

pub use config::{ClientConfig, DEFAULT_BATCH_SIZE, DEFAULT_TIMEOUT};
pub use error::{TransportError, TransportResult};
pub use handler::HttpRequestHandler;
pub use request::SyncRequest;
pub use state::ExchangeState;

pub use tokio_util::sync::CancellationToken;
