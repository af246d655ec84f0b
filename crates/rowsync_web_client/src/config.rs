//! Configuration for the web client.

use rowsync_codec::Format;
use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default download batch size hint.
pub const DEFAULT_BATCH_SIZE: u32 = 500;

/// Configuration of an [`HttpRequestHandler`](crate::HttpRequestHandler).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Sync service URI.
    pub service_uri: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Download batch size hint sent to the server.
    pub batch_size: u32,
    /// Payload serializer.
    pub format: Format,
    /// Converter key, if the server should convert values.
    pub converter: Option<String>,
    /// Query parameters appended to the service URI, in order.
    pub scope_parameters: Vec<(String, String)>,
    /// Extra headers, sent after the protocol headers.
    pub custom_headers: Vec<(String, String)>,
}

impl ClientConfig {
    /// Creates a configuration for `service_uri` with default settings.
    pub fn new(service_uri: impl Into<String>) -> Self {
        Self {
            service_uri: service_uri.into(),
            timeout: DEFAULT_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
            format: Format::default(),
            converter: None,
            scope_parameters: Vec::new(),
            custom_headers: Vec::new(),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the download batch size hint.
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets the payload serializer.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the converter key.
    pub fn with_converter(mut self, converter: impl Into<String>) -> Self {
        self.converter = Some(converter.into());
        self
    }

    /// Appends a query parameter.
    pub fn with_scope_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.scope_parameters.push((name.into(), value.into()));
        self
    }

    /// Appends a custom header. It never replaces a protocol header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("")
    }
}
