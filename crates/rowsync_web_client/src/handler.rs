//! HTTP request handler.
//!
//! Sends one [`SyncRequest`] to the sync service and decodes its response.
//! The handler keeps the session cookie handed out by the server and replays
//! it on every following request.

use crate::config::ClientConfig;
use crate::error::{TransportError, TransportResult};
use crate::request::SyncRequest;
use crate::state::ExchangeState;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder};
use rowsync_codec::CodecError;
use rowsync_core::SyncError;
use rowsync_protocol::{HttpStep, RemoteError, SerializationFormat, SyncHeaders};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;
use uuid::Uuid;

/// Everything but the RFC 3986 unreserved characters.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Client side of the HTTP sync protocol.
pub struct HttpRequestHandler {
    client: Client,
    config: ClientConfig,
    cookie: RwLock<Option<String>>,
    // Shared by every exchange on the handler.
    state: Mutex<ExchangeState>,
}

impl HttpRequestHandler {
    /// Creates a handler for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUri`] if the service URI does not
    /// parse, or a fault if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::fault_fatal(e.to_string()))?;
        let handler = Self {
            client,
            config,
            cookie: RwLock::new(None),
            state: Mutex::new(ExchangeState::Idle),
        };
        handler.request_uri()?;
        Ok(handler)
    }

    /// The handler configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session cookie, as `name=value`.
    pub fn cookie(&self) -> Option<String> {
        self.cookie.read().clone()
    }

    /// Forgets the session cookie.
    pub fn clear_cookie(&self) {
        *self.cookie.write() = None;
    }

    /// Latest transition of any exchange on this handler.
    ///
    /// Concurrent calls to [`send`](Self::send) share this value, so it
    /// tracks whichever exchange moved last.
    pub fn state(&self) -> ExchangeState {
        *self.state.lock()
    }

    /// The service URI with the scope parameters appended.
    pub fn request_uri(&self) -> TransportResult<Url> {
        let mut base = self.config.service_uri.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let mut url = Url::parse(&base).map_err(|e| TransportError::InvalidUri {
            uri: self.config.service_uri.clone(),
            message: e.to_string(),
        })?;
        if !self.config.scope_parameters.is_empty() {
            let query = self
                .config
                .scope_parameters
                .iter()
                .map(|(name, value)| {
                    format!(
                        "{}={}",
                        utf8_percent_encode(name, QUERY_COMPONENT),
                        utf8_percent_encode(value, QUERY_COMPONENT)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
        Ok(url)
    }

    /// Serializes `message` with the configured format into a request.
    pub fn encode<M: Serialize + ?Sized>(
        &self,
        step: HttpStep,
        session_id: Uuid,
        message: &M,
    ) -> TransportResult<SyncRequest> {
        Ok(SyncRequest::encode(step, session_id, message, self.config.format)?)
    }

    /// Sends `request` and decodes the response as `T`.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Cancelled`] if `cancel` fires before or during
    ///   the exchange
    /// - [`TransportError::Remote`] if the server answered with a sync error
    /// - [`TransportError::EmptyResponse`] if a successful response has no body
    /// - [`TransportError::Content`] if the body cannot be decoded
    /// - [`TransportError::Encoding`] if the payload was encoded with another
    ///   format than the configured one
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: &SyncRequest,
        cancel: &CancellationToken,
    ) -> TransportResult<T> {
        if cancel.is_cancelled() {
            self.transition(ExchangeState::Cancelled);
            return Err(TransportError::Cancelled);
        }

        let (uri, headers) = match self.prepare(request) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.transition(ExchangeState::Failed);
                return Err(e);
            }
        };

        debug!(
            step = %request.step,
            session = %request.session_id,
            uri = %uri,
            bytes = request.payload.len(),
            "sending sync request"
        );
        self.transition(ExchangeState::Sending);
        let builder = self
            .client
            .post(uri)
            .headers(headers)
            .body(request.payload.clone());

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.dispatch::<T>(builder) => result,
        };

        match &result {
            Ok(_) => self.transition(ExchangeState::Completed),
            Err(TransportError::Cancelled) => {
                debug!(step = %request.step, "sync request cancelled");
                self.transition(ExchangeState::Cancelled);
            }
            Err(e) => {
                warn!(step = %request.step, error = %e, "sync request failed");
                self.transition(ExchangeState::Failed);
            }
        }
        result
    }

    async fn dispatch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> TransportResult<T> {
        let response = builder.send().await.map_err(send_error)?;
        self.transition(ExchangeState::AwaitingResponse);

        let status = response.status();
        let cookie = first_cookie(response.headers());
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Content {
                    message: e.to_string(),
                    body: None,
                }
            }
        })?;

        if !status.is_success() {
            if body.is_empty() {
                return Err(TransportError::HttpStatus {
                    status: status.as_u16(),
                });
            }
            return match RemoteError::decode(&body) {
                Ok(remote) => Err(TransportError::Remote(SyncError::from(remote))),
                Err(e) => Err(content_error(e, &body)),
            };
        }

        if let Some(cookie) = cookie {
            trace!(cookie = %cookie, "session cookie received");
            *self.cookie.write() = Some(cookie);
        }

        if body.is_empty() {
            return Err(TransportError::EmptyResponse);
        }
        self.config
            .format
            .deserialize::<T>(&body)
            .map_err(|e| content_error(e, &body))
    }

    fn prepare(&self, request: &SyncRequest) -> TransportResult<(Url, HeaderMap)> {
        if let Some(format) = request.format.filter(|f| *f != self.config.format) {
            return Err(CodecError::encoding_failed(format!(
                "payload is {} but the handler sends {}",
                format.key(),
                self.config.format.key()
            ))
            .into());
        }
        Ok((self.request_uri()?, self.headers(request)?))
    }

    fn headers(&self, request: &SyncRequest) -> TransportResult<HeaderMap> {
        let mut sync_headers = SyncHeaders::new(
            request.session_id,
            request.step,
            SerializationFormat::new(self.config.format, self.config.batch_size),
        );
        if let Some(converter) = &self.config.converter {
            sync_headers = sync_headers.with_converter(converter.clone());
        }

        let mut headers = HeaderMap::new();
        for (name, value) in sync_headers.entries()? {
            headers.insert(HeaderName::from_static(name), header_value(&value)?);
        }
        if let Some(content_type) = self.config.format.content_type() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        if let Some(cookie) = self.cookie.read().as_deref() {
            headers.insert(COOKIE, header_value(cookie)?);
        }
        for (name, value) in &self.config.custom_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                CodecError::encoding_failed(format!("header name {name}: {e}"))
            })?;
            if !headers.contains_key(&name) {
                headers.insert(name, header_value(value)?);
            }
        }
        Ok(headers)
    }

    fn transition(&self, to: ExchangeState) {
        let mut state = self.state.lock();
        trace!(from = ?*state, to = ?to, "exchange state");
        *state = to;
    }
}

fn header_value(value: &str) -> TransportResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| CodecError::encoding_failed(format!("header value: {e}")).into())
}

/// The `name=value` pair of the first `Set-Cookie` header.
fn first_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(SET_COOKIE)?.to_str().ok()?;
    let pair = raw.split(';').next()?.trim();
    if pair.contains('=') {
        Some(pair.to_string())
    } else {
        None
    }
}

fn send_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::fault_retryable(error.to_string())
    } else {
        TransportError::fault_fatal(error.to_string())
    }
}

fn content_error(error: CodecError, body: &Bytes) -> TransportError {
    TransportError::Content {
        message: error.to_string(),
        body: Some(String::from_utf8_lossy(body).into_owned()),
    }
}
