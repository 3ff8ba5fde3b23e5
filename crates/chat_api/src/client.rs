use std::future::Future;
use std::pin::Pin;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::headers::build_headers;
use crate::payload::ChatRequest;
use crate::url::normalize_chat_url;

/// Cancellation signal shared between the caller and a streaming session.
pub type CancellationSignal = Arc<AtomicBool>;

/// Response body as a sequence of raw byte fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ChatApiError>> + Send>>;

pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Opens a chat stream for a request. Implemented over HTTP by
/// [`ChatApiClient`]; tests substitute scripted fragment sources.
#[async_trait]
pub trait ChatTransport {
    async fn open(&self, request: &ChatRequest) -> Result<FragmentStream, ChatApiError>;
}

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_url(&self.config.base_url)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, ChatApiError> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.config) {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ChatApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        let endpoint = self.normalized_endpoint();
        reqwest::Url::parse(&endpoint)
            .map_err(|error| ChatApiError::InvalidBaseUrl(format!("{endpoint}: {error}")))?;

        let headers = self.build_headers()?;
        Ok(self.http.post(endpoint).headers(headers).json(request))
    }

    /// Send the request once and return the body as byte fragments.
    ///
    /// Non-success statuses are read to completion and reported as
    /// [`ChatApiError::Status`]; no retry is attempted.
    pub async fn open_stream(&self, request: &ChatRequest) -> Result<FragmentStream, ChatApiError> {
        debug!(
            endpoint = %self.normalized_endpoint(),
            messages = request.messages.len(),
            "opening chat stream"
        );
        let response = self.build_request(request)?.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_error_message(status, &body);
            warn!(status = status.as_u16(), %message, "chat stream rejected");
            return Err(ChatApiError::Status(status, message));
        }

        let fragments = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|error| ChatApiError::Stream(error.to_string()))
        });
        Ok(Box::pin(fragments))
    }
}

#[async_trait]
impl ChatTransport for ChatApiClient {
    async fn open(&self, request: &ChatRequest) -> Result<FragmentStream, ChatApiError> {
        self.open_stream(request).await
    }
}

pub fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

/// Drive `future` while polling `cancellation`; returns [`ChatApiError::Cancelled`]
/// as soon as the signal is observed.
pub async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{await_or_cancel, is_cancelled, ChatApiClient, CancellationSignal};
    use crate::config::ChatApiConfig;
    use crate::error::ChatApiError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn endpoint_is_normalized_from_config() {
        let client = ChatApiClient::new(ChatApiConfig::new("http://docs.local:9000/"))
            .expect("client");
        assert_eq!(
            client.normalized_endpoint(),
            "http://docs.local:9000/chat/stream"
        );
    }

    #[test]
    fn invalid_header_key_is_reported() {
        let config = ChatApiConfig::default().insert_header("bad header", "x");
        let client = ChatApiClient::new(config).expect("client");
        assert!(matches!(
            client.build_headers(),
            Err(ChatApiError::InvalidHeader(_))
        ));
    }

    #[test]
    fn missing_signal_is_never_cancelled() {
        let signal: CancellationSignal = Arc::new(AtomicBool::new(false));
        assert!(!is_cancelled(None));
        assert!(!is_cancelled(Some(&signal)));
        signal.store(true, Ordering::Release);
        assert!(is_cancelled(Some(&signal)));
    }

    #[tokio::test]
    async fn await_or_cancel_stops_pending_future() {
        let signal: CancellationSignal = Arc::new(AtomicBool::new(true));
        let result = await_or_cancel(std::future::pending::<()>(), Some(&signal)).await;
        assert!(matches!(result, Err(ChatApiError::Cancelled)));
    }
}
