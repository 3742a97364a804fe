//! Transport primitives shared by token exchanges and API requests.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack: the request executor
//! sends every API call through it, and token exchanges reach it through
//! [`TransportHandle`], an `oauth2` [`AsyncHttpClient`] adapter that records each response's
//! status and `Retry-After` hint in a [`ResponseMetadataSlot`] so failed exchanges can be
//! classified with their HTTP status.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError,
	http::{HeaderMap, header::RETRY_AFTER},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Buffered HTTP request; the same type the `oauth2` crate hands to its clients.
pub type HttpRequest = oauth2::HttpRequest;
/// Buffered HTTP response.
pub type HttpResponse = oauth2::HttpResponse;
/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Executes fully buffered HTTP requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// authenticator and API value behind an `Arc`. Non-success statuses are returned as regular
/// responses; only failures to obtain a response at all are errors.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends one request and buffers the whole response body.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Metadata captured from the most recent response seen by a [`TransportHandle`].
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response arrived.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// [`AsyncHttpClient`] adapter that routes `oauth2` token requests through an
/// [`HttpTransport`] and records response metadata.
#[derive(Clone)]
pub struct TransportHandle {
	transport: Arc<dyn HttpTransport>,
	slot: ResponseMetadataSlot,
}
impl TransportHandle {
	/// Wraps `transport`, publishing metadata into `slot`.
	pub fn new(transport: Arc<dyn HttpTransport>, slot: ResponseMetadataSlot) -> Self {
		Self { transport, slot }
	}
}
impl Debug for TransportHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TransportHandle").field("slot", &self.slot).finish()
	}
}
impl<'c> AsyncHttpClient<'c> for TransportHandle {
	type Error = HttpClientError<TransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let response = self.transport.send(request).await.map_err(Box::new)?;

			self.slot.store(ResponseMetadata {
				status: Some(response.status().as_u16()),
				retry_after: parse_retry_after(response.headers()),
			});

			Ok(response)
		})
	}
}

/// Default transport backed by a shared [`ReqwestClient`].
///
/// Token endpoints return results directly, so a custom client should keep redirect following
/// disabled. Timeouts configured on the client apply to every request.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let target = format!("{} {}", request.method(), request.uri());
			let request: reqwest::Request = request
				.try_into()
				.map_err(|err: ReqwestError| TransportError::network(target.clone(), err))?;
			let response = self
				.0
				.execute(request)
				.await
				.map_err(|err| TransportError::network(target.clone(), err))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response
				.bytes()
				.await
				.map_err(|err| TransportError::network(target, err))?
				.to_vec();
			let mut buffered = HttpResponse::new(body);

			*buffered.status_mut() = status;
			*buffered.headers_mut() = headers;

			Ok(buffered)
		})
	}
}

/// Reads `Retry-After` as either delta seconds or an RFC 2822 date.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::{HeaderValue, StatusCode};
	// self
	use super::*;

	struct Canned(StatusCode);
	impl HttpTransport for Canned {
		fn send(&self, _: HttpRequest) -> TransportFuture<'_> {
			let status = self.0;

			Box::pin(async move {
				let mut response = HttpResponse::new(b"{}".to_vec());

				*response.status_mut() = status;
				response.headers_mut().insert(RETRY_AFTER, HeaderValue::from_static("7"));

				Ok(response)
			})
		}
	}

	#[test]
	fn retry_after_accepts_seconds_and_rejects_garbage() {
		let mut headers = HeaderMap::new();

		assert_eq!(parse_retry_after(&headers), None);

		headers.insert(RETRY_AFTER, HeaderValue::from_static(" 30 "));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(30)));

		headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));

		assert_eq!(parse_retry_after(&headers), None);

		headers.insert(RETRY_AFTER, HeaderValue::from_static("Mon, 01 Jan 2001 00:00:00 +0000"));

		assert_eq!(parse_retry_after(&headers), None, "Past dates carry no wait.");
	}

	#[tokio::test]
	async fn handle_records_status_and_hint() {
		let slot = ResponseMetadataSlot::default();
		let handle =
			TransportHandle::new(Arc::new(Canned(StatusCode::TOO_MANY_REQUESTS)), slot.clone());
		let response =
			handle.call(HttpRequest::new(Vec::new())).await.expect("Canned transport never fails.");

		assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

		let meta = slot.take().expect("Metadata should be recorded.");

		assert_eq!(meta.status, Some(429));
		assert_eq!(meta.retry_after, Some(Duration::seconds(7)));
		assert!(slot.take().is_none());
	}
}
