//! Request executor shared by every service API.
//!
//! [`Client::send`] performs exactly one attempt: resolve the URL against the authenticator's
//! host, apply filters, set headers, attach credentials, and hand the request to the transport.
//! [`Client::execute`] layers the status handling on top of it:
//!
//! - 2xx responses are returned to the caller.
//! - 429 waits [`RetryPolicy::backoff`] and sends the whole request again, for as long as the
//!   policy allows. The wait observes the caller's [`RequestContext`].
//! - 415 is reclassified into [`Error::ApiIncompatible`] and never retried.
//! - Every other status surfaces as [`Error::Api`] unchanged.

pub mod context;
pub mod retry;

pub use context::*;
pub use retry::*;

// crates.io
use oauth2::http::{HeaderMap, HeaderName, HeaderValue, Method, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{Authenticator, ScopeSet},
	error::{ApiError, ApiErrorKind, ConfigError},
	filters::{self, Filter},
	http::{self, HttpRequest, HttpResponse, HttpTransport},
	obs::{self, FlowKind},
};

/// `application/json`
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// `application/octet-stream`
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";
/// `application/x-www-form-urlencoded`
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// One logical API call: method, required scope, path, query filters, headers, and body.
///
/// Filters are borrowed so callers can pass their filter values without cloning them.
#[derive(Clone)]
pub struct ApiRequest<'a> {
	method: Method,
	scope: ScopeSet,
	prefix: String,
	segments: Vec<String>,
	filters: Vec<&'a dyn Filter>,
	headers: Vec<(HeaderName, HeaderValue)>,
	content_type: Option<String>,
	body: Vec<u8>,
}
impl<'a> ApiRequest<'a> {
	/// Creates a request for `method` on the service rooted at `prefix`.
	pub fn new(method: Method, scope: ScopeSet, prefix: impl Into<String>) -> Self {
		Self {
			method,
			scope,
			prefix: prefix.into(),
			segments: Vec::new(),
			filters: Vec::new(),
			headers: Vec::new(),
			content_type: None,
			body: Vec::new(),
		}
	}

	/// `GET` with a JSON content type.
	pub fn get(scope: ScopeSet, prefix: impl Into<String>) -> Self {
		Self::new(Method::GET, scope, prefix).content_type(CONTENT_TYPE_JSON)
	}

	/// `DELETE` with a JSON content type.
	pub fn delete(scope: ScopeSet, prefix: impl Into<String>) -> Self {
		Self::new(Method::DELETE, scope, prefix).content_type(CONTENT_TYPE_JSON)
	}

	/// `POST` without a body; pair with [`ApiRequest::json`] or [`ApiRequest::body`].
	pub fn post(scope: ScopeSet, prefix: impl Into<String>) -> Self {
		Self::new(Method::POST, scope, prefix)
	}

	/// `PUT` without a body; pair with [`ApiRequest::json`] or [`ApiRequest::body`].
	pub fn put(scope: ScopeSet, prefix: impl Into<String>) -> Self {
		Self::new(Method::PUT, scope, prefix)
	}

	/// Appends one literal path segment; it is percent-encoded when joined.
	pub fn segment(mut self, segment: impl Into<String>) -> Self {
		self.segments.push(segment.into());

		self
	}

	/// Appends several literal path segments.
	pub fn segments<I, S>(mut self, segments: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.segments.extend(segments.into_iter().map(Into::into));

		self
	}

	/// Adds a query filter; filters run in the order they were added.
	pub fn filter(mut self, filter: &'a dyn Filter) -> Self {
		self.filters.push(filter);

		self
	}

	/// Adds an extra request header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.push((name, value));

		self
	}

	/// Sets the `Content-Type`; an empty value sends no header.
	pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());

		self
	}

	/// Sets a raw body together with its content type.
	pub fn body(self, content_type: impl Into<String>, body: Vec<u8>) -> Self {
		Self { body, ..self.content_type(content_type) }
	}

	/// Serializes `payload` as the JSON body.
	pub fn json<T>(self, payload: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(payload).map_err(ConfigError::from)?;

		Ok(self.body(CONTENT_TYPE_JSON, body))
	}

	/// Encodes `pairs` as an `application/x-www-form-urlencoded` body.
	pub fn form<I, K, V>(self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let body =
			url::form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();

		self.body(CONTENT_TYPE_FORM, body.into_bytes())
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Scope the request must be authorized for.
	pub fn scope(&self) -> ScopeSet {
		self.scope
	}

	/// Service prefix followed by the path segments, joined with `/`.
	pub fn path(&self) -> String {
		let mut path = self.prefix.trim_matches('/').to_owned();

		for segment in &self.segments {
			path.push('/');
			path.push_str(segment);
		}

		path
	}

	fn developer_message(&self) -> String {
		format!(
			"incorrect media type: sent {} for {}({})",
			self.content_type.as_deref().unwrap_or_default(),
			self.method,
			self.path()
		)
	}
}
impl Debug for ApiRequest<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiRequest")
			.field("method", &self.method)
			.field("scope", &self.scope)
			.field("path", &self.path())
			.field("filters", &self.filters.len())
			.field("content_type", &self.content_type)
			.field("body_len", &self.body.len())
			.finish()
	}
}

/// Authenticated request executor.
///
/// The client keeps no per-call state, so one value behind an [`Arc`] serves any number of
/// concurrent callers.
#[derive(Clone)]
pub struct Client {
	authenticator: Arc<dyn Authenticator>,
	transport: Arc<dyn HttpTransport>,
	retry: RetryPolicy,
	sleeper: Arc<dyn Sleeper>,
}
impl Client {
	/// Creates a client that authenticates with `authenticator` and sends through `transport`.
	pub fn new<A>(authenticator: A, transport: Arc<dyn HttpTransport>) -> Self
	where
		A: Authenticator,
	{
		Self::from_shared(Arc::new(authenticator), transport)
	}

	/// Creates a client from an already shared authenticator.
	pub fn from_shared(
		authenticator: Arc<dyn Authenticator>,
		transport: Arc<dyn HttpTransport>,
	) -> Self {
		Self {
			authenticator,
			transport,
			retry: RetryPolicy::default(),
			sleeper: Arc::new(TokioSleeper),
		}
	}

	/// Creates a client backed by a default [`ReqwestTransport`](crate::http::ReqwestTransport).
	#[cfg(feature = "reqwest")]
	pub fn with_reqwest<A>(authenticator: A) -> Self
	where
		A: Authenticator,
	{
		Self::new(authenticator, Arc::new(crate::http::ReqwestTransport::default()))
	}

	/// Replaces the rate-limit retry policy.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Replaces the back-off sleeper, e.g. with a [`ManualSleeper`] in tests.
	pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
		self.sleeper = sleeper;

		self
	}

	/// Authenticator used for every request.
	pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
		&self.authenticator
	}

	/// Transport used for every request.
	pub fn transport(&self) -> &Arc<dyn HttpTransport> {
		&self.transport
	}

	/// Active retry policy.
	pub fn retry_policy(&self) -> &RetryPolicy {
		&self.retry
	}

	/// Sends one attempt of `request` and returns the response whatever its status.
	///
	/// Filter, header, and credential failures abort before the transport is touched.
	pub async fn send(&self, request: &ApiRequest<'_>) -> Result<HttpResponse> {
		let segments = request.segments.iter().map(String::as_str).collect::<Vec<_>>();
		let mut url = self.authenticator.path(&request.prefix, &segments)?;

		filters::apply(&mut url, &request.filters)?;

		let mut headers = HeaderMap::new();

		if let Some(content_type) = request.content_type.as_deref().filter(|ct| !ct.is_empty()) {
			let value = HeaderValue::from_str(content_type).map_err(ConfigError::from)?;

			headers.insert(CONTENT_TYPE, value);
		}
		for (name, value) in &request.headers {
			headers.append(name.clone(), value.clone());
		}
		for (name, value) in self.authenticator.auth_header(request.scope).await? {
			headers.insert(name, value);
		}

		let mut http_request: HttpRequest = oauth2::http::Request::builder()
			.method(request.method.clone())
			.uri(url.as_str())
			.body(request.body.clone())
			.map_err(ConfigError::from)?;

		*http_request.headers_mut() = headers;

		Ok(self.transport.send(http_request).await?)
	}

	/// Executes `request` until it leaves the rate-limit loop and returns the 2xx response.
	pub async fn execute(
		&self,
		request: &ApiRequest<'_>,
		ctx: &RequestContext,
	) -> Result<HttpResponse> {
		obs::observe(FlowKind::ApiRequest, "execute", async {
			let path = request.path();
			let mut retries = 0_u32;

			loop {
				obs::record_dispatch(request.method.as_str(), &path, retries + 1);

				let response = ctx.run(self.send(request)).await?;
				let status = response.status();

				if status.is_success() {
					return Ok(response);
				}

				let err = ApiError::from_json_body(status.as_u16(), response.body())
					.with_retry_after(http::parse_retry_after(response.headers()));

				match err.kind() {
					ApiErrorKind::RateLimited if self.retry.allows(retries) => {
						retries += 1;

						obs::record_rate_limited(&path, retries, self.retry.backoff);
						ctx.run(async {
							self.sleeper.sleep(self.retry.backoff).await;

							Ok(())
						})
						.await?;
					},
					ApiErrorKind::UnsupportedMediaType => {
						obs::record_api_failure(&path, &err);

						return Err(Error::ApiIncompatible {
							source: err,
							developer_message: request.developer_message(),
						});
					},
					_ => {
						obs::record_api_failure(&path, &err);

						return Err(err.into());
					},
				}
			}
		})
		.await
	}

	/// Executes `request` and decodes the JSON body into `T`.
	pub async fn execute_json<T>(&self, request: &ApiRequest<'_>, ctx: &RequestContext) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.execute(request, ctx).await?;

		decode_json(&response)
	}

	/// Executes `request` and returns the raw body bytes.
	pub async fn execute_bytes(
		&self,
		request: &ApiRequest<'_>,
		ctx: &RequestContext,
	) -> Result<Vec<u8>> {
		Ok(self.execute(request, ctx).await?.into_body())
	}

	/// Executes `request` and discards the body.
	pub async fn execute_empty(
		&self,
		request: &ApiRequest<'_>,
		ctx: &RequestContext,
	) -> Result<()> {
		self.execute(request, ctx).await.map(drop)
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("host", &self.authenticator.host().as_str())
			.field("retry", &self.retry)
			.finish()
	}
}

/// Decodes a success body, reporting the failing JSON path and the status on error.
pub(crate) fn decode_json<T>(response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::Decode { source, status: response.status().as_u16() })
}
