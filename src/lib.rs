//! Async client for Autodesk Forge REST services, built around one authenticated request core:
//! scoped credential providers, a retrying request executor, and composable query filters shared
//! by the bucket, data management, model derivative, and reality capture APIs.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod dm;
pub mod error;
pub mod filters;
pub mod flows;
pub mod http;
pub mod md;
pub mod oauth;
pub mod obs;
pub mod oss;
pub mod profile;
pub mod recap;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use oauth2::http::{
		HeaderMap, HeaderValue, Method, StatusCode,
		header::{AUTHORIZATION, CONTENT_TYPE},
	};
	// self
	use crate::{
		auth::{AuthFuture, Authenticator, ScopeSet},
		config::ServiceEndpoints,
		error::TransportError,
		http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	};

	type Handler = Box<dyn Fn(&RecordedRequest) -> HttpResponse + Send + Sync>;

	/// Request as seen by [`FakeTransport`].
	#[derive(Clone, Debug)]
	pub struct RecordedRequest {
		/// HTTP method.
		pub method: Method,
		/// Full request URI.
		pub uri: String,
		/// Request headers, credentials included.
		pub headers: HeaderMap,
		/// Buffered body.
		pub body: Vec<u8>,
	}
	impl RecordedRequest {
		/// URI path without the query string.
		pub fn path(&self) -> &str {
			self.uri.split('?').next().unwrap_or_default()
		}

		/// Body decoded as UTF-8, lossily.
		pub fn body_text(&self) -> String {
			String::from_utf8_lossy(&self.body).into_owned()
		}
	}

	/// In-process [`HttpTransport`] that records every request and answers from a handler.
	pub struct FakeTransport {
		handler: Handler,
		requests: Mutex<Vec<RecordedRequest>>,
		delay: Option<std::time::Duration>,
	}
	impl FakeTransport {
		/// Answers each request with `handler`.
		pub fn new(
			handler: impl 'static + Fn(&RecordedRequest) -> HttpResponse + Send + Sync,
		) -> Self {
			Self { handler: Box::new(handler), requests: Mutex::new(Vec::new()), delay: None }
		}

		/// Answers with `responses` in order, repeating the last one once the script runs out.
		pub fn scripted(responses: impl IntoIterator<Item = HttpResponse>) -> Self {
			let script = Mutex::new(responses.into_iter().collect::<VecDeque<_>>());

			Self::new(move |_| {
				let mut script = script.lock();

				match script.len() {
					0 => json_response(500, r#"{"reason":"script is empty"}"#),
					1 => copy_response(&script[0]),
					_ => script.pop_front().unwrap_or_else(|| json_response(500, "{}")),
				}
			})
		}

		/// Delays every response, keeping requests in flight long enough to overlap.
		pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
			self.delay = Some(delay);

			self
		}

		/// Number of requests sent so far.
		pub fn calls(&self) -> usize {
			self.requests.lock().len()
		}

		/// Every request sent so far, in order.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.requests.lock().clone()
		}
	}
	impl HttpTransport for FakeTransport {
		fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
			let recorded = RecordedRequest {
				method: request.method().clone(),
				uri: request.uri().to_string(),
				headers: request.headers().clone(),
				body: request.into_body(),
			};

			self.requests.lock().push(recorded.clone());

			Box::pin(async move {
				if let Some(delay) = self.delay {
					tokio::time::sleep(delay).await;
				}

				Ok::<_, TransportError>((self.handler)(&recorded))
			})
		}
	}

	/// Authenticator that grants every scope with a fixed bearer token and records the scopes
	/// it was asked for.
	#[derive(Debug)]
	pub struct StaticAuth {
		endpoints: ServiceEndpoints,
		scopes: Mutex<Vec<ScopeSet>>,
	}
	impl StaticAuth {
		/// Bearer value sent with every request.
		pub const AUTHORIZATION: &str = "Bearer static";

		/// Resolves paths against `base_url`.
		pub fn new(base_url: &str) -> Self {
			Self { endpoints: test_endpoints(base_url), scopes: Mutex::new(Vec::new()) }
		}

		/// Every scope requested so far, in order.
		pub fn scopes(&self) -> Vec<ScopeSet> {
			self.scopes.lock().clone()
		}
	}
	impl Authenticator for StaticAuth {
		fn auth_header(&self, scope: ScopeSet) -> AuthFuture<'_> {
			self.scopes.lock().push(scope);

			Box::pin(async {
				Ok(vec![(AUTHORIZATION, HeaderValue::from_static(Self::AUTHORIZATION))])
			})
		}

		fn endpoints(&self) -> &ServiceEndpoints {
			&self.endpoints
		}
	}

	/// Builds a JSON response with `status` and `body`.
	pub fn json_response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() =
			StatusCode::from_u16(status).expect("Test status codes should be valid.");
		response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		response
	}

	/// Token endpoint body granting `access_token` for one hour.
	pub fn token_body(access_token: &str) -> String {
		format!(
			r#"{{"access_token":"{access_token}","token_type":"Bearer","expires_in":3600,"refresh_token":"refresh-{access_token}"}}"#
		)
	}

	/// Points the service endpoints at a mock server base URL.
	pub fn test_endpoints(base_url: &str) -> ServiceEndpoints {
		ServiceEndpoints::builder()
			.host(Url::parse(base_url).expect("Mock server URL should parse successfully."))
			.allow_insecure_host(true)
			.build()
			.expect("Mock service endpoints should build successfully.")
	}

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_transport() -> Arc<dyn HttpTransport> {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		Arc::new(crate::http::ReqwestTransport::with_client(client))
	}

	fn copy_response(response: &HttpResponse) -> HttpResponse {
		let mut copy = HttpResponse::new(response.body().clone());

		*copy.status_mut() = response.status();
		*copy.headers_mut() = response.headers().clone();

		copy
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
