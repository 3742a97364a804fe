//! Optional observability for credential exchanges and API requests.
//!
//! # Feature Flags
//!
//! - `tracing`: every exchange and API call runs inside a `forge_client.flow` span carrying
//!   `flow` and `stage`; dispatches log at `debug`, rate-limit retries at `warn`, and failed
//!   calls at `debug` with their classified kind. Credentials are never recorded.
//! - `metrics`: `forge_client_flow_total{flow, outcome}`, `forge_client_rate_limited_total`, and
//!   `forge_client_api_error_total{kind}` counters.
//!
//! With both features off every hook compiles to nothing.

mod metrics;
mod tracing;

// self
use crate::{_prelude::*, error::ApiError};

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Service-identity `authenticate` exchange.
	ClientCredentials,
	/// Delegated-user `gettoken` exchange.
	AuthorizationCode,
	/// Delegated-user `refreshtoken` exchange.
	Refresh,
	/// One logical API call, retries included.
	ApiRequest,
}
impl FlowKind {
	/// Label used for the `flow` span field and metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ClientCredentials => "client_credentials",
			Self::AuthorizationCode => "authorization_code",
			Self::Refresh => "refresh",
			Self::ApiRequest => "api_request",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a flow span and counts its attempt and outcome.
pub(crate) async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	metrics::count_flow(kind, "attempt");

	let result = tracing::in_flow_span(kind, stage, fut).await;

	metrics::count_flow(kind, if result.is_ok() { "success" } else { "failure" });

	result
}

/// A request attempt is about to hit the transport.
pub(crate) fn record_dispatch(method: &str, path: &str, attempt: u32) {
	tracing::dispatch(method, path, attempt);
}

/// A 429 was received and the executor will wait `backoff` before retry number `retry`.
pub(crate) fn record_rate_limited(path: &str, retry: u32, backoff: Duration) {
	tracing::rate_limited(path, retry, backoff);
	metrics::count_rate_limited();
}

/// A call ended with a non-success status that is handed back to the caller.
pub(crate) fn record_api_failure(path: &str, err: &ApiError) {
	tracing::api_failure(path, err);
	metrics::count_api_error(err.kind());
}
