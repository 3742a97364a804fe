// self
use crate::{_prelude::*, error::ApiError, obs::FlowKind};

#[cfg(feature = "tracing")]
pub(super) type Traced<F> = tracing::instrument::Instrumented<F>;
#[cfg(not(feature = "tracing"))]
pub(super) type Traced<F> = F;

/// Wraps `fut` in a `forge_client.flow` span; no guard is held across `.await` points.
pub(super) fn in_flow_span<Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Traced<Fut>
where
	Fut: Future,
{
	#[cfg(feature = "tracing")]
	{
		use tracing::Instrument;

		fut.instrument(tracing::info_span!("forge_client.flow", flow = kind.as_str(), stage))
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, stage);

		fut
	}
}

pub(super) fn dispatch(method: &str, path: &str, attempt: u32) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(method, path, attempt, "dispatching request");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, path, attempt);
	}
}

pub(super) fn rate_limited(path: &str, retry: u32, backoff: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			path,
			retry,
			backoff_secs = backoff.as_seconds_f64(),
			"rate limited; retrying after back-off"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (path, retry, backoff);
	}
}

pub(super) fn api_failure(path: &str, err: &ApiError) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			path,
			status = err.status,
			kind = err.kind().as_str(),
			reason = %err.reason,
			"request failed"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (path, err);
	}
}
