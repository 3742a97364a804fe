// self
use crate::{error::ApiErrorKind, obs::FlowKind};

const FLOW_TOTAL: &str = "forge_client_flow_total";
const RATE_LIMITED_TOTAL: &str = "forge_client_rate_limited_total";
const API_ERROR_TOTAL: &str = "forge_client_api_error_total";

pub(super) fn count_flow(kind: FlowKind, outcome: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(FLOW_TOTAL, "flow" => kind.as_str(), "outcome" => outcome).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (FLOW_TOTAL, kind, outcome);
	}
}

pub(super) fn count_rate_limited() {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(RATE_LIMITED_TOTAL).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = RATE_LIMITED_TOTAL;
	}
}

pub(super) fn count_api_error(kind: ApiErrorKind) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(API_ERROR_TOTAL, "kind" => kind.as_str()).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (API_ERROR_TOTAL, kind);
	}
}
