//! Refresh orchestration for the delegated-user token.
//!
//! [`DelegatedUserAuth::refresh_if_expired`] is a no-op while the held token is live. Once it
//! expires, callers queue on a single async guard; the first one performs the
//! `grant_type=refresh_token` exchange and swaps in the new snapshot, and everyone behind it
//! re-checks expiry and reuses that snapshot instead of firing another exchange.

mod metrics;

pub use metrics::{RefreshMetrics, RefreshStats};

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::DelegatedUserAuth,
	obs::{self, FlowKind},
};

impl DelegatedUserAuth {
	/// Refreshes the held token if it has expired.
	pub async fn refresh_if_expired(&self) -> Result<()> {
		let current = self.current_token().ok_or(Error::MissingToken)?;

		if !current.is_expired() {
			return Ok(());
		}

		obs::observe(FlowKind::Refresh, "refresh_if_expired", async move {
			let _singleflight = self.refresh_guard.lock().await;
			let current = self.current_token().ok_or(Error::MissingToken)?;

			if !current.is_expired() {
				return Ok(());
			}

			let refresh_token =
				current.refresh_token.clone().ok_or(ConfigError::MissingRefreshToken)?;

			self.refresh_metrics.record_attempt();

			let mut refreshed = self
				.facade
				.exchange_refresh_token(&refresh_token, self.granted)
				.await
				.inspect_err(|_| self.refresh_metrics.record_failure())?;

			if refreshed.refresh_token.is_none() {
				refreshed.refresh_token = Some(refresh_token);
			}

			*self.token.write() = Some(Arc::new(refreshed));

			self.refresh_metrics.record_success();

			Ok(())
		})
		.await
	}
}
