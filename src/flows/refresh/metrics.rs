// std
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshStats {
	/// Refresh exchanges sent to the token endpoint.
	pub attempts: u64,
	/// Exchanges that produced a new token.
	pub successes: u64,
	/// Exchanges that failed.
	pub failures: u64,
}

/// Counters for refresh exchanges; only exchanges that actually hit the network are counted,
/// so callers that piggy-back on an in-flight refresh leave them untouched.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of refresh exchanges sent.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Relaxed)
	}

	/// Returns all counters at once.
	pub fn snapshot(&self) -> RefreshStats {
		RefreshStats {
			attempts: self.attempts.load(Relaxed),
			successes: self.successes.load(Relaxed),
			failures: self.failures.load(Relaxed),
		}
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.successes.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn snapshot_reflects_recorded_outcomes() {
		let metrics = RefreshMetrics::default();

		metrics.record_attempt();
		metrics.record_failure();
		metrics.record_attempt();
		metrics.record_success();

		assert_eq!(metrics.attempts(), 2);
		assert_eq!(metrics.snapshot(), RefreshStats { attempts: 2, successes: 1, failures: 1 });
	}
}
