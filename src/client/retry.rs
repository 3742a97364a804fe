//! Rate-limit retry policy and the injectable sleep behind it.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// How the executor reacts to HTTP 429.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Fixed wait between a rate-limited response and the next attempt.
	pub backoff: Duration,
	/// Maximum number of retries; `None` retries until the service stops answering 429.
	pub max_retries: Option<u32>,
}
impl RetryPolicy {
	/// Wait applied when no override is configured.
	pub const DEFAULT_BACKOFF: Duration = Duration::seconds(30);

	/// Never retries; 429 responses surface immediately.
	pub fn disabled() -> Self {
		Self { max_retries: Some(0), ..Default::default() }
	}

	/// Overrides the back-off interval; negative values clamp to zero.
	pub fn with_backoff(mut self, backoff: Duration) -> Self {
		self.backoff = if backoff.is_negative() { Duration::ZERO } else { backoff };

		self
	}

	/// Caps the number of retries.
	pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Whether another attempt is allowed after `retries` retries already happened.
	pub fn allows(&self, retries: u32) -> bool {
		self.max_retries.is_none_or(|max| retries < max)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { backoff: Self::DEFAULT_BACKOFF, max_retries: None }
	}
}

/// Source of the back-off wait, swappable so tests never sleep for real.
pub trait Sleeper
where
	Self: 'static + Send + Sync,
{
	/// Resolves once `duration` has elapsed.
	fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// Sleeps on the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;
impl Sleeper for TokioSleeper {
	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		Box::pin(tokio::time::sleep(duration.unsigned_abs()))
	}
}

/// Records requested waits and returns immediately.
#[derive(Debug, Default)]
pub struct ManualSleeper(Mutex<Vec<Duration>>);
impl ManualSleeper {
	/// Every wait requested so far, in order.
	pub fn requested(&self) -> Vec<Duration> {
		self.0.lock().clone()
	}
}
impl Sleeper for ManualSleeper {
	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		self.0.lock().push(duration);

		Box::pin(async {})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn default_policy_is_unbounded_with_thirty_second_waits() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.backoff, Duration::seconds(30));
		assert!(policy.allows(u32::MAX - 1));
		assert!(!RetryPolicy::disabled().allows(0));

		let capped = policy.with_max_retries(Some(2)).with_backoff(Duration::seconds(-1));

		assert!(capped.allows(1));
		assert!(!capped.allows(2));
		assert_eq!(capped.backoff, Duration::ZERO);
	}

	#[tokio::test]
	async fn manual_sleeper_records_without_waiting() {
		let sleeper = ManualSleeper::default();

		sleeper.sleep(Duration::seconds(30)).await;
		sleeper.sleep(Duration::seconds(30)).await;

		assert_eq!(sleeper.requested(), vec![Duration::seconds(30); 2]);
	}
}
