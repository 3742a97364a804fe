//! Per-call cancellation and deadline plumbing.

// std
use std::future;
// crates.io
use tokio::time::Instant;
// self
use crate::{CancellationToken, _prelude::*};

/// Cancellation token and deadline observed by every network call and back-off sleep.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
	cancel: Option<CancellationToken>,
	deadline: Option<Instant>,
}
impl RequestContext {
	/// Context that never cancels and never times out.
	pub fn new() -> Self {
		Self::default()
	}

	/// Aborts calls with [`Error::Cancelled`] once `token` is cancelled.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancel = Some(token);

		self
	}

	/// Aborts calls with [`Error::DeadlineExceeded`] at `deadline`.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(deadline);

		self
	}

	/// Aborts calls with [`Error::DeadlineExceeded`] once `timeout` has elapsed from now.
	pub fn with_timeout(self, timeout: std::time::Duration) -> Self {
		self.with_deadline(Instant::now() + timeout)
	}

	/// Cancellation token, if one was attached.
	pub fn cancellation(&self) -> Option<&CancellationToken> {
		self.cancel.as_ref()
	}

	/// Deadline, if one was attached.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Drives `fut` to completion unless the context is cancelled or its deadline passes first.
	pub async fn run<T, Fut>(&self, fut: Fut) -> Result<T>
	where
		Fut: Future<Output = Result<T>>,
	{
		if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
			return Err(Error::Cancelled);
		}

		let cancelled = async {
			match &self.cancel {
				Some(token) => token.cancelled().await,
				None => future::pending().await,
			}
		};
		let expired = async {
			match self.deadline {
				Some(deadline) => tokio::time::sleep_until(deadline).await,
				None => future::pending().await,
			}
		};

		tokio::select! {
			biased;
			_ = cancelled => Err(Error::Cancelled),
			_ = expired => Err(Error::DeadlineExceeded),
			output = fut => output,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn plain_context_passes_output_through() {
		let out = RequestContext::new().run(async { Ok(5) }).await;

		assert_eq!(out.expect("Nothing should interrupt the future."), 5);
	}

	#[tokio::test]
	async fn cancelled_token_short_circuits() {
		let token = CancellationToken::new();
		let ctx = RequestContext::new().with_cancellation(token.clone());

		token.cancel();

		assert!(matches!(ctx.run(future::pending::<Result<()>>()).await, Err(Error::Cancelled)));
	}

	#[tokio::test]
	async fn cancellation_interrupts_pending_work() {
		let token = CancellationToken::new();
		let ctx = RequestContext::new().with_cancellation(token.clone());
		let canceller = async {
			tokio::task::yield_now().await;
			token.cancel();
		};
		let (out, _) = tokio::join!(ctx.run(future::pending::<Result<()>>()), canceller);

		assert!(matches!(out, Err(Error::Cancelled)));
	}

	#[tokio::test]
	async fn deadline_is_reported_distinctly() {
		let ctx = RequestContext::new().with_timeout(std::time::Duration::from_millis(10));

		assert!(matches!(
			ctx.run(future::pending::<Result<()>>()).await,
			Err(Error::DeadlineExceeded)
		));
	}
}
