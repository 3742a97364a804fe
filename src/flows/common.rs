//! Shared helpers for credential providers (CSRF state, per-scope singleflight guards).

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, auth::ScopeSet};

const STATE_LEN: usize = 32;

/// Generates a random alphanumeric `state` value for correlating consent redirects.
pub fn generate_state() -> String {
	rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
}

/// Lazily created async guards, one per scope set, so concurrent callers asking for the same
/// scope share a single in-flight token exchange.
#[derive(Debug, Default)]
pub(crate) struct ScopeGuards(Mutex<HashMap<ScopeSet, Arc<AsyncMutex<()>>>>);
impl ScopeGuards {
	/// Returns (and creates on demand) the guard for `scope`.
	pub(crate) fn guard(&self, scope: ScopeSet) -> Arc<AsyncMutex<()>> {
		let mut guards = self.0.lock();

		guards.entry(scope).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
