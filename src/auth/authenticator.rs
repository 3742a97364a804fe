//! Capability contract between credential providers and the request executor.

// crates.io
use oauth2::http::{HeaderName, HeaderValue, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, Token},
	config::ServiceEndpoints,
	error::ConfigError,
};

/// Headers an authenticator contributes to one request.
pub type AuthHeaders = Vec<(HeaderName, HeaderValue)>;
/// Boxed future returned by [`Authenticator::auth_header`].
pub type AuthFuture<'a> = Pin<Box<dyn Future<Output = Result<AuthHeaders>> + 'a + Send>>;

/// Proves that a request may act with a given scope and tells the executor where to send it.
///
/// Implemented by [`ServiceIdentityAuth`](crate::flows::ServiceIdentityAuth),
/// [`DelegatedUserAuth`](crate::flows::DelegatedUserAuth), and [`NoAuth`].
pub trait Authenticator
where
	Self: 'static + Send + Sync,
{
	/// Produces the headers proving `scope`, fetching or refreshing a token when needed.
	fn auth_header(&self, scope: ScopeSet) -> AuthFuture<'_>;

	/// Host and authentication path this authenticator talks to.
	fn endpoints(&self) -> &ServiceEndpoints;

	/// Base host that service paths are joined onto.
	fn host(&self) -> &Url {
		self.endpoints().host()
	}

	/// Resolves a service prefix plus literal path segments against [`Authenticator::host`].
	fn path(&self, prefix: &str, segments: &[&str]) -> Result<Url> {
		Ok(self.endpoints().join(prefix, segments)?)
	}
}
impl<A> Authenticator for Arc<A>
where
	A: ?Sized + Authenticator,
{
	fn auth_header(&self, scope: ScopeSet) -> AuthFuture<'_> {
		(**self).auth_header(scope)
	}

	fn endpoints(&self) -> &ServiceEndpoints {
		(**self).endpoints()
	}
}

/// Authenticator that never authenticates.
///
/// Requests with [`ScopeSet::EMPTY`] go out without credentials; anything else fails with
/// [`Error::Unauthenticated`] before touching the network.
#[derive(Clone, Debug)]
pub struct NoAuth {
	endpoints: ServiceEndpoints,
}
impl NoAuth {
	/// Creates an authenticator resolving paths against `endpoints`.
	pub fn new(endpoints: ServiceEndpoints) -> Self {
		Self { endpoints }
	}
}
impl Authenticator for NoAuth {
	fn auth_header(&self, scope: ScopeSet) -> AuthFuture<'_> {
		Box::pin(async move {
			if scope.is_empty() { Ok(Vec::new()) } else { Err(Error::Unauthenticated { scope }) }
		})
	}

	fn endpoints(&self) -> &ServiceEndpoints {
		&self.endpoints
	}
}

/// Renders `Authorization: Bearer …` for `token`, marked sensitive so it never shows in logs.
pub(crate) fn bearer_header(token: &Token) -> Result<(HeaderName, HeaderValue)> {
	let mut value = HeaderValue::from_str(&token.authorization()).map_err(ConfigError::from)?;

	value.set_sensitive(true);

	Ok((AUTHORIZATION, value))
}
