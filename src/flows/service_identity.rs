//! Service-identity (2-legged) credentials: the application authenticates as itself.
//!
//! By default every [`ServiceIdentityAuth::authenticate`] call performs a fresh
//! `client_credentials` exchange for exactly the requested scope. With
//! [`ServiceIdentityAuth::with_token_cache`] enabled, tokens are kept per scope set and reused
//! until [`CACHE_MARGIN`] before they expire; a per-scope singleflight guard makes concurrent
//! callers share one in-flight exchange instead of stampeding the endpoint.

// crates.io
use oauth2::http::{HeaderName, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{
		AuthFuture, Authenticator, ClientCredentials, ScopeSet, Token, authenticator::bearer_header,
	},
	config::ServiceEndpoints,
	error::ConfigError,
	flows::common::ScopeGuards,
	http::HttpTransport,
	oauth::OAuthFacade,
	obs::{self, FlowKind},
};

/// Header naming the end user a service-identity request acts on behalf of.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Cached tokens are replaced once they are this close to expiry.
pub const CACHE_MARGIN: Duration = Duration::seconds(60);

/// Client-credentials provider.
pub struct ServiceIdentityAuth {
	facade: OAuthFacade,
	user_id: Option<HeaderValue>,
	cache: Option<TokenCache>,
}
impl ServiceIdentityAuth {
	/// Creates a provider that talks to `endpoints` through the default reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn new(credentials: ClientCredentials, endpoints: ServiceEndpoints) -> Self {
		Self::with_transport(
			credentials,
			endpoints,
			Arc::new(crate::http::ReqwestTransport::default()),
		)
	}

	/// Creates a provider that sends token exchanges through `transport`.
	pub fn with_transport(
		credentials: ClientCredentials,
		endpoints: ServiceEndpoints,
		transport: Arc<dyn HttpTransport>,
	) -> Self {
		Self {
			facade: OAuthFacade::new(&credentials, endpoints, transport),
			user_id: None,
			cache: None,
		}
	}

	/// Acts on behalf of `user_id` by sending it in the `x-user-id` header.
	pub fn with_user_id(mut self, user_id: impl AsRef<str>) -> Result<Self> {
		let value = HeaderValue::from_str(user_id.as_ref()).map_err(ConfigError::from)?;

		self.user_id = Some(value);

		Ok(self)
	}

	/// Enables or disables reuse of tokens per scope set (disabled by default).
	pub fn with_token_cache(mut self, enabled: bool) -> Self {
		self.cache = enabled.then(TokenCache::default);

		self
	}

	/// Transport used for token exchanges; API clients may share it.
	pub fn transport(&self) -> Arc<dyn HttpTransport> {
		self.facade.transport().clone()
	}

	/// Returns a token carrying exactly `scope`.
	///
	/// Invalid scope sets are rejected with [`Error::InvalidScope`] before any network call.
	pub async fn authenticate(&self, scope: ScopeSet) -> Result<Token> {
		if !scope.is_valid() {
			return Err(Error::InvalidScope { scope });
		}

		match &self.cache {
			Some(cache) =>
				cache.get_or_exchange(&self.facade, scope).await.map(|token| (*token).clone()),
			None => exchange(&self.facade, scope).await,
		}
	}
}
impl Authenticator for ServiceIdentityAuth {
	fn auth_header(&self, scope: ScopeSet) -> AuthFuture<'_> {
		Box::pin(async move {
			let token = self.authenticate(scope).await?;
			let mut headers = vec![bearer_header(&token)?];

			if let Some(user_id) = &self.user_id {
				headers.push((HeaderName::from_static(USER_ID_HEADER), user_id.clone()));
			}

			Ok(headers)
		})
	}

	fn endpoints(&self) -> &ServiceEndpoints {
		self.facade.endpoints()
	}
}
impl Debug for ServiceIdentityAuth {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceIdentityAuth")
			.field("facade", &self.facade)
			.field("user_id", &self.user_id)
			.field("token_cache", &self.cache.is_some())
			.finish()
	}
}

#[derive(Default)]
struct TokenCache {
	tokens: Mutex<HashMap<ScopeSet, Arc<Token>>>,
	guards: ScopeGuards,
}
impl TokenCache {
	fn fresh(&self, scope: ScopeSet) -> Option<Arc<Token>> {
		let now = OffsetDateTime::now_utc();

		self.tokens
			.lock()
			.get(&scope)
			.filter(|token| !token.expires_within(CACHE_MARGIN, now))
			.cloned()
	}

	async fn get_or_exchange(&self, facade: &OAuthFacade, scope: ScopeSet) -> Result<Arc<Token>> {
		if let Some(token) = self.fresh(scope) {
			return Ok(token);
		}

		let guard = self.guards.guard(scope);
		let _singleflight = guard.lock().await;

		if let Some(token) = self.fresh(scope) {
			return Ok(token);
		}

		let token = Arc::new(exchange(facade, scope).await?);

		self.tokens.lock().insert(scope, token.clone());

		Ok(token)
	}
}

async fn exchange(facade: &OAuthFacade, scope: ScopeSet) -> Result<Token> {
	let flow = facade.exchange_client_credentials(scope);

	obs::observe(FlowKind::ClientCredentials, "authenticate", flow).await
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::http::{HttpRequest, HttpResponse, TransportFuture};

	#[derive(Default)]
	struct TokenEndpoint {
		calls: AtomicUsize,
		bodies: Mutex<Vec<String>>,
	}
	impl HttpTransport for TokenEndpoint {
		fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.bodies.lock().push(String::from_utf8_lossy(request.body()).into_owned());

			Box::pin(async {
				let mut response = HttpResponse::new(
					br#"{"access_token":"abc","token_type":"Bearer","expires_in":3600}"#.to_vec(),
				);

				response.headers_mut().insert(
					oauth2::http::header::CONTENT_TYPE,
					HeaderValue::from_static("application/json"),
				);

				Ok(response)
			})
		}
	}

	fn provider(endpoint: Arc<TokenEndpoint>) -> ServiceIdentityAuth {
		ServiceIdentityAuth::with_transport(
			ClientCredentials::new("id", "secret"),
			ServiceEndpoints::production().expect("Default endpoints should build."),
			endpoint,
		)
	}

	#[tokio::test]
	async fn invalid_scopes_never_reach_the_network() {
		let endpoint = Arc::new(TokenEndpoint::default());
		let auth = provider(endpoint.clone());

		for scope in [ScopeSet::EMPTY, ScopeSet::from_bits(1 << 40)] {
			assert!(matches!(auth.authenticate(scope).await, Err(Error::InvalidScope { .. })));
		}

		assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn exchanges_send_credentials_in_the_form_body() {
		let endpoint = Arc::new(TokenEndpoint::default());
		let auth = provider(endpoint.clone());
		let token = auth
			.authenticate(ScopeSet::BUCKET_READ | ScopeSet::DATA_READ)
			.await
			.expect("Canned token should decode.");

		assert_eq!(token.access_token.expose(), "abc");

		let bodies = endpoint.bodies.lock();
		let pairs: HashMap<String, String> =
			url::form_urlencoded::parse(bodies[0].as_bytes()).into_owned().collect();

		assert_eq!(pairs["grant_type"], "client_credentials");
		assert_eq!(pairs["client_id"], "id");
		assert_eq!(pairs["client_secret"], "secret");
		assert_eq!(pairs["scope"], "data:read bucket:read");
	}

	#[tokio::test]
	async fn every_call_reauthenticates_unless_cached() {
		let endpoint = Arc::new(TokenEndpoint::default());
		let auth = provider(endpoint.clone());

		for _ in 0..2 {
			auth.authenticate(ScopeSet::DATA_READ).await.expect("Exchange should succeed.");
		}

		assert_eq!(endpoint.calls.load(Ordering::SeqCst), 2);

		let cached = provider(endpoint.clone()).with_token_cache(true);

		for _ in 0..3 {
			cached.authenticate(ScopeSet::DATA_READ).await.expect("Exchange should succeed.");
		}
		cached.authenticate(ScopeSet::DATA_WRITE).await.expect("Exchange should succeed.");

		assert_eq!(endpoint.calls.load(Ordering::SeqCst), 4);
	}

	#[tokio::test]
	async fn user_id_rides_along_with_the_bearer_header() {
		let auth = provider(Arc::new(TokenEndpoint::default()))
			.with_user_id("user-42")
			.expect("Plain ASCII user ids are valid header values.");
		let headers = auth.auth_header(ScopeSet::DATA_READ).await.expect("Headers should render.");

		assert_eq!(headers.len(), 2);
		assert_eq!(headers[0].1, "Bearer abc");
		assert_eq!(headers[1].0.as_str(), USER_ID_HEADER);
		assert_eq!(headers[1].1, "user-42");
	}
}
