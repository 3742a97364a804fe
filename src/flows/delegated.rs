//! Delegated-user (3-legged) credentials: an end user consents to a fixed scope set.
//!
//! The lifecycle is: build the consent URL with [`DelegatedUserAuth::authorization_url`], let
//! the user approve out-of-band, then trade the one-time code via
//! [`DelegatedUserAuth::exchange_code`]. The held token is an immutable [`Arc<Token>`] snapshot;
//! refreshes swap in a whole new snapshot so readers never observe a partially updated token.

// self
use crate::{
	_prelude::*,
	auth::{
		AuthFuture, Authenticator, ClientCredentials, ScopeSet, Token, authenticator::bearer_header,
	},
	config::ServiceEndpoints,
	flows::RefreshMetrics,
	http::HttpTransport,
	oauth::OAuthFacade,
	obs::{self, FlowKind},
};

/// Authorization-code provider holding the user's token.
pub struct DelegatedUserAuth {
	pub(super) facade: OAuthFacade,
	redirect_uri: Url,
	pub(super) granted: ScopeSet,
	implicit: bool,
	pub(super) token: RwLock<Option<Arc<Token>>>,
	pub(super) refresh_guard: AsyncMutex<()>,
	pub(super) refresh_metrics: Arc<RefreshMetrics>,
}
impl DelegatedUserAuth {
	/// Creates a provider using the default reqwest transport.
	///
	/// An empty `granted` scope falls back to [`ScopeSet::DATA_READ`].
	#[cfg(feature = "reqwest")]
	pub fn new(
		credentials: ClientCredentials,
		endpoints: ServiceEndpoints,
		redirect_uri: Url,
		granted: ScopeSet,
	) -> Result<Self> {
		Self::with_transport(
			credentials,
			endpoints,
			Arc::new(crate::http::ReqwestTransport::default()),
			redirect_uri,
			granted,
		)
	}

	/// Creates a provider that sends token exchanges through `transport`.
	pub fn with_transport(
		credentials: ClientCredentials,
		endpoints: ServiceEndpoints,
		transport: Arc<dyn HttpTransport>,
		redirect_uri: Url,
		granted: ScopeSet,
	) -> Result<Self> {
		let facade =
			OAuthFacade::new(&credentials, endpoints, transport).with_redirect_uri(&redirect_uri)?;
		let granted = if granted.is_empty() { ScopeSet::DATA_READ } else { granted };

		Ok(Self {
			facade,
			redirect_uri,
			granted,
			implicit: false,
			token: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
			refresh_metrics: Default::default(),
		})
	}

	/// Requests `response_type=token` (implicit grant) instead of an authorization code.
	pub fn implicit(mut self, implicit: bool) -> Self {
		self.implicit = implicit;

		self
	}

	/// Seeds a previously obtained token, e.g. one restored from storage.
	pub fn with_token(self, token: Token) -> Self {
		*self.token.write() = Some(Arc::new(token));

		self
	}

	/// Scopes the user consented to.
	pub fn granted_scope(&self) -> ScopeSet {
		self.granted
	}

	/// Redirect URI registered for the application.
	pub fn redirect_uri(&self) -> &Url {
		&self.redirect_uri
	}

	/// Current token snapshot, if one is held.
	pub fn current_token(&self) -> Option<Arc<Token>> {
		self.token.read().clone()
	}

	/// Counters for refresh exchanges performed by this provider.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.refresh_metrics.clone()
	}

	/// Transport used for token exchanges; API clients may share it.
	pub fn transport(&self) -> Arc<dyn HttpTransport> {
		self.facade.transport().clone()
	}

	/// Builds the consent URL. `state` is echoed back on the redirect for CSRF correlation;
	/// [`generate_state`](crate::flows::generate_state) produces a suitable value.
	pub fn authorization_url(&self, state: &str) -> Result<Url> {
		self.facade.authorize_url(self.granted, state, self.implicit)
	}

	/// Trades a one-time authorization code for the initial token and holds it.
	pub async fn exchange_code(&self, code: &str) -> Result<Arc<Token>> {
		let flow = self.facade.exchange_code(code);
		let token = obs::observe(FlowKind::AuthorizationCode, "exchange_code", flow).await?;
		let token = Arc::new(token);

		*self.token.write() = Some(token.clone());

		Ok(token)
	}

	/// Returns the held token after checking `scope` against the granted set and refreshing an
	/// expired token.
	///
	/// Scopes outside the granted set fail with [`Error::ScopeDenied`] before any network call.
	pub async fn token_with_scope(&self, scope: ScopeSet) -> Result<Arc<Token>> {
		if !self.granted.allows(scope) {
			return Err(Error::ScopeDenied { required: scope, granted: self.granted });
		}

		self.refresh_if_expired().await?;

		self.current_token().ok_or(Error::MissingToken)
	}
}
impl Authenticator for DelegatedUserAuth {
	fn auth_header(&self, scope: ScopeSet) -> AuthFuture<'_> {
		Box::pin(async move {
			let token = self.token_with_scope(scope).await?;

			Ok(vec![bearer_header(&token)?])
		})
	}

	fn endpoints(&self) -> &ServiceEndpoints {
		self.facade.endpoints()
	}
}
impl Debug for DelegatedUserAuth {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DelegatedUserAuth")
			.field("facade", &self.facade)
			.field("granted", &self.granted)
			.field("implicit", &self.implicit)
			.field("token", &self.current_token())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::http::{HttpRequest, HttpResponse, TransportFuture};

	#[derive(Default)]
	struct Counting(AtomicUsize);
	impl HttpTransport for Counting {
		fn send(&self, _: HttpRequest) -> TransportFuture<'_> {
			self.0.fetch_add(1, Ordering::SeqCst);

			Box::pin(async {
				let mut response = HttpResponse::new(
					br#"{"access_token":"fresh","token_type":"Bearer","expires_in":3600}"#.to_vec(),
				);

				response.headers_mut().insert(
					oauth2::http::header::CONTENT_TYPE,
					oauth2::http::HeaderValue::from_static("application/json"),
				);

				Ok(response)
			})
		}
	}

	fn provider(transport: Arc<Counting>, granted: ScopeSet) -> DelegatedUserAuth {
		DelegatedUserAuth::with_transport(
			ClientCredentials::new("id", "secret"),
			ServiceEndpoints::production().expect("Default endpoints should build."),
			transport,
			Url::parse("https://app.example.com/callback").expect("Redirect should parse."),
			granted,
		)
		.expect("Provider should build.")
	}

	fn live_token() -> Token {
		Token::builder()
			.access_token("held")
			.refresh_token("refresh")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Token fixture should build.")
	}

	#[tokio::test]
	async fn scope_outside_the_grant_is_denied_offline() {
		let transport = Arc::new(Counting::default());
		let auth = provider(transport.clone(), ScopeSet::DATA_READ).with_token(live_token());
		let err = auth
			.token_with_scope(ScopeSet::DATA_READ | ScopeSet::DATA_WRITE)
			.await
			.expect_err("Write was never granted.");

		assert!(matches!(
			err,
			Error::ScopeDenied { required, granted }
				if required == ScopeSet::DATA_READ | ScopeSet::DATA_WRITE
					&& granted == ScopeSet::DATA_READ
		));
		assert_eq!(transport.0.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn live_tokens_are_returned_without_refresh() {
		let transport = Arc::new(Counting::default());
		let auth = provider(transport.clone(), ScopeSet::DATA_READ).with_token(live_token());
		let token = auth.token_with_scope(ScopeSet::DATA_READ).await.expect("Token is live.");

		assert_eq!(token.access_token.expose(), "held");
		assert_eq!(transport.0.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn missing_token_is_reported() {
		let auth = provider(Arc::new(Counting::default()), ScopeSet::DATA_READ);

		assert!(matches!(
			auth.token_with_scope(ScopeSet::DATA_READ).await,
			Err(Error::MissingToken)
		));
	}

	#[tokio::test]
	async fn exchange_code_holds_the_token() {
		let transport = Arc::new(Counting::default());
		let auth = provider(transport.clone(), ScopeSet::EMPTY);

		assert_eq!(auth.granted_scope(), ScopeSet::DATA_READ);

		let token = auth.exchange_code("one-time").await.expect("Canned exchange should succeed.");

		assert_eq!(token.access_token.expose(), "fresh");
		assert!(Arc::ptr_eq(&token, &auth.current_token().expect("Token should be held.")));
		assert_eq!(transport.0.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn authorization_url_uses_granted_scope() {
		let granted = ScopeSet::DATA_READ | ScopeSet::VIEWABLES_READ;
		let auth = provider(Arc::new(Counting::default()), granted).implicit(true);
		let url = auth.authorization_url("state-1").expect("URL should build.");
		let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();

		assert_eq!(pairs["scope"], "viewables:read data:read");
		assert_eq!(pairs["response_type"], "token");
		assert_eq!(pairs["state"], "state-1");
	}
}
