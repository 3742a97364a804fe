//! Internal OAuth client facade over the `oauth2` crate.
//!
//! The authentication service exposes one token endpoint per grant, so the facade builds a
//! short-lived [`BasicClient`] per exchange. Client credentials always travel in the form body.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, CsrfToken, EndpointNotSet, EndpointSet,
	HttpClientError, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse, BasicTokenType},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, ScopeSet, Token, TokenSecret},
	config::{AuthEndpoint, ServiceEndpoints},
	error::{ApiError, ConfigError, TransportError},
	http::{HttpTransport, ResponseMetadata, ResponseMetadataSlot, TransportHandle},
};

type TokenClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type AuthorizeClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet>;

/// Grant-specific token exchanges against the authentication service.
#[derive(Clone)]
pub(crate) struct OAuthFacade {
	client_id: ClientId,
	client_secret: oauth2::ClientSecret,
	redirect_uri: Option<RedirectUrl>,
	endpoints: ServiceEndpoints,
	transport: Arc<dyn HttpTransport>,
}
impl OAuthFacade {
	pub(crate) fn new(
		credentials: &ClientCredentials,
		endpoints: ServiceEndpoints,
		transport: Arc<dyn HttpTransport>,
	) -> Self {
		Self {
			client_id: ClientId::new(credentials.client_id.clone()),
			client_secret: oauth2::ClientSecret::new(
				credentials.client_secret.expose().to_owned(),
			),
			redirect_uri: None,
			endpoints,
			transport,
		}
	}

	pub(crate) fn with_redirect_uri(mut self, redirect_uri: &Url) -> Result<Self> {
		let redirect = RedirectUrl::new(redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;

		self.redirect_uri = Some(redirect);

		Ok(self)
	}

	pub(crate) fn endpoints(&self) -> &ServiceEndpoints {
		&self.endpoints
	}

	pub(crate) fn transport(&self) -> &Arc<dyn HttpTransport> {
		&self.transport
	}

	/// Consent URL carrying `client_id`, `response_type`, `redirect_uri`, `scope`, and `state`.
	pub(crate) fn authorize_url(
		&self,
		scope: ScopeSet,
		state: &str,
		implicit: bool,
	) -> Result<Url> {
		let client = self.authorize_client()?;
		let state = state.to_owned();
		let mut request = client
			.authorize_url(move || CsrfToken::new(state))
			.add_scopes(scope.names().map(|name| Scope::new(name.to_owned())));

		if implicit {
			request = request.use_implicit_flow();
		}

		let (url, _) = request.url();

		Ok(url)
	}

	/// `grant_type=client_credentials` against `authenticate`.
	pub(crate) async fn exchange_client_credentials(&self, scope: ScopeSet) -> Result<Token> {
		let client = self.token_client(AuthEndpoint::Authenticate)?;
		let slot = ResponseMetadataSlot::default();
		let handle = TransportHandle::new(self.transport.clone(), slot.clone());
		let response = client
			.exchange_client_credentials()
			.add_scopes(scope.names().map(|name| Scope::new(name.to_owned())))
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(slot.take(), err))?;

		token_from_response(response)
	}

	/// `grant_type=authorization_code` against `gettoken`.
	pub(crate) async fn exchange_code(&self, code: &str) -> Result<Token> {
		let client = self.token_client(AuthEndpoint::GetToken)?;
		let slot = ResponseMetadataSlot::default();
		let handle = TransportHandle::new(self.transport.clone(), slot.clone());
		let response = client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(slot.take(), err))?;

		token_from_response(response)
	}

	/// `grant_type=refresh_token` against `refreshtoken`, re-requesting `scope`.
	pub(crate) async fn exchange_refresh_token(
		&self,
		refresh_token: &TokenSecret,
		scope: ScopeSet,
	) -> Result<Token> {
		let client = self.token_client(AuthEndpoint::RefreshToken)?;
		let slot = ResponseMetadataSlot::default();
		let handle = TransportHandle::new(self.transport.clone(), slot.clone());
		let refresh = RefreshToken::new(refresh_token.expose().to_owned());
		let response = client
			.exchange_refresh_token(&refresh)
			.add_scopes(scope.names().map(|name| Scope::new(name.to_owned())))
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(slot.take(), err))?;

		token_from_response(response)
	}

	fn token_client(&self, endpoint: AuthEndpoint) -> Result<TokenClient> {
		let token_url = TokenUrl::from_url(self.endpoints.auth_url(endpoint)?);
		let mut client = BasicClient::new(self.client_id.clone())
			.set_client_secret(self.client_secret.clone())
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(token_url);

		if let Some(redirect) = &self.redirect_uri {
			client = client.set_redirect_uri(redirect.clone());
		}

		Ok(client)
	}

	fn authorize_client(&self) -> Result<AuthorizeClient> {
		let auth_url = AuthUrl::from_url(self.endpoints.auth_url(AuthEndpoint::Authorize)?);
		let mut client = BasicClient::new(self.client_id.clone()).set_auth_uri(auth_url);

		if let Some(redirect) = &self.redirect_uri {
			client = client.set_redirect_uri(redirect.clone());
		}

		Ok(client)
	}
}
impl Debug for OAuthFacade {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthFacade")
			.field("client_id", &self.client_id.as_str())
			.field("redirect_uri", &self.redirect_uri.as_ref().map(|uri| uri.as_str()))
			.field("endpoints", &self.endpoints)
			.finish()
	}
}

fn token_from_response(response: BasicTokenResponse) -> Result<Token> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let token_type = match response.token_type() {
		BasicTokenType::Bearer => "Bearer".to_owned(),
		other => other.as_ref().to_owned(),
	};
	let mut builder = Token::builder()
		.token_type(token_type)
		.access_token(response.access_token().secret().to_owned())
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(Duration::seconds(expires_in));

	if let Some(refresh) = response.refresh_token() {
		builder = builder.refresh_token(refresh.secret().to_owned());
	}

	builder.build().map_err(|err| ConfigError::from(err).into())
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<TransportError>>,
) -> Error {
	let status = meta.as_ref().and_then(|value| value.status);
	let retry_after = meta.as_ref().and_then(|value| value.retry_after);
	let failed_status = status.filter(|code| !(200..300).contains(code));

	match err {
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::ServerResponse(response) => {
			let reason = response
				.error_description()
				.cloned()
				.unwrap_or_else(|| response.error().as_ref().to_owned());

			ApiError { status: status.unwrap_or(400), reason, retry_after }.into()
		},
		RequestTokenError::Parse(source, body) => match failed_status {
			Some(code) => ApiError::from_raw_body(code, &body).with_retry_after(retry_after).into(),
			None => Error::Decode { source, status: status.unwrap_or(200) },
		},
		RequestTokenError::Other(message) => match failed_status {
			Some(code) => ApiError { status: code, reason: message, retry_after }.into(),
			None => TransportError::Other(message).into(),
		},
	}
}

fn map_transport_error(err: HttpClientError<TransportError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => Error::Transport(*inner),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Other(message).into(),
		_ => TransportError::Other("unrecognized HTTP client failure".into()).into(),
	}
}
