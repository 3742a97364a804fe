//! Service host configuration shared by every authenticator and API.

// self
use crate::{_prelude::*, error::ConfigError};

/// Production host for every Forge service.
pub const DEFAULT_HOST: &str = "https://developer.api.autodesk.com";
/// Path of the authentication service relative to the host.
pub const DEFAULT_AUTH_PATH: &str = "authentication/v1";

/// Token-endpoint names under the authentication path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthEndpoint {
	/// `POST authenticate`; client-credentials grant.
	Authenticate,
	/// `GET authorize`; user consent redirect.
	Authorize,
	/// `POST gettoken`; authorization-code exchange.
	GetToken,
	/// `POST refreshtoken`; refresh-token exchange.
	RefreshToken,
}
impl AuthEndpoint {
	/// Path segment of the endpoint.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Authenticate => "authenticate",
			Self::Authorize => "authorize",
			Self::GetToken => "gettoken",
			Self::RefreshToken => "refreshtoken",
		}
	}
}

/// Validated host + authentication path used to resolve every request URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ServiceEndpointsBuilder", into = "ServiceEndpointsBuilder")]
pub struct ServiceEndpoints {
	host: Url,
	auth_path: String,
}
impl ServiceEndpoints {
	/// Starts a builder seeded with the production defaults.
	pub fn builder() -> ServiceEndpointsBuilder {
		ServiceEndpointsBuilder::default()
	}

	/// Production endpoints.
	pub fn production() -> Result<Self, ConfigError> {
		Self::builder().build()
	}

	/// Base host every service path is joined onto.
	pub fn host(&self) -> &Url {
		&self.host
	}

	/// Authentication path relative to the host.
	pub fn auth_path(&self) -> &str {
		&self.auth_path
	}

	/// Resolves a token endpoint, e.g. `{host}/authentication/v1/authenticate`.
	pub fn auth_url(&self, endpoint: AuthEndpoint) -> Result<Url, ConfigError> {
		self.join(&self.auth_path, &[endpoint.as_str()])
	}

	/// Joins a `/`-separated service prefix plus literal segments onto the host.
	///
	/// Prefix pieces are split on `/`; each entry of `segments` is pushed as one encoded
	/// path segment, so identifiers containing `/` stay intact.
	pub fn join<S>(&self, prefix: &str, segments: &[S]) -> Result<Url, ConfigError>
	where
		S: AsRef<str>,
	{
		let mut url = self.host.clone();

		{
			let mut path = url
				.path_segments_mut()
				.map_err(|_| ConfigError::NotABaseUrl { url: self.host.to_string() })?;

			path.pop_if_empty();
			path.extend(prefix.split('/').filter(|piece| !piece.is_empty()));
			path.extend(segments);
		}

		Ok(url)
	}
}

/// Builder for [`ServiceEndpoints`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpointsBuilder {
	host: Option<Url>,
	auth_path: Option<String>,
	allow_insecure_host: bool,
}
impl ServiceEndpointsBuilder {
	/// Overrides the host (defaults to [`DEFAULT_HOST`]).
	pub fn host(mut self, host: Url) -> Self {
		self.host = Some(host);

		self
	}

	/// Overrides the authentication path (defaults to [`DEFAULT_AUTH_PATH`]).
	pub fn auth_path(mut self, path: impl Into<String>) -> Self {
		self.auth_path = Some(path.into());

		self
	}

	/// Accepts plain `http` hosts; only meant for local mock servers.
	pub fn allow_insecure_host(mut self, allow: bool) -> Self {
		self.allow_insecure_host = allow;

		self
	}

	/// Validates and builds the endpoints.
	pub fn build(self) -> Result<ServiceEndpoints, ConfigError> {
		let host = match self.host {
			Some(host) => host,
			None => Url::parse(DEFAULT_HOST).map_err(|source| ConfigError::InvalidUrl { source })?,
		};

		if host.cannot_be_a_base() {
			return Err(ConfigError::NotABaseUrl { url: host.to_string() });
		}
		if host.scheme() != "https" && !self.allow_insecure_host {
			return Err(ConfigError::InsecureHost { url: host.to_string() });
		}

		let auth_path = self
			.auth_path
			.map(|path| path.trim_matches('/').to_owned())
			.unwrap_or_else(|| DEFAULT_AUTH_PATH.into());

		Ok(ServiceEndpoints { host, auth_path })
	}
}
impl TryFrom<ServiceEndpointsBuilder> for ServiceEndpoints {
	type Error = ConfigError;

	fn try_from(builder: ServiceEndpointsBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}
impl From<ServiceEndpoints> for ServiceEndpointsBuilder {
	fn from(endpoints: ServiceEndpoints) -> Self {
		let allow_insecure_host = endpoints.host.scheme() != "https";

		Self {
			host: Some(endpoints.host),
			auth_path: Some(endpoints.auth_path),
			allow_insecure_host,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_resolve_token_endpoints() {
		let endpoints = ServiceEndpoints::production().expect("Defaults should build.");

		assert_eq!(
			endpoints.auth_url(AuthEndpoint::Authenticate).expect("Join should succeed.").as_str(),
			"https://developer.api.autodesk.com/authentication/v1/authenticate"
		);
		assert_eq!(
			endpoints.auth_url(AuthEndpoint::RefreshToken).expect("Join should succeed.").as_str(),
			"https://developer.api.autodesk.com/authentication/v1/refreshtoken"
		);
	}

	#[test]
	fn insecure_hosts_require_opt_in() {
		let local = Url::parse("http://127.0.0.1:8080").expect("Local URL should parse.");
		let err = ServiceEndpoints::builder()
			.host(local.clone())
			.build()
			.expect_err("Plain HTTP must be rejected.");

		assert!(matches!(err, ConfigError::InsecureHost { .. }));

		let endpoints = ServiceEndpoints::builder()
			.host(local)
			.allow_insecure_host(true)
			.build()
			.expect("Opt-in should allow plain HTTP.");

		assert_eq!(endpoints.host().scheme(), "http");
	}

	#[test]
	fn opaque_hosts_are_rejected() {
		let err = ServiceEndpoints::builder()
			.host(Url::parse("mailto:ops@example.com").expect("Mailto URL should parse."))
			.allow_insecure_host(true)
			.build()
			.expect_err("Opaque URLs cannot carry paths.");

		assert!(matches!(err, ConfigError::NotABaseUrl { .. }));
	}

	#[test]
	fn join_encodes_identifier_segments() {
		let endpoints = ServiceEndpoints::builder()
			.host(Url::parse("https://example.com/base/").expect("Host should parse."))
			.build()
			.expect("Endpoints should build.");
		let url = endpoints
			.join("oss/v2/buckets", &["k1", "objects", "dir/model.rvt"])
			.expect("Join should succeed.");

		assert_eq!(url.as_str(), "https://example.com/base/oss/v2/buckets/k1/objects/dir%2Fmodel.rvt");
	}

	#[test]
	fn serde_round_trip_revalidates() {
		let endpoints = ServiceEndpoints::builder()
			.auth_path("/authentication/v2/")
			.build()
			.expect("Endpoints should build.");
		let json = serde_json::to_string(&endpoints).expect("Endpoints should serialize.");
		let back: ServiceEndpoints =
			serde_json::from_str(&json).expect("Endpoints should deserialize.");

		assert_eq!(back, endpoints);
		assert_eq!(back.auth_path(), "authentication/v2");
		assert!(
			serde_json::from_str::<ServiceEndpoints>(r#"{"host":"http://example.com"}"#).is_err()
		);
	}
}
