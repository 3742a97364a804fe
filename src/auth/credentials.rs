//! Application client credentials.

// self
use crate::{_prelude::*, auth::ClientSecret, error::ConfigError};

/// Environment variable holding the client identifier.
pub const ENV_CLIENT_ID: &str = "FORGE_CLIENT_ID";
/// Environment variable holding the client secret.
pub const ENV_CLIENT_SECRET: &str = "FORGE_CLIENT_SECRET";

/// Client identifier and secret issued to the application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: ClientSecret,
}
impl ClientCredentials {
	/// Creates credentials from raw values.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: ClientSecret::new(client_secret) }
	}

	/// Reads `FORGE_CLIENT_ID` and `FORGE_CLIENT_SECRET` from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Resolves both values through `lookup`; empty values count as missing.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&'static str) -> Option<String>,
	{
		let fetch = |name: &'static str| {
			lookup(name).filter(|value| !value.is_empty()).ok_or(ConfigError::MissingEnv { name })
		};

		Ok(Self::new(fetch(ENV_CLIENT_ID)?, fetch(ENV_CLIENT_SECRET)?))
	}
}
