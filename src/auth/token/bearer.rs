//! Immutable bearer token snapshots and their builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Errors produced by [`TokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the expiry cannot be represented as a date.
	#[error("Expiry is out of the representable date range.")]
	ExpiryOutOfRange,
}

/// Bearer credential returned by a token exchange.
///
/// Tokens are never mutated; a refresh produces a new snapshot that replaces the old one
/// wholesale, so readers cannot observe a half-updated token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Token type reported by the service (always `Bearer` in practice).
	pub token_type: String,
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, issued by the authorization-code exchange.
	pub refresh_token: Option<TokenSecret>,
	/// Lifetime reported by the service.
	pub expires_in: Duration,
	/// Instant the token was received.
	pub issued_at: OffsetDateTime,
	/// `issued_at + expires_in`, or an explicit expiry.
	pub expires_at: OffsetDateTime,
}
impl Token {
	/// Returns a builder.
	pub fn builder() -> TokenBuilder {
		TokenBuilder::default()
	}

	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the token expires within `window` of `instant`.
	pub fn expires_within(&self, window: Duration, instant: OffsetDateTime) -> bool {
		self.expires_at - instant <= window
	}

	/// Renders the `Authorization` header value.
	pub fn authorization(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("token_type", &self.token_type)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_in", &self.expires_in)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`Token`].
#[derive(Clone, Debug, Default)]
pub struct TokenBuilder {
	token_type: Option<String>,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenBuilder {
	/// Sets the token type; defaults to `Bearer`.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issued-at instant; defaults to now.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Token`].
	pub fn build(self) -> Result<Token, TokenBuilderError> {
		let access_token = self.access_token.ok_or(TokenBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let (expires_in, expires_at) = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => (instant - issued_at, instant),
			(None, Some(delta)) => {
				let instant =
					issued_at.checked_add(delta).ok_or(TokenBuilderError::ExpiryOutOfRange)?;

				(delta, instant)
			},
			(None, None) => return Err(TokenBuilderError::MissingExpiry),
		};

		Ok(Token {
			token_type: self.token_type.unwrap_or_else(|| "Bearer".into()),
			access_token,
			refresh_token: self.refresh_token,
			expires_in,
			issued_at,
			expires_at,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn builder_handles_relative_expiry() {
		let token = Token::builder()
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::hours(1))
			.build()
			.expect("Token builder should support relative expiry calculations.");

		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
		assert_eq!(token.token_type, "Bearer");
		assert!(!token.is_expired_at(macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(token.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
		assert!(token.expires_within(
			Duration::minutes(5),
			macros::datetime!(2025-01-01 00:56 UTC)
		));
	}

	#[test]
	fn builder_requires_access_token_and_expiry() {
		assert_eq!(
			Token::builder().expires_in(Duration::hours(1)).build().unwrap_err(),
			TokenBuilderError::MissingAccessToken
		);
		assert_eq!(
			Token::builder().access_token("a").build().unwrap_err(),
			TokenBuilderError::MissingExpiry
		);
	}

	#[test]
	fn builder_rejects_unrepresentable_expiry() {
		assert_eq!(
			Token::builder()
				.access_token("a")
				.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
				.expires_in(Duration::seconds(100_000_000_000_000))
				.build()
				.unwrap_err(),
			TokenBuilderError::ExpiryOutOfRange
		);
	}

	#[test]
	fn debug_and_header_handle_secrets() {
		let token = Token::builder()
			.access_token("abc")
			.refresh_token("def")
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Token fixture should build.");
		let rendered = format!("{token:?}");

		assert!(!rendered.contains("abc"));
		assert!(!rendered.contains("def"));
		assert_eq!(token.authorization(), "Bearer abc");
	}
}
