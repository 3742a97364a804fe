//! Crate-wide error types shared by credential providers, the request executor, and service APIs.

// crates.io
use oauth2::http::{StatusCode, header::InvalidHeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenBuilderError},
	filters::FilterError,
	recap::SceneError,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Remote service answered with a non-success status.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// The service rejected the media type; the client and API versions are misaligned.
	#[error("API incompatible: {developer_message}: {source}")]
	ApiIncompatible {
		/// The 415 response that triggered the reclassification.
		#[source]
		source: ApiError,
		/// Method, path, and content type that were sent.
		developer_message: String,
	},
	/// A success response carried a body that is not the expected JSON.
	#[error("Response body with status {status} could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status of the response.
		status: u16,
	},
	/// A query filter rejected its input.
	#[error(transparent)]
	Filter(#[from] FilterError),
	/// Reality capture reported a failure inside a success response.
	#[error(transparent)]
	Scene(#[from] SceneError),

	/// The requested scope set is empty or carries unknown bits.
	#[error("Scope `{scope}` is not a valid scope set.")]
	InvalidScope {
		/// The rejected scope set.
		scope: ScopeSet,
	},
	/// The requested scopes exceed what the end user granted.
	#[error("Scopes require `{required}` but only `{granted}` were granted.")]
	ScopeDenied {
		/// Scopes the request needs.
		required: ScopeSet,
		/// Scopes fixed at consent time.
		granted: ScopeSet,
	},
	/// No token is held yet; exchange an authorization code first.
	#[error("No token is held; exchange an authorization code first.")]
	MissingToken,
	/// A scoped request was attempted without credentials.
	#[error("Authentication is required for scope `{scope}`.")]
	Unauthenticated {
		/// Scope the request asked for.
		scope: ScopeSet,
	},
	/// The caller cancelled the request.
	#[error("Request was cancelled.")]
	Cancelled,
	/// The caller-supplied deadline elapsed.
	#[error("Request deadline exceeded.")]
	DeadlineExceeded,
}
impl Error {
	/// Returns the classified API error, looking through the incompatibility wrapper.
	pub fn api_error(&self) -> Option<&ApiError> {
		match self {
			Self::Api(err) | Self::ApiIncompatible { source: err, .. } => Some(err),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised before any request is sent.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A header value contains characters HTTP does not allow.
	#[error(transparent)]
	HeaderValue(#[from] InvalidHeaderValue),
	/// Host or endpoint URL cannot be parsed.
	#[error("Endpoint URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Host must use HTTPS.
	#[error("The host must use HTTPS: {url}.")]
	InsecureHost {
		/// Host URL that failed validation.
		url: String,
	},
	/// Host cannot carry path segments.
	#[error("The host cannot be used as a base URL: {url}.")]
	NotABaseUrl {
		/// Host URL that failed validation.
		url: String,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Required environment variable is unset or empty.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// Request payload could not be serialized.
	#[error("Request body could not be encoded.")]
	Encode(#[from] serde_json::Error),
	/// Token fields were incomplete.
	#[error(transparent)]
	TokenBuilder(#[from] TokenBuilderError),
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// A refresh was needed but the held token carries no refresh secret.
	#[error("Held token is missing a refresh token.")]
	MissingRefreshToken,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Method and URL that failed.
		target: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
	/// HTTP client failure that carries only a message.
	#[error("HTTP client error: {0}.")]
	Other(String),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		target: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { target: target.into(), source: Box::new(src) }
	}
}

/// Classification of a non-success HTTP status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
	/// HTTP 429; the executor waits and retries.
	RateLimited,
	/// HTTP 401.
	Unauthorized,
	/// HTTP 403.
	Forbidden,
	/// HTTP 404.
	NotFound,
	/// HTTP 412; the service's signal for an expired token.
	TokenExpired,
	/// HTTP 415; reclassified into [`Error::ApiIncompatible`] by the executor.
	UnsupportedMediaType,
	/// HTTP 5xx.
	ServerIssue,
	/// Any other non-success status.
	Unclassified,
}
impl ApiErrorKind {
	/// Classifies an HTTP status code.
	pub const fn from_status(status: u16) -> Self {
		match status {
			429 => Self::RateLimited,
			401 => Self::Unauthorized,
			403 => Self::Forbidden,
			404 => Self::NotFound,
			412 => Self::TokenExpired,
			415 => Self::UnsupportedMediaType,
			500..=599 => Self::ServerIssue,
			_ => Self::Unclassified,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::RateLimited => "rate_limited",
			Self::Unauthorized => "unauthorized",
			Self::Forbidden => "forbidden",
			Self::NotFound => "not_found",
			Self::TokenExpired => "token_expired",
			Self::UnsupportedMediaType => "unsupported_media_type",
			Self::ServerIssue => "server_issue",
			Self::Unclassified => "unclassified",
		}
	}
}
impl Display for ApiErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Failed HTTP exchange: the status code plus whatever reason the body carried.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("[{status}]`{reason}`")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Reason text from the body; empty when the body was not parseable.
	pub reason: String,
	/// Retry-After hint, when the service sent one.
	pub retry_after: Option<Duration>,
}
impl ApiError {
	/// Creates an error with only a status code.
	pub fn new(status: u16) -> Self {
		Self { status, reason: String::new(), retry_after: None }
	}

	/// Creates an error carrying the raw body text as the reason.
	pub fn from_raw_body(status: u16, body: &[u8]) -> Self {
		Self { reason: String::from_utf8_lossy(body).into_owned(), ..Self::new(status) }
	}

	/// Best-effort decode of a `{"reason": ...}` body; unparseable bodies leave only the status.
	pub fn from_json_body(status: u16, body: &[u8]) -> Self {
		#[derive(Deserialize)]
		#[serde(rename_all = "camelCase")]
		struct ErrorBody {
			reason: Option<String>,
			developer_message: Option<String>,
		}

		let reason = serde_json::from_slice::<ErrorBody>(body)
			.ok()
			.and_then(|parsed| parsed.reason.or(parsed.developer_message))
			.unwrap_or_default();

		Self { reason, ..Self::new(status) }
	}

	/// Attaches a Retry-After hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}

	/// Classifies the status code.
	pub fn kind(&self) -> ApiErrorKind {
		ApiErrorKind::from_status(self.status)
	}

	/// Typed status code, when it is in the valid HTTP range.
	pub fn status_code(&self) -> Option<StatusCode> {
		StatusCode::from_u16(self.status).ok()
	}

	/// HTTP 429.
	pub fn is_rate_limited(&self) -> bool {
		self.kind() == ApiErrorKind::RateLimited
	}

	/// HTTP 401.
	pub fn is_unauthorized(&self) -> bool {
		self.kind() == ApiErrorKind::Unauthorized
	}

	/// HTTP 403.
	pub fn is_forbidden(&self) -> bool {
		self.kind() == ApiErrorKind::Forbidden
	}

	/// HTTP 404.
	pub fn is_not_found(&self) -> bool {
		self.kind() == ApiErrorKind::NotFound
	}

	/// HTTP 412.
	pub fn is_token_expired(&self) -> bool {
		self.kind() == ApiErrorKind::TokenExpired
	}

	/// HTTP 5xx.
	pub fn is_server_issue(&self) -> bool {
		self.kind() == ApiErrorKind::ServerIssue
	}
}
