//! Broker-level error types shared across the session and guild flows.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Canonical broker error exposed by public APIs.
///
/// Failed session validation is not represented here; it is the ordinary
/// [`SessionValidation::Unauthenticated`](crate::session::SessionValidation) outcome.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Provider rejected the grant with a structured OAuth error body.
	#[error(transparent)]
	Grant(#[from] ProviderError),
	/// Provider answered successfully but the payload is unusable.
	#[error(transparent)]
	Response(#[from] ResponseError),
	/// Resource endpoint answered with a non-success status.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
}
impl Error {
	/// Returns `true` when the provider rejected the credential with HTTP 401.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Upstream(UpstreamError { status: 401, .. }))
	}
}

/// Configuration and validation failures raised by the broker.
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
	/// An endpoint path could not be resolved against the configured base URL.
	#[error("Endpoint `{path}` cannot be resolved against the API base.")]
	InvalidEndpoint {
		/// Relative path that failed to resolve.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Credential contains characters that are not valid in an HTTP header.
	#[error("Credential cannot be encoded as an HTTP header value.")]
	InvalidCredential,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
	/// HTTP client failed without a typed source.
	#[error("HTTP client error occurred while calling the provider: {message}.")]
	Other {
		/// Client-supplied failure summary.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// OAuth error envelope (`error` + `error_description`) returned by the token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Provider rejected the grant: {}.", display_reason(.code, .description))]
pub struct ProviderError {
	/// OAuth `error` code, e.g. `invalid_grant`.
	pub code: String,
	/// OAuth `error_description`, when supplied.
	pub description: Option<String>,
	/// HTTP status that carried the envelope, when known.
	pub status: Option<u16>,
}
impl ProviderError {
	/// Creates an error for the given OAuth code.
	pub fn new(code: impl Into<String>) -> Self {
		Self { code: code.into(), description: None, status: None }
	}

	/// Attaches the provider's `error_description`.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());

		self
	}

	/// Attaches the HTTP status code.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}

	/// Human-readable reason, preferring the description over the bare code.
	pub fn reason(&self) -> &str {
		display_reason(&self.code, &self.description)
	}
}

/// Successful responses whose payload cannot be used.
#[derive(Debug, ThisError)]
pub enum ResponseError {
	/// Token endpoint succeeded without issuing an access token.
	#[error("Token endpoint response is missing access_token.")]
	MissingAccessToken {
		/// HTTP status code of the response.
		status: u16,
	},
	/// Body could not be decoded into the expected shape.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	Malformed {
		/// Endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
}

/// Non-success status returned by a provider endpoint.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("The {endpoint} endpoint responded with HTTP {status}.")]
pub struct UpstreamError {
	/// Endpoint label, e.g. `users/@me/guilds`.
	pub endpoint: &'static str,
	/// HTTP status code.
	pub status: u16,
	/// Retry-After hint from upstream, if supplied.
	pub retry_after: Option<Duration>,
	/// Leading part of the response body for diagnostics.
	pub body_preview: Option<String>,
}
impl UpstreamError {
	/// Creates an error for the endpoint + status pair.
	pub fn new(endpoint: &'static str, status: u16) -> Self {
		Self { endpoint, status, retry_after: None, body_preview: None }
	}

	/// Attaches a Retry-After hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}

	/// Attaches a truncated preview of the response body.
	pub fn with_body(mut self, body: &[u8]) -> Self {
		if !body.is_empty() {
			self.body_preview = Some(truncate_preview(&String::from_utf8_lossy(body)));
		}

		self
	}
}

fn display_reason<'a>(code: &'a str, description: &'a Option<String>) -> &'a str {
	description.as_deref().unwrap_or(code)
}

fn truncate_preview(body: &str) -> String {
	if body.chars().count() <= BODY_PREVIEW_LIMIT {
		return body.to_owned();
	}

	let mut buf = body.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn provider_error_prefers_description() {
		let err =
			ProviderError::new("invalid_grant").with_description("Invalid \"code\" in request.");

		assert_eq!(err.reason(), "Invalid \"code\" in request.");
		assert_eq!(ProviderError::new("invalid_grant").reason(), "invalid_grant");
		assert!(Error::from(err).to_string().starts_with("Provider rejected the grant"));
	}

	#[test]
	fn only_http_401_counts_as_unauthorized() {
		assert!(Error::from(UpstreamError::new("users/@me", 401)).is_unauthorized());
		assert!(!Error::from(UpstreamError::new("users/@me", 403)).is_unauthorized());
		assert!(
			!Error::from(ProviderError::new("invalid_grant").with_status(401)).is_unauthorized()
		);
	}

	#[test]
	fn body_preview_is_truncated() {
		let body = "x".repeat(BODY_PREVIEW_LIMIT * 2);
		let err = UpstreamError::new("guilds", 500).with_body(body.as_bytes());
		let preview = err.body_preview.expect("Preview should be captured for non-empty bodies.");

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
		assert!(UpstreamError::new("guilds", 500).with_body(b"").body_preview.is_none());
	}
}
