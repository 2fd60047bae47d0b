// std
use std::net::IpAddr;
// self
use crate::{
	_prelude::*,
	provider::{ProviderDescriptor, ProviderEndpoints},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// Authorization endpoint is required to start logins.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory for exchanges and refreshes.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// REST API base is mandatory for profile and guild calls.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// CDN base is mandatory for icon and avatar URLs.
	#[error("Missing CDN base URL.")]
	MissingCdnBase,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Base URLs cannot carry a query or fragment.
	#[error("The {endpoint} base URL cannot carry a query or fragment: {url}.")]
	InvalidBase {
		/// Which base failed validation.
		endpoint: &'static str,
		/// Base URL that failed validation.
		url: String,
	},
	/// A preset URL failed to parse.
	#[error("Endpoint URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug, Default)]
pub struct ProviderDescriptorBuilder {
	/// Authorization endpoint the browser is redirected to.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint used for exchanges and refreshes.
	pub token_endpoint: Option<Url>,
	/// REST API base.
	pub api_base: Option<Url>,
	/// Asset CDN base.
	pub cdn_base: Option<Url>,
}
impl ProviderDescriptorBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the REST API base. A trailing `/` is appended when missing.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Sets the CDN base. A trailing `/` is appended when missing.
	pub fn cdn_base(mut self, url: Url) -> Self {
		self.cdn_base = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let api = normalize_base(self.api_base.ok_or(ProviderDescriptorError::MissingApiBase)?);
		let cdn = normalize_base(self.cdn_base.ok_or(ProviderDescriptorError::MissingCdnBase)?);
		let descriptor =
			ProviderDescriptor { endpoints: ProviderEndpoints { authorization, token, api, cdn } };

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("api", &self.endpoints.api)?;
		validate_endpoint("cdn", &self.endpoints.cdn)?;
		validate_base("api", &self.endpoints.api)?;
		validate_base("cdn", &self.endpoints.cdn)?;

		Ok(())
	}
}

fn normalize_base(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ProviderDescriptorError::InsecureEndpoint {
			endpoint: name,
			url: url.to_string(),
		}),
	}
}

fn validate_base(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.query().is_some() || url.fragment().is_some() {
		Err(ProviderDescriptorError::InvalidBase { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.is_ok_and(|ip| ip.is_loopback()),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(raw: &str) -> Url {
		Url::parse(raw).expect("Test URL should parse.")
	}

	fn complete(base: &str) -> ProviderDescriptorBuilder {
		ProviderDescriptor::builder()
			.authorization_endpoint(url(&format!("{base}/oauth2/authorize")))
			.token_endpoint(url(&format!("{base}/oauth2/token")))
			.api_base(url(&format!("{base}/api")))
			.cdn_base(url(&format!("{base}/cdn/")))
	}

	#[test]
	fn bases_gain_trailing_slash() {
		let descriptor =
			complete("https://provider.example").build().expect("Descriptor should build.");

		assert_eq!(descriptor.endpoints.api.as_str(), "https://provider.example/api/");
		assert_eq!(descriptor.endpoints.cdn.as_str(), "https://provider.example/cdn/");
	}

	#[test]
	fn missing_endpoints_are_reported() {
		let err = ProviderDescriptor::builder()
			.token_endpoint(url("https://provider.example/token"))
			.build()
			.expect_err("Descriptor without an authorization endpoint should fail.");

		assert_eq!(err, ProviderDescriptorError::MissingAuthorizationEndpoint);

		let err = ProviderDescriptor::builder()
			.authorization_endpoint(url("https://provider.example/authorize"))
			.token_endpoint(url("https://provider.example/token"))
			.build()
			.expect_err("Descriptor without an API base should fail.");

		assert_eq!(err, ProviderDescriptorError::MissingApiBase);
	}

	#[test]
	fn plain_http_is_limited_to_loopback() {
		assert!(complete("http://127.0.0.1:8080").build().is_ok());
		assert!(complete("http://localhost:8080").build().is_ok());
		assert!(complete("http://[::1]:8080").build().is_ok());

		let err = complete("http://provider.example")
			.build()
			.expect_err("Remote plain-HTTP endpoints should be rejected.");

		assert!(matches!(
			err,
			ProviderDescriptorError::InsecureEndpoint { endpoint: "authorization", .. }
		));
	}

	#[test]
	fn bases_reject_queries() {
		let err = complete("https://provider.example")
			.api_base(url("https://provider.example/api/?v=10"))
			.build()
			.expect_err("API base with a query should be rejected.");

		assert!(matches!(err, ProviderDescriptorError::InvalidBase { endpoint: "api", .. }));
	}
}
