//! OAuth client registration data supplied at startup.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Confidential client registration used against the token endpoint.
#[derive(Clone)]
pub struct ClientCredentials {
	/// OAuth 2.0 client (application) identifier.
	pub client_id: String,
	/// Client secret sent with every grant.
	pub client_secret: TokenSecret,
	/// Redirect URI registered with the provider; reused for refresh grants.
	pub redirect_uri: Url,
}
impl ClientCredentials {
	/// Creates credentials for a confidential client.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		redirect_uri: Url,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			redirect_uri,
		}
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &!self.client_secret.is_empty())
			.field("redirect_uri", &self.redirect_uri.as_str())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn debug_output_never_contains_the_secret() {
		let credentials = ClientCredentials::new(
			"app-1",
			"hunter2",
			Url::parse("https://app.example.com/cb").expect("Redirect fixture should parse."),
		);
		let rendered = format!("{credentials:?}");

		assert!(rendered.contains("app-1"));
		assert!(rendered.contains("client_secret_set: true"));
		assert!(!rendered.contains("hunter2"));
	}
}
