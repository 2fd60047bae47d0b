//! Authorization start: authorize URL and CSRF state.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	error::ProviderError,
	flows::Broker,
	http::ProviderHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::ProviderDescriptor,
};

const STATE_LEN: usize = 32;

/// Error code reported when the redirect's `state` does not match.
pub const INVALID_STATE: &str = "invalid_state";

/// Authorize URL plus the state the redirect handler must check.
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
	/// Requested scope set.
	pub scopes: ScopeSet,
	/// Opaque state value that must round-trip via the redirect handler.
	pub state: String,
	/// Redirect URI supplied when constructing the authorize URL.
	pub redirect_uri: Url,
	/// Fully-formed authorize URL to send the end-user to.
	pub authorize_url: Url,
}
impl AuthorizationRequest {
	fn new(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		redirect_uri: Url,
		scopes: ScopeSet,
	) -> Self {
		let state = random_string(STATE_LEN);
		let mut authorize_url = descriptor.endpoints.authorization.clone();
		let mut pairs = authorize_url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", client_id);
		pairs.append_pair("redirect_uri", redirect_uri.as_str());

		if !scopes.is_empty() {
			pairs.append_pair("scope", &scopes.normalized());
		}

		pairs.append_pair("state", &state);

		drop(pairs);

		Self { scopes, state, redirect_uri, authorize_url }
	}

	/// Validates the `state` returned on the redirect.
	///
	/// A missing or different value fails with an [`ProviderError`] coded `invalid_state`.
	pub fn validate_state(&self, returned_state: Option<&str>) -> Result<()> {
		match returned_state {
			Some(state) if state == self.state => Ok(()),
			Some(_) => Err(ProviderError::new(INVALID_STATE)
				.with_description("Authorization state mismatch.")
				.into()),
			None => Err(ProviderError::new(INVALID_STATE)
				.with_description("Authorization state is missing.")
				.into()),
		}
	}
}

impl<C> Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Builds the authorize URL for a new login.
	///
	/// `scopes` defaults to [`ScopeSet::dashboard`] and `redirect_uri` to the registered
	/// one. The caller stores [`AuthorizationRequest::state`] (e.g. in a cookie) and checks it
	/// with [`AuthorizationRequest::validate_state`] before exchanging the code.
	pub fn start_authorization(
		&self,
		redirect_uri: Option<Url>,
		scopes: Option<ScopeSet>,
	) -> AuthorizationRequest {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let _span = FlowSpan::new(KIND, "start_authorization").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let request = AuthorizationRequest::new(
			self.descriptor(),
			&self.credentials().client_id,
			redirect_uri.unwrap_or_else(|| self.credentials().redirect_uri.clone()),
			scopes.unwrap_or_else(ScopeSet::dashboard),
		);

		obs::record_flow_outcome(KIND, FlowOutcome::Success);

		request
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn request() -> AuthorizationRequest {
		AuthorizationRequest::new(
			&ProviderDescriptor::discord().expect("Discord preset should build."),
			"client-123",
			Url::parse("https://app.example.com/callback").expect("Redirect URL should parse."),
			ScopeSet::dashboard(),
		)
	}

	#[test]
	fn authorize_url_carries_login_parameters() {
		let request = request();
		let pairs = request.authorize_url.query_pairs().into_owned().collect::<HashMap<_, _>>();

		assert_eq!(request.state.len(), STATE_LEN);
		assert!(request.state.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(pairs.get("client_id").map(String::as_str), Some("client-123"));
		assert_eq!(
			pairs.get("redirect_uri").map(String::as_str),
			Some("https://app.example.com/callback")
		);
		assert_eq!(pairs.get("scope").map(String::as_str), Some("email guilds identify"));
		assert_eq!(pairs.get("state"), Some(&request.state));
	}

	#[test]
	fn state_validation_errors_on_mismatch() {
		let request = request();

		assert!(request.validate_state(Some(request.state.as_str())).is_ok());

		for returned in [Some("other"), None] {
			let err = request.validate_state(returned).expect_err("Bad state should fail.");

			assert!(matches!(
				err,
				Error::Grant(ProviderError { ref code, .. }) if code == INVALID_STATE
			));
		}
	}

	#[test]
	fn states_are_unique_per_request() {
		assert_ne!(request().state, request().state);
	}
}
