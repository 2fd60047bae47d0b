//! Token endpoint grants: authorization code exchange and refresh.
//!
//! Responses are classified into a [`TokenGrant`] or one of the broker errors:
//!
//! - any body carrying an OAuth `error` field becomes [`Error::Grant`];
//! - a non-2xx response without that envelope becomes [`Error::Upstream`];
//! - a 2xx response without a non-empty `access_token` becomes
//!   [`ResponseError::MissingAccessToken`].

// crates.io
use oauth2::http::StatusCode;
// self
use crate::{
	_prelude::*,
	api::{self, ProviderApi},
	auth::{ClientCredentials, ScopeSet, TokenSecret},
	error::{ProviderError, ResponseError, UpstreamError},
	flows::Broker,
	http::{self, ProviderHttpClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::GrantType,
	session::{Session, TokenGrant},
};

const TOKEN_ENDPOINT: &str = "oauth2/token";

/// Performs grants against the provider's token endpoint with the client's credentials.
pub struct TokenExchanger<C>
where
	C: ?Sized + ProviderHttpClient,
{
	api: Arc<ProviderApi<C>>,
	credentials: ClientCredentials,
}
impl<C> TokenExchanger<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates an exchanger sharing `api`.
	pub fn new(api: Arc<ProviderApi<C>>, credentials: ClientCredentials) -> Self {
		Self { api, credentials }
	}

	/// Client credentials used for every grant.
	pub fn credentials(&self) -> &ClientCredentials {
		&self.credentials
	}

	/// Exchanges a one-time authorization code (`grant_type=authorization_code`).
	pub async fn exchange_authorization_code(
		&self,
		code: &str,
		redirect_uri: &Url,
	) -> Result<TokenGrant> {
		self.grant(GrantType::AuthorizationCode, code, redirect_uri).await
	}

	/// Redeems a refresh token (`grant_type=refresh_token`).
	pub async fn refresh(
		&self,
		refresh_token: &TokenSecret,
		redirect_uri: &Url,
	) -> Result<TokenGrant> {
		self.grant(GrantType::RefreshToken, refresh_token.expose(), redirect_uri).await
	}

	async fn grant(&self, grant: GrantType, value: &str, redirect_uri: &Url) -> Result<TokenGrant> {
		let value_field = match grant {
			GrantType::AuthorizationCode => "code",
			GrantType::RefreshToken => "refresh_token",
		};
		let form = [
			("client_id", self.credentials.client_id.as_str()),
			("client_secret", self.credentials.client_secret.expose()),
			("grant_type", grant.as_str()),
			(value_field, value),
			("redirect_uri", redirect_uri.as_str()),
		];
		let response = self.api.post_form(&self.api.descriptor().endpoints.token, &form).await?;

		parse_token_response(response.status(), response.headers(), response.body())
	}
}
impl<C> Debug for TokenExchanger<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchanger").field("credentials", &self.credentials).finish()
	}
}

impl<C> Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Exchanges the code from the authorization redirect for a new [`Session`].
	///
	/// Provider rejections (e.g. `invalid_grant`) surface as [`Error::Grant`] carrying the
	/// provider's code and description.
	pub async fn exchange_authorization_code(
		&self,
		code: &str,
		redirect_uri: &Url,
	) -> Result<Session> {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "exchange_authorization_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.exchanger
					.exchange_authorization_code(code, redirect_uri)
					.await
					.map(TokenGrant::into_session)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(err) => {
				tracing::warn!(error = %err, "Authorization code exchange failed.");

				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}
}

#[derive(Debug, Deserialize)]
struct TokenEndpointBody {
	access_token: Option<String>,
	refresh_token: Option<String>,
	expires_in: Option<i64>,
	scope: Option<String>,
	error: Option<String>,
	error_description: Option<String>,
}
impl TokenEndpointBody {
	fn provider_error(&mut self, status: u16) -> Option<ProviderError> {
		let code = self.error.take()?;
		let mut err = ProviderError::new(code).with_status(status);

		if let Some(description) = self.error_description.take() {
			err = err.with_description(description);
		}

		Some(err)
	}
}

fn parse_token_response(
	status: StatusCode,
	headers: &oauth2::http::HeaderMap,
	body: &[u8],
) -> Result<TokenGrant> {
	let code = status.as_u16();

	if !status.is_success() {
		let envelope = serde_json::from_slice::<TokenEndpointBody>(body)
			.ok()
			.and_then(|mut parsed| parsed.provider_error(code));

		return Err(match envelope {
			Some(err) => err.into(),
			None => UpstreamError::new(TOKEN_ENDPOINT, code)
				.with_retry_after(http::parse_retry_after(headers))
				.with_body(body)
				.into(),
		});
	}

	let mut parsed = api::decode_json::<TokenEndpointBody>(TOKEN_ENDPOINT, code, body)?;

	if let Some(err) = parsed.provider_error(code) {
		return Err(err.into());
	}

	let access_token = parsed
		.access_token
		.filter(|token| !token.is_empty())
		.ok_or(ResponseError::MissingAccessToken { status: code })?;

	Ok(TokenGrant {
		access_token: TokenSecret::new(access_token),
		refresh_token: parsed.refresh_token.filter(|token| !token.is_empty()).map(TokenSecret::new),
		expires_in: parsed.expires_in.map(Duration::seconds),
		scope: parsed.scope.and_then(|raw| raw.parse::<ScopeSet>().ok()),
	})
}
