//! Provider REST and token endpoint access.
//!
//! [`ProviderApi`] owns the transport and descriptor. It builds authenticated requests,
//! submits form-encoded token grants, and turns response bodies into typed values or the
//! broker error taxonomy.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::{
		HeaderValue, Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, ResponseError, UpstreamError},
	http::{self, ProviderHttpClient},
	provider::ProviderDescriptor,
};

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Credential attached to a provider API call.
#[derive(Clone, Copy, Debug)]
pub enum Credential<'a> {
	/// End-user access token (`Authorization: Bearer <token>`).
	Bearer(&'a TokenSecret),
	/// Service bot token (`Authorization: Bot <token>`).
	Bot(&'a TokenSecret),
}
impl Credential<'_> {
	fn header_value(self) -> Result<HeaderValue, ConfigError> {
		let (scheme, secret) = match self {
			Self::Bearer(secret) => ("Bearer", secret),
			Self::Bot(secret) => ("Bot", secret),
		};
		let mut value = HeaderValue::try_from(format!("{scheme} {}", secret.expose()))
			.map_err(|_| ConfigError::InvalidCredential)?;

		value.set_sensitive(true);

		Ok(value)
	}
}

/// Request facade over one provider descriptor and one HTTP transport.
pub struct ProviderApi<C>
where
	C: ?Sized + ProviderHttpClient,
{
	http_client: Arc<C>,
	descriptor: ProviderDescriptor,
}
impl<C> ProviderApi<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Wraps a transport for the provided descriptor.
	pub fn new(descriptor: ProviderDescriptor, http_client: impl Into<Arc<C>>) -> Self {
		Self { http_client: http_client.into(), descriptor }
	}

	/// Descriptor this facade talks to.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	/// Fetches `path` relative to the API base and decodes the JSON body.
	///
	/// `endpoint` is a static label (e.g. `guilds/{id}`) used in errors and logs. Any non-2xx
	/// response surfaces as [`UpstreamError`].
	pub async fn get_json<T>(
		&self,
		endpoint: &'static str,
		path: &str,
		credential: Credential<'_>,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let url = self.descriptor.api_url(path)?;
		let request = Request::builder()
			.method(Method::GET)
			.uri(url.as_str())
			.header(ACCEPT, JSON)
			.header(AUTHORIZATION, credential.header_value()?)
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let response = self.execute(request).await?;
		let status = response.status();

		if !status.is_success() {
			return Err(UpstreamError::new(endpoint, status.as_u16())
				.with_retry_after(http::parse_retry_after(response.headers()))
				.with_body(response.body())
				.into());
		}

		Ok(decode_json(endpoint, status.as_u16(), response.body())?)
	}

	/// Posts a form-encoded body to `url`, returning the raw response for the caller to classify.
	pub async fn post_form(&self, url: &Url, form: &[(&str, &str)]) -> Result<HttpResponse> {
		let body = url::form_urlencoded::Serializer::new(String::new())
			.extend_pairs(form.iter().copied())
			.finish()
			.into_bytes();
		let request = Request::builder()
			.method(Method::POST)
			.uri(url.as_str())
			.header(ACCEPT, JSON)
			.header(CONTENT_TYPE, FORM)
			.body(body)
			.map_err(ConfigError::from)?;

		self.execute(request).await
	}

	/// Sends a prepared request through the transport.
	pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
		let handle = self.http_client.handle();

		handle.call(request).await.map_err(http::map_transport_error)
	}
}
impl<C> Debug for ProviderApi<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderApi").field("descriptor", &self.descriptor).finish()
	}
}

/// Decodes a JSON body, reporting the failing path on error.
pub fn decode_json<T>(endpoint: &'static str, status: u16, body: &[u8]) -> Result<T, ResponseError>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ResponseError::Malformed { endpoint, source, status })
}
