//! High-level flows exposed through the [`Broker`] facade.
//!
//! The broker wires one [`ProviderApi`] into the [`TokenExchanger`], the [`SessionValidator`],
//! and the [`GuildAggregator`]. Each flow lives in its own module and adds its methods to
//! [`Broker`].

pub mod authorize;
pub mod exchange;
pub mod guilds;
pub mod validate;

pub use authorize::*;
pub use exchange::*;
pub use validate::*;

// self
use crate::{
	_prelude::*,
	api::ProviderApi,
	auth::{ClientCredentials, TokenSecret},
	cache::{CacheSettings, Clock},
	guilds::{GuildAggregator, GuildCaches},
	http::ProviderHttpClient,
	provider::ProviderDescriptor,
};
#[cfg(feature = "reqwest")]
use crate::{cache::SystemClock, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport.
pub type ReqwestBroker = Broker<ReqwestHttpClient>;

/// Session lifecycle and guild aggregation against a single provider.
///
/// The broker holds no per-user state besides its caches: sessions are passed in and new ones
/// handed back for the caller to store.
pub struct Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	api: Arc<ProviderApi<C>>,
	exchanger: Arc<TokenExchanger<C>>,
	validator: SessionValidator<C>,
	guilds: GuildAggregator<C>,
}
impl<C> Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates a broker that reuses the caller-provided transport.
	///
	/// Every cache the broker owns reads time from `clock`.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		credentials: ClientCredentials,
		bot_token: TokenSecret,
		settings: CacheSettings,
		clock: Arc<dyn Clock>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		let api = Arc::new(ProviderApi::new(descriptor, http_client));
		let exchanger = Arc::new(TokenExchanger::new(api.clone(), credentials));
		let validator = SessionValidator::new(
			api.clone(),
			exchanger.clone(),
			settings.refresh_grace,
			clock.clone(),
		);
		let caches = GuildCaches::new(settings, clock);
		let guilds = GuildAggregator::new(api.clone(), bot_token, caches);

		Self { api, exchanger, validator, guilds }
	}

	/// Provider descriptor in use.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		self.api.descriptor()
	}

	/// Client credentials used for grants.
	pub fn credentials(&self) -> &ClientCredentials {
		self.exchanger.credentials()
	}

	/// Caches backing the guild listings.
	pub fn caches(&self) -> &GuildCaches {
		self.guilds.caches()
	}

	/// Shared request facade, for calls the broker does not wrap.
	pub fn api(&self) -> &Arc<ProviderApi<C>> {
		&self.api
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient> {
	/// Creates a broker with its own reqwest transport and wall-clock caches.
	pub fn new(
		descriptor: ProviderDescriptor,
		credentials: ClientCredentials,
		bot_token: TokenSecret,
		settings: CacheSettings,
	) -> Result<Self> {
		Ok(Self::with_http_client(
			descriptor,
			credentials,
			bot_token,
			settings,
			Arc::new(SystemClock),
			ReqwestHttpClient::new()?,
		))
	}
}
impl<C> Debug for Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("descriptor", self.descriptor())
			.field("credentials", self.credentials())
			.field("validator", &self.validator)
			.field("guilds", &self.guilds)
			.finish()
	}
}
