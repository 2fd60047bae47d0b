//! Cached guild listings and the mutual-guild join.

// crates.io
use futures::future;
// self
use crate::{
	_prelude::*,
	api::{Credential, ProviderApi},
	auth::{GuildId, TokenSecret},
	guilds::{BOT_GUILDS_CACHE_KEY, BotGuild, GuildCaches, GuildDetail, MutualGuild, UserGuild},
	http::ProviderHttpClient,
	obs::{self, CacheKind, FlowKind, FlowOutcome, FlowSpan},
	provider::ProviderDescriptor,
};

const GUILDS_ENDPOINT: &str = "users/@me/guilds";
const GUILD_DETAIL_ENDPOINT: &str = "guilds/{id}";

/// Fetches user and bot guild listings through their caches and joins them.
pub struct GuildAggregator<C>
where
	C: ?Sized + ProviderHttpClient,
{
	api: Arc<ProviderApi<C>>,
	bot_token: TokenSecret,
	caches: GuildCaches,
}
impl<C> GuildAggregator<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates an aggregator using `bot_token` for bot-scoped calls.
	pub fn new(api: Arc<ProviderApi<C>>, bot_token: TokenSecret, caches: GuildCaches) -> Self {
		Self { api, bot_token, caches }
	}

	/// Caches backing this aggregator.
	pub fn caches(&self) -> &GuildCaches {
		&self.caches
	}

	/// Guilds the access token's owner belongs to, cached per token.
	pub async fn user_guilds(&self, access_token: &TokenSecret) -> Result<Arc<[UserGuild]>> {
		let key = access_token.fingerprint();

		if let Some(guilds) = self.caches.user_guilds.get(&key) {
			obs::record_cache_lookup(CacheKind::UserGuilds, true);

			return Ok(guilds);
		}

		obs::record_cache_lookup(CacheKind::UserGuilds, false);

		let credential = Credential::Bearer(access_token);
		let guilds: Vec<UserGuild> =
			self.api.get_json(GUILDS_ENDPOINT, GUILDS_ENDPOINT, credential).await?;
		let guilds = Arc::<[UserGuild]>::from(guilds);

		self.caches.user_guilds.set(key, guilds.clone());

		Ok(guilds)
	}

	/// Guilds the bot belongs to, trimmed to `id`, `name`, and `icon`, cached under one key.
	pub async fn bot_guilds(&self) -> Result<Arc<[BotGuild]>> {
		if let Some(guilds) = self.caches.bot_guilds.get(BOT_GUILDS_CACHE_KEY) {
			obs::record_cache_lookup(CacheKind::BotGuilds, true);

			return Ok(guilds);
		}

		obs::record_cache_lookup(CacheKind::BotGuilds, false);

		let credential = Credential::Bot(&self.bot_token);
		let guilds: Vec<BotGuild> =
			self.api.get_json(GUILDS_ENDPOINT, GUILDS_ENDPOINT, credential).await?;
		let guilds = Arc::<[BotGuild]>::from(guilds);

		self.caches.bot_guilds.set(BOT_GUILDS_CACHE_KEY.to_owned(), guilds.clone());

		Ok(guilds)
	}

	/// Owner and approximate counts for one guild, fetched with the bot credential.
	pub async fn guild_detail(&self, id: &GuildId) -> Result<GuildDetail> {
		self.api
			.get_json(
				GUILD_DETAIL_ENDPOINT,
				&format!("guilds/{id}?with_counts=true"),
				Credential::Bot(&self.bot_token),
			)
			.await
	}

	/// Guilds shared with the bot where the user holds `MANAGE_GUILD`, enriched with details.
	///
	/// Both listings are fetched concurrently and either failure aborts the call. Detail
	/// lookups run concurrently too, but a failed lookup only leaves that guild's detail
	/// fields empty.
	pub async fn mutual_manageable_guilds(
		&self,
		access_token: &TokenSecret,
	) -> Result<Vec<MutualGuild>> {
		let (user_guilds, bot_guilds) =
			futures::try_join!(self.user_guilds(access_token), self.bot_guilds())?;
		let bot_by_id =
			bot_guilds.iter().map(|guild| (&guild.id, guild)).collect::<HashMap<_, _>>();
		let candidates = user_guilds
			.iter()
			.filter(|guild| guild.can_manage())
			.filter_map(|guild| bot_by_id.get(&guild.id).copied())
			.collect::<Vec<_>>();
		let lookups = candidates.iter().map(|guild| self.guild_detail_best_effort(&guild.id));
		let details = future::join_all(lookups).await;

		candidates
			.into_iter()
			.zip(details)
			.map(|(guild, detail)| mutual_guild(self.api.descriptor(), guild, detail))
			.collect()
	}

	async fn guild_detail_best_effort(&self, id: &GuildId) -> Option<GuildDetail> {
		const KIND: FlowKind = FlowKind::GuildDetail;

		let span = FlowSpan::new(KIND, "guild_detail");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		match span.instrument(self.guild_detail(id)).await {
			Ok(detail) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				Some(detail)
			},
			Err(err) => {
				tracing::warn!(guild_id = %id, error = %err, "Guild detail lookup failed.");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);

				None
			},
		}
	}
}
impl<C> Debug for GuildAggregator<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GuildAggregator")
			.field("bot_token", &self.bot_token)
			.field("caches", &self.caches)
			.finish()
	}
}

fn mutual_guild(
	descriptor: &ProviderDescriptor,
	guild: &BotGuild,
	detail: Option<GuildDetail>,
) -> Result<MutualGuild> {
	let icon_url = guild
		.icon
		.as_deref()
		.map(|icon| descriptor.cdn_url(&format!("icons/{}/{icon}.png", guild.id)))
		.transpose()?;
	let (owner_id, member_count, presence_count) = match detail {
		Some(detail) => (
			Some(detail.owner_id),
			detail.approximate_member_count,
			detail.approximate_presence_count,
		),
		None => (None, None, None),
	};

	Ok(MutualGuild {
		id: guild.id.clone(),
		name: guild.name.clone(),
		icon_url,
		owner_id,
		member_count,
		presence_count,
	})
}
