//! Guild records returned by the provider and the caches that hold them.

pub mod aggregator;

pub use aggregator::*;

// self
use crate::{
	_prelude::*,
	auth::{GuildId, UserId},
	cache::{CacheSettings, Clock, TtlCache},
	permission::Permissions,
};

/// Fixed key of the single bot guild cache entry.
pub const BOT_GUILDS_CACHE_KEY: &str = "bot_guilds";

/// Cache of user guild listings keyed by access-token fingerprint.
pub type UserGuildCache = TtlCache<String, Arc<[UserGuild]>>;
/// Cache holding the bot's trimmed guild listing under [`BOT_GUILDS_CACHE_KEY`].
pub type BotGuildCache = TtlCache<String, Arc<[BotGuild]>>;

/// Guild summary as seen by the authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGuild {
	/// Snowflake identifier.
	pub id: GuildId,
	/// Display name.
	pub name: String,
	/// Icon hash.
	#[serde(default)]
	pub icon: Option<String>,
	/// Whether the user owns the guild.
	#[serde(default)]
	pub owner: bool,
	/// The user's effective permissions in the guild.
	pub permissions: Permissions,
}
impl UserGuild {
	/// Returns `true` when the user holds `MANAGE_GUILD` in this guild.
	pub fn can_manage(&self) -> bool {
		self.permissions.can_manage_guild()
	}
}

/// Guild summary as seen by the bot, trimmed to the fields the join needs.
///
/// Any other field in the provider payload is dropped while decoding, so cached values never
/// carry it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotGuild {
	/// Snowflake identifier.
	pub id: GuildId,
	/// Display name.
	pub name: String,
	/// Icon hash.
	#[serde(default)]
	pub icon: Option<String>,
}

/// Volatile per-guild details fetched with the bot credential; never cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildDetail {
	/// Owner of the guild.
	pub owner_id: UserId,
	/// Approximate member count.
	#[serde(default)]
	pub approximate_member_count: Option<u64>,
	/// Approximate online member count.
	#[serde(default)]
	pub approximate_presence_count: Option<u64>,
}

/// Guild shared by the user and the bot where the user can manage settings.
///
/// Detail fields are `None` when enrichment failed for this guild.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutualGuild {
	/// Snowflake identifier.
	pub id: GuildId,
	/// Display name.
	pub name: String,
	/// CDN icon URL, when the guild has an icon.
	pub icon_url: Option<Url>,
	/// Owner of the guild.
	pub owner_id: Option<UserId>,
	/// Approximate member count.
	pub member_count: Option<u64>,
	/// Approximate online member count.
	pub presence_count: Option<u64>,
}

/// The pair of caches used by [`GuildAggregator`].
#[derive(Clone, Debug)]
pub struct GuildCaches {
	/// User guild listings.
	pub user_guilds: Arc<UserGuildCache>,
	/// Bot guild listing.
	pub bot_guilds: Arc<BotGuildCache>,
}
impl GuildCaches {
	/// Creates independent caches with the configured TTLs sharing `clock`.
	pub fn new(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
		Self {
			user_guilds: Arc::new(TtlCache::new(settings.user_guilds_ttl, clock.clone())),
			bot_guilds: Arc::new(TtlCache::new(settings.bot_guilds_ttl, clock)),
		}
	}
}
