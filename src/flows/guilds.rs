//! Guild listing flows.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	flows::Broker,
	guilds::{BotGuild, MutualGuild, UserGuild},
	http::ProviderHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::Session,
};

impl<C> Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Guilds the access token's owner belongs to (cached per token).
	pub async fn user_guilds(&self, access_token: &TokenSecret) -> Result<Arc<[UserGuild]>> {
		observe(FlowKind::UserGuilds, "user_guilds", self.guilds.user_guilds(access_token)).await
	}

	/// The user's guilds in which they hold `MANAGE_GUILD`.
	pub async fn manageable_user_guilds(
		&self,
		access_token: &TokenSecret,
	) -> Result<Vec<UserGuild>> {
		let guilds = observe(
			FlowKind::UserGuilds,
			"manageable_user_guilds",
			self.guilds.user_guilds(access_token),
		)
		.await?;

		Ok(guilds.iter().filter(|guild| guild.can_manage()).cloned().collect())
	}

	/// Guilds the bot belongs to (cached under a single key).
	pub async fn bot_guilds(&self) -> Result<Arc<[BotGuild]>> {
		observe(FlowKind::BotGuilds, "bot_guilds", self.guilds.bot_guilds()).await
	}

	/// Guilds shared with the bot where the user holds `MANAGE_GUILD`.
	pub async fn mutual_manageable_guilds(
		&self,
		access_token: &TokenSecret,
	) -> Result<Vec<MutualGuild>> {
		observe(
			FlowKind::MutualGuilds,
			"mutual_manageable_guilds",
			self.guilds.mutual_manageable_guilds(access_token),
		)
		.await
	}

	/// Drops the cached guild listing for `session` (logout).
	pub fn forget_session(&self, session: &Session) -> bool {
		self.caches().user_guilds.delete(&session.access_token().fingerprint())
	}
}

async fn observe<T, F>(kind: FlowKind, stage: &'static str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	obs::record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(err) => {
			tracing::warn!(flow = kind.as_str(), error = %err, "Guild listing failed.");
			obs::record_flow_outcome(kind, FlowOutcome::Failure);
		},
	}

	result
}
