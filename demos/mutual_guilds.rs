//! Validates a stored dashboard session and lists the guilds the user can manage alongside the
//! bot.
//!
//! Reads `GUILD_BROKER_CLIENT_ID`, `GUILD_BROKER_CLIENT_SECRET`, `GUILD_BROKER_BOT_TOKEN`, and
//! `GUILD_BROKER_ACCESS_TOKEN` from the environment. `GUILD_BROKER_REFRESH_TOKEN` is optional.

// std
use std::env;
// crates.io
use color_eyre::{Result, eyre::eyre};
use url::Url;
// self
use guild_broker::{
	auth::{ClientCredentials, TokenSecret},
	cache::CacheSettings,
	flows::Broker,
	provider::ProviderDescriptor,
	session::{Session, SessionValidation},
};

fn var(name: &str) -> Result<String> {
	env::var(name).map_err(|_| eyre!("Set `{name}` before running this example."))
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let credentials = ClientCredentials::new(
		var("GUILD_BROKER_CLIENT_ID")?,
		var("GUILD_BROKER_CLIENT_SECRET")?,
		Url::parse("http://localhost:3000/api/auth/callback")?,
	);
	let broker = Broker::new(
		ProviderDescriptor::discord()?,
		credentials,
		TokenSecret::new(var("GUILD_BROKER_BOT_TOKEN")?),
		CacheSettings::default(),
	)?;
	let access_token = var("GUILD_BROKER_ACCESS_TOKEN")?;
	let refresh_token = env::var("GUILD_BROKER_REFRESH_TOKEN").ok();
	let session = Session::from_parts(Some(&access_token), refresh_token.as_deref());
	let SessionValidation::Authenticated(authenticated) =
		broker.validate_session(session.as_ref()).await
	else {
		eprintln!("Session is no longer valid; sign in again.");

		return Ok(());
	};

	println!("Signed in as {}.", authenticated.user.username);

	if authenticated.refreshed {
		println!("Tokens were refreshed; persist the new session before the next request.");
	}

	let guilds = broker.mutual_manageable_guilds(authenticated.session.access_token()).await?;

	for guild in &guilds {
		println!(
			"{} ({}): {} members, icon {}.",
			guild.name,
			guild.id,
			guild.member_count.map_or_else(|| "unknown".into(), |count| count.to_string()),
			guild.icon_url.as_ref().map_or("none", Url::as_str),
		);
	}

	Ok(())
}
