//! Observability helpers for broker flows.
//!
//! Every public flow runs inside a `guild_broker.flow` span carrying `flow` and `stage`
//! fields.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment `guild_broker_flow_total{flow,outcome}` for every
//!   attempt/success/failure and `guild_broker_cache_total{cache,result}` for every cache
//!   lookup.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization start and code exchange.
	AuthorizationCode,
	/// Refresh token grant.
	Refresh,
	/// Session validation.
	Validate,
	/// User guild listing.
	UserGuilds,
	/// Bot guild listing.
	BotGuilds,
	/// Mutual manageable guild aggregation.
	MutualGuilds,
	/// Per-guild detail enrichment.
	GuildDetail,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::Refresh => "refresh",
			FlowKind::Validate => "validate",
			FlowKind::UserGuilds => "user_guilds",
			FlowKind::BotGuilds => "bot_guilds",
			FlowKind::MutualGuilds => "mutual_guilds",
			FlowKind::GuildDetail => "guild_detail",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller or recovered locally.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Caches observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheKind {
	/// Per-access-token user guild listings.
	UserGuilds,
	/// The single bot guild listing.
	BotGuilds,
}
impl CacheKind {
	/// Returns a stable label suitable for log or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheKind::UserGuilds => "user_guilds",
			CacheKind::BotGuilds => "bot_guilds",
		}
	}
}
impl Display for CacheKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
