// self
use crate::obs::{CacheKind, FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"guild_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a cache hit or miss, logging it at `debug` and counting it when metrics are on.
pub fn record_cache_lookup(cache: CacheKind, hit: bool) {
	let result = if hit { "hit" } else { "miss" };

	tracing::debug!(cache = cache.as_str(), result, "Guild cache lookup.");

	#[cfg(feature = "metrics")]
	{
		metrics::counter!("guild_broker_cache_total", "cache" => cache.as_str(), "result" => result)
			.increment(1);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_accept_every_label() {
		record_flow_outcome(FlowKind::MutualGuilds, FlowOutcome::Failure);
		record_cache_lookup(CacheKind::BotGuilds, true);
		record_cache_lookup(CacheKind::UserGuilds, false);
	}
}
