//! In-process TTL cache with eviction on read.
//!
//! Caches are explicit instances injected into the guild aggregator. Time comes from a
//! [`Clock`] so tests can move it forward deterministically with [`ManualClock`].

// std
use std::{borrow::Borrow, hash::Hash};
// self
use crate::_prelude::*;

/// Source of the current instant used for cache expiry.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current UTC instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall-clock [`Clock`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually advanced [`Clock`] for deterministic expiry in tests.
#[derive(Debug)]
pub struct ManualClock(Mutex<OffsetDateTime>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Mutex::new(start))
	}

	/// Moves the clock forward by `delta`.
	pub fn advance(&self, delta: Duration) {
		*self.0.lock() += delta;
	}

	/// Pins the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new(OffsetDateTime::UNIX_EPOCH)
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

/// TTLs applied by the broker's caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheSettings {
	/// Lifetime of a user's guild listing.
	pub user_guilds_ttl: Duration,
	/// Lifetime of the bot's guild listing.
	pub bot_guilds_ttl: Duration,
	/// How long a successful refresh grant is reused for validations still holding the
	/// refresh token it consumed. Zero disables reuse.
	pub refresh_grace: Duration,
}
impl CacheSettings {
	/// Overrides the user guild TTL.
	pub fn with_user_guilds_ttl(mut self, ttl: Duration) -> Self {
		self.user_guilds_ttl = ttl;

		self
	}

	/// Overrides the bot guild TTL.
	pub fn with_bot_guilds_ttl(mut self, ttl: Duration) -> Self {
		self.bot_guilds_ttl = ttl;

		self
	}

	/// Overrides the refresh grace period.
	pub fn with_refresh_grace(mut self, grace: Duration) -> Self {
		self.refresh_grace = grace;

		self
	}
}
impl Default for CacheSettings {
	fn default() -> Self {
		Self {
			user_guilds_ttl: Duration::minutes(5),
			bot_guilds_ttl: Duration::minutes(1),
			refresh_grace: Duration::seconds(10),
		}
	}
}

/// Stored value with its expiry instant.
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
	/// Cached value.
	pub value: V,
	/// First instant at which the entry is stale.
	pub expires_at: OffsetDateTime,
}
impl<V> CacheEntry<V> {
	/// Returns `true` while `now` is strictly before the expiry instant.
	pub fn is_live_at(&self, now: OffsetDateTime) -> bool {
		now < self.expires_at
	}
}

/// Key/value map applying one TTL to every entry it stores.
///
/// Stale entries are removed when they are read, never by a background task. Writes replace
/// entries wholesale, so concurrent writers resolve as last-writer-wins.
pub struct TtlCache<K, V> {
	entries: Mutex<HashMap<K, CacheEntry<V>>>,
	ttl: Duration,
	clock: Arc<dyn Clock>,
}
impl<K, V> TtlCache<K, V>
where
	K: Eq + Hash,
	V: Clone,
{
	/// Creates an empty cache.
	pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
		Self { entries: Mutex::new(HashMap::new()), ttl, clock }
	}

	/// TTL applied to new entries.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Returns the live value for `key`, evicting it if it has expired.
	pub fn get<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		let now = self.clock.now();
		let mut entries = self.entries.lock();

		match entries.get(key).map(|entry| entry.is_live_at(now).then(|| entry.value.clone())) {
			Some(Some(value)) => Some(value),
			Some(None) => {
				entries.remove(key);

				None
			},
			None => None,
		}
	}

	/// Stores `value` until `now + ttl`, replacing any previous entry.
	pub fn set(&self, key: K, value: V) {
		let expires_at = self.clock.now() + self.ttl;

		self.entries.lock().insert(key, CacheEntry { value, expires_at });
	}

	/// Removes `key`, returning whether an entry (live or stale) was present.
	pub fn delete<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		self.entries.lock().remove(key).is_some()
	}

	/// Removes every entry.
	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	/// Number of stored entries, including stale ones not yet read.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}
impl<K, V> Debug for TtlCache<K, V> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TtlCache")
			.field("ttl", &self.ttl)
			.field("entries", &self.entries.lock().len())
			.finish()
	}
}
