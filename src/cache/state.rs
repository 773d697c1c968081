//! Cache state modelling the lifecycle of one cached document.

// self
use crate::_prelude::*;

/// A cached document and the instant it was fetched.
#[derive(Debug)]
pub struct CachedValue<T> {
	/// Document retained for the slot.
	pub value: Arc<T>,
	/// Monotonic fetch instant used for TTL decisions.
	pub fetched_at: Instant,
	/// Wall-clock fetch timestamp for status reporting.
	pub fetched_at_wallclock: DateTime<Utc>,
}
impl<T> CachedValue<T> {
	/// Wrap a freshly fetched document.
	pub fn new(value: Arc<T>, fetched_at: Instant) -> Self {
		Self { value, fetched_at, fetched_at_wallclock: Utc::now() }
	}

	/// Age of the document at `now`.
	pub fn age(&self, now: Instant) -> Duration {
		now.saturating_duration_since(self.fetched_at)
	}

	/// Whether the document is still within its time-to-live at `now`.
	pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
		self.age(now) < ttl
	}

	/// Monotonic instant after which the document must be refetched.
	pub fn expires_at(&self, ttl: Duration) -> Instant {
		self.fetched_at + ttl
	}
}
impl<T> Clone for CachedValue<T> {
	fn clone(&self) -> Self {
		Self {
			value: self.value.clone(),
			fetched_at: self.fetched_at,
			fetched_at_wallclock: self.fetched_at_wallclock,
		}
	}
}

/// Cache lifecycle states.
#[derive(Debug)]
pub enum CacheState<T> {
	/// Nothing has been fetched yet, or the slot was invalidated.
	Empty,
	/// A document is held; it may already be past its TTL.
	Ready(CachedValue<T>),
}
impl<T> CacheState<T> {
	/// Retrieve the held document if any.
	pub fn cached(&self) -> Option<&CachedValue<T>> {
		match self {
			CacheState::Ready(cached) => Some(cached),
			CacheState::Empty => None,
		}
	}

	/// Whether a document within its TTL is held at `now`.
	pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
		self.cached().is_some_and(|cached| cached.is_fresh(now, ttl))
	}
}
impl<T> Clone for CacheState<T> {
	fn clone(&self) -> Self {
		match self {
			CacheState::Empty => CacheState::Empty,
			CacheState::Ready(cached) => CacheState::Ready(cached.clone()),
		}
	}
}
