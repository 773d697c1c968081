//! Cache entry definitions and state management helpers.

// self
use crate::{
	_prelude::*,
	cache::state::{CacheState, CachedValue},
};

/// A single named cache slot.
#[derive(Debug)]
pub struct CacheEntry<T> {
	name: &'static str,
	state: CacheState<T>,
}
impl<T> CacheEntry<T> {
	/// Create a new empty cache entry.
	pub fn new(name: &'static str) -> Self {
		Self { name, state: CacheState::Empty }
	}

	/// Label of the slot, used in logs and metrics.
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Inspect the current cache state.
	pub fn state(&self) -> &CacheState<T> {
		&self.state
	}

	/// Replace the held document wholesale.
	pub fn store(&mut self, value: Arc<T>, now: Instant) {
		self.state = CacheState::Ready(CachedValue::new(value, now));
	}

	/// Return the document if it is still within `ttl` at `now`.
	pub fn fresh(&self, now: Instant, ttl: Duration) -> Option<Arc<T>> {
		self.state
			.cached()
			.filter(|cached| cached.is_fresh(now, ttl))
			.map(|cached| cached.value.clone())
	}

	/// Drop the held document, returning to Empty state.
	pub fn invalidate(&mut self) {
		self.state = CacheState::Empty;
	}
}
