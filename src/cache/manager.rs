//! Cache manager coordinating lookups and refreshes for one cache slot.

// std
use std::future::Future;
// crates.io
use tokio::sync::{Mutex, RwLock};
// self
use crate::{
	_prelude::*,
	cache::{entry::CacheEntry, state::CacheState},
};

/// How a lookup was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
	/// Served from the cache without contacting the issuer.
	Hit,
	/// The document was fetched and stored.
	Fetched,
}

/// Read-only snapshot of cache state for diagnostics.
#[derive(Debug)]
pub struct CacheSnapshot<T> {
	/// Monotonic instant captured when the snapshot was taken.
	pub captured_at: Instant,
	/// Configured lifetime of the slot.
	pub ttl: Duration,
	/// Cache state recorded at capture time.
	pub state: CacheState<T>,
}
impl<T> CacheSnapshot<T> {
	/// Whether the snapshot held a fresh document when captured.
	pub fn is_fresh(&self) -> bool {
		self.state.is_fresh(self.captured_at, self.ttl)
	}

	/// Wall-clock expiry of the held document.
	pub fn expires_at(&self) -> Option<DateTime<Utc>> {
		let cached = self.state.cached()?;
		let ttl = TimeDelta::from_std(self.ttl).ok()?;

		cached.fetched_at_wallclock.checked_add_signed(ttl)
	}
}

/// A time-boxed cache slot with a single-flight refresh guard.
///
/// The held document is replaced atomically. Concurrent callers that find the slot stale
/// queue on the guard and reuse whatever the first caller stored.
#[derive(Debug)]
pub struct TtlCache<T> {
	entry: Arc<RwLock<CacheEntry<T>>>,
	single_flight: Arc<Mutex<()>>,
	ttl: Duration,
}
impl<T> TtlCache<T> {
	/// Create an empty slot.
	pub fn new(name: &'static str, ttl: Duration) -> Self {
		Self {
			entry: Arc::new(RwLock::new(CacheEntry::new(name))),
			single_flight: Arc::new(Mutex::new(())),
			ttl,
		}
	}

	/// Configured time-to-live.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Return the cached document when fresh, otherwise run `fetch` and store its result.
	///
	/// Fetch errors propagate unchanged and leave the slot untouched; an expired document is
	/// never served.
	pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<(Arc<T>, Lookup)>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		if let Some(value) = self.fresh().await {
			return Ok((value, Lookup::Hit));
		}

		let _guard = self.single_flight.lock().await;

		// Another caller may have refreshed the slot while we waited.
		if let Some(value) = self.fresh().await {
			return Ok((value, Lookup::Hit));
		}

		self.store_from(fetch).await.map(|value| (value, Lookup::Fetched))
	}

	/// Fetch unconditionally and replace the held document.
	pub async fn refresh<F, Fut>(&self, fetch: F) -> Result<Arc<T>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let _guard = self.single_flight.lock().await;

		self.store_from(fetch).await
	}

	/// Drop the held document.
	pub async fn invalidate(&self) {
		self.entry.write().await.invalidate();
	}

	/// Capture the current cache state.
	pub async fn snapshot(&self) -> CacheSnapshot<T> {
		let captured_at = Instant::now();
		let state = { self.entry.read().await.state().clone() };

		CacheSnapshot { captured_at, ttl: self.ttl, state }
	}

	async fn fresh(&self) -> Option<Arc<T>> {
		self.entry.read().await.fresh(Instant::now(), self.ttl)
	}

	async fn store_from<F, Fut>(&self, fetch: F) -> Result<Arc<T>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let value = Arc::new(fetch().await?);
		let mut entry = self.entry.write().await;

		entry.store(value.clone(), Instant::now());

		tracing::debug!(slot = entry.name(), ttl = ?self.ttl, "cache slot refreshed");

		Ok(value)
	}
}
impl<T> Clone for TtlCache<T> {
	fn clone(&self) -> Self {
		Self { entry: self.entry.clone(), single_flight: self.single_flight.clone(), ttl: self.ttl }
	}
}
