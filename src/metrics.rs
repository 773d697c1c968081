//! Metrics helpers and per-verifier telemetry bookkeeping.
//!
//! [`VerifierMetrics`] is always available. With the `metrics` feature the same events are also
//! emitted through the `metrics` facade, and `prometheus` adds a ready-made exporter.

// std
#[cfg(feature = "prometheus")] use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
#[cfg(feature = "metrics")] use metrics::Label;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
#[cfg(feature = "metrics")] use smallvec::SmallVec;
// self
use crate::_prelude::*;

#[cfg(feature = "metrics")]
type LabelSet = SmallVec<[Label; 4]>;

#[cfg(feature = "metrics")]
const METRIC_VALIDATIONS_TOTAL: &str = "rownd_token_validations_total";
#[cfg(feature = "metrics")]
const METRIC_CACHE_HITS_TOTAL: &str = "rownd_cache_hits_total";
#[cfg(feature = "metrics")]
const METRIC_FETCH_TOTAL: &str = "rownd_issuer_fetch_total";
#[cfg(feature = "metrics")]
const METRIC_FETCH_DURATION: &str = "rownd_issuer_fetch_duration_seconds";

/// Shared Prometheus handle installed by [`install_default_exporter`].
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Issuer documents the verifier caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
	/// The discovery document.
	IssuerMetadata,
	/// The published signing keys.
	KeySet,
}
impl Resource {
	/// Stable label used in logs and metrics.
	pub fn as_str(self) -> &'static str {
		match self {
			Resource::IssuerMetadata => "issuer_metadata",
			Resource::KeySet => "key_set",
		}
	}
}

/// Thread-safe counters for a single verifier instance.
#[derive(Debug, Default)]
pub struct VerifierMetrics {
	validations: AtomicU64,
	accepted: AtomicU64,
	rejected: AtomicU64,
	cache_hits: AtomicU64,
	metadata_fetches: AtomicU64,
	key_set_fetches: AtomicU64,
	fetch_errors: AtomicU64,
	last_fetch_micros: AtomicU64,
}
impl VerifierMetrics {
	/// Create a new metrics accumulator.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record the outcome of one `validate_token` call.
	pub fn record_validation(&self, accepted: bool) {
		self.validations.fetch_add(1, Ordering::Relaxed);

		if accepted {
			self.accepted.fetch_add(1, Ordering::Relaxed);
		} else {
			self.rejected.fetch_add(1, Ordering::Relaxed);
		}

		record_validation_outcome(accepted);
	}

	/// Record a lookup served from cache.
	pub fn record_cache_hit(&self, resource: Resource) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);

		record_cache_hit(resource);
	}

	/// Record a successful fetch from the issuer and its latency.
	pub fn record_fetch(&self, resource: Resource, duration: Duration) {
		match resource {
			Resource::IssuerMetadata => self.metadata_fetches.fetch_add(1, Ordering::Relaxed),
			Resource::KeySet => self.key_set_fetches.fetch_add(1, Ordering::Relaxed),
		};
		self.last_fetch_micros.store(duration.as_micros() as u64, Ordering::Relaxed);

		record_fetch_success(resource, duration);
	}

	/// Record a failed fetch from the issuer.
	pub fn record_fetch_error(&self, resource: Resource) {
		self.fetch_errors.fetch_add(1, Ordering::Relaxed);

		record_fetch_error(resource);
	}

	/// Take a point-in-time snapshot for status reporting.
	pub fn snapshot(&self) -> VerifierMetricsSnapshot {
		VerifierMetricsSnapshot {
			validations: self.validations.load(Ordering::Relaxed),
			accepted: self.accepted.load(Ordering::Relaxed),
			rejected: self.rejected.load(Ordering::Relaxed),
			cache_hits: self.cache_hits.load(Ordering::Relaxed),
			metadata_fetches: self.metadata_fetches.load(Ordering::Relaxed),
			key_set_fetches: self.key_set_fetches.load(Ordering::Relaxed),
			fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
			last_fetch_micros: match self.last_fetch_micros.load(Ordering::Relaxed) {
				0 => None,
				value => Some(value),
			},
		}
	}
}

/// Read-only snapshot of per-verifier counters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifierMetricsSnapshot {
	/// Total `validate_token` calls.
	pub validations: u64,
	/// Calls that produced a validated token.
	pub accepted: u64,
	/// Calls that failed for any reason.
	pub rejected: u64,
	/// Metadata and key set lookups served from cache.
	pub cache_hits: u64,
	/// Successful discovery document fetches.
	pub metadata_fetches: u64,
	/// Successful key set fetches.
	pub key_set_fetches: u64,
	/// Failed issuer fetches.
	pub fetch_errors: u64,
	/// Microsecond latency of the most recent fetch.
	pub last_fetch_micros: Option<u64>,
}
impl VerifierMetricsSnapshot {
	/// Share of validations that succeeded.
	pub fn acceptance_rate(&self) -> f64 {
		if self.validations == 0 {
			0.0
		} else {
			self.accepted as f64 / self.validations as f64
		}
	}
}

/// Install the default Prometheus recorder backed by `metrics`.
///
/// Multiple invocations are safe; subsequent calls become no-ops once the recorder is installed.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new()
		.install_recorder()
		.map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Access the global Prometheus exporter handle when installed.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

#[cfg(feature = "metrics")]
fn record_validation_outcome(accepted: bool) {
	let outcome = if accepted { "accepted" } else { "rejected" };
	let mut labels = LabelSet::new();

	labels.push(Label::new("outcome", outcome));

	metrics::counter!(METRIC_VALIDATIONS_TOTAL, labels.iter()).increment(1);
}
#[cfg(not(feature = "metrics"))]
fn record_validation_outcome(_: bool) {}

#[cfg(feature = "metrics")]
fn record_cache_hit(resource: Resource) {
	metrics::counter!(METRIC_CACHE_HITS_TOTAL, resource_labels(resource).iter()).increment(1);
}
#[cfg(not(feature = "metrics"))]
fn record_cache_hit(_: Resource) {}

#[cfg(feature = "metrics")]
fn record_fetch_success(resource: Resource, duration: Duration) {
	metrics::counter!(METRIC_FETCH_TOTAL, status_labels(resource, "success").iter()).increment(1);
	metrics::histogram!(METRIC_FETCH_DURATION, resource_labels(resource).iter())
		.record(duration.as_secs_f64());
}
#[cfg(not(feature = "metrics"))]
fn record_fetch_success(_: Resource, _: Duration) {}

#[cfg(feature = "metrics")]
fn record_fetch_error(resource: Resource) {
	metrics::counter!(METRIC_FETCH_TOTAL, status_labels(resource, "error").iter()).increment(1);
}
#[cfg(not(feature = "metrics"))]
fn record_fetch_error(_: Resource) {}

#[cfg(feature = "metrics")]
fn resource_labels(resource: Resource) -> LabelSet {
	let mut labels = LabelSet::with_capacity(2);

	labels.push(Label::new("resource", resource.as_str()));

	labels
}

#[cfg(feature = "metrics")]
fn status_labels(resource: Resource, status: &'static str) -> LabelSet {
	let mut labels = resource_labels(resource);

	labels.push(Label::new("status", status));

	labels
}
