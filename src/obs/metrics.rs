// self
use crate::obs::{RefreshKind, RefreshOutcome};

/// Bumps `rotating_auth_refresh_total{kind, outcome}`; compiled out without the `metrics` feature.
pub fn record_refresh_outcome(kind: RefreshKind, outcome: RefreshOutcome) {
	#[cfg(feature = "metrics")]
	{
		let counter = metrics::counter!(
			"rotating_auth_refresh_total",
			"kind" => kind.as_str(),
			"outcome" => outcome.as_str()
		);

		counter.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}
