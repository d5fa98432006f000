// self
use crate::obs::RefreshOutcome;

/// Bumps `auth_coordinator_refresh_total{outcome}` on the installed recorder; a no-op
/// without the `metrics` feature or a recorder.
pub fn record_refresh_outcome(outcome: RefreshOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("auth_coordinator_refresh_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}
