//! Spans and counters around the coordinator's three stages.
//!
//! Every [`Coordinator::execute`](crate::coordinator::Coordinator::execute) call runs inside an
//! `auth_coordinator.call` span with `stage = "execute"` and the request target in `endpoint`.
//! The refresh window it joins runs in its own span with `stage = "refresh"`, and the single
//! re-send after a renewed session is recorded under `stage = "retry"`. Spans need the
//! `tracing` feature.
//!
//! With the `metrics` feature each refresh window also bumps `auth_coordinator_refresh_total`
//! once when it starts (`outcome = "attempt"`) and once when it settles (`"success"` or
//! `"failure"`). Joined callers never add to it, so the counter reads as refresh calls sent.
//! [`CoordinatorMetrics`](crate::coordinator::CoordinatorMetrics) keeps the same numbers in
//! process without any recorder.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Stage label carried by the `stage` span field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallStage {
	/// Caller-facing authenticated call, including any recovery.
	Execute,
	/// Single-flight refresh call.
	Refresh,
	/// The one retry that follows a successful refresh.
	Retry,
}
impl CallStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallStage::Execute => "execute",
			CallStage::Refresh => "refresh",
			CallStage::Retry => "retry",
		}
	}
}
impl Display for CallStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Value of the `outcome` label on `auth_coordinator_refresh_total`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
	/// A refresh call was started.
	Attempt,
	/// The refresh endpoint renewed the session.
	Success,
	/// The refresh window ended without renewed credentials.
	Failure,
}
impl RefreshOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshOutcome::Attempt => "attempt",
			RefreshOutcome::Success => "success",
			RefreshOutcome::Failure => "failure",
		}
	}
}
impl Display for RefreshOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
