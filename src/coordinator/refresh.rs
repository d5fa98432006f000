//! Single-flight refresh windows.
//!
//! A [`RefreshSlot`] holds at most one in-flight refresh. The first caller to need a refresh
//! installs a shared future under a synchronous lock; everyone arriving before it settles
//! clones that future instead of starting their own. The future owns a [`RefreshGuard`]
//! whose drop returns the slot to idle, so the slot is released on success, on a declared
//! failure, on a transport error, and if the refresh future is dropped or unwinds.
//!
//! Because the handle is a [`Shared`] future, dropping one waiting caller does not cancel
//! the refresh for the others; any remaining clone keeps driving it.

// std
use std::sync::Weak;
// crates.io
use ::http::header::{ACCEPT, HeaderValue};
use futures_util::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	auth::{CredentialProvider, CredentialPurpose},
	coordinator::Coordinator,
	error::RefreshFailure,
	http::{AuthHttpClient, Method, OutboundRequest},
	obs::{self, CallSpan, CallStage, RefreshOutcome},
};

type SharedRefresh = Shared<BoxFuture<'static, Result<(), RefreshFailure>>>;

/// Observable state of the refresh slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshState {
	/// No refresh is in flight.
	Idle,
	/// A refresh is in flight; new authorization failures join it.
	Refreshing,
}

#[derive(Default)]
pub(crate) struct RefreshSlot(Mutex<SlotState>);
impl RefreshSlot {
	/// Returns the in-flight refresh, or installs the one produced by `start`.
	///
	/// The check and the install happen under one lock with no await in between.
	fn join_or_start<F>(self: &Arc<Self>, start: F) -> (SharedRefresh, bool)
	where
		F: FnOnce(RefreshGuard) -> BoxFuture<'static, Result<(), RefreshFailure>>,
	{
		let mut state = self.0.lock();

		if let Some(in_flight) = state.in_flight.as_ref() {
			return (in_flight.clone(), false);
		}

		state.generation = state.generation.wrapping_add(1);

		let guard = RefreshGuard { slot: Arc::downgrade(self), generation: state.generation };
		let refresh = start(guard).shared();

		state.in_flight = Some(refresh.clone());

		(refresh, true)
	}

	pub(crate) fn state(&self) -> RefreshState {
		if self.0.lock().in_flight.is_some() { RefreshState::Refreshing } else { RefreshState::Idle }
	}

	/// Number of callers currently holding the in-flight refresh, excluding the slot itself.
	#[cfg(test)]
	pub(crate) fn waiters(&self) -> usize {
		self.0
			.lock()
			.in_flight
			.as_ref()
			.and_then(Shared::strong_count)
			.map_or(0, |count| count.saturating_sub(1))
	}

	fn release(&self, generation: u64) {
		let stale = {
			let mut state = self.0.lock();

			if state.generation == generation { state.in_flight.take() } else { None }
		};

		drop(stale);
	}
}
impl Debug for RefreshSlot {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("RefreshSlot").field(&self.state()).finish()
	}
}

#[derive(Default)]
struct SlotState {
	generation: u64,
	in_flight: Option<SharedRefresh>,
}

/// Returns the slot to idle when the refresh that installed it settles or is dropped.
struct RefreshGuard {
	slot: Weak<RefreshSlot>,
	generation: u64,
}
impl Drop for RefreshGuard {
	fn drop(&mut self) {
		if let Some(slot) = self.slot.upgrade() {
			slot.release(self.generation);
		}
	}
}

/// Body returned by the refresh endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponseBody {
	result: RefreshResultCode,
	#[serde(default)]
	message: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
enum RefreshResultCode {
	#[serde(rename = "SUCCESS")]
	Success,
	#[serde(rename = "ERROR")]
	Error,
	#[serde(other)]
	Unknown,
}

impl<C> Coordinator<C>
where
	C: ?Sized + AuthHttpClient,
{
	/// Joins the in-flight refresh or starts one, and waits for it to settle.
	///
	/// Every caller that arrives while a refresh is in flight observes that refresh's
	/// outcome; the refresh endpoint is called once per window. Transport failures are
	/// folded into [`RefreshFailure::Transport`] and never escape as errors.
	pub async fn refresh(&self) -> Result<(), RefreshFailure> {
		let (refresh, started) =
			self.refresh_slot.join_or_start(|guard| self.refresh_future(guard));

		#[cfg(feature = "tracing")]
		{
			if started {
				tracing::debug!("Started refresh window.");
			} else {
				tracing::debug!("Joined in-flight refresh window.");
			}
		}
		#[cfg(not(feature = "tracing"))]
		let _ = started;

		refresh.await
	}

	/// Returns whether a refresh is currently in flight.
	pub fn state(&self) -> RefreshState {
		self.refresh_slot.state()
	}

	fn refresh_future(
		&self,
		guard: RefreshGuard,
	) -> BoxFuture<'static, Result<(), RefreshFailure>> {
		let http_client = Arc::clone(&self.http_client);
		let credentials = Arc::clone(&self.credentials);
		let metrics = Arc::clone(&self.metrics);
		let url = self
			.config
			.refresh_url()
			.map_err(|err| RefreshFailure::Misconfigured { message: err.to_string() });
		let span = CallSpan::new(CallStage::Refresh, &self.config.refresh_path);

		span.instrument(async move {
			let _guard = guard;

			metrics.record_refresh();
			obs::record_refresh_outcome(RefreshOutcome::Attempt);

			let result = match url {
				Ok(url) => request_refresh(http_client.as_ref(), credentials.as_ref(), url).await,
				Err(failure) => Err(failure),
			};

			match &result {
				Ok(()) => {
					metrics.record_refresh_success();
					obs::record_refresh_outcome(RefreshOutcome::Success);
				},
				Err(failure) => {
					metrics.record_refresh_failure();
					obs::record_refresh_outcome(RefreshOutcome::Failure);

					#[cfg(feature = "tracing")]
					tracing::warn!(error = %failure, "Refresh window ended without a session.");
					#[cfg(not(feature = "tracing"))]
					let _ = failure;
				},
			}

			result
		})
		.boxed()
	}
}

/// Calls the refresh endpoint once and classifies the outcome.
async fn request_refresh<C>(
	client: &C,
	credentials: &dyn CredentialProvider,
	url: Url,
) -> Result<(), RefreshFailure>
where
	C: ?Sized + AuthHttpClient,
{
	let mut request = OutboundRequest::new(Method::POST, url);

	request.headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
	credentials.attach(&mut request, CredentialPurpose::Refresh);

	let response = client
		.send(request)
		.await
		.map_err(|err| RefreshFailure::Transport { message: err.to_string() })?;

	credentials.absorb(&response);

	let status = response.status.as_u16();

	if !response.is_success() {
		return Err(RefreshFailure::Rejected { status, message: None });
	}

	let body = response.json::<RefreshResponseBody>().map_err(|err| {
		RefreshFailure::MalformedBody {
			status,
			path: err.path().to_string(),
			message: err.inner().to_string(),
		}
	})?;

	match body.result {
		RefreshResultCode::Success => Ok(()),
		RefreshResultCode::Error | RefreshResultCode::Unknown =>
			Err(RefreshFailure::Rejected { status, message: body.message }),
	}
}
