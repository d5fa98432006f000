//! Authenticated request coordination.
//!
//! [`Coordinator::execute`] sends a request with credentials attached and returns the
//! response untouched unless it carries the configured unauthenticated status. In that case
//! the call joins (or starts) the single in-flight refresh, re-sends the original request
//! exactly once when the refresh renews the session, and otherwise hands back the original
//! failing response after asking the session navigator to end the session, unless the
//! current page is exempt.
//!
//! A coordinator is an explicit object: construct one per process (or per test), clone it
//! freely, and every clone shares the same refresh slot, credentials, and counters.

mod metrics;
mod refresh;

pub use metrics::CoordinatorMetrics;
pub use refresh::RefreshState;

// self
use crate::{
	_prelude::*,
	auth::{AmbientCredentials, CredentialProvider, CredentialPurpose},
	config::CoordinatorConfig,
	coordinator::refresh::RefreshSlot,
	http::{AuthHttpClient, AuthRequest, AuthResponse},
	obs::{CallSpan, CallStage},
	session::{HeadlessNavigator, InvalidationDecision, SessionNavigator},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Coordinator specialized for the crate's default reqwest transport.
pub type ReqwestCoordinator = Coordinator<ReqwestHttpClient>;

/// Per-call policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecuteOptions {
	/// Attempt a refresh and a single retry when the response is unauthenticated.
	pub allow_refresh: bool,
}
impl ExecuteOptions {
	/// Options that return the raw response without any recovery.
	pub fn without_refresh() -> Self {
		Self { allow_refresh: false }
	}
}
impl Default for ExecuteOptions {
	fn default() -> Self {
		Self { allow_refresh: true }
	}
}

/// Executes authenticated requests with single-flight refresh and retry-once recovery.
pub struct Coordinator<C>
where
	C: ?Sized + AuthHttpClient,
{
	/// Transport used for every outbound attempt, including refresh calls.
	pub http_client: Arc<C>,
	/// Credential capability consulted around every attempt.
	pub credentials: Arc<dyn CredentialProvider>,
	/// Host capability used to end the session in the UI.
	pub navigator: Arc<dyn SessionNavigator>,
	/// Validated configuration.
	pub config: Arc<CoordinatorConfig>,
	/// Shared counters for refresh windows, retries, and invalidations.
	pub metrics: Arc<CoordinatorMetrics>,
	refresh_slot: Arc<RefreshSlot>,
}
impl<C> Coordinator<C>
where
	C: ?Sized + AuthHttpClient,
{
	/// Creates a coordinator over the provided transport.
	///
	/// Credentials default to [`AmbientCredentials`] (the transport manages them) and the
	/// navigator defaults to [`HeadlessNavigator`] (terminal failures never navigate).
	pub fn with_http_client(config: CoordinatorConfig, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			credentials: Arc::new(AmbientCredentials),
			navigator: Arc::new(HeadlessNavigator),
			config: Arc::new(config),
			metrics: Default::default(),
			refresh_slot: Default::default(),
		}
	}

	/// Replaces the credential provider.
	pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
		self.credentials = credentials;

		self
	}

	/// Replaces the session navigator.
	pub fn with_navigator(mut self, navigator: Arc<dyn SessionNavigator>) -> Self {
		self.navigator = navigator;

		self
	}

	/// Sends `request` to `target`, recovering once from an expired access credential.
	///
	/// `target` is an absolute URL or a path resolved against the configured base URL.
	/// Non-authentication failures are returned as responses, never as errors. Only local
	/// misconfiguration and transport failures of the initial or retried attempt surface as
	/// [`Error`].
	pub async fn execute(
		&self,
		target: &str,
		request: AuthRequest,
		options: ExecuteOptions,
	) -> Result<AuthResponse> {
		CallSpan::new(CallStage::Execute, target)
			.instrument(self.run(target, request, options))
			.await
	}

	/// Shorthand for a `GET` with default options.
	pub async fn get(&self, target: &str) -> Result<AuthResponse> {
		self.execute(target, AuthRequest::get(), ExecuteOptions::default()).await
	}

	async fn run(
		&self,
		target: &str,
		request: AuthRequest,
		options: ExecuteOptions,
	) -> Result<AuthResponse> {
		let url = self.config.resolve(target)?;
		let response = self.dispatch(&request, url.clone()).await?;

		if !options.allow_refresh || !self.config.is_unauthenticated(response.status.as_u16()) {
			return Ok(response);
		}
		if self.refresh().await.is_err() {
			self.end_session();

			return Ok(response);
		}

		self.metrics.record_retry();

		CallSpan::new(CallStage::Retry, target).instrument(self.dispatch(&request, url)).await
	}

	async fn dispatch(&self, request: &AuthRequest, url: Url) -> Result<AuthResponse> {
		let mut outbound = request.to_outbound(url);

		self.credentials.attach(&mut outbound, CredentialPurpose::Access);

		let response = self.http_client.send(outbound).await?;

		self.credentials.absorb(&response);

		Ok(response)
	}

	/// Applies the terminal-failure side effect for the current location.
	fn end_session(&self) -> InvalidationDecision {
		let current = self.navigator.current_path();
		let decision = self.config.exempt_prefixes.decide(current.as_deref());

		#[cfg(feature = "tracing")]
		tracing::info!(
			decision = decision.as_str(),
			path = current.as_deref().unwrap_or_default(),
			"Session could not be renewed."
		);

		if decision == InvalidationDecision::Navigate {
			self.metrics.record_invalidation();
			self.navigator.invalidate_session(&self.config.entry_point);
		}

		decision
	}
}
#[cfg(feature = "reqwest")]
impl Coordinator<ReqwestHttpClient> {
	/// Creates a coordinator whose reqwest client keeps server-set cookies in its own jar,
	/// so credentials propagate ambiently.
	pub fn new(config: CoordinatorConfig) -> Result<Self> {
		Ok(Self::with_http_client(config, ReqwestHttpClient::with_cookie_store()?))
	}
}
impl<C> Clone for Coordinator<C>
where
	C: ?Sized + AuthHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: Arc::clone(&self.http_client),
			credentials: Arc::clone(&self.credentials),
			navigator: Arc::clone(&self.navigator),
			config: Arc::clone(&self.config),
			metrics: Arc::clone(&self.metrics),
			refresh_slot: Arc::clone(&self.refresh_slot),
		}
	}
}
impl<C> Debug for Coordinator<C>
where
	C: ?Sized + AuthHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Coordinator")
			.field("config", &self.config)
			.field("refresh", &self.refresh_slot)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		sync::atomic::{AtomicBool, Ordering},
		time::Duration,
	};
	// crates.io
	use futures_util::future;
	use tokio::sync::Notify;
	// self
	use super::*;
	use crate::{
		error::{RefreshFailure, TransportError},
		http::{StatusCode, TransportFuture},
	};

	const REFRESH_PATH: &str = "/api/auth/refresh";

	#[derive(Clone, Copy, Debug)]
	enum RefreshReply {
		Success,
		Error,
		Status(u16),
		Transport,
		Malformed,
	}

	/// Holds refresh calls until the test opens it.
	#[derive(Default)]
	struct Gate {
		open: AtomicBool,
		notify: Notify,
	}
	impl Gate {
		async fn wait(&self) {
			loop {
				let notified = self.notify.notified();

				if self.open.load(Ordering::SeqCst) {
					return;
				}

				notified.await;
			}
		}

		fn open(&self) {
			self.open.store(true, Ordering::SeqCst);
			self.notify.notify_waiters();
		}
	}

	/// Backend double: protected paths answer 401 until a refresh succeeds.
	struct FakeBackend {
		reply: RefreshReply,
		gate: Option<Arc<Gate>>,
		always_unauthorized: bool,
		renewed: AtomicBool,
		calls: Mutex<Vec<String>>,
	}
	impl FakeBackend {
		fn new(reply: RefreshReply) -> Self {
			Self {
				reply,
				gate: None,
				always_unauthorized: false,
				renewed: AtomicBool::new(false),
				calls: Default::default(),
			}
		}

		fn gated(mut self, gate: Arc<Gate>) -> Self {
			self.gate = Some(gate);

			self
		}

		fn always_unauthorized(mut self) -> Self {
			self.always_unauthorized = true;

			self
		}

		fn calls_to(&self, path: &str) -> usize {
			self.calls.lock().iter().filter(|call| call.as_str() == path).count()
		}

		fn json(status: StatusCode, body: serde_json::Value) -> AuthResponse {
			AuthResponse::new(status, body.to_string())
		}
	}
	impl AuthHttpClient for FakeBackend {
		fn send(&self, request: crate::http::OutboundRequest) -> TransportFuture<'_> {
			Box::pin(async move {
				let path = request.url.path().to_owned();

				self.calls.lock().push(path.clone());

				if path == REFRESH_PATH {
					if let Some(gate) = &self.gate {
						gate.wait().await;
					}

					return match self.reply {
						RefreshReply::Success => {
							self.renewed.store(true, Ordering::SeqCst);

							Ok(Self::json(StatusCode::OK, serde_json::json!({ "result": "SUCCESS" })))
						},
						RefreshReply::Error => Ok(Self::json(
							StatusCode::OK,
							serde_json::json!({ "result": "ERROR", "message": "expired" }),
						)),
						RefreshReply::Status(status) => Ok(AuthResponse::new(
							StatusCode::from_u16(status).expect("Fixture status should be valid."),
							Vec::new(),
						)),
						RefreshReply::Transport =>
							Err(TransportError::Io(std::io::Error::other("connection refused"))),
						RefreshReply::Malformed =>
							Ok(AuthResponse::new(StatusCode::OK, "<html>maintenance</html>")),
					};
				}
				if path == "/v1/forbidden" {
					return Ok(AuthResponse::new(StatusCode::FORBIDDEN, Vec::new()));
				}
				if path == "/v1/broken" {
					return Ok(AuthResponse::new(StatusCode::INTERNAL_SERVER_ERROR, Vec::new()));
				}
				if self.renewed.load(Ordering::SeqCst) && !self.always_unauthorized {
					Ok(Self::json(StatusCode::OK, serde_json::json!({ "path": path })))
				} else {
					Ok(AuthResponse::new(StatusCode::UNAUTHORIZED, Vec::new()))
				}
			})
		}
	}

	#[derive(Default)]
	struct Navigator {
		path: Option<String>,
		navigations: Mutex<Vec<String>>,
	}
	impl Navigator {
		fn at(path: &str) -> Self {
			Self { path: Some(path.into()), navigations: Default::default() }
		}

		fn navigations(&self) -> Vec<String> {
			self.navigations.lock().clone()
		}
	}
	impl SessionNavigator for Navigator {
		fn current_path(&self) -> Option<String> {
			self.path.clone()
		}

		fn invalidate_session(&self, entry_point: &str) {
			self.navigations.lock().push(entry_point.into());
		}
	}

	fn harness(
		backend: FakeBackend,
		navigator: Navigator,
	) -> (Coordinator<FakeBackend>, Arc<FakeBackend>, Arc<Navigator>) {
		let config = CoordinatorConfig::builder(
			Url::parse("https://app.example.com").expect("Base URL fixture should parse."),
		)
		.build()
		.expect("Default configuration should validate.");
		let backend = Arc::new(backend);
		let navigator = Arc::new(navigator);
		let coordinator = Coordinator::with_http_client(config, backend.clone())
			.with_navigator(navigator.clone());

		(coordinator, backend, navigator)
	}

	#[tokio::test]
	async fn non_unauthenticated_responses_pass_through() {
		let (coordinator, backend, navigator) =
			harness(FakeBackend::new(RefreshReply::Success), Navigator::at("/my/profile"));

		for (path, status) in
			[("/v1/forbidden", StatusCode::FORBIDDEN), ("/v1/broken", StatusCode::INTERNAL_SERVER_ERROR)]
		{
			let response = coordinator.get(path).await.expect("Call should complete.");

			assert_eq!(response.status, status);
		}

		assert_eq!(backend.calls_to(REFRESH_PATH), 0);
		assert_eq!(coordinator.metrics.refreshes(), 0);
		assert!(navigator.navigations().is_empty());
	}

	#[tokio::test]
	async fn disabled_refresh_returns_raw_unauthenticated_response() {
		let (coordinator, backend, navigator) =
			harness(FakeBackend::new(RefreshReply::Success), Navigator::at("/my/profile"));
		let response = coordinator
			.execute("/v1/user", AuthRequest::get(), ExecuteOptions::without_refresh())
			.await
			.expect("Call should complete.");

		assert_eq!(response.status, StatusCode::UNAUTHORIZED);
		assert_eq!(backend.calls_to(REFRESH_PATH), 0);
		assert_eq!(backend.calls_to("/v1/user"), 1);
		assert!(navigator.navigations().is_empty());
	}

	#[tokio::test]
	async fn refresh_success_retries_original_request_once() {
		let (coordinator, backend, navigator) =
			harness(FakeBackend::new(RefreshReply::Success), Navigator::at("/my/profile"));
		let response = coordinator.get("/v1/user").await.expect("Call should complete.");

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(response.text(), r#"{"path":"/v1/user"}"#);
		assert_eq!(backend.calls_to("/v1/user"), 2);
		assert_eq!(backend.calls_to(REFRESH_PATH), 1);
		assert_eq!(coordinator.metrics.retries(), 1);
		assert_eq!(coordinator.metrics.refresh_successes(), 1);
		assert_eq!(coordinator.state(), RefreshState::Idle);
		assert!(navigator.navigations().is_empty());
	}

	#[tokio::test]
	async fn second_unauthenticated_response_is_returned_without_another_refresh() {
		let (coordinator, backend, navigator) = harness(
			FakeBackend::new(RefreshReply::Success).always_unauthorized(),
			Navigator::at("/my/profile"),
		);
		let response = coordinator.get("/v1/user").await.expect("Call should complete.");

		assert_eq!(response.status, StatusCode::UNAUTHORIZED);
		assert_eq!(backend.calls_to("/v1/user"), 2);
		assert_eq!(backend.calls_to(REFRESH_PATH), 1);
		assert!(navigator.navigations().is_empty());
	}

	#[tokio::test]
	async fn concurrent_unauthenticated_calls_share_one_refresh() {
		let gate = Arc::new(Gate::default());
		let (coordinator, backend, _) = harness(
			FakeBackend::new(RefreshReply::Success).gated(gate.clone()),
			Navigator::at("/my/profile"),
		);
		let targets = (0..8).map(|i| format!("/v1/jobs/{i}")).collect::<Vec<_>>();
		let calls = future::join_all(targets.iter().map(|target| coordinator.get(target)));
		let opener = async {
			while coordinator.state() != RefreshState::Refreshing {
				tokio::task::yield_now().await;
			}

			gate.open();
		};
		let (responses, ()) = future::join(calls, opener).await;

		for (target, response) in targets.iter().zip(responses) {
			let response = response.expect("Call should complete.");

			assert_eq!(response.status, StatusCode::OK);
			assert_eq!(backend.calls_to(target), 2);
		}

		assert_eq!(backend.calls_to(REFRESH_PATH), 1);
		assert_eq!(coordinator.metrics.refreshes(), 1);
		assert_eq!(coordinator.metrics.retries(), 8);
		assert_eq!(coordinator.state(), RefreshState::Idle);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_tasks_share_one_refresh() {
		let gate = Arc::new(Gate::default());
		let (coordinator, backend, _) = harness(
			FakeBackend::new(RefreshReply::Success).gated(gate.clone()),
			Navigator::at("/my/profile"),
		);
		let tasks = (0..6)
			.map(|i| {
				let coordinator = coordinator.clone();

				tokio::spawn(async move { coordinator.get(&format!("/v1/user/{i}")).await })
			})
			.collect::<Vec<_>>();

		while coordinator.state() != RefreshState::Refreshing
			|| coordinator.refresh_slot.waiters() < 6
		{
			tokio::time::sleep(Duration::from_millis(1)).await;
		}

		gate.open();

		for task in tasks {
			let response = task.await.expect("Task should not panic.").expect("Call should complete.");

			assert_eq!(response.status, StatusCode::OK);
		}

		assert_eq!(backend.calls_to(REFRESH_PATH), 1);
	}

	#[tokio::test]
	async fn failed_refresh_returns_to_idle_and_next_failure_starts_new_window() {
		let (coordinator, backend, navigator) =
			harness(FakeBackend::new(RefreshReply::Error), Navigator::at("/my/profile"));
		let first = coordinator.get("/v1/user").await.expect("Call should complete.");

		assert_eq!(first.status, StatusCode::UNAUTHORIZED);
		assert_eq!(coordinator.state(), RefreshState::Idle);

		let second = coordinator.get("/v1/user").await.expect("Call should complete.");

		assert_eq!(second.status, StatusCode::UNAUTHORIZED);
		assert_eq!(backend.calls_to(REFRESH_PATH), 2);
		assert_eq!(backend.calls_to("/v1/user"), 2);
		assert_eq!(coordinator.metrics.refresh_failures(), 2);
		assert_eq!(navigator.navigations(), ["/", "/"]);
	}

	#[tokio::test]
	async fn refresh_rejection_respects_exempt_paths() {
		let (exempt, _, exempt_navigator) =
			harness(FakeBackend::new(RefreshReply::Error), Navigator::at("/ai-chat/foo"));
		let response = exempt.get("/v1/user").await.expect("Call should complete.");

		assert_eq!(response.status, StatusCode::UNAUTHORIZED);
		assert!(exempt_navigator.navigations().is_empty());
		assert_eq!(exempt.metrics.invalidations(), 0);

		let (regular, _, regular_navigator) =
			harness(FakeBackend::new(RefreshReply::Error), Navigator::at("/my/profile"));
		let response = regular.get("/v1/user").await.expect("Call should complete.");

		assert_eq!(response.status, StatusCode::UNAUTHORIZED);
		assert_eq!(regular_navigator.navigations(), ["/"]);
		assert_eq!(regular.metrics.invalidations(), 1);
	}

	#[tokio::test]
	async fn refresh_transport_error_is_treated_as_rejection() {
		let (coordinator, backend, navigator) =
			harness(FakeBackend::new(RefreshReply::Transport), Navigator::at("/my/profile"));
		let response =
			coordinator.get("/v1/user").await.expect("Refresh transport errors must not escape.");

		assert_eq!(response.status, StatusCode::UNAUTHORIZED);
		assert_eq!(backend.calls_to("/v1/user"), 1);
		assert_eq!(navigator.navigations(), ["/"]);
		assert_eq!(coordinator.state(), RefreshState::Idle);
		assert!(matches!(coordinator.refresh().await, Err(RefreshFailure::Transport { .. })));
	}

	#[tokio::test]
	async fn refresh_classifies_status_and_body_failures() {
		let (coordinator, ..) =
			harness(FakeBackend::new(RefreshReply::Status(500)), Navigator::default());

		assert_eq!(
			coordinator.refresh().await,
			Err(RefreshFailure::Rejected { status: 500, message: None })
		);

		let (coordinator, ..) =
			harness(FakeBackend::new(RefreshReply::Error), Navigator::default());

		assert_eq!(
			coordinator.refresh().await,
			Err(RefreshFailure::Rejected { status: 200, message: Some("expired".into()) })
		);

		let (coordinator, ..) =
			harness(FakeBackend::new(RefreshReply::Malformed), Navigator::default());

		assert!(matches!(
			coordinator.refresh().await,
			Err(RefreshFailure::MalformedBody { status: 200, .. })
		));
	}

	#[tokio::test]
	async fn headless_hosts_never_navigate() {
		let (coordinator, _, navigator) =
			harness(FakeBackend::new(RefreshReply::Error), Navigator::default());
		let response = coordinator.get("/v1/user").await.expect("Call should complete.");

		assert_eq!(response.status, StatusCode::UNAUTHORIZED);
		assert!(navigator.navigations().is_empty());
		assert_eq!(coordinator.end_session(), InvalidationDecision::Headless);
	}

	#[tokio::test]
	async fn concurrent_failures_all_observe_rejection() {
		let gate = Arc::new(Gate::default());
		let (coordinator, backend, navigator) = harness(
			FakeBackend::new(RefreshReply::Error).gated(gate.clone()),
			Navigator::at("/my/profile"),
		);
		let calls = future::join(coordinator.get("/v1/user"), coordinator.get("/v1/jobs"));
		let opener = async {
			while coordinator.state() != RefreshState::Refreshing {
				tokio::task::yield_now().await;
			}

			gate.open();
		};
		let ((user, jobs), ()) = future::join(calls, opener).await;

		assert_eq!(user.expect("Call should complete.").status, StatusCode::UNAUTHORIZED);
		assert_eq!(jobs.expect("Call should complete.").status, StatusCode::UNAUTHORIZED);
		assert_eq!(backend.calls_to(REFRESH_PATH), 1);
		assert_eq!(backend.calls_to("/v1/user"), 1);
		assert_eq!(backend.calls_to("/v1/jobs"), 1);
		assert!(!navigator.navigations().is_empty());
	}

	#[tokio::test]
	async fn dropping_the_starting_caller_does_not_abort_the_shared_refresh() {
		let gate = Arc::new(Gate::default());
		let (coordinator, backend, _) = harness(
			FakeBackend::new(RefreshReply::Success).gated(gate.clone()),
			Navigator::at("/my/profile"),
		);
		let mut leader = Box::pin(coordinator.get("/v1/user"));
		let mut follower = Box::pin(coordinator.get("/v1/jobs"));

		assert!(tokio::time::timeout(Duration::from_millis(20), &mut leader).await.is_err());
		assert_eq!(coordinator.state(), RefreshState::Refreshing);
		assert!(tokio::time::timeout(Duration::from_millis(20), &mut follower).await.is_err());

		drop(leader);
		gate.open();

		let response = follower.await.expect("Call should complete.");

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(backend.calls_to(REFRESH_PATH), 1);
		assert_eq!(backend.calls_to("/v1/jobs"), 2);
		assert_eq!(coordinator.state(), RefreshState::Idle);
	}

	#[tokio::test]
	async fn unresolvable_target_is_a_config_error() {
		let (coordinator, backend, _) =
			harness(FakeBackend::new(RefreshReply::Success), Navigator::default());
		let err = coordinator.get("http://[::1").await.expect_err("Broken targets should fail.");

		assert!(matches!(err, Error::Config(crate::error::ConfigError::InvalidTarget { .. })));
		assert!(backend.calls.lock().is_empty());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_coordinator_builds_with_ambient_defaults() {
		let config = CoordinatorConfig::builder(
			Url::parse("https://app.example.com").expect("Base URL fixture should parse."),
		)
		.build()
		.expect("Default configuration should validate.");
		let coordinator = ReqwestCoordinator::new(config).expect("Cookie-store client should build.");

		assert_eq!(coordinator.state(), RefreshState::Idle);
		assert_eq!(coordinator.end_session(), InvalidationDecision::Headless);
		assert_eq!(coordinator.metrics.refreshes(), 0);
	}
}
