//! Demonstrates a bearer-mode coordinator recovering from an expired access token against a
//! mock backend, then ending the session when the refresh token is rejected.
//!
//! 1. Seed [`SessionCredentials`] with the current token pair.
//! 2. Wire a [`SessionNavigator`] that reports the user's location and prints navigations.
//! 3. Call [`ReqwestCoordinator::get`]; a 401 triggers one refresh and one retry.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use auth_coordinator::{
	auth::{AttachMode, CredentialProvider, SessionCredentials},
	config::CoordinatorConfig,
	coordinator::ReqwestCoordinator,
	http::ReqwestHttpClient,
	session::SessionNavigator,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let _stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/user").header("authorization", "Bearer demo-access");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/refresh")
				.header("authorization", "Bearer demo-refresh");
			then.status(200)
				.header("set-cookie", "accessToken=demo-access-2; Path=/; HttpOnly")
				.json_body(json!({ "result": "SUCCESS" }));
		})
		.await;
	let _fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/user").header("authorization", "Bearer demo-access-2");
			then.status(200).json_body(json!({ "name": "Demo" }));
		})
		.await;
	let config = CoordinatorConfig::builder(Url::parse(&server.base_url())?).build()?;
	let credentials = Arc::new(
		SessionCredentials::from_config(AttachMode::Bearer, &config)
			.with_tokens("demo-access", "demo-refresh"),
	);
	let provider: Arc<dyn CredentialProvider> = credentials.clone();
	let coordinator = ReqwestCoordinator::with_http_client(config, ReqwestHttpClient::new()?)
		.with_credentials(provider)
		.with_navigator(Arc::new(PrintingNavigator { path: "/my/profile" }));
	let response = coordinator.get("/v1/user").await?;

	println!("Recovered call returned {} with body {}.", response.status, response.text());
	println!("Stored credentials after rotation: {:?}.", credentials.snapshot());

	refresh.assert_async().await;

	let _rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/jobs");
			then.status(401);
		})
		.await;

	credentials.clear();

	let response = coordinator.get("/v1/jobs").await?;

	println!("Unrecoverable call returned {}.", response.status);
	println!(
		"Refresh calls: {}, retries: {}, invalidations: {}.",
		coordinator.metrics.refreshes(),
		coordinator.metrics.retries(),
		coordinator.metrics.invalidations()
	);

	Ok(())
}

struct PrintingNavigator {
	path: &'static str,
}
impl SessionNavigator for PrintingNavigator {
	fn current_path(&self) -> Option<String> {
		Some(self.path.to_owned())
	}

	fn invalidate_session(&self, entry_point: &str) {
		println!("Session ended on {}; navigating to {entry_point}.", self.path);
	}
}
