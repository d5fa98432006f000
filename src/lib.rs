//! Single-flight session refresh for authenticated HTTP calls: detect an expired access
//! credential, refresh it once for every concurrent caller, retry once, and invalidate the
//! session cleanly when recovery is impossible.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod obs;
pub mod session;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{AttachMode, CredentialProvider, SessionCredentials},
		config::CoordinatorConfig,
		coordinator::Coordinator,
		http::ReqwestHttpClient,
		session::SessionNavigator,
	};

	/// Coordinator type alias used by reqwest-backed integration tests.
	pub type ReqwestTestCoordinator = Coordinator<ReqwestHttpClient>;

	/// Navigator that reports a fixed current path and records every invalidation.
	#[derive(Debug, Default)]
	pub struct RecordingNavigator {
		current_path: Option<String>,
		navigations: Mutex<Vec<String>>,
	}
	impl RecordingNavigator {
		/// Creates a navigator that reports `path` as the current location.
		pub fn at(path: impl Into<String>) -> Self {
			Self { current_path: Some(path.into()), navigations: Default::default() }
		}

		/// Returns every entry point the coordinator navigated to, in order.
		pub fn navigations(&self) -> Vec<String> {
			self.navigations.lock().clone()
		}
	}
	impl SessionNavigator for RecordingNavigator {
		fn current_path(&self) -> Option<String> {
			self.current_path.clone()
		}

		fn invalidate_session(&self, entry_point: &str) {
			self.navigations.lock().push(entry_point.to_owned());
		}
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a reqwest HTTP client with its cookie jar enabled that also accepts the
	/// self-signed certificates produced by `httpmock`.
	pub fn test_cookie_store_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.cookie_store(true)
			.danger_accept_invalid_certs(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure cookie-store Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a validated configuration rooted at the provided mock server URL.
	pub fn test_config(base_url: &str) -> CoordinatorConfig {
		CoordinatorConfig::builder(Url::parse(base_url).expect("Mock server URL should parse."))
			.build()
			.expect("Test configuration should validate.")
	}

	/// Constructs a [`Coordinator`] backed by bearer-mode [`SessionCredentials`] seeded with
	/// the provided tokens and a [`RecordingNavigator`] positioned at `current_path`.
	pub fn build_reqwest_test_coordinator(
		base_url: &str,
		access: &str,
		refresh: &str,
		current_path: &str,
	) -> (ReqwestTestCoordinator, Arc<SessionCredentials>, Arc<RecordingNavigator>) {
		let config = test_config(base_url);
		let credentials = Arc::new(
			SessionCredentials::from_config(AttachMode::Bearer, &config).with_tokens(access, refresh),
		);
		let navigator = Arc::new(RecordingNavigator::at(current_path));
		let provider: Arc<dyn CredentialProvider> = credentials.clone();
		let coordinator = Coordinator::with_http_client(config, test_reqwest_http_client())
			.with_credentials(provider)
			.with_navigator(navigator.clone());

		(coordinator, credentials, navigator)
	}

	/// Constructs a [`Coordinator`] whose credentials live only in the transport's cookie jar,
	/// mirroring [`Coordinator::new`] but trusting the mock server's certificate.
	pub fn build_ambient_test_coordinator(
		config: CoordinatorConfig,
		current_path: &str,
	) -> (ReqwestTestCoordinator, Arc<RecordingNavigator>) {
		let navigator = Arc::new(RecordingNavigator::at(current_path));
		let coordinator = Coordinator::with_http_client(config, test_cookie_store_http_client())
			.with_navigator(navigator.clone());

		(coordinator, navigator)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
