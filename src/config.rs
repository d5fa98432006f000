//! Coordinator configuration: where the backend lives, how sessions are refreshed, and where
//! an expired session lands.
//!
//! Values are validated when built through [`CoordinatorConfigBuilder`] or parsed with
//! [`CoordinatorConfig::from_json`]. Everything has a default except the base URL, which
//! relative request targets are resolved against.

/// Builder API for assembling coordinator configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError, session::ExemptPrefixes};

/// Cookie names carrying the credential token pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieNames {
	/// Cookie holding the access token.
	pub access: String,
	/// Cookie holding the refresh token.
	pub refresh: String,
}
impl Default for CookieNames {
	fn default() -> Self {
		Self { access: "accessToken".into(), refresh: "refreshToken".into() }
	}
}

/// Immutable configuration consumed by the [`Coordinator`](crate::coordinator::Coordinator).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
	/// Base URL relative request targets are resolved against.
	pub base_url: Url,
	/// Path of the refresh endpoint, relative to the base URL.
	#[serde(default = "default_refresh_path")]
	pub refresh_path: String,
	/// Path the session-invalidation navigation lands on.
	#[serde(default = "default_entry_point")]
	pub entry_point: String,
	/// Paths that render their own expired-session state instead of navigating.
	#[serde(default)]
	pub exempt_prefixes: ExemptPrefixes,
	/// Status code that signals an expired or missing access credential.
	#[serde(default = "default_unauthenticated_status")]
	pub unauthenticated_status: u16,
	/// Cookie names used by cookie-based credential providers.
	#[serde(default)]
	pub cookies: CookieNames,
}
impl CoordinatorConfig {
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/api/auth/refresh";
	/// Default navigation target on terminal failure.
	pub const DEFAULT_ENTRY_POINT: &'static str = "/";
	/// Default unauthenticated status.
	pub const DEFAULT_UNAUTHENTICATED_STATUS: u16 = 401;

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> CoordinatorConfigBuilder {
		CoordinatorConfigBuilder::new(base_url)
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut de).map_err(|err| {
			ConfigError::MalformedConfig { path: err.path().to_string(), source: err.into_inner() }
		})?;

		config.validate()?;

		Ok(config)
	}

	/// Resolves a request target: absolute URLs pass through, anything else is joined onto
	/// the base URL.
	pub fn resolve(&self, target: &str) -> Result<Url, ConfigError> {
		match Url::parse(target) {
			Ok(url) => Ok(url),
			Err(url::ParseError::RelativeUrlWithoutBase) => self
				.base_url
				.join(target)
				.map_err(|source| ConfigError::InvalidTarget { target: target.into(), source }),
			Err(source) => Err(ConfigError::InvalidTarget { target: target.into(), source }),
		}
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.resolve(&self.refresh_path)
	}

	/// Returns true when `status` is the configured unauthenticated status.
	pub fn is_unauthenticated(&self, status: u16) -> bool {
		status == self.unauthenticated_status
	}
}

fn default_refresh_path() -> String {
	CoordinatorConfig::DEFAULT_REFRESH_PATH.into()
}

fn default_entry_point() -> String {
	CoordinatorConfig::DEFAULT_ENTRY_POINT.into()
}

fn default_unauthenticated_status() -> u16 {
	CoordinatorConfig::DEFAULT_UNAUTHENTICATED_STATUS
}
