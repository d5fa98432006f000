// self
use crate::{
	_prelude::*,
	config::{CookieNames, CoordinatorConfig},
	session::ExemptPrefixes,
};

/// Errors raised while constructing or validating configurations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConfigBuildError {
	/// Base URL must be HTTP(S).
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Path-like fields must be absolute.
	#[error("The {field} value must start with `/`: {value}.")]
	RelativePath {
		/// Which field failed validation.
		field: &'static str,
		/// Value that failed validation.
		value: String,
	},
	/// Unauthenticated status must be a real HTTP status.
	#[error("The unauthenticated status {status} is not a valid HTTP status.")]
	InvalidStatus {
		/// Status that failed validation.
		status: u16,
	},
	/// Cookie names cannot be blank.
	#[error("The {field} cookie name cannot be empty.")]
	EmptyCookieName {
		/// Which cookie name failed validation.
		field: &'static str,
	},
}

/// Builder for [`CoordinatorConfig`] values.
#[derive(Debug)]
pub struct CoordinatorConfigBuilder {
	/// Base URL relative targets are resolved against.
	pub base_url: Url,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Session-invalidation navigation target.
	pub entry_point: String,
	/// Exempt path prefixes.
	pub exempt_prefixes: ExemptPrefixes,
	/// Status treated as an authorization failure.
	pub unauthenticated_status: u16,
	/// Credential cookie names.
	pub cookies: CookieNames,
}
impl CoordinatorConfigBuilder {
	/// Creates a new builder seeded with defaults and the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: CoordinatorConfig::DEFAULT_REFRESH_PATH.into(),
			entry_point: CoordinatorConfig::DEFAULT_ENTRY_POINT.into(),
			exempt_prefixes: ExemptPrefixes::default(),
			unauthenticated_status: CoordinatorConfig::DEFAULT_UNAUTHENTICATED_STATUS,
			cookies: CookieNames::default(),
		}
	}

	/// Sets the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Sets the navigation target used on terminal failure.
	pub fn entry_point(mut self, path: impl Into<String>) -> Self {
		self.entry_point = path.into();

		self
	}

	/// Appends a single exempt prefix.
	pub fn exempt_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.exempt_prefixes = self.exempt_prefixes.with(prefix);

		self
	}

	/// Replaces the exempt prefix list.
	pub fn exempt_prefixes<I, S>(mut self, prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.exempt_prefixes = ExemptPrefixes::new(prefixes);

		self
	}

	/// Overrides the unauthenticated status.
	pub fn unauthenticated_status(mut self, status: u16) -> Self {
		self.unauthenticated_status = status;

		self
	}

	/// Overrides the access token cookie name.
	pub fn access_cookie(mut self, name: impl Into<String>) -> Self {
		self.cookies.access = name.into();

		self
	}

	/// Overrides the refresh token cookie name.
	pub fn refresh_cookie(mut self, name: impl Into<String>) -> Self {
		self.cookies.refresh = name.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<CoordinatorConfig, ConfigBuildError> {
		let config = CoordinatorConfig {
			base_url: self.base_url,
			refresh_path: self.refresh_path,
			entry_point: self.entry_point,
			exempt_prefixes: self.exempt_prefixes,
			unauthenticated_status: self.unauthenticated_status,
			cookies: self.cookies,
		};

		config.validate()?;

		Ok(config)
	}
}

impl CoordinatorConfig {
	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), ConfigBuildError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigBuildError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if !(100..=599).contains(&self.unauthenticated_status) {
			return Err(ConfigBuildError::InvalidStatus { status: self.unauthenticated_status });
		}

		validate_path("refresh_path", &self.refresh_path)?;
		validate_path("entry_point", &self.entry_point)?;

		for prefix in self.exempt_prefixes.iter() {
			validate_path("exempt_prefix", prefix)?;
		}

		validate_cookie_name("access", &self.cookies.access)?;
		validate_cookie_name("refresh", &self.cookies.refresh)?;

		Ok(())
	}
}

fn validate_path(field: &'static str, value: &str) -> Result<(), ConfigBuildError> {
	if value.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigBuildError::RelativePath { field, value: value.into() })
	}
}

fn validate_cookie_name(field: &'static str, value: &str) -> Result<(), ConfigBuildError> {
	if value.trim().is_empty() {
		Err(ConfigBuildError::EmptyCookieName { field })
	} else {
		Ok(())
	}
}
