//! Coordinator-level error types shared across transports, credentials, and refresh calls.
//!
//! Ordinary HTTP failure statuses are never errors: they come back as
//! [`AuthResponse`](crate::http::AuthResponse) values for the caller to interpret. [`Error`]
//! is reserved for local misconfiguration and transport failures on the caller's own request,
//! while [`RefreshFailure`] describes why a refresh window ended without a usable session.

// self
use crate::_prelude::*;

/// Coordinator-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical coordinator error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) on the initial or retried request.
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Configuration and validation failures raised by the coordinator.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request target cannot be resolved against the base URL.
	#[error("Request target `{target}` is not a valid URL.")]
	InvalidTarget {
		/// Target as supplied by the caller.
		target: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Coordinator configuration failed validation.
	#[error(transparent)]
	InvalidConfig(#[from] crate::config::ConfigBuildError),
	/// Serialized configuration could not be parsed.
	#[error("Configuration is malformed at `{path}`.")]
	MalformedConfig {
		/// Path of the offending field.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{target}`.")]
	Network {
		/// URL of the request that failed.
		target: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		target: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { target: target.into(), source: Box::new(src) }
	}
}

/// Reasons a refresh window ended without renewed credentials.
///
/// The value is broadcast to every caller waiting on the same refresh, so it only carries
/// owned, cloneable data.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshFailure {
	/// Refresh endpoint answered with a non-success status or `result: "ERROR"`.
	#[error("Refresh endpoint rejected the session with status {status}.")]
	Rejected {
		/// HTTP status returned by the refresh endpoint.
		status: u16,
		/// Optional message supplied by the endpoint.
		message: Option<String>,
	},
	/// Refresh endpoint answered 2xx but the body is not a refresh result.
	#[error("Refresh endpoint returned a malformed body at `{path}`: {message}.")]
	MalformedBody {
		/// HTTP status returned by the refresh endpoint.
		status: u16,
		/// Path of the offending field.
		path: String,
		/// Parser message.
		message: String,
	},
	/// Refresh call could not complete (DNS, connection, timeout).
	#[error("Refresh call failed in transport: {message}.")]
	Transport {
		/// Rendered transport error.
		message: String,
	},
	/// Refresh endpoint URL could not be derived from the configuration.
	#[error("Refresh endpoint is misconfigured: {message}.")]
	Misconfigured {
		/// Rendered configuration error.
		message: String,
	},
}
impl RefreshFailure {
	/// Returns the HTTP status observed from the refresh endpoint, if it answered at all.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. } | Self::MalformedBody { status, .. } => Some(*status),
			Self::Transport { .. } | Self::Misconfigured { .. } => None,
		}
	}
}
