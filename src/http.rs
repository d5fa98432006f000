//! Transport primitives for authenticated calls.
//!
//! The module exposes [`AuthHttpClient`] alongside the request/response values the
//! coordinator moves across it. A caller describes a call once with [`AuthRequest`]
//! (method, headers, body); the coordinator resolves its target, turns it into an
//! [`OutboundRequest`], lets the configured credential provider decorate it, and hands it
//! to the transport. Because [`AuthRequest`] is cloneable and owns its body, the same
//! description can be re-sent after a refresh without the caller rebuilding it.

pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};

// std
use std::borrow::Cow;
// crates.io
use ::http::header::{CONTENT_TYPE, SET_COOKIE};
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`AuthHttpClient::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AuthResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports used by the coordinator.
///
/// The trait is the coordinator's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so one transport can back every clone of a coordinator, and the
/// futures they return must be `Send` so callers can hop executors mid-call. Transports never
/// interpret status codes: a 401 is a successful transport round trip.
pub trait AuthHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and buffers the full response.
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// Caller-side description of a call: everything except where it goes.
#[derive(Clone, Debug)]
pub struct AuthRequest {
	/// HTTP method.
	pub method: Method,
	/// Caller-supplied headers. Credential headers are added per attempt, not stored here.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl AuthRequest {
	/// Creates an empty request for the provided method.
	pub fn new(method: Method) -> Self {
		Self { method, headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get() -> Self {
		Self::new(Method::GET)
	}

	/// Shorthand for a `POST` request.
	pub fn post() -> Self {
		Self::new(Method::POST)
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a raw body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `value` as the JSON body and sets the content type.
	pub fn with_json<T>(self, value: &T) -> Result<Self, serde_json::Error>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(value)?;

		Ok(self
			.with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
			.with_body(body))
	}

	/// Produces a fresh outbound attempt addressed to `url`.
	pub fn to_outbound(&self, url: Url) -> OutboundRequest {
		OutboundRequest {
			method: self.method.clone(),
			url,
			headers: self.headers.clone(),
			body: self.body.clone(),
		}
	}
}

/// A single attempt as handed to the transport.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Headers, including any attached credentials.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl OutboundRequest {
	/// Creates a body-less attempt.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}
}

/// Fully buffered response returned by a transport.
#[derive(Clone, Debug)]
pub struct AuthResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl AuthResponse {
	/// Creates a response with no headers.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Decodes the body as JSON, reporting the failing field path on error.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
	}

	/// Returns the body as text, replacing invalid UTF-8.
	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}

	/// Iterates over every `Set-Cookie` header value that is valid UTF-8.
	pub fn set_cookies(&self) -> impl Iterator<Item = &str> {
		self.headers.get_all(SET_COOKIE).iter().filter_map(|value| value.to_str().ok())
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects should not be followed: an auth redirect answered by the transport would hide
/// the 401 the coordinator is waiting for. [`ReqwestHttpClient::new`] and
/// [`ReqwestHttpClient::with_cookie_store`] configure this; custom clients passed through
/// [`ReqwestHttpClient::with_client`] should do the same.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client without a cookie jar; pair it with
	/// [`SessionCredentials`](crate::auth::SessionCredentials).
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client =
			ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Builds a client whose cookie jar carries the session cookies set by the server, so
	/// credentials propagate without any explicit provider.
	pub fn with_cookie_store() -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.cookie_store(true)
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl AuthHttpClient for ReqwestHttpClient {
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let target = request.url.to_string();
			let mut builder =
				client.request(request.method, request.url).headers(request.headers);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response =
				builder.send().await.map_err(|e| TransportError::network(&target, e))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body =
				response.bytes().await.map_err(|e| TransportError::network(&target, e))?.to_vec();

			Ok(AuthResponse { status, headers, body })
		})
	}
}
