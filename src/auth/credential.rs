//! Credential provider contract plus the ambient and session-backed implementations.
//!
//! The coordinator consults a [`CredentialProvider`] around every attempt it sends: once
//! before dispatch to attach credentials, and once after a response arrives so that cookies
//! set by the server boundary (most importantly by the refresh endpoint) replace the stored
//! pair. The coordinator itself never reads token values.

// crates.io
use ::http::header::{AUTHORIZATION, COOKIE};
use cookie::Cookie;
use time::Duration;
// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	config::{CookieNames, CoordinatorConfig},
	http::{AuthResponse, HeaderValue, OutboundRequest},
};

/// Which credential an attempt needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialPurpose {
	/// Regular call to a protected resource.
	Access,
	/// Call to the refresh endpoint.
	Refresh,
}
impl CredentialPurpose {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Access => "access",
			Self::Refresh => "refresh",
		}
	}
}

/// Describes how to attach credentials to an outbound attempt and how to learn new ones.
pub trait CredentialProvider
where
	Self: Send + Sync,
{
	/// Decorates the attempt before it reaches the transport.
	fn attach(&self, request: &mut OutboundRequest, purpose: CredentialPurpose);

	/// Observes a response so server-set credentials can be stored.
	fn absorb(&self, _response: &AuthResponse) {}
}

/// Provider for transports that manage credentials themselves (for example a reqwest client
/// with its cookie store enabled).
#[derive(Clone, Copy, Debug, Default)]
pub struct AmbientCredentials;
impl CredentialProvider for AmbientCredentials {
	fn attach(&self, _request: &mut OutboundRequest, _purpose: CredentialPurpose) {}
}

/// How [`SessionCredentials`] presents tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachMode {
	#[default]
	/// Send both tokens in a `Cookie` header, as a browser would.
	Cookie,
	/// Send `Authorization: Bearer`, the access token for regular calls and the refresh token
	/// for the refresh endpoint.
	Bearer,
}

/// In-process credential store fed by `Set-Cookie` headers.
#[derive(Debug)]
pub struct SessionCredentials {
	mode: AttachMode,
	names: CookieNames,
	pair: RwLock<TokenPair>,
}
impl SessionCredentials {
	/// Creates an empty store that uses the provided cookie names.
	pub fn new(mode: AttachMode, names: CookieNames) -> Self {
		Self { mode, names, pair: Default::default() }
	}

	/// Creates an empty store using the cookie names from `config`.
	pub fn from_config(mode: AttachMode, config: &CoordinatorConfig) -> Self {
		Self::new(mode, config.cookies.clone())
	}

	/// Seeds the store with an existing pair.
	pub fn with_tokens(
		self,
		access: impl Into<TokenSecret>,
		refresh: impl Into<TokenSecret>,
	) -> Self {
		*self.pair.write() = TokenPair::new(access, refresh);

		self
	}

	/// Returns the attach mode.
	pub fn mode(&self) -> AttachMode {
		self.mode
	}

	/// Returns a copy of the stored pair.
	pub fn snapshot(&self) -> TokenPair {
		self.pair.read().clone()
	}

	/// Drops both credentials.
	pub fn clear(&self) {
		let mut pair = self.pair.write();

		if !pair.is_empty() {
			*pair = TokenPair { rotated_at: Some(OffsetDateTime::now_utc()), ..Default::default() };
		}
	}

	fn cookie_header(&self, pair: &TokenPair) -> Option<String> {
		let parts = [(&self.names.access, &pair.access), (&self.names.refresh, &pair.refresh)]
			.into_iter()
			.filter_map(|(name, secret)| secret.as_ref().map(|s| format!("{name}={}", s.expose())))
			.collect::<Vec<_>>();

		if parts.is_empty() { None } else { Some(parts.join("; ")) }
	}

	fn bearer_header(pair: &TokenPair, purpose: CredentialPurpose) -> Option<String> {
		let secret = match purpose {
			CredentialPurpose::Access => pair.access.as_ref(),
			CredentialPurpose::Refresh => pair.refresh.as_ref(),
		}?;

		Some(format!("Bearer {}", secret.expose()))
	}
}
impl CredentialProvider for SessionCredentials {
	fn attach(&self, request: &mut OutboundRequest, purpose: CredentialPurpose) {
		let pair = self.pair.read();

		match self.mode {
			AttachMode::Cookie => {
				let Some(cookies) = self.cookie_header(&pair) else { return };
				let merged = match request.headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
					Some(existing) if !existing.is_empty() => format!("{existing}; {cookies}"),
					_ => cookies,
				};

				insert_header(request, COOKIE, &merged);
			},
			AttachMode::Bearer =>
				if let Some(value) = Self::bearer_header(&pair, purpose) {
					insert_header(request, AUTHORIZATION, &value);
				},
		}
	}

	fn absorb(&self, response: &AuthResponse) {
		let now = OffsetDateTime::now_utc();
		let updates = response
			.set_cookies()
			.filter_map(|raw| CookieUpdate::parse(raw, now))
			.filter(|update| update.name == self.names.access || update.name == self.names.refresh)
			.collect::<Vec<_>>();

		if updates.is_empty() {
			return;
		}

		let mut pair = self.pair.write();
		let TokenPair { access, refresh, rotated_at } = &mut *pair;

		for update in updates {
			let slot = if update.name == self.names.access { &mut *access } else { &mut *refresh };

			if TokenPair::rotate(slot, update.value, rotated_at, now) {
				#[cfg(feature = "tracing")]
				tracing::debug!(cookie = %update.name, "Stored credential rotated by server.");
			}
		}
	}
}

fn insert_header(request: &mut OutboundRequest, name: ::http::HeaderName, value: &str) {
	match HeaderValue::from_str(value) {
		Ok(mut value) => {
			value.set_sensitive(true);
			request.headers.insert(name, value);
		},
		Err(_) => {
			#[cfg(feature = "tracing")]
			tracing::warn!(
				header = %name,
				"Stored credential is not a valid header value; skipped."
			);
		},
	}
}

/// A single credential change announced by a `Set-Cookie` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CookieUpdate {
	pub(crate) name: String,
	/// `None` when the server clears the cookie.
	pub(crate) value: Option<TokenSecret>,
}
impl CookieUpdate {
	/// Parses one `Set-Cookie` value. An empty value, a non-positive `Max-Age`, or an `Expires`
	/// instant at or before `now` clears the credential.
	pub(crate) fn parse(raw: &str, now: OffsetDateTime) -> Option<Self> {
		let cookie = Cookie::parse(raw).ok()?;
		let value = cookie.value_trimmed();
		let expired = match cookie.max_age() {
			Some(max_age) => max_age <= Duration::ZERO,
			None => cookie.expires_datetime().is_some_and(|expires| expires <= now),
		};
		let value = if expired || value.is_empty() { None } else { Some(TokenSecret::new(value)) };

		Some(Self { name: cookie.name().to_owned(), value })
	}
}
