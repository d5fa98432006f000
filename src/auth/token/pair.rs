//! Credential token pair snapshot.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access and refresh credentials as last set by the server boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Short-lived access credential.
	pub access: Option<TokenSecret>,
	/// Longer-lived credential used only to obtain a new access credential.
	pub refresh: Option<TokenSecret>,
	/// Instant either value last changed.
	pub rotated_at: Option<OffsetDateTime>,
}
impl TokenPair {
	/// Creates a pair holding both credentials.
	pub fn new(access: impl Into<TokenSecret>, refresh: impl Into<TokenSecret>) -> Self {
		Self { access: Some(access.into()), refresh: Some(refresh.into()), rotated_at: None }
	}

	/// Returns true when neither credential is present.
	pub fn is_empty(&self) -> bool {
		self.access.is_none() && self.refresh.is_none()
	}

	/// Replaces one slot, stamping the rotation instant when the value changed.
	pub(crate) fn rotate(
		slot: &mut Option<TokenSecret>,
		value: Option<TokenSecret>,
		rotated_at: &mut Option<OffsetDateTime>,
		now: OffsetDateTime,
	) -> bool {
		if *slot == value {
			return false;
		}

		*slot = value;
		*rotated_at = Some(now);

		true
	}
}
