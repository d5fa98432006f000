//! Session-invalidation port and the exemption rules that gate it.
//!
//! When a refresh window ends without renewed credentials the coordinator asks a
//! [`SessionNavigator`] where the user currently is, checks that path against
//! [`ExemptPrefixes`], and only then asks the navigator to drop the session and move to the
//! entry point. Interactive hosts wire a navigator that drives their UI; headless hosts use
//! [`HeadlessNavigator`], which reports no location and therefore never navigates.

// self
use crate::_prelude::*;

/// Host capability used to end a session in the UI.
pub trait SessionNavigator
where
	Self: Send + Sync,
{
	/// Current navigational path, or `None` when no navigable UI exists.
	fn current_path(&self) -> Option<String>;

	/// Performs a full session-invalidation navigation to `entry_point`.
	fn invalidate_session(&self, entry_point: &str);
}

/// Navigator for server-side or background execution: no location, no navigation.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessNavigator;
impl SessionNavigator for HeadlessNavigator {
	fn current_path(&self) -> Option<String> {
		None
	}

	fn invalidate_session(&self, _entry_point: &str) {}
}

/// Path prefixes whose pages render their own expired-session state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExemptPrefixes(Vec<String>);
impl ExemptPrefixes {
	/// Prefix exempted by default: the conversational chat flow shows an inline error.
	pub const DEFAULT: &'static str = "/ai-chat";

	/// Creates a list from the provided prefixes.
	pub fn new<I, S>(prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(prefixes.into_iter().map(Into::into).collect())
	}

	/// Creates an empty list; every interactive failure navigates.
	pub fn none() -> Self {
		Self(Vec::new())
	}

	/// Returns a copy of the list with `prefix` appended.
	pub fn with(mut self, prefix: impl Into<String>) -> Self {
		self.0.push(prefix.into());

		self
	}

	/// Iterates over the configured prefixes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Returns true when no prefix is configured.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns the first prefix `path` starts with.
	pub fn matching(&self, path: &str) -> Option<&str> {
		self.iter().find(|prefix| path.starts_with(prefix))
	}

	/// Decides what a terminal refresh failure should do for the given location.
	pub fn decide(&self, current_path: Option<&str>) -> InvalidationDecision {
		match current_path {
			None => InvalidationDecision::Headless,
			Some(path) => match self.matching(path) {
				Some(prefix) => InvalidationDecision::Exempt { prefix: prefix.to_owned() },
				None => InvalidationDecision::Navigate,
			},
		}
	}
}
impl Default for ExemptPrefixes {
	fn default() -> Self {
		Self::new([Self::DEFAULT])
	}
}

/// Outcome of checking a terminal failure against the host and exemption list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidationDecision {
	/// Navigate to the entry point.
	Navigate,
	/// Stay put; the page at this prefix handles the expired session itself.
	Exempt {
		/// Prefix that matched the current path.
		prefix: String,
	},
	/// No navigable UI; nothing to do.
	Headless,
}
impl InvalidationDecision {
	/// Returns a stable label suitable for span or metric fields.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Navigate => "navigate",
			Self::Exempt { .. } => "exempt",
			Self::Headless => "headless",
		}
	}
}
