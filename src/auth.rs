//! Credential models and the provider capability that attaches them to outbound calls.

pub mod credential;
pub mod token;

pub use credential::*;
pub use token::{pair::*, secret::*};
