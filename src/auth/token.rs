//! Opaque token values carried between the server boundary and outbound calls.

pub mod pair;
pub mod secret;
