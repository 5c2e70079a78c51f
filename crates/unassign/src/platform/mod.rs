//! Issue-hosting platform abstraction and its GitHub implementation.

pub mod github;
pub mod traits;
