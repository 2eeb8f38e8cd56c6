//! Types kept in the session.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
