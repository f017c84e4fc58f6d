//! # API Module
//!
//! HTTP endpoints of the short-lived local server started by `newmusic auth`.
//!
//! - [`callback`] - completes the OAuth 2.0 PKCE flow by exchanging the
//!   authorization code for an access token
//! - [`health`] - reports status and version
//!
//! Both handlers are mounted by [`crate::server::router`].

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
