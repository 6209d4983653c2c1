//! The registered service: an authenticated client for a Mastodon-compatible
//! instance, held by the session daemon and reached through its socket.

pub mod client;
pub mod credentials;
pub mod types;

pub use client::ApiClient;
pub use credentials::Credentials;
