//! Per-user background daemon shared by short-lived CLI invocations.
//!
//! ## Architecture
//!
//! - **Listener (`listener.rs`)**: binds the Unix socket and serves each
//!   connection as a tarpc channel until a signal or the idle timeout.
//! - **Server (`server.rs`)**: the `DaemonService` implementation, shared by
//!   every connection.
//! - **Registry (`registry.rs`)**: set of session IDs held by attached CLIs.
//! - **Bootstrap (`bootstrap.rs`)**: connect-or-spawn for the CLI side.
//! - **Session (`session.rs`)**: one invocation's attachment, released on end.

pub mod bootstrap;
pub mod idle;
pub mod listener;
pub mod registry;
pub mod server;
pub mod session;
pub mod socket;

pub use bootstrap::{Connector, DaemonSpawner, ProcessSpawner, RetryPolicy};
pub use idle::{RunMode, ShutdownReason};
pub use listener::{run_daemon, Daemon};
pub use registry::SessionRegistry;
pub use session::Session;
