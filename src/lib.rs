//! fedi - a fediverse command-line client whose invocations share one
//! per-user background daemon over a Unix socket.

pub mod api;
pub mod commands;
pub mod config;
pub mod daemon_log;
pub mod paths;
pub mod rpc;
pub mod session_daemon;
