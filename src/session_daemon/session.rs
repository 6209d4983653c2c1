//! One CLI invocation's attachment to the daemon.

use crate::rpc::call_context;
use crate::rpc::daemon_service::DaemonServiceClient;
use crate::rpc::SessionId;
use anyhow::{Context, Result};

/// A connected client plus the session ID registered for it, if any.
pub struct Session {
    client: DaemonServiceClient,
    id: Option<SessionId>,
}

impl Session {
    pub fn new(client: DaemonServiceClient, id: Option<SessionId>) -> Self {
        Self { client, id }
    }

    /// Typed handle for calls against the daemon.
    pub fn client(&self) -> &DaemonServiceClient {
        &self.client
    }

    /// `None` when the daemon does not track sessions.
    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    /// Releases the session ID and closes the connection.
    ///
    /// The connection is closed whether or not the release succeeds; a
    /// release error is returned afterwards.
    pub async fn end(self) -> Result<()> {
        let Session { client, id } = self;

        let result = match id {
            Some(id) => release(&client, id).await,
            None => Ok(()),
        };

        drop(client);
        result
    }
}

async fn release(client: &DaemonServiceClient, id: SessionId) -> Result<()> {
    let initialised = client
        .is_initialised(call_context())
        .await
        .context("Failed to query session registry")?;
    if !initialised {
        return Ok(());
    }

    client
        .remove_session(call_context(), id)
        .await
        .context("Failed to release session")??;
    Ok(())
}
