//! Registry of CLI invocations currently attached to the daemon.
//!
//! Only active when the daemon runs with an idle timeout. Otherwise it is
//! constructed non-initialised and rejects every mutation with
//! `ServiceError::NotInitialised`, telling clients to skip bookkeeping.

use crate::daemon_log::daemon_log;
use crate::rpc::{ServiceError, ServiceResult, SessionId};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

pub struct SessionRegistry {
    initialised: bool,
    session_ids: Mutex<HashSet<SessionId>>,
}

impl SessionRegistry {
    /// An active registry, for idle-timeout mode.
    pub fn new() -> Self {
        Self {
            initialised: true,
            session_ids: Mutex::new(HashSet::new()),
        }
    }

    /// An inactive registry, for no-idle-timeout mode.
    pub fn uninitialised() -> Self {
        Self {
            initialised: false,
            session_ids: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Registers a session ID. Fails if inactive or if the ID is present.
    pub fn add(&self, id: SessionId) -> ServiceResult<()> {
        if !self.initialised {
            return Err(ServiceError::NotInitialised);
        }

        let mut ids = self.lock();
        if ids.contains(&id) {
            return Err(ServiceError::SessionIdExists {
                session_id: id.to_string(),
            });
        }
        daemon_log("registry", &format!("Session added: {}", id));
        ids.insert(id);
        Ok(())
    }

    /// Releases a session ID. Unknown IDs are a no-op.
    pub fn remove(&self, id: &SessionId) -> ServiceResult<()> {
        if !self.initialised {
            return Err(ServiceError::NotInitialised);
        }

        if self.lock().remove(id) {
            daemon_log("registry", &format!("Session removed: {}", id));
        }
        Ok(())
    }

    /// Mints an ID that is not currently registered.
    pub fn mint_session_id(&self) -> SessionId {
        let ids = self.lock();
        loop {
            let id = SessionId::generate();
            if !ids.contains(&id) {
                return id;
            }
        }
    }

    pub fn num_session_ids(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The set is valid after any panic mid-insert, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashSet<SessionId>> {
        self.session_ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
