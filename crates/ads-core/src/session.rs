//! Session state and the API client that threads it through every call.

use std::sync::{Arc, Mutex, MutexGuard};

use ads_domain::Administrator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{Backend, Credentials, RequestContext};
use crate::{CoreError, CoreResult};

/// Authenticated session: bearer token plus the cached user profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: Administrator,
}

impl Session {
    pub fn context(&self) -> RequestContext {
        RequestContext::new(self.token.clone())
    }
}

/// Where a session survives between application restarts.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> CoreResult<Option<Session>>;
    fn save(&self, session: &Session) -> CoreResult<()>;
    fn clear(&self) -> CoreResult<()>;
}

/// Session storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> CoreResult<Option<Session>> {
        Ok(self.slot().clone())
    }

    fn save(&self, session: &Session) -> CoreResult<()> {
        *self.slot() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        *self.slot() = None;
        Ok(())
    }
}

impl<S: SessionStorage + ?Sized> SessionStorage for Arc<S> {
    fn load(&self) -> CoreResult<Option<Session>> {
        (**self).load()
    }

    fn save(&self, session: &Session) -> CoreResult<()> {
        (**self).save(session)
    }

    fn clear(&self) -> CoreResult<()> {
        (**self).clear()
    }
}

pub type UnauthorizedHandler = Box<dyn Fn() + Send + Sync>;

/// Gateway to the backend. Owns the session and the single 401 handler.
pub struct ApiClient {
    backend: Arc<dyn Backend>,
    storage: Box<dyn SessionStorage>,
    session: Mutex<Option<Session>>,
    on_unauthorized: Option<UnauthorizedHandler>,
}

impl ApiClient {
    pub fn new(backend: Arc<dyn Backend>, storage: Box<dyn SessionStorage>) -> Self {
        Self {
            backend,
            storage,
            session: Mutex::new(None),
            on_unauthorized: None,
        }
    }

    /// Registers the callback fired whenever the backend rejects the token.
    pub fn with_unauthorized_handler(mut self, handler: UnauthorizedHandler) -> Self {
        self.on_unauthorized = Some(handler);
        self
    }

    fn session_slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Loads a persisted session, if any. Returns whether one was found.
    pub fn restore(&self) -> CoreResult<bool> {
        let stored = self.storage.load()?;
        let found = stored.is_some();
        *self.session_slot() = stored;
        debug!(found, "session restore");
        Ok(found)
    }

    pub fn login(&self, email: &str, password: &str) -> CoreResult<Administrator> {
        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response = self.backend.login(&credentials)?;
        let session = Session {
            token: response.token,
            user: response.user,
        };
        self.storage.save(&session)?;
        let user = session.user.clone();
        *self.session_slot() = Some(session);
        info!(user = %user.email, "login succeeded");
        Ok(user)
    }

    pub fn logout(&self) {
        *self.session_slot() = None;
        if let Err(err) = self.storage.clear() {
            warn!(error = %err, "failed to clear stored session");
        }
        info!("session closed");
    }

    pub fn is_authenticated(&self) -> bool {
        self.session_slot().is_some()
    }

    pub fn current_user(&self) -> Option<Administrator> {
        self.session_slot().as_ref().map(|session| session.user.clone())
    }

    /// Refreshes the cached profile after a profile mutation.
    pub fn update_cached_user(&self, user: Administrator) -> CoreResult<()> {
        let mut slot = self.session_slot();
        if let Some(session) = slot.as_mut() {
            session.user = user;
            self.storage.save(session)?;
        }
        Ok(())
    }

    /// Runs an authenticated backend operation with the current request context.
    ///
    /// A 401 from the backend ends the session and fires the unauthorized
    /// handler before the error is returned to the caller.
    pub fn call<T>(
        &self,
        operation: impl FnOnce(&dyn Backend, &RequestContext) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let ctx = match self.session_slot().as_ref() {
            Some(session) => session.context(),
            None => return Err(CoreError::Unauthorized),
        };
        match operation(self.backend.as_ref(), &ctx) {
            Err(CoreError::Unauthorized) => {
                warn!("backend rejected the session token");
                self.logout();
                if let Some(handler) = &self.on_unauthorized {
                    handler();
                }
                Err(CoreError::Unauthorized)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trips_session() {
        let storage = MemorySessionStorage::new();
        assert!(storage.load().expect("load").is_none());
        let session = Session {
            token: "abc".into(),
            user: Administrator {
                id: "u1".into(),
                first_name: "Laura".into(),
                last_name: "Verdi".into(),
                email: "laura@example.it".into(),
                phone: None,
                fiscal_code: None,
                qualification: None,
                court: None,
                signature: None,
            },
        };
        storage.save(&session).expect("save");
        assert_eq!(storage.load().expect("load"), Some(session));
        storage.clear().expect("clear");
        assert!(storage.load().expect("load").is_none());
    }

    #[test]
    fn request_context_formats_bearer_header() {
        let session_ctx = RequestContext::new("tok");
        assert_eq!(session_ctx.authorization_header(), "Bearer tok");
    }
}
