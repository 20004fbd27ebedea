use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};

/// In-memory credential holder shared by the auth gateway and the mail
/// client. It lives for one process run and is never persisted; the session
/// store is what survives restarts.
pub trait TokenHandle: Send + Sync {
    /// Current bearer token, if one is attached.
    fn token(&self) -> Option<String>;

    fn attach_token(&self, token: &str) -> Result<()>;

    fn detach_token(&self) -> Result<()>;

    /// Whether the mail API module behind this handle finished loading.
    fn is_loaded(&self) -> bool;

    fn mark_loaded(&self);
}

#[derive(Debug, Default)]
struct HandleState {
    token: Option<String>,
    loaded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClientHandle {
    inner: Arc<Mutex<HandleState>>,
}

impl ClientHandle {
    pub fn create() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, HandleState>> {
        self.inner
            .lock()
            .map_err(|_| Error::Storage("client handle lock poisoned".into()))
    }
}

impl TokenHandle for ClientHandle {
    fn token(&self) -> Option<String> {
        self.state().ok().and_then(|s| s.token.clone())
    }

    fn attach_token(&self, token: &str) -> Result<()> {
        self.state()?.token = Some(token.to_string());
        Ok(())
    }

    fn detach_token(&self) -> Result<()> {
        self.state()?.token = None;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.state().map(|s| s.loaded).unwrap_or(false)
    }

    fn mark_loaded(&self) {
        if let Ok(mut s) = self.state() {
            s.loaded = true;
        }
    }
}
