use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

use crate::store::KeyValueStore;

pub const ACCESS_TOKEN_KEY: &str = "mailhub-access-token";
pub const TOKEN_TIMESTAMP_KEY: &str = "mailhub-token-timestamp";

/// Lifetime of an implicit-flow access token, in milliseconds. There is no
/// refresh token, so past this window the user has to log in again.
pub const TOKEN_TTL_MS: i64 = 3_600_000;

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Access token persisted with its issue time. Every operation is
/// best-effort: storage failures are logged and never reach the caller.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save(&self, token: &str) {
        self.save_at(token, now_millis());
    }

    pub fn save_at(&self, token: &str, issued_at_ms: i64) {
        let res = self
            .store
            .set(ACCESS_TOKEN_KEY, token)
            .and_then(|_| {
                self.store
                    .set(TOKEN_TIMESTAMP_KEY, &issued_at_ms.to_string())
            });
        match res {
            Ok(()) => info!("access token saved"),
            Err(e) => warn!("could not save access token: {e}"),
        }
    }

    /// Returns the stored token if it was issued less than [`TOKEN_TTL_MS`]
    /// ago. Expired or unreadable entries are purged.
    pub fn load(&self) -> Option<String> {
        self.load_at(now_millis())
    }

    pub fn load_at(&self, now_ms: i64) -> Option<String> {
        let token = match self.store.get(ACCESS_TOKEN_KEY) {
            Ok(t) => t,
            Err(e) => {
                warn!("could not read access token: {e}");
                return None;
            }
        };
        let timestamp = match self.store.get(TOKEN_TIMESTAMP_KEY) {
            Ok(t) => t,
            Err(e) => {
                warn!("could not read token timestamp: {e}");
                return None;
            }
        };

        let (Some(token), Some(timestamp)) = (token, timestamp) else {
            return None;
        };

        match timestamp.trim().parse::<i64>() {
            Ok(issued_at) if now_ms - issued_at < TOKEN_TTL_MS => {
                debug!("valid access token found in storage");
                Some(token)
            }
            Ok(_) => {
                info!("stored access token expired, removing");
                self.clear();
                None
            }
            Err(_) => {
                warn!("unreadable token timestamp {timestamp:?}, removing");
                self.clear();
                None
            }
        }
    }

    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, TOKEN_TIMESTAMP_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!("could not remove {key}: {e}");
            }
        }
    }
}
