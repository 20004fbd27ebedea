use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::auth::loopback;
use crate::auth::{AuthGateway, AuthState, ClientHandle, SessionStore, TokenHandle};
use crate::config::{Config, resolve_db_path};
use crate::domain::{MessageSummary, Sender};
use crate::error::Error;
use crate::favorites::FavoriteSet;
use crate::mail::{GmailClient, MailApi, SenderAggregator};
use crate::store::{KeyValueStore, MemoryStore, SqliteStore};

/// How long a browser login may take before giving up.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(180);

/// Upper bound on messages shown for one sender.
pub const SENDER_MESSAGES_MAX: u32 = 50;

/// Everything one run of the program needs, built once from the config.
pub struct MailHub {
    pub config: Config,
    store: Arc<dyn KeyValueStore>,
    gateway: AuthGateway,
    api: Box<dyn MailApi>,
}

impl MailHub {
    /// Opens the SQLite store named by the config. When it cannot be
    /// opened the hub runs on an in-memory store for this process only.
    pub fn open(config: Config) -> Self {
        let store: Arc<dyn KeyValueStore> = match open_sqlite(&config) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("storage unavailable, nothing will be kept: {e:#}");
                Arc::new(MemoryStore::new())
            }
        };
        Self::with_store(config, store)
    }

    /// Wires storage, the shared client handle, the gateway and the Gmail
    /// client, then signals the gateway that the client is ready.
    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> Self {
        let handle: Arc<dyn TokenHandle> = Arc::new(ClientHandle::create());
        let api = match &config.api_base_url {
            Some(base) => GmailClient::with_base_url(handle.clone(), base),
            None => GmailClient::new(handle.clone()),
        };
        Self::assemble(config, store, handle, Box::new(api))
    }

    pub fn assemble(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        handle: Arc<dyn TokenHandle>,
        api: Box<dyn MailApi>,
    ) -> Self {
        let mut gateway = AuthGateway::new(handle, SessionStore::new(store.clone()));
        gateway.client_ready();
        Self {
            config,
            store,
            gateway,
            api,
        }
    }

    pub fn auth_state(&self) -> AuthState {
        self.gateway.state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.gateway.is_authenticated()
    }

    /// Full browser round trip: open the consent page, wait for the
    /// redirect, and store the token.
    pub fn login_with_browser(&mut self) -> Result<()> {
        let req = self.gateway.begin_login(&self.config.oauth())?;
        let fragment = loopback::receive_fragment(&req, LOGIN_TIMEOUT)?;
        self.gateway.complete_login(&fragment)?;
        Ok(())
    }

    pub fn complete_login(&mut self, fragment: &str) -> Result<(), Error> {
        self.gateway.complete_login(fragment)
    }

    /// Ends the session and forgets the favorite senders with it.
    pub fn logout(&mut self) {
        self.gateway.logout();
        FavoriteSet::clear(self.store.as_ref());
    }

    pub fn clear_stored_token(&self) {
        self.gateway.clear_stored_token();
        info!("stored token removed");
    }

    fn ensure_authenticated(&self) -> Result<(), Error> {
        if self.gateway.is_authenticated() {
            Ok(())
        } else {
            Err(Error::NotAuthenticated)
        }
    }

    pub fn senders(&self, sample_size: u32) -> Result<Vec<Sender>, Error> {
        self.ensure_authenticated()?;
        SenderAggregator::new(self.api.as_ref()).get_senders(sample_size)
    }

    pub fn messages_from(&self, address: &str, max: u32) -> Result<Vec<MessageSummary>, Error> {
        self.ensure_authenticated()?;
        SenderAggregator::new(self.api.as_ref()).get_emails_by_sender(address, max)
    }

    pub fn favorites(&self) -> FavoriteSet {
        FavoriteSet::load(self.store.as_ref())
    }

    /// Flips `address` in the favorite set and persists it.
    pub fn toggle_favorite(&self, address: &str) -> bool {
        let mut favs = self.favorites();
        let now = favs.toggle(address);
        favs.save(self.store.as_ref());
        now
    }
}

fn open_sqlite(config: &Config) -> Result<SqliteStore> {
    let db_path = resolve_db_path(config)?;
    SqliteStore::open(&db_path).with_context(|| format!("opening {}", db_path.display()))
}
