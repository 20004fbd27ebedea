use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::auth::handle::TokenHandle;
use crate::auth::implicit::{self, LoginRequest, OAuthConfig, RedirectOutcome};
use crate::auth::session_store::SessionStore;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// The mail API module has not signalled readiness yet.
    Uninitialized,
    Ready,
    AwaitingLogin,
    Authenticated,
}

/// Decides whether a usable credential exists and runs login/logout.
pub struct AuthGateway {
    handle: Arc<dyn TokenHandle>,
    session: SessionStore,
    state: AuthState,
    /// Set by `logout`; ignores whatever the handle still holds until the
    /// next successful login.
    signed_out: bool,
}

impl AuthGateway {
    pub fn new(handle: Arc<dyn TokenHandle>, session: SessionStore) -> Self {
        Self {
            handle,
            session,
            state: AuthState::Uninitialized,
            signed_out: false,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Called once the mail API module is loaded. Restores a stored
    /// credential without user interaction when one is still valid.
    pub fn client_ready(&mut self) -> AuthState {
        self.handle.mark_loaded();
        self.state = AuthState::Ready;
        debug!("mail module ready");

        self.state = match self.session.load() {
            Some(token) => match self.handle.attach_token(&token) {
                Ok(()) => {
                    info!("login restored from stored token");
                    AuthState::Authenticated
                }
                Err(e) => {
                    error!("could not attach stored token: {e}");
                    AuthState::AwaitingLogin
                }
            },
            None => AuthState::AwaitingLogin,
        };
        self.state
    }

    /// Phase 1: the URL the user has to visit.
    pub fn begin_login(&mut self, cfg: &OAuthConfig) -> Result<LoginRequest> {
        match implicit::authorization_request(cfg) {
            Ok(req) => {
                debug!("authorization request prepared for {}", req.redirect_origin);
                Ok(req)
            }
            Err(e) => {
                error!("login could not start: {e}");
                self.state = AuthState::AwaitingLogin;
                Err(e)
            }
        }
    }

    /// Phase 2: consume the fragment the provider redirected back with.
    pub fn complete_login(&mut self, fragment: &str) -> Result<()> {
        match implicit::parse_redirect_fragment(fragment) {
            RedirectOutcome::Token(token) => {
                self.session.save(&token);
                if let Err(e) = self.handle.attach_token(&token) {
                    error!("could not attach token: {e}");
                    self.state = AuthState::AwaitingLogin;
                    return Err(e);
                }
                info!("login completed");
                self.signed_out = false;
                self.state = AuthState::Authenticated;
                Ok(())
            }
            RedirectOutcome::Error(raw) => {
                warn!("authorization error: {raw}");
                self.state = AuthState::AwaitingLogin;
                Err(Error::Authorization(raw))
            }
            RedirectOutcome::Empty => {
                self.state = AuthState::AwaitingLogin;
                Err(Error::Authorization("missing access_token".into()))
            }
        }
    }

    /// True when the handle carries a token and the module is loaded.
    /// A valid stored token is reattached if the handle lost it.
    pub fn is_authenticated(&self) -> bool {
        if self.signed_out {
            return false;
        }
        let has_token = self.handle.token().is_some();
        let loaded = self.handle.is_loaded();

        debug!("auth check: token={has_token} loaded={loaded}");

        if !has_token && loaded {
            if let Some(saved) = self.session.load() {
                info!("reattaching stored token");
                return self.handle.attach_token(&saved).is_ok();
            }
        }

        has_token && loaded
    }

    /// Always ends logged out. A failing detach is only logged.
    pub fn logout(&mut self) {
        if let Err(e) = self.handle.detach_token() {
            warn!("could not detach token: {e}");
        }
        self.session.clear();
        self.signed_out = true;
        self.state = AuthState::AwaitingLogin;
        info!("logged out");
    }

    /// Drops the stored token without touching the current handle.
    pub fn clear_stored_token(&self) {
        self.session.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::handle::ClientHandle;
    use crate::auth::session_store::{
        ACCESS_TOKEN_KEY, TOKEN_TIMESTAMP_KEY, TOKEN_TTL_MS, now_millis,
    };
    use crate::store::{KeyValueStore, MemoryStore};

    fn gateway() -> (Arc<MemoryStore>, ClientHandle, AuthGateway) {
        let kv = Arc::new(MemoryStore::new());
        let handle = ClientHandle::create();
        let gw = AuthGateway::new(Arc::new(handle.clone()), SessionStore::new(kv.clone()));
        (kv, handle, gw)
    }

    fn store_token(kv: &MemoryStore, token: &str, age_ms: i64) {
        kv.set(ACCESS_TOKEN_KEY, token).unwrap();
        kv.set(TOKEN_TIMESTAMP_KEY, &(now_millis() - age_ms).to_string())
            .unwrap();
    }

    #[test]
    fn nothing_stored_is_not_authenticated() {
        let (_, _, mut gw) = gateway();
        assert!(!gw.is_authenticated());
        assert_eq!(gw.client_ready(), AuthState::AwaitingLogin);
        assert!(!gw.is_authenticated());
    }

    #[test]
    fn ready_restores_valid_stored_token() {
        let (kv, handle, mut gw) = gateway();
        store_token(&kv, "stored", 1_000);
        assert_eq!(gw.state(), AuthState::Uninitialized);
        assert_eq!(gw.client_ready(), AuthState::Authenticated);
        assert_eq!(handle.token().as_deref(), Some("stored"));
    }

    #[test]
    fn expired_token_is_purged_on_ready() {
        let (kv, handle, mut gw) = gateway();
        store_token(&kv, "old", TOKEN_TTL_MS + 5);
        assert_eq!(gw.client_ready(), AuthState::AwaitingLogin);
        assert_eq!(handle.token(), None);
        assert_eq!(kv.get(ACCESS_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn lazily_reattaches_after_handle_lost_token() {
        let (kv, handle, mut gw) = gateway();
        gw.client_ready();
        store_token(&kv, "later", 10);
        assert_eq!(handle.token(), None);

        assert!(gw.is_authenticated());
        assert_eq!(handle.token().as_deref(), Some("later"));
    }

    #[test]
    fn token_without_loaded_module_is_not_enough() {
        let (kv, handle, gw) = gateway();
        store_token(&kv, "tok", 10);
        handle.attach_token("tok").unwrap();
        assert!(!gw.is_authenticated());
    }

    #[test]
    fn logout_then_login_again() {
        let (kv, handle, mut gw) = gateway();
        store_token(&kv, "tok", 10);
        gw.client_ready();
        gw.logout();
        assert_eq!(handle.token(), None);
        assert!(!gw.is_authenticated());

        gw.complete_login("access_token=next").unwrap();
        assert!(gw.is_authenticated());
    }

    #[test]
    fn complete_login_with_token() {
        let (kv, handle, mut gw) = gateway();
        gw.client_ready();
        gw.complete_login("#access_token=fresh&token_type=Bearer")
            .unwrap();
        assert_eq!(gw.state(), AuthState::Authenticated);
        assert_eq!(handle.token().as_deref(), Some("fresh"));
        assert_eq!(kv.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn complete_login_with_error_surfaces_raw_message() {
        let (_, handle, mut gw) = gateway();
        gw.client_ready();
        let err = gw.complete_login("error=access_denied").unwrap_err();
        assert!(matches!(err, Error::Authorization(ref m) if m == "access_denied"));
        assert_eq!(gw.state(), AuthState::AwaitingLogin);
        assert_eq!(handle.token(), None);
    }

    #[test]
    fn begin_login_without_client_id_stays_awaiting() {
        let (_, _, mut gw) = gateway();
        gw.client_ready();
        let cfg = OAuthConfig::new(None, "http://127.0.0.1:8080");
        assert!(matches!(gw.begin_login(&cfg), Err(Error::MissingClientId)));
        assert_eq!(gw.state(), AuthState::AwaitingLogin);
    }

    struct StuckHandle(ClientHandle);

    impl TokenHandle for StuckHandle {
        fn token(&self) -> Option<String> {
            self.0.token()
        }
        fn attach_token(&self, token: &str) -> Result<()> {
            self.0.attach_token(token)
        }
        fn detach_token(&self) -> Result<()> {
            Err(Error::Storage("handle refused to let go".into()))
        }
        fn is_loaded(&self) -> bool {
            self.0.is_loaded()
        }
        fn mark_loaded(&self) {
            self.0.mark_loaded()
        }
    }

    #[test]
    fn logout_succeeds_even_if_detach_fails() {
        let kv = Arc::new(MemoryStore::new());
        let inner = ClientHandle::create();
        let mut gw = AuthGateway::new(
            Arc::new(StuckHandle(inner.clone())),
            SessionStore::new(kv.clone()),
        );
        store_token(&kv, "tok", 10);
        assert_eq!(gw.client_ready(), AuthState::Authenticated);

        gw.logout();

        assert_eq!(gw.state(), AuthState::AwaitingLogin);
        assert_eq!(kv.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(inner.token().as_deref(), Some("tok"));
        assert!(!gw.is_authenticated());
    }
}
