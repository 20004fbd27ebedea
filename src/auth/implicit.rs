//! OAuth2 implicit grant, split in two phases.
//!
//! Phase 1 builds the URL the host environment navigates to. Phase 2 turns
//! the fragment the provider redirects back with into a token or an error,
//! without touching any browser or network.

use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope};
use url::Url;

use crate::error::{Error, Result};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Everything phase 1 needs.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    /// Where the provider sends the browser back. Only its origin is used.
    pub redirect_uri: String,
    pub auth_url: String,
    pub scope: String,
}

impl OAuthConfig {
    pub fn new(client_id: Option<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id,
            redirect_uri: redirect_uri.into(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            scope: GMAIL_READONLY_SCOPE.to_string(),
        }
    }
}

/// Output of phase 1.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub url: Url,
    pub redirect_origin: String,
    pub state: CsrfToken,
}

/// Result of parsing a redirect fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    Token(String),
    Error(String),
    /// Neither `access_token` nor `error` was present.
    Empty,
}

/// Serializes the origin (`scheme://host[:port]`) of a redirect URI.
pub fn redirect_origin(redirect_uri: &str) -> Result<String> {
    let url = Url::parse(redirect_uri)
        .map_err(|e| Error::Config(format!("invalid redirect_uri '{redirect_uri}': {e}")))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(Error::Config(format!(
            "redirect_uri has no usable origin: {redirect_uri}"
        )));
    }
    Ok(origin.ascii_serialization())
}

pub fn authorization_request(cfg: &OAuthConfig) -> Result<LoginRequest> {
    let client_id = cfg
        .client_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(Error::MissingClientId)?;

    let origin = redirect_origin(&cfg.redirect_uri)?;

    let auth_url = AuthUrl::new(cfg.auth_url.clone())
        .map_err(|e| Error::Config(format!("invalid auth_url: {e}")))?;
    let redirect = RedirectUrl::new(origin.clone())
        .map_err(|e| Error::Config(format!("invalid redirect origin: {e}")))?;

    let client = BasicClient::new(ClientId::new(client_id.to_string()), None, auth_url, None)
        .set_redirect_uri(redirect);

    let (url, state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new(cfg.scope.clone()))
        .use_implicit_flow()
        .add_extra_param("prompt", "consent")
        .url();

    Ok(LoginRequest {
        url,
        redirect_origin: origin,
        state,
    })
}

/// Parses `access_token=...&token_type=...` or `error=...`. A leading `#`
/// is ignored. A token wins over an error if both are present.
pub fn parse_redirect_fragment(fragment: &str) -> RedirectOutcome {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);

    let mut token = None;
    let mut error = None;
    for (k, v) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match k.as_ref() {
            "access_token" if !v.is_empty() => token = Some(v.into_owned()),
            "error" if !v.is_empty() => error = Some(v.into_owned()),
            _ => {}
        }
    }

    match (token, error) {
        (Some(t), _) => RedirectOutcome::Token(t),
        (None, Some(e)) => RedirectOutcome::Error(e),
        (None, None) => RedirectOutcome::Empty,
    }
}

/// Returns `url` with its fragment removed, the way the address bar is
/// cleaned after a redirect has been handled.
pub fn strip_fragment(url: &Url) -> Url {
    let mut clean = url.clone();
    clean.set_fragment(None);
    clean
}
