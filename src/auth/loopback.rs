//! Host side of the implicit flow for a terminal program.
//!
//! The provider returns the token in the URL fragment, which browsers never
//! send to a server. The loopback listener therefore answers the redirect with
//! a small relay page that cleans the address bar and posts the fragment back
//! as a query string.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use tiny_http::{Header, Response, Server};
use url::Url;

use crate::auth::implicit::LoginRequest;

const RELAY_PATH: &str = "/__mailhub_fragment";

const RELAY_PAGE: &str = r#"<!doctype html>
<html><head><meta charset="utf-8"><title>mailhub</title></head>
<body>
<p id="msg">Finishing sign-in...</p>
<script>
  var fragment = window.location.hash.substring(1);
  window.history.replaceState({}, document.title, window.location.pathname);
  fetch("/__mailhub_fragment?" + fragment).then(function () {
    document.getElementById("msg").textContent = "Done. You can close this tab.";
  });
</script>
</body></html>
"#;

/// Opens the authorization URL and blocks until the browser relays the
/// redirect fragment back, or `timeout` elapses. Returns the raw fragment.
pub fn receive_fragment(req: &LoginRequest, timeout: Duration) -> Result<String> {
    let origin = Url::parse(&req.redirect_origin)
        .map_err(|e| anyhow!("invalid redirect origin '{}': {e}", req.redirect_origin))?;

    let host = origin
        .host_str()
        .ok_or_else(|| anyhow!("redirect origin missing host: {}", req.redirect_origin))?;
    let port = origin
        .port_or_known_default()
        .ok_or_else(|| anyhow!("redirect origin missing port: {}", req.redirect_origin))?;

    let bind_ip: IpAddr = match host {
        "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other
            .parse::<IpAddr>()
            .map_err(|_| anyhow!("redirect host must be localhost/127.0.0.1 or an IP: {other}"))?,
    };
    let bind_addr = SocketAddr::new(bind_ip, port);

    // Listen before the browser is sent anywhere.
    let server = Server::http(bind_addr)
        .map_err(|e| anyhow!("failed to bind OAuth callback server on {bind_addr}: {e:?}"))?;

    info!("opening authorization page");
    println!("Open this URL in your browser:\n{}", req.url);
    if let Err(e) = open::that(req.url.as_str()) {
        warn!("could not open browser automatically: {e}");
    }

    serve_until_fragment(&server, host, port, timeout)
}

fn serve_until_fragment(server: &Server, host: &str, port: u16, timeout: Duration) -> Result<String> {
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        let Ok(maybe_request) = server.recv_timeout(Duration::from_millis(500)) else {
            continue;
        };
        let Some(request) = maybe_request else {
            continue;
        };

        let full = format!("http://{}:{}{}", host, port, request.url());
        let Ok(parsed) = Url::parse(&full) else {
            let _ = request.respond(Response::from_string("Bad redirect").with_status_code(400));
            continue;
        };

        if parsed.path() == RELAY_PATH {
            let fragment = parsed.query().unwrap_or_default().to_string();
            debug!("fragment relayed ({} bytes)", fragment.len());
            let _ = request.respond(Response::from_string("ok"));
            return Ok(fragment);
        }

        let page = Response::from_string(RELAY_PAGE);
        let page = match Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]) {
            Ok(h) => page.with_header(h),
            Err(_) => page,
        };
        let _ = request.respond(page);
    }

    Err(anyhow!("no authorization response received within timeout"))
}
