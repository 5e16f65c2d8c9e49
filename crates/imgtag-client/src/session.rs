//! Cookie-jar persistence for session-authenticated operations.
//!
//! The server establishes a cookie session on login. A browser keeps that
//! cookie for us; a command-line process does not outlive a single command,
//! so the jar is exported after session calls and re-imported on start-up.

use reqwest::cookie::{CookieStore, Jar};
use url::Url;

/// Seed `jar` with a `name=value; name2=value2` header previously exported
/// for `base_url`.
pub fn import_cookies(jar: &Jar, base_url: &Url, header: &str) {
    for pair in header.split(';').map(str::trim).filter(|pair| pair.contains('=')) {
        jar.add_cookie_str(pair, base_url);
    }
}

/// Cookies the jar would send to `base_url`, in request-header form.
#[must_use]
pub fn export_cookies(jar: &Jar, base_url: &Url) -> Option<String> {
    jar.cookies(base_url)
        .and_then(|value| value.to_str().ok().map(str::to_string))
        .filter(|value| !value.trim().is_empty())
}
