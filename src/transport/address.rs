//! Target URL resolution.
//!
//! The bus accepts either an absolute URL or a path. Paths are joined onto
//! the configured application origin. The result is always translated to
//! the WebSocket scheme family:
//!
//! | Input | Result |
//! |-------|--------|
//! | `http://host/bus` | `ws://host/bus` |
//! | `https://host/bus` | `wss://host/bus` |
//! | `ws://host/bus`, `wss://host/bus` | unchanged |
//! | `/bus` + origin `https://host` | `wss://host/bus` |

use url::Url;

use crate::error::{Error, Result};

/// Schemes accepted as absolute targets.
const ABSOLUTE_PREFIXES: [&str; 4] = ["http://", "https://", "ws://", "wss://"];

/// Resolves a bus target into a `ws://` or `wss://` URL.
///
/// # Errors
///
/// - [`Error::InvalidUrl`] if the target or join result cannot be parsed
/// - [`Error::Config`] if `target` is a path and no origin is configured,
///   or the origin has a scheme other than http(s)/ws(s)
pub fn resolve_ws_url(target: &str, origin: Option<&Url>) -> Result<Url> {
    let absolute = if is_absolute(target) {
        Url::parse(target).map_err(|e| Error::invalid_url(target, e))?
    } else {
        let origin = origin.ok_or_else(|| {
            Error::config(format!(
                "'{target}' is a path and no origin is configured.\n\
                 Use .origin(\"https://host\") or pass an absolute URL."
            ))
        })?;
        origin.join(target).map_err(|e| Error::invalid_url(target, e))?
    };

    to_ws_scheme(absolute)
}

/// Parses an application origin.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if `origin` is not an absolute URL.
pub fn parse_origin(origin: &str) -> Result<Url> {
    Url::parse(origin).map_err(|e| Error::invalid_url(origin, e))
}

fn is_absolute(target: &str) -> bool {
    ABSOLUTE_PREFIXES.iter().any(|prefix| {
        target
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}

fn to_ws_scheme(mut url: Url) -> Result<Url> {
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::config(format!(
                "Unsupported scheme '{other}' in {url}"
            )));
        }
    };

    if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
        return Err(Error::config(format!("Cannot switch {url} to {scheme}")));
    }

    Ok(url)
}
