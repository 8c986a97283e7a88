//! Repository URL splitting.
//!
//! Graph URL patterns are written against a `host` and a `path` variable:
//!
//! ```
//! use tcgraph_core::urls::resolve;
//!
//! let parts = resolve("https://hg.mozilla.org/try/").unwrap();
//! assert_eq!(parts.host, "https://hg.mozilla.org");
//! assert_eq!(parts.path, "/try");
//! ```

use crate::error::UrlError;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlParts {
    /// `<scheme>://<hostname[:port]>`
    pub host: String,
    /// Normalized absolute path; empty when the path is the root.
    pub path: String,
}

/// Split a repository URL into a host and a normalized path.
///
/// URLs without a scheme are read as `http`.
pub fn resolve(url: &str) -> Result<UrlParts, UrlError> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{url}"))
            .map_err(|e| invalid(url, e.to_string()))?,
        Err(e) => return Err(invalid(url, e.to_string())),
    };

    let hostname = parsed
        .host_str()
        .ok_or_else(|| invalid(url, "missing host".to_string()))?;
    let port = parsed
        .port()
        .or_else(|| written_port(url).and(parsed.port_or_known_default()));
    let authority = match port {
        Some(port) => format!("{hostname}:{port}"),
        None => hostname.to_string(),
    };

    Ok(UrlParts {
        host: format!("{}://{}", parsed.scheme(), authority),
        path: normalize_path(parsed.path()),
    })
}

/// Port spelled out in the authority of `url`.
///
/// `Url` drops a port equal to the scheme default; the host variable keeps
/// whatever the repository URL wrote.
fn written_port(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let (_, port) = host_port.rsplit_once(':')?;
    (!port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())).then_some(port)
}

/// Resolve `path` against `/`, collapsing `.`, `..` and repeated separators.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn invalid(url: &str, reason: String) -> UrlError {
    UrlError {
        url: url.to_string(),
        reason,
    }
}
