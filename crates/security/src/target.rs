//! Target validation: the gate in front of every run.
//!
//! A target is accepted when it is one of:
//! - an absolute URL with both a scheme and a host (`https://example.com/app`)
//! - a bare domain: labels of `[A-Za-z0-9.-]` ending in a TLD of 2+ letters
//! - a dotted quad (`10.0.0.1`)
//!
//! No network access is performed. The IPv4 pattern does **not** range-check
//! octets, so `999.999.999.999` passes; scope enforcement is the operator's
//! responsibility.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use url::Url;
use watchtower_core::error::ValidationError;

static DOMAIN_RE: OnceLock<Option<Regex>> = OnceLock::new();
static IPV4_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn domain_re() -> Option<&'static Regex> {
    DOMAIN_RE
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok())
        .as_ref()
}

fn ipv4_re() -> Option<&'static Regex> {
    IPV4_RE
        .get_or_init(|| Regex::new(r"^[0-9]{1,3}(\.[0-9]{1,3}){3}$").ok())
        .as_ref()
}

/// Returns `true` if `target` is syntactically acceptable.
pub fn validate_target(target: &str) -> bool {
    check_target(target).is_ok()
}

/// Like [`validate_target`] but explains the rejection.
pub fn check_target(target: &str) -> Result<(), ValidationError> {
    if target.is_empty() {
        return Err(ValidationError::EmptyTarget);
    }

    if let Ok(url) = Url::parse(target) {
        if !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty()) {
            return Ok(());
        }
    }

    let matches = |re: Option<&Regex>| re.is_some_and(|re| re.is_match(target));
    if matches(domain_re()) || matches(ipv4_re()) {
        return Ok(());
    }

    debug!(value = %target, "Target rejected");
    Err(ValidationError::InvalidTarget(target.to_string()))
}
