use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ShareError;

/// Custom-scheme URL only the host app handles, e.g. `takasly://share`.
///
/// Carries no payload: the host re-reads the hand-off record once woken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationAddress {
    pub scheme: String,
    pub host: String,
}

impl ActivationAddress {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }
}

impl fmt::Display for ActivationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)
    }
}

impl FromStr for ActivationAddress {
    type Err = ShareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ShareError::Config(format!("activation URL {:?}: {}", s, reason));

        let (scheme, host) = s.split_once("://").ok_or_else(|| invalid("missing ://"))?;

        // RFC 3986: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
        let mut chars = scheme.chars();
        let scheme_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !scheme_ok {
            return Err(invalid("bad scheme"));
        }

        let host = host.trim_end_matches('/');
        if host.is_empty()
            || host
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#'))
        {
            return Err(invalid("host must be a bare name without path, query or payload"));
        }

        Ok(Self::new(scheme.to_ascii_lowercase(), host))
    }
}
