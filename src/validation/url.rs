//! Syntactic URL checks applied to every token of the input list

use url::Url;

/// Accepts absolute `http`/`https` URLs with a non-empty host, at most
/// `max_length` characters long. Never fails: anything unparseable is
/// simply rejected.
#[derive(Debug, Clone, Copy)]
pub struct UrlValidator {
    max_length: usize,
}

impl UrlValidator {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn is_valid(&self, candidate: &str) -> bool {
        if candidate.is_empty() || candidate.chars().count() > self.max_length {
            return false;
        }

        // The URL parser silently strips surrounding spaces and embedded
        // newlines/tabs; such tokens are rejected as-is instead.
        if candidate
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return false;
        }

        let Ok(parsed) = Url::parse(candidate) else {
            return false;
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }

        has_literal_authority(candidate, parsed.scheme())
            && parsed.host_str().is_some_and(|host| !host.is_empty())
    }
}

/// The parser repairs `http:///host` and `http:host` into `http://host/`;
/// require the `scheme://authority` form to be spelled out.
fn has_literal_authority(candidate: &str, scheme: &str) -> bool {
    candidate
        .get(scheme.len()..)
        .and_then(|rest| rest.strip_prefix("://"))
        .is_some_and(|authority| !authority.is_empty() && !authority.starts_with('/'))
}
