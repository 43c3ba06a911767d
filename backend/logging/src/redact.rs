//! Log Redaction
//!
//! Scrubs provider API keys and bearer tokens from text before it is logged
//! or echoed back to a client. Provider error bodies sometimes quote the
//! key that was rejected.

use std::sync::LazyLock;

use regex::Regex;

static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[A-Za-z0-9_\-]{8,})|(tvly-[A-Za-z0-9_\-]{8,})|(Bearer\s+[A-Za-z0-9\-\._~+/]+=*)")
        .expect("static regex")
});

/// Redacts credential-shaped substrings.
pub fn redact_sensitive_data(input: &str) -> String {
    API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]").into_owned()
}
