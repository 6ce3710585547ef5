//! Destination URL allow-list.

use regex::Regex;
use std::sync::LazyLock;

/// Anchored at the start and requires the path slash after host[:port].
#[allow(clippy::expect_used, reason = "Pattern is a compile-time constant")]
static ENDPOINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://[a-zA-Z0-9.\-]+\.(visualforce|force|salesforce|cloudforce|database)\.com(:[0-9]+)?/",
    )
    .expect("endpoint pattern must compile")
});

/// Decides whether a destination URL is a trusted relay target.
///
/// Applied to the inbound destination header and again to every redirect
/// target before credentials or the body are re-attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointValidator;

impl EndpointValidator {
    pub fn is_allowed(&self, url: &str) -> bool {
        ENDPOINT_PATTERN.is_match(url)
    }
}
