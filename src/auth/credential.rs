//! Delegated-access credential

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Access credential granted by the identity provider
///
/// Tokens are redacted from the `Debug` output so credentials never end up in
/// the run log.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token presented to the indexing API
    pub access_token: String,

    /// Long-lived token used to mint new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// When the access token stops being accepted
    pub expires_at: DateTime<Utc>,

    /// Scopes the provider granted
    pub scopes: BTreeSet<String>,
}

impl Credential {
    /// Returns true if the access token expires within `margin` from now
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_within_at(margin, Utc::now())
    }

    /// Same as [`Credential::expires_within`] with an explicit clock
    pub fn expires_within_at(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + margin
    }

    /// Returns true if every scope in `requested` was granted
    pub fn covers_scopes<S: AsRef<str>>(&self, requested: &[S]) -> bool {
        requested
            .iter()
            .all(|scope| self.scopes.contains(scope.as_ref()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}
